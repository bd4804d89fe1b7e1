//! Error types for the SPARQL endpoint

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EndpointError {
    /// Operation text is missing, ambiguous or fails to parse
    #[error("{0}")]
    BadRequest(String),

    /// Update disabled, or bearer token missing/invalid
    #[error("{0}")]
    Forbidden(String),

    /// Parsed operation the endpoint does not execute (e.g. LOAD)
    #[error("{0}")]
    NotImplemented(String),

    /// Negotiated format cannot encode the result shape
    #[error("{0}")]
    UnprocessableEntity(String),

    #[error("Error executing the SPARQL operation: {0}")]
    Execution(String),

    #[error("Unbound extension function: <{0}>")]
    UnboundFunction(String),

    #[error("Extension function already registered: <{0}>")]
    DuplicateFunction(String),

    #[error("Error loading RDF data: {0}")]
    Load(String),

    #[error("Invalid IRI: {0}")]
    InvalidIri(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EndpointError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        EndpointError::BadRequest(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        EndpointError::Forbidden(msg.into())
    }

    pub fn not_implemented(msg: impl Into<String>) -> Self {
        EndpointError::NotImplemented(msg.into())
    }

    pub fn unprocessable(msg: impl Into<String>) -> Self {
        EndpointError::UnprocessableEntity(msg.into())
    }

    pub fn execution(msg: impl Into<String>) -> Self {
        EndpointError::Execution(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        EndpointError::Internal(msg.into())
    }

    /// Map error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            EndpointError::BadRequest(_) => StatusCode::BAD_REQUEST,
            EndpointError::Execution(_) => StatusCode::BAD_REQUEST,
            EndpointError::UnboundFunction(_) => StatusCode::BAD_REQUEST,
            EndpointError::Forbidden(_) => StatusCode::FORBIDDEN,
            EndpointError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            EndpointError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,

            // Startup and internal failures
            EndpointError::DuplicateFunction(_)
            | EndpointError::InvalidIri(_)
            | EndpointError::Load(_)
            | EndpointError::Config(_)
            | EndpointError::Io(_)
            | EndpointError::Yaml(_)
            | EndpointError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub status: u16,
}

impl IntoResponse for EndpointError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "request rejected");
        }

        let body = ErrorResponse {
            message: self.to_string(),
            status: status.as_u16(),
        };

        let json = serde_json::to_string(&body)
            .unwrap_or_else(|_| format!(r#"{{"message":"{}","status":{}}}"#, status, status.as_u16()));

        (status, [("content-type", "application/json")], json).into_response()
    }
}

pub type Result<T> = std::result::Result<T, EndpointError>;

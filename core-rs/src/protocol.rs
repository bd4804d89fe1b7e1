//! Request normalization for the SPARQL 1.1 Protocol
//!
//! Three bindings converge on one [`Operation`]:
//! - `GET ?query=...` / `GET ?update=...`
//! - `POST` with an `application/x-www-form-urlencoded` body
//! - `POST` with an `application/sparql-query` / `application/sparql-update` body
//!
//! Access control for updates is applied here, before any parsing happens.

use axum::http::{header, HeaderMap, Method};

use crate::config::UpdatePolicy;
use crate::errors::{EndpointError, Result};

pub const SPARQL_QUERY: &str = "application/sparql-query";
pub const SPARQL_UPDATE: &str = "application/sparql-update";
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Update,
}

/// Which HTTP binding supplied the operation text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationSource {
    GetParam,
    PostForm,
    PostBody,
}

/// One logical SPARQL operation extracted from a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub text: String,
    pub kind: OperationKind,
    pub source: OperationSource,
}

/// The parts of an HTTP request the normalizer looks at
#[derive(Debug, Clone, Copy)]
pub struct HttpRequest<'a> {
    pub method: &'a Method,
    pub query_string: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub body: &'a [u8],
}

impl<'a> HttpRequest<'a> {
    pub fn new(method: &'a Method, query_string: Option<&'a str>, headers: &'a HeaderMap, body: &'a [u8]) -> Self {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok());

        Self {
            method,
            query_string,
            content_type,
            body,
        }
    }
}

/// Extract the operation carried by a request.
///
/// `Ok(None)` means no operation was supplied (service description path).
pub fn normalize(request: &HttpRequest<'_>) -> Result<Option<Operation>> {
    if *request.method == Method::POST {
        normalize_post(request)
    } else {
        normalize_get(request.query_string)
    }
}

fn normalize_get(query_string: Option<&str>) -> Result<Option<Operation>> {
    let pairs = match query_string {
        Some(qs) if !qs.is_empty() => decode_pairs(qs.as_bytes())?,
        _ => return Ok(None),
    };

    let query = first_value(&pairs, "query");
    let update = first_value(&pairs, "update");

    match (query, update) {
        (Some(_), Some(_)) => Err(EndpointError::bad_request("Cannot do both query and update")),
        (Some(text), None) => Ok(Some(Operation {
            text: text.to_string(),
            kind: OperationKind::Query,
            source: OperationSource::GetParam,
        })),
        (None, Some(text)) => Ok(Some(Operation {
            text: text.to_string(),
            kind: OperationKind::Update,
            source: OperationSource::GetParam,
        })),
        (None, None) => Ok(None),
    }
}

fn normalize_post(request: &HttpRequest<'_>) -> Result<Option<Operation>> {
    let media_type = request.content_type.map(essence);

    match media_type.as_deref() {
        Some(SPARQL_QUERY) => direct_body(request.body, OperationKind::Query).map(Some),
        Some(SPARQL_UPDATE) => direct_body(request.body, OperationKind::Update).map(Some),
        // Form bodies; federated clients sometimes omit the content type
        _ => {
            if !request.body.is_empty() {
                let pairs = decode_pairs(request.body)?;
                let found = pairs.iter().find_map(|(key, value)| {
                    let kind = match key.as_str() {
                        "query" => OperationKind::Query,
                        "update" => OperationKind::Update,
                        _ => return None,
                    };
                    if value.is_empty() {
                        return None;
                    }
                    Some(Operation {
                        text: value.clone(),
                        kind,
                        source: OperationSource::PostForm,
                    })
                });
                if found.is_some() {
                    return Ok(found);
                }
            }
            normalize_get(request.query_string)
        }
    }
}

fn direct_body(body: &[u8], kind: OperationKind) -> Result<Operation> {
    let text = std::str::from_utf8(body)
        .map_err(|e| EndpointError::bad_request(format!("Request body is not valid UTF-8: {}", e)))?;

    Ok(Operation {
        text: text.to_string(),
        kind,
        source: OperationSource::PostBody,
    })
}

fn decode_pairs(input: &[u8]) -> Result<Vec<(String, String)>> {
    serde_urlencoded::from_bytes::<Vec<(String, String)>>(input)
        .map_err(|e| EndpointError::bad_request(format!("Malformed URL-encoded parameters: {}", e)))
}

fn first_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .filter(|(k, v)| k == key && !v.is_empty())
        .map(|(_, v)| v.as_str())
        .next()
}

/// Media type without parameters, lower-cased
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Enforce update access control. Queries always pass.
pub fn authorize(operation: &Operation, policy: &UpdatePolicy, headers: &HeaderMap) -> Result<()> {
    if operation.kind == OperationKind::Query {
        return Ok(());
    }

    if !policy.enabled {
        return Err(EndpointError::forbidden("INSERT and DELETE queries are not allowed."));
    }

    if let Some(expected) = policy.api_key.as_deref() {
        match extract_bearer_token(headers) {
            Some(token) if token == expected => {}
            _ => return Err(EndpointError::forbidden("Invalid API KEY.")),
        }
    }

    Ok(())
}

/// Extract a Bearer token from the Authorization header.
///
/// The scheme is matched case-insensitively and surrounding whitespace is ignored.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

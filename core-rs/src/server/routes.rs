//! HTTP routes
//!
//! GET and POST on the endpoint path share one handler: both are reduced to an
//! [`Operation`](crate::protocol::Operation) by the normalizer, then follow the
//! same authorize / parse / negotiate / execute pipeline.

use axum::body::Bytes;
use axum::extract::{RawQuery, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, Instrument};
use uuid::Uuid;

use super::state::AppState;
use crate::classify;
use crate::errors::{EndpointError, Result};
use crate::executor::{Outcome, QueryExecutor};
use crate::negotiate::{negotiate_description, negotiate_results, DescriptionFormat, NegotiatedFormat};
use crate::protocol::{authorize, normalize, HttpRequest};

/// Build the endpoint router
pub fn build_router(state: Arc<AppState>) -> Router {
    let path = state.config.path.clone();

    let mut router = Router::new().route(&path, get(sparql).post(sparql));
    if path != "/" {
        router = router.route("/", get(docs_redirect));
    }

    let router = router
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::clone(&state));

    if state.config.cors_enabled {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    }
}

async fn docs_redirect(State(state): State<Arc<AppState>>) -> Redirect {
    Redirect::temporary(state.config.docs_target())
}

/// SPARQL 1.1 Protocol handler for every binding
async fn sparql(
    State(state): State<Arc<AppState>>,
    method: Method,
    RawQuery(query_string): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let span = tracing::info_span!("sparql_request", request_id = %Uuid::new_v4(), method = %method);
    handle(state, method, query_string, headers, body)
        .instrument(span)
        .await
}

async fn handle(
    state: Arc<AppState>,
    method: Method,
    query_string: Option<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let request = HttpRequest::new(&method, query_string.as_deref(), &headers, &body);
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok());

    let Some(operation) = normalize(&request)? else {
        return Ok(describe(&state, accept));
    };

    authorize(&operation, &state.update_policy, &headers)?;

    let parsed = classify::parse(&operation)?;
    classify::ensure_supported(&parsed)?;

    // The result shape is known from the algebra, so format mismatches are
    // rejected before anything runs.
    let format = parsed
        .result_shape()
        .map(|shape| negotiate_results(accept, shape))
        .transpose()?;

    info!(
        operation = %parsed.tag().display_name(),
        source = ?operation.source,
        response_format = format.as_ref().map(|f| f.mime_type.as_str()).unwrap_or("none"),
        "executing SPARQL operation"
    );
    debug!(text = parsed.text(), "operation text");

    let content_type = format.as_ref().map(NegotiatedFormat::content_type);
    let task_state = Arc::clone(&state);
    let span = tracing::Span::current();
    let output = tokio::task::spawn_blocking(move || span.in_scope(|| run(&task_state, &parsed, format)))
        .await
        .map_err(|e| EndpointError::internal(format!("Query task failed: {}", e)))??;

    Ok(match (output, content_type) {
        (Some(bytes), Some(content_type)) => {
            ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        _ => StatusCode::NO_CONTENT.into_response(),
    })
}

/// Execute and serialize on the blocking pool; `None` means no body
fn run(
    state: &AppState,
    parsed: &classify::ParsedOperation,
    format: Option<NegotiatedFormat>,
) -> Result<Option<Vec<u8>>> {
    match state.executor.execute(parsed)? {
        Outcome::Updated => {
            info!(operation = %parsed.tag().display_name(), "update applied");
            Ok(None)
        }
        Outcome::Results(results) => {
            let format = format.ok_or_else(|| EndpointError::internal("Query results without a negotiated format"))?;
            QueryExecutor::serialize(results, &format).map(Some)
        }
    }
}

/// Response to a request carrying no operation
fn describe(state: &AppState, accept: Option<&str>) -> Response {
    let format = negotiate_description(accept, state.ui_page.is_some());
    debug!(description_format = ?format, "serving service description");

    match (format, &state.ui_page) {
        (DescriptionFormat::Html, Some(page)) => (
            [(header::CONTENT_TYPE, format.content_type())],
            page.clone(),
        )
            .into_response(),
        (DescriptionFormat::Turtle, _) => (
            [(header::CONTENT_TYPE, format.content_type())],
            state.documents.turtle.clone(),
        )
            .into_response(),
        _ => (
            [(header::CONTENT_TYPE, DescriptionFormat::RdfXml.content_type())],
            state.documents.rdf_xml.clone(),
        )
            .into_response(),
    }
}

//! Integration tests for SPARQL updates
//!
//! Covers update access control (disabled, API key) and that successful
//! updates mutate the shared store.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use oxigraph::io::RdfFormat;
use oxigraph::model::{GraphNameRef, Literal, NamedNode, QuadRef};
use sparql_endpoint::{build_router, AppState, EndpointConfig, ExtensionRegistry};
use std::sync::Arc;
use tower::ServiceExt;

const DATA: &str = r#"
@prefix ex: <http://example.org/> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
ex:alice rdfs:label "foo" .
"#;

const RELABEL: &str = r#"PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>
DELETE { ?s rdfs:label "foo" }
INSERT { ?s rdfs:label "bar" }
WHERE { ?s rdfs:label "foo" }"#;

fn state(enable_update: bool, api_key: Option<&str>) -> Arc<AppState> {
    let config = EndpointConfig {
        enable_update,
        api_key: api_key.map(str::to_string),
        ..Default::default()
    };
    let state = AppState::in_memory(config, ExtensionRegistry::new()).unwrap();
    state
        .executor
        .load_reader(RdfFormat::Turtle, DATA.as_bytes())
        .unwrap();
    Arc::new(state)
}

fn has_label(state: &AppState, label: &str) -> bool {
    let alice = NamedNode::new("http://example.org/alice").unwrap();
    let rdfs_label = NamedNode::new("http://www.w3.org/2000/01/rdf-schema#label").unwrap();
    let label = Literal::new_simple_literal(label);
    state
        .executor
        .store()
        .contains(QuadRef::new(&alice, &rdfs_label, &label, GraphNameRef::DefaultGraph))
        .unwrap()
}

fn post_update(update: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/sparql")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::ACCEPT, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let body = serde_urlencoded::to_string(&[("update", update)]).unwrap();
    builder.body(Body::from(body)).unwrap()
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, body)
}

#[tokio::test]
async fn test_update_disabled_is_forbidden_and_graph_unchanged() {
    let state = state(false, None);
    assert!(has_label(&state, "foo"));

    let (status, body) = send(build_router(Arc::clone(&state)), post_update(RELABEL, None)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["message"], "INSERT and DELETE queries are not allowed.");

    assert!(has_label(&state, "foo"));
    assert!(!has_label(&state, "bar"));
}

#[tokio::test]
async fn test_update_with_wrong_token_is_forbidden() {
    let state = state(true, Some("key"));

    for token in [Some("wrong"), None] {
        let (status, body) = send(build_router(Arc::clone(&state)), post_update(RELABEL, token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Invalid API KEY.");
    }

    assert!(has_label(&state, "foo"));
}

#[tokio::test]
async fn test_update_with_correct_token_applies() {
    let state = state(true, Some("key"));

    let (status, body) = send(build_router(Arc::clone(&state)), post_update(RELABEL, Some("key"))).await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
    assert!(!has_label(&state, "foo"));
    assert!(has_label(&state, "bar"));
}

#[tokio::test]
async fn test_update_without_api_key_is_open() {
    let state = state(true, None);

    let (status, _) = send(build_router(Arc::clone(&state)), post_update(RELABEL, None)).await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(has_label(&state, "bar"));
}

#[tokio::test]
async fn test_direct_update_body_ignores_accept() {
    let state = state(true, Some("key"));
    let request = Request::builder()
        .method("POST")
        .uri("/sparql")
        .header(header::CONTENT_TYPE, "application/sparql-update")
        .header(header::ACCEPT, "text/turtle")
        .header(header::AUTHORIZATION, "Bearer key")
        .body(Body::from(RELABEL))
        .unwrap();

    let (status, _) = send(build_router(Arc::clone(&state)), request).await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(has_label(&state, "bar"));
}

#[tokio::test]
async fn test_update_via_get_param() {
    let state = state(true, None);
    let params = serde_urlencoded::to_string(&[("update", RELABEL)]).unwrap();
    let request = Request::builder()
        .uri(format!("/sparql?{}", params))
        .body(Body::empty())
        .unwrap();

    let (status, _) = send(build_router(Arc::clone(&state)), request).await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(has_label(&state, "bar"));
}

#[tokio::test]
async fn test_load_is_not_implemented() {
    let state = state(true, None);

    let (status, body) = send(
        build_router(Arc::clone(&state)),
        post_update("LOAD <http://example.org/data.ttl>", None),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["message"], "Load not implemented");
}

#[tokio::test]
async fn test_invalid_update_is_bad_request() {
    let state = state(true, None);

    let (status, _) = send(build_router(Arc::clone(&state)), post_update("DELETE everything", None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(has_label(&state, "foo"));
}

#[tokio::test]
async fn test_forbidden_update_is_rejected_before_parsing() {
    let state = state(false, None);

    // Unparsable text still answers 403 when updates are off
    let (status, _) = send(build_router(Arc::clone(&state)), post_update("DELETE everything", None)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

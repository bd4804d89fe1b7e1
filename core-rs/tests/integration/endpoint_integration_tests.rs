//! Integration tests for the query side of the endpoint
//!
//! Drives the axum router in-process through every protocol binding:
//! - GET ?query=
//! - POST form body
//! - POST application/sparql-query body
//! - Service description and query UI

use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use oxigraph::io::RdfFormat;
use oxigraph::model::vocab::rdf;
use oxigraph::model::{GraphNameRef, NamedNode, NamedNodeRef, QuadRef};
use oxigraph::store::Store;
use sparql_endpoint::functions::concat;
use sparql_endpoint::{build_router, AppState, EndpointConfig, ExtensionRegistry};
use std::sync::Arc;
use tower::ServiceExt;

const DATA: &str = r#"
@prefix ex: <http://example.org/> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
ex:alice rdfs:label "Alice" .
ex:bob rdfs:label "Bob" .
"#;

const SELECT_LABELS: &str = "SELECT ?s ?label WHERE { ?s <http://www.w3.org/2000/01/rdf-schema#label> ?label } ORDER BY ?label";
const CONSTRUCT_ALL: &str = "CONSTRUCT { ?s ?p ?o } WHERE { ?s ?p ?o }";
const SD_SERVICE: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/sparql-service-description#Service");


fn router_with(config: EndpointConfig, registry: ExtensionRegistry) -> Router {
    let state = AppState::in_memory(config, registry).unwrap();
    state
        .executor
        .load_reader(RdfFormat::Turtle, DATA.as_bytes())
        .unwrap();
    build_router(Arc::new(state))
}

fn router() -> Router {
    router_with(EndpointConfig::default(), ExtensionRegistry::new())
}

fn get_query(query: &str, accept: &str) -> Request<Body> {
    let params = serde_urlencoded::to_string(&[("query", query)]).unwrap();
    Request::builder()
        .uri(format!("/sparql?{}", params))
        .header(header::ACCEPT, accept)
        .body(Body::empty())
        .unwrap()
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, headers, body)
}

fn content_type(headers: &HeaderMap) -> &str {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_select_json_bindings() {
    let (status, headers, body) = send(router(), get_query(SELECT_LABELS, "application/json")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(content_type(&headers).starts_with("application/json"));

    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["head"]["vars"], serde_json::json!(["s", "label"]));
    let bindings = json["results"]["bindings"].as_array().unwrap();
    assert_eq!(bindings.len(), 2);
    assert_eq!(bindings[0]["label"]["value"], "Alice");
}

#[tokio::test]
async fn test_select_csv_header_names_projected_variables() {
    let (status, headers, body) = send(router(), get_query(SELECT_LABELS, "text/csv")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(content_type(&headers).starts_with("text/csv"));

    let body = String::from_utf8(body).unwrap();
    let header_row = body.lines().next().unwrap();
    assert_eq!(header_row.trim(), "s,label");
    assert_eq!(body.lines().count(), 3);
}

#[tokio::test]
async fn test_select_turtle_is_unprocessable() {
    let (status, _, body) = send(router(), get_query(SELECT_LABELS, "text/turtle")).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], 422);
}

#[tokio::test]
async fn test_select_default_is_sparql_results_xml() {
    let (status, headers, body) = send(router(), get_query(SELECT_LABELS, "*/*")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(content_type(&headers).starts_with("application/sparql-results+xml"));
    assert!(String::from_utf8(body).unwrap().contains("<sparql"));
}

#[tokio::test]
async fn test_ask_json() {
    let (status, _, body) = send(
        router(),
        get_query("ASK { ?s ?p \"Alice\" }", "application/sparql-results+json"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["boolean"], true);
}

#[tokio::test]
async fn test_construct_with_json_and_xml_accept() {
    let (status, headers, body) = send(router(), get_query(CONSTRUCT_ALL, "application/json")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type(&headers).starts_with("text/turtle"));

    let store = Store::new().unwrap();
    store.load_from_reader(RdfFormat::Turtle, body.as_slice()).unwrap();
    assert_eq!(store.len().unwrap(), 2);

    let (status, headers, body) = send(router(), get_query(CONSTRUCT_ALL, "application/xml")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type(&headers).starts_with("application/rdf+xml"));

    let store = Store::new().unwrap();
    store.load_from_reader(RdfFormat::RdfXml, body.as_slice()).unwrap();
    assert_eq!(store.len().unwrap(), 2);
}

#[tokio::test]
async fn test_extension_function_binding() {
    let registry = ExtensionRegistry::new()
        .with_function("https://example.org/fn/concat", concat)
        .unwrap();
    let router = router_with(EndpointConfig::default(), registry);

    let query = r#"PREFIX fn: <https://example.org/fn/>
        SELECT ?x WHERE { BIND(fn:concat("First", "last") AS ?x) }"#;
    let (status, _, body) = send(router, get_query(query, "application/json")).await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["results"]["bindings"][0]["x"]["value"], "Firstlast");
}

#[tokio::test]
async fn test_unregistered_extension_function_is_bad_request() {
    let query = r#"PREFIX fn: <https://example.org/fn/>
        SELECT ?x WHERE { BIND(fn:missing("a") AS ?x) }"#;
    let (status, _, body) = send(router(), get_query(query, "application/json")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json["message"]
        .as_str()
        .unwrap()
        .contains("https://example.org/fn/missing"));
}

#[tokio::test]
async fn test_invalid_query_is_bad_request() {
    let (status, _, _) = send(router(), get_query("not a query", "application/json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_query_and_update_together_is_bad_request() {
    let params = serde_urlencoded::to_string(&[("query", "ASK {}"), ("update", "CLEAR DEFAULT")]).unwrap();
    let request = Request::builder()
        .uri(format!("/sparql?{}", params))
        .body(Body::empty())
        .unwrap();

    let (status, _, _) = send(router(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_post_form_query() {
    let body = serde_urlencoded::to_string(&[("query", SELECT_LABELS)]).unwrap();
    let request = Request::builder()
        .method("POST")
        .uri("/sparql")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::ACCEPT, "application/json")
        .body(Body::from(body))
        .unwrap();

    let (status, _, body) = send(router(), request).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["results"]["bindings"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_post_direct_query_body() {
    let request = Request::builder()
        .method("POST")
        .uri("/sparql")
        .header(header::CONTENT_TYPE, "application/sparql-query")
        .header(header::ACCEPT, "text/tab-separated-values")
        .body(Body::from(SELECT_LABELS))
        .unwrap();

    let (status, headers, body) = send(router(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type(&headers).starts_with("text/tab-separated-values"));
    assert_eq!(String::from_utf8(body).unwrap().lines().next().unwrap().trim(), "?s\t?label");
}

#[tokio::test]
async fn test_service_description_turtle() {
    let config = EndpointConfig {
        public_url: "https://example.org/sparql".to_string(),
        ..Default::default()
    };
    let request = Request::builder()
        .uri("/sparql")
        .header(header::ACCEPT, "text/turtle")
        .body(Body::empty())
        .unwrap();

    let (status, headers, body) = send(router_with(config, ExtensionRegistry::new()), request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type(&headers).starts_with("text/turtle"));

    let store = Store::new().unwrap();
    store.load_from_reader(RdfFormat::Turtle, body.as_slice()).unwrap();
    let service = NamedNode::new("https://example.org/sparql").unwrap();
    assert!(store
        .contains(QuadRef::new(&service, rdf::TYPE, SD_SERVICE, GraphNameRef::DefaultGraph))
        .unwrap());
}

#[tokio::test]
async fn test_service_description_defaults_to_rdf_xml() {
    for accept in ["*/*", "application/json"] {
        let request = Request::builder()
            .uri("/sparql")
            .header(header::ACCEPT, accept)
            .body(Body::empty())
            .unwrap();

        let (status, headers, body) = send(router(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type(&headers).starts_with("application/rdf+xml"));

        let store = Store::new().unwrap();
        store.load_from_reader(RdfFormat::RdfXml, body.as_slice()).unwrap();
        assert!(!store.is_empty().unwrap());
    }
}

#[tokio::test]
async fn test_browser_gets_query_ui() {
    let request = Request::builder()
        .uri("/sparql")
        .header(header::ACCEPT, "text/html,application/xhtml+xml,*/*;q=0.8")
        .body(Body::empty())
        .unwrap();

    let (status, headers, body) = send(router(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type(&headers).starts_with("text/html"));
    assert!(String::from_utf8(body).unwrap().contains("yasgui"));

    // Without the UI browsers get the description
    let config = EndpointConfig {
        query_ui: false,
        ..Default::default()
    };
    let request = Request::builder()
        .uri("/sparql")
        .header(header::ACCEPT, "text/html")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = send(router_with(config, ExtensionRegistry::new()), request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type(&headers).starts_with("application/rdf+xml"));
}

#[tokio::test]
async fn test_root_redirects_to_endpoint() {
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();

    let (status, headers, _) = send(router(), request).await;
    assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(headers.get(header::LOCATION).unwrap(), "/sparql");
}

#[tokio::test]
async fn test_custom_endpoint_path() {
    let config = EndpointConfig {
        path: "/graph/query".to_string(),
        ..Default::default()
    };
    let router = router_with(config, ExtensionRegistry::new());

    let params = serde_urlencoded::to_string(&[("query", "ASK { ?s ?p ?o }")]).unwrap();
    let request = Request::builder()
        .uri(format!("/graph/query?{}", params))
        .header(header::ACCEPT, "application/json")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(router.clone(), request).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(router, get_query("ASK { ?s ?p ?o }", "application/json")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

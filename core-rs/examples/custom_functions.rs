/// Example: Serve a graph with application-defined SPARQL functions
///
/// Registers two extension functions, loads a small graph and serves it on
/// http://localhost:8000/sparql. Try:
///
///   curl -G http://localhost:8000/sparql \
///     -H 'Accept: application/json' \
///     --data-urlencode 'query=PREFIX fn: <https://example.org/fn/>
///       SELECT ?name ?shout WHERE { ?s <http://xmlns.com/foaf/0.1/name> ?name
///       BIND(fn:shout(?name) AS ?shout) }'
///
/// Usage:
///   cargo run --example custom_functions

use oxigraph::io::RdfFormat;
use oxigraph::model::{Literal, Term};
use sparql_endpoint::{
    functions, init_logging, AppState, EndpointConfig, EndpointServer, ExtensionRegistry, QueryExecutor,
    TelemetryConfig,
};
use std::sync::Arc;

const DATA: &str = r#"
@prefix foaf: <http://xmlns.com/foaf/0.1/> .
<http://example.org/alice> foaf:name "Alice" .
<http://example.org/bob> foaf:name "Bob" .
"#;

/// Upper-case a literal
fn shout(args: &[Term]) -> Option<Term> {
    match args {
        [Term::Literal(literal)] => Some(Literal::new_simple_literal(literal.value().to_uppercase()).into()),
        _ => None,
    }
}

/// Length of a literal's lexical form
fn length(args: &[Term]) -> Option<Term> {
    match args {
        [Term::Literal(literal)] => Some(Literal::from(literal.value().chars().count() as i64).into()),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(&TelemetryConfig::default());

    let mut registry = ExtensionRegistry::new();
    functions::register_defaults(&mut registry)?;
    registry.register("https://example.org/fn/shout", shout)?;
    registry.register("https://example.org/fn/length", length)?;

    let executor = QueryExecutor::in_memory(Arc::new(registry))?;
    executor.load_reader(RdfFormat::Turtle, DATA.as_bytes())?;

    let config = EndpointConfig {
        title: "Custom functions demo".to_string(),
        public_url: "http://localhost:8000/sparql".to_string(),
        example_query: "PREFIX fn: <https://example.org/fn/>\nSELECT ?name ?shout ?length WHERE {\n    ?s <http://xmlns.com/foaf/0.1/name> ?name .\n    BIND(fn:shout(?name) AS ?shout)\n    BIND(fn:length(?name) AS ?length)\n}".to_string(),
        ..Default::default()
    }
    .with_env_api_key();

    println!("Serving on http://{}{}", config.listen_addr(), config.path);
    EndpointServer::new(AppState::new(config, executor)?).run().await?;

    Ok(())
}

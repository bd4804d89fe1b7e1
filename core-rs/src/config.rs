/**
 * config.rs
 * Endpoint configuration (YAML format)
 *
 * Format:
 * ```yaml
 * title: My SPARQL endpoint
 * description: Serves the project graph
 * path: /sparql
 * publicUrl: https://example.org/sparql
 * enableUpdate: true
 * apiKey: s3cret
 * queryUi: true
 * exampleQueries:
 *   Count triples:
 *     query: SELECT (COUNT(*) AS ?n) WHERE { ?s ?p ?o }
 * ```
 *
 * Every key is optional. CLI flags and the `SPARQL_ENDPOINT_APIKEY`
 * environment variable override file values.
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::errors::{EndpointError, Result};

/// Environment variable holding the update API key
pub const APIKEY_ENV: &str = "SPARQL_ENDPOINT_APIKEY";

pub const DEFAULT_EXAMPLE_QUERY: &str = r#"PREFIX myfunctions: <https://w3id.org/sparql-functions/>

SELECT ?concat WHERE {
    BIND("First" AS ?first)
    BIND(myfunctions:custom_concat(?first, "last") AS ?concat)
}"#;

/// Named example opened as an extra tab in the query UI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExampleQuery {
    pub query: String,
    /// Endpoint the tab targets; this endpoint when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// Endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EndpointConfig {
    pub title: String,
    pub description: String,
    pub version: String,
    /// Route the endpoint is mounted on
    pub path: String,
    /// Public IRI of the endpoint, used as the service description subject
    pub public_url: String,
    /// Target of the `GET /` redirect; the endpoint itself when unset
    pub docs_url: Option<String>,
    pub enable_update: bool,
    /// Bearer token required for updates (only when updates are enabled)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Serve the HTML query editor to browsers
    pub query_ui: bool,
    pub example_query: String,
    /// Extra query UI tabs, by tab name
    pub example_queries: BTreeMap<String, ExampleQuery>,
    pub favicon: String,
    pub cors_enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            title: "SPARQL endpoint for RDF graphs".to_string(),
            description: "A SPARQL endpoint serving an in-memory RDF graph, extensible with custom functions.".to_string(),
            version: crate::VERSION.to_string(),
            path: "/sparql".to_string(),
            public_url: "https://your-endpoint/sparql".to_string(),
            docs_url: None,
            enable_update: false,
            api_key: None,
            query_ui: true,
            example_query: DEFAULT_EXAMPLE_QUERY.to_string(),
            example_queries: BTreeMap::new(),
            favicon: "https://rdflib.readthedocs.io/en/stable/_static/RDFlib.png".to_string(),
            cors_enabled: true,
            host: "localhost".to_string(),
            port: 8000,
        }
    }
}

/// Update access rules, as consumed by the request normalizer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdatePolicy {
    pub enabled: bool,
    pub api_key: Option<String>,
}

impl UpdatePolicy {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn enabled(api_key: Option<String>) -> Self {
        Self {
            enabled: true,
            api_key,
        }
    }
}

impl EndpointConfig {
    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(EndpointError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(path)?;
        let config: EndpointConfig = serde_yaml::from_str(&content)?;

        config.validate()?;

        Ok(config)
    }

    /// Apply the API key from the environment, if set and non-empty
    pub fn with_env_api_key(mut self) -> Self {
        if let Ok(key) = std::env::var(APIKEY_ENV) {
            if !key.is_empty() {
                self.api_key = Some(key);
            }
        }
        self
    }

    /// Validate configuration at startup
    pub fn validate(&self) -> Result<()> {
        if !self.path.starts_with('/') {
            return Err(EndpointError::Config(format!(
                "path must start with '/', got '{}'",
                self.path
            )));
        }

        if oxigraph::model::NamedNode::new(self.public_url.as_str()).is_err() {
            return Err(EndpointError::Config(format!(
                "publicUrl is not a valid IRI: '{}'",
                self.public_url
            )));
        }

        if matches!(self.api_key.as_deref(), Some("")) {
            return Err(EndpointError::Config("apiKey must not be empty".to_string()));
        }

        Ok(())
    }

    pub fn update_policy(&self) -> UpdatePolicy {
        UpdatePolicy {
            enabled: self.enable_update,
            api_key: self.api_key.clone(),
        }
    }

    /// Where `GET /` redirects to
    pub fn docs_target(&self) -> &str {
        self.docs_url.as_deref().unwrap_or(&self.path)
    }

    /// `host:port` listen address
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/**
 * executor.rs
 * Query execution against the graph store
 *
 * Wraps an oxigraph `Store` and the shared extension registry. Every query
 * and update is evaluated with the registry's handlers wired in as custom
 * functions; updates are forwarded as one atomic call.
 *
 * All calls here block. HTTP handlers run them on the blocking pool.
 */

use oxigraph::io::{RdfFormat, RdfSerializer};
use oxigraph::model::{Graph, TripleRef};
use oxigraph::sparql::{EvaluationError, QueryResults};
use oxigraph::store::Store;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::classify::ParsedOperation;
use crate::errors::{EndpointError, Result};
use crate::negotiate::NegotiatedFormat;
use crate::registry::ExtensionRegistry;

/// Result of executing an operation
pub enum Outcome {
    /// SELECT / ASK / CONSTRUCT / DESCRIBE results
    Results(QueryResults),
    /// Update applied, nothing to return
    Updated,
}

/// Executes parsed operations against one store
#[derive(Clone)]
pub struct QueryExecutor {
    store: Store,
    registry: Arc<ExtensionRegistry>,
}

impl QueryExecutor {
    pub fn new(store: Store, registry: Arc<ExtensionRegistry>) -> Self {
        Self { store, registry }
    }

    /// Executor over a fresh in-memory store
    pub fn in_memory(registry: Arc<ExtensionRegistry>) -> Result<Self> {
        let store = Store::new().map_err(|e| EndpointError::internal(format!("Failed to create store: {}", e)))?;
        Ok(Self::new(store, registry))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn registry(&self) -> &Arc<ExtensionRegistry> {
        &self.registry
    }

    /// Execute a parsed operation.
    ///
    /// Fails with `UnboundFunction` before touching the store when the
    /// operation calls an extension function that has no handler.
    pub fn execute(&self, parsed: &ParsedOperation) -> Result<Outcome> {
        let calls = parsed.function_calls();
        self.registry.ensure_registered(&calls)?;

        match parsed {
            ParsedOperation::Query { text, .. } => {
                debug!(tag = parsed.tag().name(), "evaluating query");
                self.store
                    .query_opt(text.as_str(), self.registry.query_options())
                    .map(Outcome::Results)
                    .map_err(|e| EndpointError::execution(e.to_string()))
            }
            ParsedOperation::Update { text, .. } => {
                debug!(tag = parsed.tag().name(), "applying update");
                self.store
                    .update_opt(text.as_str(), self.registry.query_options())
                    .map(|()| Outcome::Updated)
                    .map_err(|e| EndpointError::execution(e.to_string()))
            }
        }
    }

    /// Serialize query results in the negotiated format.
    ///
    /// Solutions are evaluated lazily while being written, so backend
    /// failures surface here and are reported as execution errors.
    pub fn serialize(results: QueryResults, format: &NegotiatedFormat) -> Result<Vec<u8>> {
        let written = if matches!(results, QueryResults::Graph(_)) {
            let rdf_format = format.serializer.rdf_format().ok_or_else(|| {
                EndpointError::unprocessable(format!("Cannot serialize graph results as {}", format.mime_type))
            })?;
            results.write_graph(Vec::new(), rdf_format)
        } else {
            let results_format = format.serializer.results_format().ok_or_else(|| {
                EndpointError::unprocessable(format!("Cannot serialize query results as {}", format.mime_type))
            })?;
            results.write(Vec::new(), results_format)
        };

        written.map_err(|e| match e {
            EvaluationError::ResultsSerialization(e) => {
                EndpointError::unprocessable(format!("Error serializing the SPARQL results: {}", e))
            }
            other => EndpointError::execution(other.to_string()),
        })
    }

    /// Load an RDF file into the store, format chosen from its extension
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let format = rdf_format_for_path(path)?;
        let file = File::open(path)?;

        self.load_reader(format, BufReader::new(file))
            .map_err(|e| EndpointError::Load(format!("{}: {}", path.display(), e)))?;

        info!(path = %path.display(), format = format.name(), "loaded RDF file");
        Ok(())
    }

    pub fn load_reader<R: Read>(&self, format: RdfFormat, reader: R) -> Result<()> {
        self.store
            .load_from_reader(format, reader)
            .map_err(|e| EndpointError::Load(e.to_string()))
    }

    /// Number of quads in the store
    pub fn len(&self) -> Result<usize> {
        self.store
            .len()
            .map_err(|e| EndpointError::internal(e.to_string()))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Serialize the whole store.
    ///
    /// Dataset formats (TriG, N-Quads) keep named graphs; triple formats get
    /// the union of every graph.
    pub fn dump(&self, format: RdfFormat) -> Result<Vec<u8>> {
        if format.supports_datasets() {
            return self
                .store
                .dump_to_writer(format, Vec::new())
                .map_err(|e| EndpointError::internal(format!("Failed to serialize dataset: {}", e)));
        }

        let mut graph = Graph::new();
        for quad in self.store.iter() {
            let quad = quad.map_err(|e| EndpointError::internal(e.to_string()))?;
            graph.insert(TripleRef::new(&quad.subject, &quad.predicate, &quad.object));
        }

        let mut writer = RdfSerializer::from_format(format).for_writer(Vec::new());
        for triple in graph.iter() {
            writer.serialize_triple(triple)?;
        }
        Ok(writer.finish()?)
    }
}

/// RDF format for a file path, from its extension
pub fn rdf_format_for_path(path: &Path) -> Result<RdfFormat> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| match ext.to_ascii_lowercase().as_str() {
            "xml" => Some(RdfFormat::RdfXml),
            other => RdfFormat::from_extension(other),
        })
        .ok_or_else(|| EndpointError::Config(format!("Unsupported RDF file extension: {}", path.display())))
}

/**
 * registry.rs
 * Extension function registry
 *
 * Maps an extension function IRI to the handler invoked when a SPARQL
 * expression calls that IRI:
 *
 * ```sparql
 * PREFIX fn: <https://example.org/fn/>
 * SELECT ?x WHERE { BIND(fn:concat("First", "last") AS ?x) }
 * ```
 *
 * Lifecycle:
 * - Startup: the embedding application registers handlers through `&mut` access
 * - Serving: the registry is frozen behind an `Arc` shared by the executor and
 *   the service description; nothing can mutate it any more
 */

use oxigraph::model::{NamedNode, Term};
use oxigraph::sparql::QueryOptions;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::{EndpointError, Result};

/// Callable implementing an extension function.
///
/// Receives the evaluated argument terms of the current solution. Returning
/// `None` leaves the target variable unbound.
pub type FunctionHandler = Arc<dyn Fn(&[Term]) -> Option<Term> + Send + Sync>;

/// A registered extension function
#[derive(Clone)]
pub struct ExtensionFunction {
    iri: NamedNode,
    handler: FunctionHandler,
}

impl ExtensionFunction {
    pub fn iri(&self) -> &NamedNode {
        &self.iri
    }

    /// Invoke the handler directly (outside of query evaluation)
    pub fn call(&self, args: &[Term]) -> Option<Term> {
        (self.handler)(args)
    }
}

impl fmt::Debug for ExtensionFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionFunction")
            .field("iri", &self.iri.as_str())
            .finish_non_exhaustive()
    }
}

/// Extension function registry, keyed by IRI
#[derive(Clone, Default, Debug)]
pub struct ExtensionRegistry {
    functions: BTreeMap<String, ExtensionFunction>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `iri`.
    ///
    /// Rejects IRIs that do not parse and IRIs that already have a handler.
    pub fn register<F>(&mut self, iri: &str, handler: F) -> Result<()>
    where
        F: Fn(&[Term]) -> Option<Term> + Send + Sync + 'static,
    {
        let iri = NamedNode::new(iri).map_err(|e| EndpointError::InvalidIri(format!("{}: {}", iri, e)))?;

        if self.functions.contains_key(iri.as_str()) {
            tracing::warn!(iri = iri.as_str(), "duplicate extension function registration rejected");
            return Err(EndpointError::DuplicateFunction(iri.into_string()));
        }

        tracing::debug!(iri = iri.as_str(), "registered extension function");
        self.functions.insert(
            iri.as_str().to_string(),
            ExtensionFunction {
                iri,
                handler: Arc::new(handler),
            },
        );
        Ok(())
    }

    /// Builder form of [`register`](Self::register)
    pub fn with_function<F>(mut self, iri: &str, handler: F) -> Result<Self>
    where
        F: Fn(&[Term]) -> Option<Term> + Send + Sync + 'static,
    {
        self.register(iri, handler)?;
        Ok(self)
    }

    pub fn lookup(&self, iri: &str) -> Option<&ExtensionFunction> {
        self.functions.get(iri)
    }

    pub fn contains(&self, iri: &str) -> bool {
        self.functions.contains_key(iri)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Registered IRIs in lexical order
    pub fn iris(&self) -> impl Iterator<Item = &NamedNode> {
        self.functions.values().map(|f| &f.iri)
    }

    /// Fail with `UnboundFunction` on the first IRI that has no handler
    pub fn ensure_registered<'a>(&self, iris: impl IntoIterator<Item = &'a NamedNode>) -> Result<()> {
        for iri in iris {
            if !self.contains(iri.as_str()) {
                return Err(EndpointError::UnboundFunction(iri.as_str().to_string()));
            }
        }
        Ok(())
    }

    /// Query options with every handler wired in as a custom function
    pub fn query_options(&self) -> QueryOptions {
        self.functions
            .values()
            .fold(QueryOptions::default(), |options, function| {
                let handler = Arc::clone(&function.handler);
                options.with_custom_function(function.iri.clone(), move |args| handler(args))
            })
    }
}

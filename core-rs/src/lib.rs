//! # SPARQL endpoint
//!
//! Serves an RDF graph over the SPARQL 1.1 Protocol, with application-defined
//! extension functions callable from queries.
//!
//! ## Request pipeline
//!
//! ```text
//! HTTP request
//!     │
//!     ▼
//! protocol::normalize ──(no operation)──► service description / query UI
//!     │
//!     ▼
//! protocol::authorize ─► classify::parse ─► classify::ensure_supported
//!     │
//!     ▼
//! negotiate::negotiate_results ─► executor::execute (+ ExtensionRegistry)
//!     │
//!     ▼
//! serialized response (200) / 204 for updates
//! ```
//!
//! ## Embedding
//!
//! ```no_run
//! use sparql_endpoint::{AppState, EndpointConfig, EndpointServer, ExtensionRegistry};
//!
//! # async fn run() -> sparql_endpoint::Result<()> {
//! let mut registry = ExtensionRegistry::new();
//! registry.register("https://example.org/fn/answer", |_| {
//!     Some(oxigraph::model::Literal::from(42).into())
//! })?;
//!
//! let state = AppState::in_memory(EndpointConfig::default(), registry)?;
//! EndpointServer::new(state).run().await?;
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod config;
pub mod errors;
pub mod executor;
pub mod functions;
pub mod negotiate;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod service_description;
pub mod telemetry;

pub use classify::{OperationTag, ParsedOperation};
pub use config::{EndpointConfig, ExampleQuery, UpdatePolicy};
pub use errors::{EndpointError, Result};
pub use executor::{Outcome, QueryExecutor};
pub use negotiate::{DescriptionFormat, NegotiatedFormat, ResultShape, Serializer};
pub use protocol::{Operation, OperationKind, OperationSource};
pub use registry::{ExtensionFunction, ExtensionRegistry, FunctionHandler};
pub use server::{build_router, AppState, EndpointServer};
pub use service_description::{DescriptionInfo, ServiceDescription};
pub use telemetry::{init_logging, TelemetryConfig};

/// Crate version, reported in the default configuration
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

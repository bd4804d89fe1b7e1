//! HTTP server
//!
//! ```text
//! GET  /            -> 307 to docs URL
//! GET  <path>       -> ?query= / ?update= / service description / query UI
//! POST <path>       -> form body or application/sparql-{query,update} body
//! ```

mod routes;
mod state;
mod ui;

pub use routes::build_router;
pub use state::{AppState, DescriptionDocuments};

use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// SPARQL endpoint HTTP server
pub struct EndpointServer {
    state: Arc<AppState>,
    router: Router,
}

impl EndpointServer {
    pub fn new(state: AppState) -> Self {
        let state = Arc::new(state);
        let router = build_router(Arc::clone(&state));
        Self { state, router }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Get the router for testing
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until Ctrl-C
    pub async fn run(self) -> std::io::Result<()> {
        let addr = self.state.config.listen_addr();
        let listener = TcpListener::bind(addr.as_str()).await?;

        info!(
            addr = %addr,
            path = %self.state.config.path,
            update_enabled = self.state.update_policy.enabled,
            api_key = self.state.update_policy.api_key.is_some(),
            extension_functions = self.state.description.extension_functions().len(),
            "SPARQL endpoint starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received, stopping server");
}

//! Shared application state
//!
//! Built once before the router exists and shared through `Arc`. Nothing in
//! it is mutated while serving; the store synchronizes its own writes.

use std::sync::Arc;

use crate::config::{EndpointConfig, UpdatePolicy};
use crate::errors::Result;
use crate::executor::QueryExecutor;
use crate::registry::ExtensionRegistry;
use crate::service_description::{DescriptionInfo, ServiceDescription};

/// Service description rendered in every format it is served in
#[derive(Debug, Clone)]
pub struct DescriptionDocuments {
    pub turtle: Vec<u8>,
    pub rdf_xml: Vec<u8>,
}

pub struct AppState {
    pub config: EndpointConfig,
    pub update_policy: UpdatePolicy,
    pub executor: QueryExecutor,
    pub description: ServiceDescription,
    pub documents: DescriptionDocuments,
    /// Rendered query editor page, when enabled
    pub ui_page: Option<String>,
}

impl AppState {
    /// Build the state over an existing executor.
    ///
    /// The service description is generated here from the executor's
    /// registry, which is frozen from this point on.
    pub fn new(config: EndpointConfig, executor: QueryExecutor) -> Result<Self> {
        config.validate()?;

        let description = ServiceDescription::generate(&DescriptionInfo::from(&config), executor.registry())?;
        let documents = DescriptionDocuments {
            turtle: description.to_turtle()?,
            rdf_xml: description.to_rdf_xml()?,
        };
        let ui_page = config.query_ui.then(|| super::ui::render(&config));

        Ok(Self {
            update_policy: config.update_policy(),
            config,
            executor,
            description,
            documents,
            ui_page,
        })
    }

    /// State over a fresh in-memory store
    pub fn in_memory(config: EndpointConfig, registry: ExtensionRegistry) -> Result<Self> {
        let executor = QueryExecutor::in_memory(Arc::new(registry))?;
        Self::new(config, executor)
    }
}

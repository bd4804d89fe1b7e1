//! sparql-endpoint - serve RDF files over the SPARQL 1.1 Protocol
//!
//! ```text
//! sparql-endpoint serve data.ttl more.nt --enable-update
//! sparql-endpoint convert data.ttl more.nt --output merged.nt
//! ```

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use sparql_endpoint::config::APIKEY_ENV;
use sparql_endpoint::executor::rdf_format_for_path;
use sparql_endpoint::{
    functions, init_logging, AppState, EndpointConfig, EndpointServer, ExtensionRegistry, QueryExecutor,
    TelemetryConfig,
};

#[derive(Parser)]
#[command(name = "sparql-endpoint")]
#[command(version)]
#[command(about = "SPARQL endpoint for RDF files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load RDF files into memory and serve them
    Serve {
        /// RDF files to load (format from extension)
        files: Vec<PathBuf>,
        /// YAML configuration file
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        /// Accept SPARQL updates
        #[arg(long)]
        enable_update: bool,
        /// Route the endpoint is mounted on
        #[arg(long)]
        path: Option<String>,
        /// Public IRI advertised in the service description
        #[arg(long)]
        public_url: Option<String>,
        #[arg(long)]
        title: Option<String>,
        /// Bearer token required for updates
        #[arg(long, env = APIKEY_ENV, hide_env_values = true)]
        api_key: Option<String>,
        /// Do not serve the HTML query editor
        #[arg(long)]
        no_ui: bool,
        /// Enable verbose logging
        #[arg(long, short = 'v')]
        verbose: bool,
    },
    /// Merge RDF files into one output file
    Convert {
        /// RDF files to merge
        files: Vec<PathBuf>,
        /// Output file; format from extension (Turtle when unknown)
        #[arg(long, short = 'o')]
        output: PathBuf,
        #[arg(long, short = 'v')]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            files,
            config,
            host,
            port,
            enable_update,
            path,
            public_url,
            title,
            api_key,
            no_ui,
            verbose,
        } => {
            init_logging(&TelemetryConfig::verbose(verbose));

            let mut config = match config {
                Some(path) => EndpointConfig::load(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => EndpointConfig::default(),
            };

            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(path) = path {
                config.path = path;
            }
            if let Some(public_url) = public_url {
                config.public_url = public_url;
            }
            if let Some(title) = title {
                config.title = title;
            }
            if enable_update {
                config.enable_update = true;
            }
            if no_ui {
                config.query_ui = false;
            }
            if let Some(api_key) = api_key.filter(|key| !key.is_empty()) {
                config.api_key = Some(api_key);
            }

            let mut registry = ExtensionRegistry::new();
            functions::register_defaults(&mut registry)?;

            let executor = QueryExecutor::in_memory(Arc::new(registry))?;
            for file in &files {
                executor
                    .load_file(file)
                    .with_context(|| format!("Failed to load {}", file.display()))?;
            }
            tracing::info!(files = files.len(), triples = executor.len()?, "graph loaded");

            let state = AppState::new(config, executor)?;
            EndpointServer::new(state).run().await?;
        }

        Commands::Convert { files, output, verbose } => {
            init_logging(&TelemetryConfig::verbose(verbose));

            if files.is_empty() {
                bail!("No input files given");
            }

            let executor = QueryExecutor::in_memory(Arc::new(ExtensionRegistry::new()))?;
            for file in &files {
                executor
                    .load_file(file)
                    .with_context(|| format!("Failed to load {}", file.display()))?;
            }

            let format = rdf_format_for_path(&output).unwrap_or(oxigraph::io::RdfFormat::Turtle);
            let bytes = executor.dump(format)?;
            std::fs::write(&output, bytes)
                .with_context(|| format!("Failed to write {}", output.display()))?;

            println!(
                "✓ Converted {} file(s) into {} ({})",
                files.len(),
                output.display(),
                format.name()
            );
        }
    }

    Ok(())
}

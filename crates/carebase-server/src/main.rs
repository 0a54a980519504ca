use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use carebase_core::CareCore;
use carebase_llm::{CareAssistant, DisabledAssistant, HttpAssistant, HttpConfig};
use carebase_server::config::{Overrides, Settings};
use carebase_server::{serve, AppState};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "carebase-server", version, about = "Care management backend for home-nursing services")]
struct Cli {
    /// Configuration file (default: ./carebase.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    /// SQLite database path, or `:memory:`
    #[arg(long)]
    database: Option<String>,
}

fn build_assistant(settings: &Settings) -> Result<Arc<dyn CareAssistant>> {
    match settings.ai_key() {
        Some(key) => {
            let assistant = HttpAssistant::from_config(HttpConfig {
                endpoint: settings.ai.endpoint.clone(),
                api_key: key.to_string(),
                model: settings.ai.model.clone(),
                timeout_secs: settings.ai.timeout_secs,
            })
            .context("Failed to set up the AI provider")?;
            info!(model = %settings.ai.model, "AI assistant enabled");
            Ok(Arc::new(assistant))
        }
        None => {
            warn!("no ai.api_key configured; AI features are disabled");
            Ok(Arc::new(DisabledAssistant))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let settings = Settings::load(
        cli.config.as_deref(),
        Overrides {
            host: cli.host,
            port: cli.port,
            database: cli.database,
        },
    )?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log.filter))
        .context("Invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let core = CareCore::open(&settings.database.path, settings.core_settings()?)
        .with_context(|| format!("Failed to open database at {}", settings.database.path))?;
    info!(database = %settings.database.path, "database ready");

    let state = AppState::new(core, build_assistant(&settings)?);

    let address = settings.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    serve(listener, state, shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}

//! Drafter UI server - HTTP API for constraint-checked clause drafting.

mod routes;
mod sse;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{info, warn};

use drafter::agent::AgentConfig;
use drafter::io::document_store::DocumentStore;
use drafter::io::gateway::CommandGateway;
use drafter::io::settings::{DEFAULT_SETTINGS_PATH, load_settings};

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "drafter-ui")]
#[command(about = "HTTP API for constraint-checked contract clause drafting")]
struct Args {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value = "3001")]
    port: u16,

    /// Settings file (TOML). A missing file means defaults.
    #[arg(long, default_value = DEFAULT_SETTINGS_PATH)]
    settings: PathBuf,

    /// Directory containing UI static files (served as fallback when present)
    #[arg(long)]
    ui_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("drafter_ui=info".parse()?)
                .add_directive("drafter=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let settings = load_settings(&args.settings)?;

    let store = Arc::new(DocumentStore::from_settings(&settings));
    store
        .load()
        .with_context(|| format!("load source documents from {}", store.dir().display()))?;
    let corpus = store.corpus()?;
    info!(
        documents = corpus.documents().len(),
        citations = corpus.citation_index().len(),
        "source corpus loaded"
    );
    if settings.server.api_key().is_none() {
        warn!("no API key configured, endpoints are unauthenticated");
    }

    let gateway = CommandGateway::new(settings.gateway.clone())?;
    let state = AppState::new(
        store,
        Box::new(gateway),
        AgentConfig::from_settings(&settings),
        settings.server.api_key(),
    )?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = routes::app(state).layer(cors);

    if let Some(ui_dir) = args.ui_dir {
        if ui_dir.exists() {
            info!(ui_dir = %ui_dir.display(), "serving static UI files");
            app = app
                .fallback_service(ServeDir::new(ui_dir).append_index_html_on_directories(true));
        } else {
            info!(ui_dir = %ui_dir.display(), "UI directory not found, API-only mode");
        }
    }

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

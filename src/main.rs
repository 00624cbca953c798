use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;

use kopakopi::{
    agents::IngestionAgent,
    config::Config,
    embeddings::{OpenAIEmbedder, SourceKind},
    llm::OpenAIChat,
    routes::create_router,
    storage::PineconeStore,
    utils::init_logger,
    AppState,
};

#[derive(Parser)]
#[command(name = "kopakopi", version, about = "Coffee-shop menu assistant")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Replace the index contents with a menu file
    Ingest {
        /// CSV or PDF menu
        path: PathBuf,
        /// File format; inferred from the extension when omitted
        #[arg(long)]
        format: Option<SourceKind>,
    },
}

/// Build the process-wide clients once; every handler gets them through `AppState`.
fn build_state(config: Config) -> AppState {
    let http = reqwest::Client::new();
    let embedder = Arc::new(OpenAIEmbedder::with_client(http.clone(), &config.openai));
    let store = Arc::new(PineconeStore::with_client(http.clone(), &config.pinecone));
    let completer = Arc::new(OpenAIChat::with_client(http, &config.openai));
    AppState::new(config, embedder, store, completer)
}

async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", state.config.server.host, state.config.server.port)
        .parse()
        .context("HOST/PORT do not form a valid socket address")?;

    let app = create_router(state);

    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}

async fn ingest(state: AppState, path: PathBuf, format: Option<SourceKind>) -> anyhow::Result<()> {
    let kind = format
        .or_else(|| SourceKind::from_path(&path))
        .with_context(|| format!("Cannot tell the format of {}; pass --format csv|pdf", path.display()))?;

    let agent = IngestionAgent::new(state.embedder.as_ref(), state.store.as_ref());
    let report = agent.ingest_file(&path, kind).await?;
    info!(count = report.count(), "{}", report.message());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let cli = Cli::parse();

    let config = Config::from_env()?;
    info!("Configuration loaded: {:?}", config.server);

    let state = build_state(config);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(state).await,
        Command::Ingest { path, format } => ingest(state, path, format).await,
    }
}

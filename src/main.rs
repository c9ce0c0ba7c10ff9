use std::path::PathBuf;
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use anyhow::{Result, anyhow};
use workflow_history_mcp::config::{config_path, try_load_config, ServerConfig};
use workflow_history_mcp::history::HistoryStore;
use workflow_history_mcp::logging::init_logging;
use workflow_history_mcp::server;
use workflow_history_mcp::session::workflow_home;

/// MCP server exposing chat session logs from ~/.workflow.
#[derive(Debug, Parser)]
#[command(name = "workflow-history-mcp", version)]
struct Args {
    /// Path to config.json (defaults to the one next to the executable)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load config, falling back to defaults on any problem
    let path = match args.config {
        Some(path) => path,
        None => config_path()?,
    };
    let (raw, load_error) = match try_load_config(&path) {
        Ok(raw) => (raw, None),
        Err(e) => (Default::default(), Some(e)),
    };
    let config = ServerConfig::from_map(&raw);

    // 2. Init logging
    let _guard = init_logging(&config.log_level)?;
    tracing::info!("Workflow history MCP starting up...");
    if let Some(e) = load_error {
        tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable config, using defaults");
    }

    // 3. Locate session logs
    let base_dir = workflow_home().ok_or_else(|| anyhow!("Could not find home directory"))?;
    let store = HistoryStore::new(base_dir);
    if !store.base_dir().is_dir() {
        tracing::warn!(dir = %store.base_dir().display(), "Workflow directory does not exist yet");
    }

    // 4. Start server
    let shutdown = CancellationToken::new();
    let server_shutdown = shutdown.clone();
    let mut server_handle = tokio::spawn(async move {
        server::start_server(&config, store, server_shutdown).await
    });

    // 5. Wait for signals
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = signal::ctrl_c() => {
            tracing::info!("Received SIGINT, shutting down...");
        }
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
        res = &mut server_handle => {
            return res?;
        }
    }

    shutdown.cancel();
    server_handle.await??;
    tracing::info!("Shutdown complete.");

    Ok(())
}

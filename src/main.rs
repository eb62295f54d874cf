//! `reflowd` — the Reflow backend server binary.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use reflow::server::{start_server, AppState};
use reflow::session::SessionStore;
use reflow::settings;
use reflow::tasks::TaskManager;

#[derive(Parser, Debug)]
#[command(name = "reflowd", about = "Reflow scanned-document backend", version)]
struct Args {
    /// Path to the configuration file
    #[arg(long, default_value = "reflow.toml")]
    config: PathBuf,

    /// Listen port (overrides configuration)
    #[arg(long, env = "REFLOW_PORT")]
    port: Option<u16>,

    /// Data directory (overrides configuration)
    #[arg(long, env = "REFLOW_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = settings::load(&args.config)?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.clone())),
        )
        .init();

    let store = SessionStore::new(&config)?;
    let tasks = TaskManager::new(config.heartbeat());
    let state = AppState::new(store.clone(), tasks);

    let (addr, shutdown) = start_server(config.port, state).await?;
    tracing::info!("reflowd ready on http://{}", addr);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    shutdown.cancel();

    // Stop the autosave loop and flush anything still dirty before exiting.
    store.shutdown().await;

    // Give in-flight responses a moment to drain.
    tokio::time::sleep(Duration::from_millis(100)).await;
    Ok(())
}

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use coinrate::config::{default_config_path, ResolvedConfig};
use coinrate::scheduler::RefreshScheduler;
use coinrate_server::{create_router, AppState};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "coinrate-server")]
#[command(about = "Serve stored crypto prices over HTTP and keep them fresh")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Override `server.bind`
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Disable the background refresh loop
    #[arg(long)]
    no_refresh: bool,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = ResolvedConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load config: {}", cli.config.display()))?;
    let bind = cli.bind.unwrap_or(config.server.bind);

    let service = Arc::new(config.build_service()?);
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let scheduler = if cli.no_refresh {
        None
    } else {
        let scheduler = RefreshScheduler::from_config(service.clone(), &config.refresh);
        let mut rx = shutdown_tx.subscribe();
        Some(tokio::spawn(async move {
            scheduler
                .run(async move {
                    let _ = rx.wait_for(|stop| *stop).await;
                })
                .await;
        }))
    };

    let state = AppState::new(service, config.display.clone());
    let app = create_router(state, config.server.request_timeout);

    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    tracing::info!(
        addr = %bind,
        data_dir = %config.data_dir.display(),
        "coinrate-server listening"
    );

    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown requested");
        let _ = shutdown_tx.send(true);
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.wait_for(|stop| *stop).await;
        })
        .await?;

    if let Some(handle) = scheduler {
        let _ = handle.await;
    }
    Ok(())
}

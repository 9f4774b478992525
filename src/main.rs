use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coinrate::config::{default_config_path, ResolvedConfig};
use coinrate::format::{format_observed_at, round_price};
use coinrate::market_data::{Aggregation, Observation};
use coinrate::scheduler::RefreshScheduler;
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "coinrate")]
#[command(about = "Track crypto prices and query their history")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the resolved configuration
    Config,
    /// Fetch and store current prices (all known symbols if none given)
    Refresh {
        symbols: Vec<String>,
    },
    /// Query stored prices, fetching live ones on a miss
    Price {
        /// latest, min, max or avg
        #[arg(long, default_value = "latest")]
        agg: Aggregation,

        #[arg(required = true)]
        symbols: Vec<String>,
    },
    /// Run the periodic refresh in the foreground until Ctrl-C
    Watch,
}

fn render(observations: &[Observation], config: &ResolvedConfig) -> serde_json::Value {
    let rows: Vec<_> = observations
        .iter()
        .map(|obs| {
            json!({
                "symbol": obs.symbol(),
                "price": round_price(obs.price(), config.display.price_decimals),
                "observed_at": format_observed_at(&obs.observed_at(), &config.display.date_format),
            })
        })
        .collect();
    serde_json::Value::Array(rows)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ResolvedConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load config: {}", cli.config.display()))?;

    match cli.command {
        Command::Config => {
            println!("Config file: {}", cli.config.display());
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Command::Refresh { symbols } => {
            let service = config.build_service()?;
            let observations = service.refresh(&symbols).await?;
            println!("{}", serde_json::to_string_pretty(&render(&observations, &config))?);
        }
        Command::Price { agg, symbols } => {
            let service = config.build_service()?;
            let observations = service.get_or_refresh(&symbols, agg).await?;
            println!("{}", serde_json::to_string_pretty(&render(&observations, &config))?);
        }
        Command::Watch => {
            let service = Arc::new(config.build_service()?);
            let scheduler = RefreshScheduler::from_config(service, &config.refresh);
            scheduler
                .run(async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await;
        }
    }

    Ok(())
}

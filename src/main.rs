use anyhow::Result;
use clap::{Parser, Subcommand};
use home_inventory::cli;
use home_inventory::config::Config;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// home-inventory - household pantry and shopping orchestration engine
#[derive(Parser)]
#[command(name = "home-inventory")]
#[command(about = "Job queue, ledger, planner, and shopping draft engine for a home inventory system", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the JSON API and its in-process worker pool
    Serve {
        /// Overrides HOME_INVENTORY_API_PORT
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run a standalone worker pool against a fresh in-memory core
    Worker,
    /// Seed a demo household with a small starting inventory
    SeedDemo,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    let log_json = std::env::var("HOME_INVENTORY_LOG_JSON")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if log_json {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().json().with_filter(env_filter))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
            .try_init()?;
    }

    match cli.command {
        Commands::Serve { port } => cli::serve(config, port).await,
        Commands::Worker => cli::worker(config).await,
        Commands::SeedDemo => cli::seed_demo(config).await,
    }
}

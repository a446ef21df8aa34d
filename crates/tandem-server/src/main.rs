//! # Tandem Server
//!
//! Anonymous one-to-one matchmaking and WebRTC signaling relay.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default settings
//! tandem
//!
//! # Run with custom config
//! tandem --config /path/to/tandem.toml
//!
//! # Run with environment variables
//! TANDEM_PORT=8080 TANDEM_HOST=0.0.0.0 tandem
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tandem_server::{config::Config, handlers, metrics};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "tandem", version, about = "Matchmaking and WebRTC signaling relay")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "TANDEM_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "tandem=debug,tandem_server=debug,tandem_core=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load(args.config.as_deref())?;

    tracing::info!("Starting tandem server on {}:{}", config.host, config.port);

    // Initialize metrics
    metrics::init_metrics();

    // Start the server
    handlers::run_server(config).await?;

    Ok(())
}

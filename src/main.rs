//! Service entry point.
//!
//! ```bash
//! url-shortener-pipeline serve     # HTTP API (+ analytics consumers by default)
//! url-shortener-pipeline consume   # analytics consumers only
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use url_shortener_pipeline::config::{self, Config};
use url_shortener_pipeline::server;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Default)]
enum Command {
    /// Run the HTTP API
    #[default]
    Serve,

    /// Run the analytics consumers without the HTTP API
    Consume,
}

fn init_tracing(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_new(&config.log_level)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if config.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = config::load_from_env()?;

    init_tracing(&config)?;
    config.print_summary();

    match cli.command.unwrap_or_default() {
        Command::Serve => server::run(config).await,
        Command::Consume => server::run_consumers(config).await,
    }
}

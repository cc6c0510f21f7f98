use anyhow::{Context, Result};
use clap::Parser;
use jobscout::cli::{handle_command, Cli};
use std::fs::OpenOptions;
use std::path::Path;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // a missing .env is fine
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.log_json, cli.log_file.as_deref())?;

    handle_command(cli).await
}

fn init_logging(json: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true) // Clear file on startup
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;

            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(file)
                        .with_current_span(true)
                        .with_span_list(false),
                )
                .init();
        }
        None if json => registry.with(fmt::layer().json()).init(),
        None => registry.with(fmt::layer().with_target(false)).init(),
    }

    Ok(())
}

//! pricing: one-shot rate lookup.
//!
//! Runs a single `fetch_rate` through the full cache and breaker stack and
//! prints the rate, or the caller-facing failure message.

use std::process::ExitCode;

use clap::Parser;
use tracing::debug;

use pricing_shield::RateQuery;
use pricing_shield::config::Config;

/// Fetch a rate from the pricing provider.
#[derive(Parser)]
#[command(name = "pricing")]
#[command(version = pricing_shield::PKG_VERSION)]
#[command(about = "Resilient rate lookup against the pricing provider")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Pricing period (e.g. "Summer").
    #[arg(long)]
    period: String,

    /// Hotel identifier.
    #[arg(long)]
    hotel: String,

    /// Room identifier.
    #[arg(long)]
    room: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    debug!(version = pricing_shield::version_string(), "pricing starting");

    let service = match Config::load(args.config.as_deref()).and_then(|c| c.build_service()) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let query = RateQuery::new(args.period, args.hotel, args.room);
    match service.fetch_rate(&query).await {
        Ok(rate) => {
            println!("{rate}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

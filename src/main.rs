//! Cashtally - daily cash-sales notifier
//!
//! Queries a Notion database for today's records tagged with a payment
//! method, sums an amount property across every result page, and pushes
//! the total to Pushover. Runs once and exits.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Missing or invalid configuration
//!   2 - Notion query failed
//!   3 - Pushover delivery failed

mod cli;
mod config;
mod error;
mod job;
mod mask;
mod models;
mod notify;
mod query;
mod report;
mod retry;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use cli::Args;
use config::Config;
use error::{FetchError, NotifyError, EXIT_CONFIG};
use notify::PushoverClient;
use query::NotionClient;
use retry::TokioSleeper;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Handle --init-config early (no logging needed)
    if args.init_config {
        if let Err(e) = handle_init_config() {
            eprintln!("Error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
        return;
    }

    // Initialize logging
    init_logging(&args);

    info!("Cashtally v{}", env!("CARGO_PKG_VERSION"));

    let code = job::execute(
        &args,
        |config| {
            let source = NotionClient::new(&config.query).map_err(FetchError::Client)?;
            let gateway = PushoverClient::new(&config.notify).map_err(NotifyError::Client)?;
            Ok((source, gateway))
        },
        &TokioSleeper,
        &mut std::io::stdout(),
    )
    .await;
    std::process::exit(code);
}

/// Handle --init-config: generate a default .cashtally.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(config::CONFIG_FILE);

    if path.exists() {
        anyhow::bail!(
            "{} already exists. Remove it first or edit it manually.",
            config::CONFIG_FILE
        );
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::CONFIG_FILE))?;

    println!("Created {} with default settings.", config::CONFIG_FILE);
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr; stdout carries only mask directives, the optional
/// total line and the final "Done".
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

//! Command-line interface argument parsing.
//!
//! Every secret can come from the environment, which is how a scheduler
//! usually supplies them. Secrets are optional at the clap level so that a
//! missing value is reported by the job itself with exit code 1.

use crate::config::TagMatch;
use crate::error::EXIT_CONFIG;
use crate::report::{MessageStyle, OutputSink};
use clap::error::ErrorKind;
use clap::Parser;
use std::path::PathBuf;

/// Cashtally - daily cash-sales total from Notion, pushed to Pushover
///
/// Sums the amount property of today's tagged records in a Notion
/// database and sends the total as a push notification.
///
/// Exit codes: 0 success, 1 configuration, 2 Notion, 3 Pushover.
///
/// Examples:
///   cashtally
///   cashtally --tag-match not-empty --style daily --sink stdout
///   cashtally --utc-offset -05:00 --timezone-label America/New_York
///   cashtally --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Notion integration token
    #[arg(long, env = "NOTION_API_KEY", hide_env_values = true)]
    pub notion_api_key: Option<String>,

    /// Notion database to query
    #[arg(long, env = "NOTION_DB_ID", hide_env_values = true)]
    pub notion_db_id: Option<String>,

    /// Pushover application token
    #[arg(long, env = "PUSHOVER_TOKEN", hide_env_values = true)]
    pub pushover_token: Option<String>,

    /// Pushover user or group key
    #[arg(long, env = "PUSHOVER_USER", hide_env_values = true)]
    pub pushover_user: Option<String>,

    /// Deliver to this device only
    #[arg(long, env = "PUSHOVER_DEVICE", hide_env_values = true)]
    pub pushover_device: Option<String>,

    /// Message priority (-2..2)
    #[arg(long, env = "PUSHOVER_PRIORITY", allow_hyphen_values = true)]
    pub pushover_priority: Option<String>,

    /// Notification sound
    #[arg(long, env = "PUSHOVER_SOUND", hide_env_values = true)]
    pub pushover_sound: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .cashtally.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// How the tag property is matched
    #[arg(long, value_name = "MODE")]
    pub tag_match: Option<TagMatch>,

    /// Tag option required by --tag-match contains
    #[arg(long, value_name = "VALUE")]
    pub tag_value: Option<String>,

    /// Local UTC offset for the day window (e.g. +08:00)
    #[arg(long, value_name = "OFFSET", allow_hyphen_values = true)]
    pub utc_offset: Option<String>,

    /// Zone name shown in the daily message
    #[arg(long, value_name = "NAME")]
    pub timezone_label: Option<String>,

    /// Notification wording
    #[arg(long, value_name = "STYLE")]
    pub style: Option<MessageStyle>,

    /// Extra output besides the notification
    #[arg(long, value_name = "SINK")]
    pub sink: Option<OutputSink>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .cashtally.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    ///
    /// Usage errors exit with the configuration code rather than clap's 2,
    /// which the scheduler would read as a query failure.
    pub fn parse_args() -> Self {
        Self::try_parse().unwrap_or_else(|e| {
            let code = usage_exit_code(&e);
            let _ = e.print();
            std::process::exit(code)
        })
    }

    /// Validate flag combinations. Secrets are checked later.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref path) = self.config {
            if !path.is_file() {
                return Err(format!("Config file does not exist: {}", path.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

/// Exit code for a failed parse; help and version output are successes.
pub fn usage_exit_code(err: &clap::Error) -> i32 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => EXIT_CONFIG,
    }
}

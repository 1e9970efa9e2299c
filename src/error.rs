//! Error types for the job's network boundaries and configuration.

use thiserror::Error;

/// Exit code for missing or invalid configuration.
pub const EXIT_CONFIG: i32 = 1;

/// Failure below HTTP: the request never produced a status line.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

/// Why a retried call gave up.
#[derive(Debug, Clone, Error)]
pub enum CallFailure {
    #[error("rate limited, gave up after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("gave up after {retries} retries: {source}")]
    Exhausted {
        retries: u32,
        #[source]
        source: TransportError,
    },

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// Fatal query-side failure. Aborts the job before any notification.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Notion rate limit exceeded after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("Notion request failed after {retries} retries: {source}")]
    Exhausted {
        retries: u32,
        #[source]
        source: TransportError,
    },

    #[error("Notion API error {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("Failed to parse Notion response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Failed to build Notion client: {0}")]
    Client(TransportError),
}

impl From<CallFailure> for FetchError {
    fn from(failure: CallFailure) -> Self {
        match failure {
            CallFailure::RateLimited { retries } => FetchError::RateLimited { retries },
            CallFailure::Exhausted { retries, source } => FetchError::Exhausted { retries, source },
            CallFailure::Status { status, body } => FetchError::RequestFailed { status, body },
        }
    }
}

/// Notification delivery failure. Aggregation has already completed.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Pushover rate limit exceeded after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("Pushover request failed after {retries} retries: {source}")]
    Exhausted {
        retries: u32,
        #[source]
        source: TransportError,
    },

    #[error("Pushover API error {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("Pushover error: status {status}{}", format_errors(.errors))]
    Rejected { status: i64, errors: Vec<String> },

    #[error("Failed to parse Pushover response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Failed to build Pushover client: {0}")]
    Client(TransportError),
}

fn format_errors(errors: &[String]) -> String {
    if errors.is_empty() {
        String::new()
    } else {
        format!(" ({})", errors.join("; "))
    }
}

impl From<CallFailure> for NotifyError {
    fn from(failure: CallFailure) -> Self {
        match failure {
            CallFailure::RateLimited { retries } => NotifyError::RateLimited { retries },
            CallFailure::Exhausted { retries, source } => {
                NotifyError::Exhausted { retries, source }
            }
            CallFailure::Status { status, body } => NotifyError::RequestFailed { status, body },
        }
    }
}

/// Pre-flight configuration problem. Raised before any network activity.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing {0}")]
    Missing(&'static str),

    #[error("Invalid UTC offset '{0}' (expected e.g. +08:00)")]
    InvalidOffset(String),

    #[error("Invalid Pushover priority '{0}' (expected -2..2)")]
    InvalidPriority(String),

    #[error("Invalid tag filter: {0}")]
    InvalidTagFilter(String),
}

/// Anything that stops the job before a client is built.
#[derive(Debug, Error)]
pub enum PreflightError {
    #[error("Error: {0}")]
    InvalidArgs(String),

    #[error("Error: {0:#}")]
    ConfigFile(anyhow::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl PreflightError {
    pub fn exit_code(&self) -> i32 {
        EXIT_CONFIG
    }
}

/// Fatal outcome of a job run.
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Notify(#[from] NotifyError),

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl JobError {
    /// Process exit code seen by the scheduler.
    pub fn exit_code(&self) -> i32 {
        match self {
            JobError::Fetch(_) => 2,
            JobError::Notify(_) | JobError::Output(_) => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let fetch = JobError::from(FetchError::RateLimited { retries: 5 });
        assert_eq!(fetch.exit_code(), 2);

        let notify = JobError::from(NotifyError::Rejected {
            status: 0,
            errors: vec![],
        });
        assert_eq!(notify.exit_code(), 3);
    }

    #[test]
    fn test_preflight_errors_use_config_code() {
        let missing = PreflightError::from(ConfigError::Missing("NOTION_DB_ID"));
        assert_eq!(missing.exit_code(), EXIT_CONFIG);
        assert_eq!(missing.to_string(), "Missing NOTION_DB_ID");

        let file = PreflightError::ConfigFile(anyhow::anyhow!("bad toml"));
        assert_eq!(file.exit_code(), 1);
    }

    #[test]
    fn test_call_failure_maps_per_side() {
        let status = CallFailure::Status {
            status: 400,
            body: "bad".to_string(),
        };
        assert!(matches!(
            FetchError::from(status.clone()),
            FetchError::RequestFailed { status: 400, .. }
        ));
        assert!(matches!(
            NotifyError::from(status),
            NotifyError::RequestFailed { status: 400, .. }
        ));
    }

    #[test]
    fn test_rejected_message_lists_errors() {
        let err = NotifyError::Rejected {
            status: 0,
            errors: vec!["user key is invalid".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Pushover error: status 0 (user key is invalid)"
        );
    }
}

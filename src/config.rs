//! Configuration handling.
//!
//! This module loads the optional `.cashtally.toml` file, merges it with
//! command-line and environment values, and resolves everything into a
//! validated [`JobConfig`] that is built once and passed by reference.

use crate::cli::Args;
use crate::error::ConfigError;
use crate::models::TagPredicate;
use crate::report::{MessageStyle, OutputSink};
use anyhow::{Context, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".cashtally.toml";

/// Root of the configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Record-source settings.
    #[serde(default)]
    pub query: QueryConfig,

    /// Push-notification settings.
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Job variant settings.
    #[serde(default)]
    pub job: JobSection,
}

/// How the tag property is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TagMatch {
    /// Tag list contains `tag_value`
    #[default]
    Contains,
    /// Tag list is not empty
    NotEmpty,
}

/// Record-source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Notion API base URL.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Value of the Notion-Version header.
    #[serde(default = "default_notion_version")]
    pub notion_version: String,

    /// Date property holding the record's creation time.
    #[serde(default = "default_created_property")]
    pub created_property: String,

    /// Multi-select property the tag filter applies to.
    #[serde(default = "default_tag_property")]
    pub tag_property: String,

    /// Number or formula property that is summed.
    #[serde(default = "default_amount_property")]
    pub amount_property: String,

    /// Tag predicate.
    #[serde(default)]
    pub tag_match: TagMatch,

    /// Option matched by `tag_match = "contains"`.
    #[serde(default = "default_tag_value")]
    pub tag_value: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            notion_version: default_notion_version(),
            created_property: default_created_property(),
            tag_property: default_tag_property(),
            amount_property: default_amount_property(),
            tag_match: TagMatch::default(),
            tag_value: default_tag_value(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.notion.com".to_string()
}

fn default_notion_version() -> String {
    "2022-06-28".to_string()
}

fn default_created_property() -> String {
    "created_at".to_string()
}

fn default_tag_property() -> String {
    "payment_method".to_string()
}

fn default_amount_property() -> String {
    "actual_money".to_string()
}

fn default_tag_value() -> String {
    "Cash".to_string()
}

/// Push-notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Pushover messages endpoint.
    #[serde(default = "default_push_url")]
    pub api_url: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            api_url: default_push_url(),
        }
    }
}

fn default_push_url() -> String {
    "https://api.pushover.net/1/messages.json".to_string()
}

/// Job variant settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSection {
    /// Local offset the day window is computed in.
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,

    /// Zone name shown in the daily message.
    #[serde(default = "default_timezone_label")]
    pub timezone_label: String,

    /// Message wording.
    #[serde(default)]
    pub style: MessageStyle,

    /// Extra output besides the notification.
    #[serde(default)]
    pub sink: OutputSink,
}

impl Default for JobSection {
    fn default() -> Self {
        Self {
            utc_offset: default_utc_offset(),
            timezone_label: default_timezone_label(),
            style: MessageStyle::default(),
            sink: OutputSink::default(),
        }
    }
}

fn default_utc_offset() -> String {
    "+08:00".to_string()
}

fn default_timezone_label() -> String {
    "Asia/Brunei".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// File named by `--config`, else `.cashtally.toml` if present, else
    /// defaults; CLI overrides applied on top.
    ///
    /// An explicit file that fails to load is an error. A broken default
    /// file only produces a warning.
    pub fn for_args(args: &Args) -> Result<Self> {
        let mut config = if let Some(ref config_path) = args.config {
            Self::load(config_path)?
        } else {
            match Self::load_default() {
                Ok(Some(config)) => config,
                Ok(None) => Self::default(),
                Err(e) => {
                    eprintln!("Warning: failed to load {}: {:#}", CONFIG_FILE, e);
                    Self::default()
                }
            }
        };

        config.merge_with_args(args);
        Ok(config)
    }

    /// Merge CLI arguments into this configuration.
    ///
    /// Only values given explicitly on the command line override the file.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(tag_match) = args.tag_match {
            self.query.tag_match = tag_match;
        }
        if let Some(ref tag_value) = args.tag_value {
            self.query.tag_value = tag_value.clone();
        }
        if let Some(ref offset) = args.utc_offset {
            self.job.utc_offset = offset.clone();
        }
        if let Some(ref label) = args.timezone_label {
            self.job.timezone_label = label.clone();
        }
        if let Some(style) = args.style {
            self.job.style = style;
        }
        if let Some(sink) = args.sink {
            self.job.sink = sink;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

/// Resolved record-source settings, secrets included.
#[derive(Clone)]
pub struct QuerySettings {
    pub api_base: String,
    pub notion_version: String,
    pub api_key: String,
    pub database_id: String,
    pub created_property: String,
    pub tag_property: String,
    pub amount_property: String,
    pub predicate: TagPredicate,
}

impl Default for QuerySettings {
    fn default() -> Self {
        let query = QueryConfig::default();
        Self {
            api_base: query.api_base,
            notion_version: query.notion_version,
            api_key: String::new(),
            database_id: String::new(),
            created_property: query.created_property,
            tag_property: query.tag_property,
            amount_property: query.amount_property,
            predicate: TagPredicate::Contains(query.tag_value),
        }
    }
}

/// Resolved push settings, secrets included.
#[derive(Clone)]
pub struct NotifySettings {
    pub api_url: String,
    pub token: String,
    pub user: String,
    pub device: Option<String>,
    pub priority: Option<i8>,
    pub sound: Option<String>,
}

impl Default for NotifySettings {
    fn default() -> Self {
        let notify = NotifyConfig::default();
        Self {
            api_url: notify.api_url,
            token: String::new(),
            user: String::new(),
            device: None,
            priority: None,
            sound: None,
        }
    }
}

/// Everything one job run needs.
#[derive(Clone)]
pub struct JobConfig {
    pub query: QuerySettings,
    pub notify: NotifySettings,
    pub offset: FixedOffset,
    pub timezone_label: String,
    pub style: MessageStyle,
    pub sink: OutputSink,
}

impl JobConfig {
    /// Validate secrets and settings. Fails before any client is built.
    pub fn resolve(args: &Args, config: &Config) -> Result<Self, ConfigError> {
        let api_key = required("NOTION_API_KEY", &args.notion_api_key)?;
        let database_id = required("NOTION_DB_ID", &args.notion_db_id)?;
        let token = required("PUSHOVER_TOKEN", &args.pushover_token)?;
        let user = required("PUSHOVER_USER", &args.pushover_user)?;

        let predicate = match config.query.tag_match {
            TagMatch::Contains if config.query.tag_value.trim().is_empty() => {
                return Err(ConfigError::InvalidTagFilter(
                    "tag_value must not be empty for 'contains'".to_string(),
                ))
            }
            TagMatch::Contains => TagPredicate::Contains(config.query.tag_value.clone()),
            TagMatch::NotEmpty => TagPredicate::NotEmpty,
        };

        let priority = optional(&args.pushover_priority)
            .map(|p| parse_priority(&p))
            .transpose()?;

        Ok(Self {
            query: QuerySettings {
                api_base: config.query.api_base.clone(),
                notion_version: config.query.notion_version.clone(),
                api_key,
                database_id,
                created_property: config.query.created_property.clone(),
                tag_property: config.query.tag_property.clone(),
                amount_property: config.query.amount_property.clone(),
                predicate,
            },
            notify: NotifySettings {
                api_url: config.notify.api_url.clone(),
                token,
                user,
                device: optional(&args.pushover_device),
                priority,
                sound: optional(&args.pushover_sound),
            },
            offset: parse_utc_offset(&config.job.utc_offset)?,
            timezone_label: config.job.timezone_label.clone(),
            style: config.job.style,
            sink: config.job.sink,
        })
    }

    /// Values that must never appear in CI logs.
    pub fn secrets(&self) -> Vec<String> {
        let mut values = vec![
            self.query.api_key.clone(),
            self.query.database_id.clone(),
            self.notify.token.clone(),
            self.notify.user.clone(),
        ];
        values.extend(self.notify.device.clone());
        values.extend(self.notify.priority.map(|p| p.to_string()));
        values.extend(self.notify.sound.clone());
        values
    }
}

/// Empty strings count as absent.
fn optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn required(name: &'static str, value: &Option<String>) -> Result<String, ConfigError> {
    optional(value).ok_or(ConfigError::Missing(name))
}

fn parse_priority(value: &str) -> Result<i8, ConfigError> {
    value
        .parse::<i8>()
        .ok()
        .filter(|p| (-2..=2).contains(p))
        .ok_or_else(|| ConfigError::InvalidPriority(value.to_string()))
}

/// Parse `+HH:MM`, `-HH:MM`, `+HH` or `Z`.
pub fn parse_utc_offset(value: &str) -> Result<FixedOffset, ConfigError> {
    let invalid = || ConfigError::InvalidOffset(value.to_string());
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, rest) = match value.as_bytes().first() {
        Some(b'+') => (1, &value[1..]),
        Some(b'-') => (-1, &value[1..]),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None => (rest, "0"),
    };
    let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !digits(hours) || !digits(minutes) {
        return Err(invalid());
    }
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 14 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

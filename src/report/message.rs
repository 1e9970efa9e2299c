//! Notification text for the daily total.

use crate::models::{AggregateTotal, TimeWindow};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// How the notification is worded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MessageStyle {
    /// "Total Cash Sales for Oct 17, 2026" / "19.75"
    #[default]
    Cash,
    /// "Daily total" / date, zone and property on two lines
    Daily,
}

/// Where the total goes besides the push notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OutputSink {
    /// Push notification only
    #[default]
    Notify,
    /// Print the total to stdout, then push
    Stdout,
}

/// Everything the message text depends on.
#[derive(Debug, Clone)]
pub struct DailyReport<'a> {
    pub window: &'a TimeWindow,
    pub total: AggregateTotal,
    pub amount_property: &'a str,
    pub timezone_label: &'a str,
}

impl DailyReport<'_> {
    /// Title and message for the given style.
    pub fn compose(&self, style: MessageStyle) -> (String, String) {
        match style {
            MessageStyle::Cash => (
                format!(
                    "Total Cash Sales for {}",
                    self.window.start().format("%b %d, %Y")
                ),
                self.total.to_string(),
            ),
            MessageStyle::Daily => (
                "Daily total".to_string(),
                format!(
                    "Date: {} {}\nTotal {}: {}",
                    self.window.start().date_naive(),
                    self.timezone_label,
                    self.amount_property,
                    self.total
                ),
            ),
        }
    }

    /// Write the total line when the sink asks for it.
    pub fn emit<W: Write>(&self, sink: OutputSink, out: &mut W) -> std::io::Result<()> {
        if sink == OutputSink::Stdout {
            writeln!(out, "{}", self.total)?;
        }
        Ok(())
    }
}

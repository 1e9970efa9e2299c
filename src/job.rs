//! One run of the daily job: aggregate, then notify.

use crate::cli::Args;
use crate::config::{Config, JobConfig};
use crate::error::{JobError, PreflightError};
use crate::mask;
use crate::models::{AggregateTotal, NotificationRequest, QueryFilter, TimeWindow};
use crate::notify::{Notifier, PushGateway};
use crate::query::{Aggregator, RecordSource};
use crate::report::DailyReport;
use crate::retry::Sleeper;
use chrono::{DateTime, FixedOffset, Utc};
use std::io::Write;
use tracing::{debug, error, info, warn};

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct JobSummary {
    pub window: TimeWindow,
    pub total: AggregateTotal,
}

/// Validate arguments and resolve the effective configuration.
///
/// Touches only the filesystem; no client exists yet.
pub fn prepare(args: &Args) -> Result<JobConfig, PreflightError> {
    args.validate().map_err(PreflightError::InvalidArgs)?;
    let file = Config::for_args(args).map_err(PreflightError::ConfigFile)?;
    Ok(JobConfig::resolve(args, &file)?)
}

/// Full run from parsed arguments to a process exit code.
///
/// `connect` builds the transports and is only called once configuration
/// resolved cleanly and the secret masks are written.
pub async fn execute<R, P, S, W, C>(args: &Args, connect: C, sleeper: &S, out: &mut W) -> i32
where
    R: RecordSource,
    P: PushGateway,
    S: Sleeper,
    W: Write,
    C: FnOnce(&JobConfig) -> Result<(R, P), JobError>,
{
    let config = match prepare(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return e.exit_code();
        }
    };

    if let Err(e) = mask::write_masks(out, &config.secrets(), mask::running_in_actions()) {
        warn!("Failed to write secret masks: {}", e);
    }

    let outcome = match connect(&config) {
        Ok((source, gateway)) => {
            let now = Utc::now().with_timezone(&config.offset);
            debug!("Local time: {}", now.to_rfc3339());
            run_job(&config, now, &source, &gateway, sleeper, out).await
        }
        Err(e) => Err(e),
    };

    match outcome {
        Ok(summary) => {
            info!(
                "Sent total {} for {}",
                summary.total,
                summary.window.start().date_naive()
            );
            if let Err(e) = writeln!(out, "Done") {
                warn!("Failed to write completion line: {}", e);
            }
            0
        }
        Err(e) => {
            error!("Job failed: {}", e);
            eprintln!("{}", e);
            e.exit_code()
        }
    }
}

/// Sum today's records and push the total.
///
/// The notifier only runs once every page has been aggregated; a failed
/// aggregation never produces a notification.
pub async fn run_job<R, P, S, W>(
    config: &JobConfig,
    now: DateTime<FixedOffset>,
    source: &R,
    gateway: &P,
    sleeper: &S,
    out: &mut W,
) -> Result<JobSummary, JobError>
where
    R: RecordSource,
    P: PushGateway,
    S: Sleeper,
    W: Write,
{
    let window = TimeWindow::today(now);
    info!(
        "Summing {} for {} .. {}",
        config.query.amount_property,
        window.start().to_rfc3339(),
        window.end().to_rfc3339()
    );

    let filter = QueryFilter {
        window,
        created_property: config.query.created_property.clone(),
        tag_property: config.query.tag_property.clone(),
        predicate: config.query.predicate.clone(),
    };
    let total = Aggregator::new(source, sleeper, config.query.amount_property.as_str())
        .aggregate(&filter)
        .await?;
    info!("Total: {}", total);

    let report = DailyReport {
        window: &window,
        total,
        amount_property: &config.query.amount_property,
        timezone_label: &config.timezone_label,
    };
    report.emit(config.sink, out)?;

    let (title, message) = report.compose(config.style);
    let request = NotificationRequest {
        title,
        message,
        timestamp: now.timestamp(),
        device: config.notify.device.clone(),
        priority: config.notify.priority,
        sound: config.notify.sound.clone(),
    };
    Notifier::new(gateway, sleeper).notify(&request).await?;

    Ok(JobSummary { window, total })
}

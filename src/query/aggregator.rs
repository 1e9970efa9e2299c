//! Paginated aggregation of the amount property.
//!
//! Pages are requested one after another with the same filter, following
//! the continuation cursor until the source reports no more results. Each
//! record's amount is folded into a single running total.

use crate::error::FetchError;
use crate::models::{AggregateTotal, Page, QueryBody, QueryFilter};
use crate::query::client::RecordSource;
use crate::retry::{RetryBudget, RetryPolicy, Sleeper};
use tracing::{debug, info, warn};

/// Sums one amount property over every matching record.
pub struct Aggregator<'a, R, S> {
    source: &'a R,
    sleeper: &'a S,
    amount_property: String,
    policy: RetryPolicy,
}

impl<'a, R: RecordSource, S: Sleeper> Aggregator<'a, R, S> {
    pub fn new(source: &'a R, sleeper: &'a S, amount_property: impl Into<String>) -> Self {
        Self {
            source,
            sleeper,
            amount_property: amount_property.into(),
            policy: RetryPolicy::default(),
        }
    }

    /// Fetch every page matching `filter` and return the summed amount.
    ///
    /// Nothing partial is returned: any fatal error aborts the whole run.
    pub async fn aggregate(&self, filter: &QueryFilter) -> Result<AggregateTotal, FetchError> {
        let mut body = QueryBody::first_page(filter);
        let mut total = AggregateTotal::default();
        let mut budget = RetryBudget::new(self.policy);
        let mut pages = 0usize;
        let mut records = 0usize;

        loop {
            let source = self.source;
            let request = &body;
            let raw = budget
                .run("Notion", self.sleeper, move || source.query(request))
                .await?;
            let page: Page = serde_json::from_str(&raw)?;
            pages += 1;
            records += page.results.len();

            for record in &page.results {
                total.add(record.amount(&self.amount_property).value());
            }
            debug!(
                "Page {}: {} records, running total {}",
                pages,
                page.results.len(),
                total
            );

            if !page.has_more {
                break;
            }
            match page.next_cursor {
                Some(cursor) => body.start_cursor = Some(cursor),
                None => {
                    warn!("Notion reported more results without a cursor; stopping");
                    break;
                }
            }
        }

        info!(
            "Aggregated {} records over {} pages ({} retries)",
            records,
            pages,
            budget.used()
        );
        Ok(total)
    }
}

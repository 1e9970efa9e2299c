//! Record-source side of the job.
//!
//! This module provides the Notion query client and the paginated
//! aggregator that sums the amount property across every page.

pub mod aggregator;
pub mod client;

pub use aggregator::Aggregator;
pub use client::{NotionClient, RecordSource};

//! Push-notification side of the job.

pub mod client;
pub mod notifier;

pub use client::{PushGateway, PushoverClient};
pub use notifier::Notifier;

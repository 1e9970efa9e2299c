//! Output formatting.
//!
//! This module turns the aggregated total into the notification text and
//! writes the optional stdout line.

pub mod message;

pub use message::*;

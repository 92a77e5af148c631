//! Queue execution and reporting
//!
//! This module drives operator-approved queue items through the transport:
//! resolving each item's file plan from the two indexes, copying or moving
//! one file at a time, and keeping counters, skip logs, and the indexes
//! consistent as it goes.

mod executor;
mod reporting;

pub use executor::{ProgressEvent, QueueExecutor, SyncContext};
pub use reporting::QueueReporter;

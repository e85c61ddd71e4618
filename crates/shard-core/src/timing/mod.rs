//! The timing store: a durable per-test duration ledger, smoothed by an
//! exponential moving average and pruned by age.
//!
//! The ledger file is the sole source of truth for historical durations.
//! One writer at a time (the merger) publishes it via atomic rename;
//! readers (the assigner) take an immutable snapshot for the run.

mod ledger;
mod merge;

pub use ledger::{DurationMs, TimingEntry, TimingLedger, CURRENT_VERSION};
pub use merge::{merge_observation, prune_stale, Observation, DEFAULT_ALPHA, DEFAULT_PRUNE_DAYS};

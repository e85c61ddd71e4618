//! The merger: folds one or more shard-timing files into the prior ledger
//! using EMA, prunes stale entries, and publishes the result atomically.

use crate::error::{Result, ShardError};
use crate::extract::ShardTiming;
use crate::timing::{merge_observation, prune_stale, Observation, TimingLedger, DEFAULT_ALPHA, DEFAULT_PRUNE_DAYS};
use chrono::Utc;
use std::path::Path;
use tracing::{info, info_span};

/// Options controlling a single merge run.
#[derive(Debug, Clone)]
pub struct MergeOptions {
    pub alpha: f64,
    pub prune_days: i64,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            prune_days: DEFAULT_PRUNE_DAYS,
        }
    }
}

/// Load `ledger_path` (absent is treated as empty), fold in `shard_timings`
/// in the order given, prune, and persist the result back to `ledger_path`.
///
/// Callers are responsible for sorting `shard_timings` into deterministic
/// file-name order before calling, per spec.md §4.8.
pub fn merge(ledger_path: &Path, shard_timings: &[ShardTiming], options: &MergeOptions) -> Result<TimingLedger> {
    if !(0.0..=1.0).contains(&options.alpha) {
        return Err(ShardError::inconsistent(format!(
            "alpha must be in [0, 1], got {}",
            options.alpha
        )));
    }
    if options.prune_days < 0 {
        return Err(ShardError::inconsistent(format!(
            "prune_days must be >= 0, got {}",
            options.prune_days
        )));
    }

    let span = info_span!("merge", shard_files = shard_timings.len(), alpha = options.alpha);
    let _guard = span.enter();

    let mut ledger = TimingLedger::load(ledger_path)?;
    let now = Utc::now();

    for timing in shard_timings {
        for (id, duration) in &timing.tests {
            merge_observation(
                &mut ledger,
                Observation {
                    id: id.clone(),
                    duration: *duration,
                    timestamp: now,
                },
                options.alpha,
            );
        }
    }

    prune_stale(&mut ledger, options.prune_days, now);
    ledger.persist(ledger_path)?;
    info!(tests = ledger.tests.len(), "ledger merged and persisted");

    Ok(ledger)
}

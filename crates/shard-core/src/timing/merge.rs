//! EMA-based ledger merge and age-based pruning.

use super::ledger::{DurationMs, TimingEntry, TimingLedger};
use crate::identity::{self, TestId};
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Default EMA smoothing factor.
pub const DEFAULT_ALPHA: f64 = 0.3;

/// Default pruning window, in days.
pub const DEFAULT_PRUNE_DAYS: i64 = 30;

/// A single new duration observation to fold into the ledger.
pub struct Observation {
    pub id: TestId,
    pub duration: DurationMs,
    pub timestamp: DateTime<Utc>,
}

/// Fold `observation` into `ledger` in place using exponential moving
/// average smoothing. New entries are inserted verbatim with `runs = 1`.
///
/// `alpha` must be in `[0, 1]`; callers validate this once up front (see
/// [`crate::error::ShardError::Inconsistent`]) rather than on every call.
pub fn merge_observation(ledger: &mut TimingLedger, observation: Observation, alpha: f64) {
    let file = identity::file_of(&observation.id).to_string();

    ledger
        .tests
        .entry(observation.id)
        .and_modify(|entry| {
            let smoothed = alpha * observation.duration as f64 + (1.0 - alpha) * entry.duration as f64;
            entry.duration = smoothed.round() as DurationMs;
            entry.runs += 1;
            entry.last_run = entry.last_run.max(observation.timestamp);
            entry.file = file.clone();
        })
        .or_insert(TimingEntry {
            file,
            duration: observation.duration,
            runs: 1,
            last_run: observation.timestamp,
        });

    ledger.updated_at = Utc::now();
}

/// Remove entries whose `last_run` is older than `prune_days` days from
/// `now`. `prune_days == 0` disables pruning entirely.
pub fn prune_stale(ledger: &mut TimingLedger, prune_days: i64, now: DateTime<Utc>) {
    if prune_days == 0 {
        return;
    }
    let cutoff = now - Duration::days(prune_days);
    let before = ledger.tests.len();
    ledger.tests.retain(|_, entry| entry.last_run >= cutoff);
    let removed = before - ledger.tests.len();
    if removed > 0 {
        debug!(removed, prune_days, "pruned stale timing entries");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn ema_update_matches_scenario() {
        let mut ledger = TimingLedger::empty();
        ledger.tests.insert(
            "a.ts::t".to_string(),
            TimingEntry {
                file: "a.ts".to_string(),
                duration: 100_000,
                runs: 3,
                last_run: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            },
        );

        let new_ts = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
        merge_observation(
            &mut ledger,
            Observation {
                id: "a.ts::t".to_string(),
                duration: 130_000,
                timestamp: new_ts,
            },
            0.3,
        );

        let entry = ledger.tests.get("a.ts::t").unwrap();
        assert_eq!(entry.duration, 109_000);
        assert_eq!(entry.runs, 4);
        assert_eq!(entry.last_run, new_ts);
    }

    #[test]
    fn new_observation_is_inserted_verbatim() {
        let mut ledger = TimingLedger::empty();
        let ts = Utc::now();
        merge_observation(
            &mut ledger,
            Observation {
                id: "b.ts::t".to_string(),
                duration: 5_000,
                timestamp: ts,
            },
            0.3,
        );
        let entry = ledger.tests.get("b.ts::t").unwrap();
        assert_eq!(entry.duration, 5_000);
        assert_eq!(entry.runs, 1);
    }

    #[test]
    fn last_run_is_monotonic_non_decreasing() {
        let mut ledger = TimingLedger::empty();
        let later = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        ledger.tests.insert(
            "a.ts::t".to_string(),
            TimingEntry {
                file: "a.ts".to_string(),
                duration: 1_000,
                runs: 1,
                last_run: later,
            },
        );

        let earlier = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        merge_observation(
            &mut ledger,
            Observation {
                id: "a.ts::t".to_string(),
                duration: 2_000,
                timestamp: earlier,
            },
            0.5,
        );

        assert_eq!(ledger.tests.get("a.ts::t").unwrap().last_run, later);
    }

    #[test]
    fn prune_removes_exactly_stale_entries() {
        let mut ledger = TimingLedger::empty();
        let now = Utc.with_ymd_and_hms(2026, 7, 30, 0, 0, 0).unwrap();

        ledger.tests.insert(
            "stale.ts::t".to_string(),
            TimingEntry {
                file: "stale.ts".to_string(),
                duration: 1_000,
                runs: 1,
                last_run: now - Duration::days(40),
            },
        );
        ledger.tests.insert(
            "fresh.ts::t".to_string(),
            TimingEntry {
                file: "fresh.ts".to_string(),
                duration: 2_000,
                runs: 1,
                last_run: now,
            },
        );

        prune_stale(&mut ledger, 30, now);

        assert!(!ledger.tests.contains_key("stale.ts::t"));
        let fresh = ledger.tests.get("fresh.ts::t").unwrap();
        assert_eq!(fresh.duration, 2_000);
    }

    #[test]
    fn prune_days_zero_disables_pruning() {
        let mut ledger = TimingLedger::empty();
        let now = Utc::now();
        ledger.tests.insert(
            "old.ts::t".to_string(),
            TimingEntry {
                file: "old.ts".to_string(),
                duration: 1_000,
                runs: 1,
                last_run: now - Duration::days(9999),
            },
        );
        prune_stale(&mut ledger, 0, now);
        assert!(ledger.tests.contains_key("old.ts::t"));
    }
}

//! The duration oracle: fills in missing timing data for discovered tests.
//!
//! A pure function of its inputs — same ledger and discovered-test set
//! always yields the same estimates, with no state to carry between runs.

use crate::discovery::DiscoveredTest;
use crate::timing::{DurationMs, TimingLedger};
use std::collections::HashMap;

/// The default duration assumed for a test with no ledger data of any kind.
pub const DEFAULT_DURATION_MS: DurationMs = 30_000;

/// Where an estimate came from, cheapest (best) first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Taken directly from a ledger hit for this exact test.
    Measured,
    /// Averaged from other measured tests in the same file.
    SameFile,
    /// Averaged across the entire ledger.
    Global,
    /// No ledger data available at all; the hard-coded default was used.
    Default,
}

/// A duration estimate and how it was produced.
#[derive(Debug, Clone, Copy)]
pub struct Estimate {
    pub duration: DurationMs,
    pub provenance: Provenance,
}

/// Estimate the duration of every test in `tests` using `ledger`.
///
/// Lookup order, per spec.md §4.3: ledger hit, same-file average, global
/// average, hard-coded default.
pub fn estimate_all(tests: &[DiscoveredTest], ledger: &TimingLedger) -> HashMap<String, Estimate> {
    let global_mean = mean_duration(ledger.tests.values().map(|e| e.duration));

    let mut per_file_mean: HashMap<&str, f64> = HashMap::new();
    for test in tests {
        per_file_mean.entry(test.file.as_str()).or_insert_with(|| {
            let durations = ledger
                .tests
                .values()
                .filter(|e| e.file == test.file)
                .map(|e| e.duration);
            mean_duration(durations).unwrap_or(0.0)
        });
    }

    tests
        .iter()
        .map(|test| {
            let estimate = if let Some(entry) = ledger.tests.get(&test.id) {
                Estimate {
                    duration: entry.duration,
                    provenance: Provenance::Measured,
                }
            } else if let Some(mean) = same_file_mean(ledger, &test.file) {
                Estimate {
                    duration: mean.round() as DurationMs,
                    provenance: Provenance::SameFile,
                }
            } else if let Some(mean) = global_mean {
                Estimate {
                    duration: mean.round() as DurationMs,
                    provenance: Provenance::Global,
                }
            } else {
                Estimate {
                    duration: DEFAULT_DURATION_MS,
                    provenance: Provenance::Default,
                }
            };
            (test.id.clone(), estimate)
        })
        .collect()
}

fn same_file_mean(ledger: &TimingLedger, file: &str) -> Option<f64> {
    mean_duration(ledger.tests.values().filter(|e| e.file == file).map(|e| e.duration))
}

fn mean_duration(durations: impl Iterator<Item = DurationMs>) -> Option<f64> {
    let (sum, count) = durations.fold((0u64, 0u64), |(sum, count), d| (sum + d, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum as f64 / count as f64)
    }
}

/// The default file-affinity penalty: the 25th percentile of per-file
/// average measured durations, or [`DEFAULT_DURATION_MS`] when the ledger
/// has no measured tests at all.
pub fn default_file_affinity_penalty(ledger: &TimingLedger) -> DurationMs {
    let mut by_file: HashMap<&str, Vec<DurationMs>> = HashMap::new();
    for entry in ledger.tests.values() {
        by_file.entry(entry.file.as_str()).or_default().push(entry.duration);
    }

    let mut per_file_averages: Vec<f64> = by_file
        .values()
        .filter_map(|durations| mean_duration(durations.iter().copied()))
        .collect();

    if per_file_averages.is_empty() {
        return DEFAULT_DURATION_MS;
    }

    per_file_averages.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    percentile(&per_file_averages, 0.25).round() as DurationMs
}

/// Linear-interpolation percentile of an already-sorted slice.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let position = p * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = position - lower as f64;
        sorted[lower] + (sorted[upper] - sorted[lower]) * frac
    }
}

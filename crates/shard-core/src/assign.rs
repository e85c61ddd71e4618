//! The assigner: orchestrates discovery, the oracle, and the packer into a
//! materialized per-shard assignment, plus the metadata needed for reporting.

use crate::discovery::Discovery;
use crate::error::{Result, ShardError};
use crate::identity;
use crate::oracle::{self, Provenance};
use crate::packing::{ckk_schedule, PackableTest};
use crate::timing::{DurationMs, TimingLedger};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{info, info_span, warn};

/// Options controlling a single assign run. Mirrors the CLI's `assign` flags.
#[derive(Debug, Clone)]
pub struct AssignOptions {
    pub shard_count: usize,
    pub timeout_ms: u64,
    pub file_affinity: bool,
    /// Overrides the auto-computed penalty when `Some`; ignored when
    /// `file_affinity` is `false`.
    pub file_affinity_penalty: Option<DurationMs>,
}

/// One shard's materialized assignment.
#[derive(Debug, Clone, Serialize)]
pub struct ShardAssignment {
    pub tests: Vec<String>,
    #[serde(rename = "testListFile")]
    pub test_list_file: String,
    #[serde(rename = "expectedDurationMs")]
    pub expected_duration_ms: DurationMs,
}

/// The full result of an assign run, serialized per spec.md §6.
#[derive(Debug, Clone, Serialize)]
pub struct AssignResult {
    pub shards: std::collections::BTreeMap<String, ShardAssignment>,
    #[serde(rename = "testListFiles")]
    pub test_list_files: std::collections::BTreeMap<String, String>,
    #[serde(rename = "expectedDurations")]
    pub expected_durations: std::collections::BTreeMap<String, DurationMs>,
    #[serde(rename = "totalTests")]
    pub total_tests: usize,
    #[serde(rename = "estimatedTests")]
    pub estimated_tests: BTreeSet<String>,
    #[serde(rename = "isOptimal")]
    pub is_optimal: bool,
}

impl AssignResult {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ShardError::malformed("assign result", format!("serialization failed: {e}")))
    }

    /// A short human-readable summary: per-shard test counts and expected
    /// durations, plus the optimality flag.
    pub fn to_human_summary(&self) -> String {
        let mut out = String::new();
        for (shard, assignment) in &self.shards {
            out.push_str(&format!(
                "shard {shard}: {} tests, expected {} ms\n",
                assignment.tests.len(),
                assignment.expected_duration_ms
            ));
        }
        out.push_str(&format!(
            "total: {} tests, {} estimated, optimal={}\n",
            self.total_tests,
            self.estimated_tests.len(),
            self.is_optimal
        ));
        out
    }
}

/// Run the assigner: load discovery + ledger, estimate durations, pack into
/// shards, and convert each shard to its downstream test-list text.
pub fn assign(discovery: &Discovery, ledger: &TimingLedger, options: &AssignOptions) -> Result<AssignResult> {
    if options.shard_count < 1 {
        return Err(ShardError::inconsistent("shard count must be >= 1"));
    }
    if discovery.tests.is_empty() && options.shard_count > 0 {
        return Err(ShardError::inconsistent(
            "empty test set with non-zero shard count",
        ));
    }

    let span = info_span!("assign", shards = options.shard_count, tests = discovery.tests.len());
    let _guard = span.enter();

    let estimates = oracle::estimate_all(&discovery.tests, ledger);

    let penalty = if !options.file_affinity {
        0
    } else if let Some(p) = options.file_affinity_penalty {
        p
    } else {
        let p = oracle::default_file_affinity_penalty(ledger);
        info!(penalty = p, "auto-computed file-affinity penalty");
        p
    };

    let packable: Vec<PackableTest> = discovery
        .tests
        .iter()
        .map(|t| PackableTest {
            id: t.id.clone(),
            file: t.file.clone(),
            duration: estimates.get(&t.id).map(|e| e.duration).unwrap_or(oracle::DEFAULT_DURATION_MS),
        })
        .collect();

    let ckk = ckk_schedule(&packable, options.shard_count, penalty, options.timeout_ms);
    if !ckk.is_optimal {
        warn!(timeout_ms = options.timeout_ms, "CKK deadline exceeded, using best-so-far");
    }

    let mut shards = std::collections::BTreeMap::new();
    let mut test_list_files = std::collections::BTreeMap::new();
    let mut expected_durations = std::collections::BTreeMap::new();
    let mut total_tests = 0usize;

    for (idx, (ids, raw_load)) in ckk.assignment.iter().zip(ckk.raw_load.iter()).enumerate() {
        let shard_key = (idx + 1).to_string();
        let mut test_list_file = String::new();
        for id in ids {
            let test = discovery
                .tests
                .iter()
                .find(|t| &t.id == id)
                .ok_or_else(|| ShardError::inconsistent(format!("scheduled id '{id}' not found in discovery")))?;
            let line = identity::to_filter_line(id, &discovery.root_dir, &test.test_dir)?;
            test_list_file.push_str(&line);
        }

        total_tests += ids.len();
        test_list_files.insert(shard_key.clone(), test_list_file.clone());
        expected_durations.insert(shard_key.clone(), *raw_load);
        shards.insert(
            shard_key,
            ShardAssignment {
                tests: ids.clone(),
                test_list_file,
                expected_duration_ms: *raw_load,
            },
        );
    }

    let estimated_tests: BTreeSet<String> = estimates
        .iter()
        .filter(|(_, e)| e.provenance != Provenance::Measured)
        .map(|(id, _)| id.clone())
        .collect();

    Ok(AssignResult {
        shards,
        test_list_files,
        expected_durations,
        total_tests,
        estimated_tests,
        is_optimal: ckk.is_optimal,
    })
}

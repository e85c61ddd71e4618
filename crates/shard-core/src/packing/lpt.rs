//! Greedy Longest-Processing-Time-first packing, with an optional
//! file-affinity penalty. Used standalone as a fallback and as the seed
//! for the CKK search.

use super::effective_cost;
use crate::identity::TestId;
use crate::timing::DurationMs;
use std::collections::HashSet;

/// A test ready to be packed: its id, owning file, and duration estimate.
#[derive(Debug, Clone)]
pub struct PackableTest {
    pub id: TestId,
    pub file: String,
    pub duration: DurationMs,
}

/// The result of a packing pass: per-shard ordered test ids, and the raw
/// (penalty-free) load per shard used for reporting `expectedDurations`.
#[derive(Debug, Clone)]
pub struct PackResult {
    pub assignment: Vec<Vec<TestId>>,
    pub raw_load: Vec<DurationMs>,
}

/// Sort tests by duration descending, ties broken by id ascending. This
/// ordering is shared by LPT packing and the CKK branch order, and is the
/// sole source of determinism across runs with identical inputs.
pub fn sorted_order(tests: &[PackableTest]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..tests.len()).collect();
    order.sort_by(|&a, &b| {
        tests[b]
            .duration
            .cmp(&tests[a].duration)
            .then_with(|| tests[a].id.cmp(&tests[b].id))
    });
    order
}

/// Greedily pack `tests` into `shard_count` shards, minimizing the
/// effective cost (raw load + duration + affinity penalty on a new file)
/// at each step.
pub fn lpt_pack(tests: &[PackableTest], shard_count: usize, penalty: DurationMs) -> PackResult {
    let mut raw_load = vec![0 as DurationMs; shard_count];
    let mut files: Vec<HashSet<&str>> = vec![HashSet::new(); shard_count];
    let mut assignment: Vec<Vec<TestId>> = vec![Vec::new(); shard_count];

    for idx in sorted_order(tests) {
        let test = &tests[idx];
        let mut best_shard = 0;
        let mut best_cost = DurationMs::MAX;
        for shard in 0..shard_count {
            let joins_new_file = !files[shard].contains(test.file.as_str());
            let cost = effective_cost(raw_load[shard], test.duration, joins_new_file, penalty);
            if cost < best_cost {
                best_cost = cost;
                best_shard = shard;
            }
        }
        raw_load[best_shard] += test.duration;
        files[best_shard].insert(test.file.as_str());
        assignment[best_shard].push(test.id.clone());
    }

    PackResult { assignment, raw_load }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(id: &str, file: &str, duration: DurationMs) -> PackableTest {
        PackableTest {
            id: id.to_string(),
            file: file.to_string(),
            duration,
        }
    }

    #[test]
    fn even_split_without_affinity() {
        let tests = vec![
            t("a", "f1", 30_000),
            t("b", "f2", 30_000),
            t("c", "f3", 30_000),
            t("d", "f4", 30_000),
        ];
        let result = lpt_pack(&tests, 2, 0);
        assert_eq!(result.raw_load, vec![60_000, 60_000]);
        assert_eq!(result.assignment[0], vec!["a".to_string(), "c".to_string()]);
        assert_eq!(result.assignment[1], vec!["b".to_string(), "d".to_string()]);
    }

    #[test]
    fn affinity_keeps_a_file_together() {
        let tests = vec![
            t("pA1", "pA", 10_000),
            t("pA2", "pA", 10_000),
            t("pA3", "pA", 10_000),
            t("pA4", "pA", 10_000),
            t("pB1", "pB", 10_000),
            t("pB2", "pB", 10_000),
            t("pB3", "pB", 10_000),
            t("pB4", "pB", 10_000),
        ];
        let result = lpt_pack(&tests, 2, 30_000);
        // every test on a shard belongs to the same source file
        for shard in &result.assignment {
            let files: HashSet<&str> = shard.iter().map(|id| &id[..2]).collect();
            assert_eq!(files.len(), 1, "shard mixes files: {:?}", shard);
        }
    }

    #[test]
    fn affinity_overridden_by_makespan() {
        let tests = vec![
            t("heavy1", "heavy", 120_000),
            t("heavy2", "heavy", 60_000),
            t("light1", "light", 10_000),
            t("light2", "light", 10_000),
        ];
        let result = lpt_pack(&tests, 2, 5_000);
        let makespan = *result.raw_load.iter().max().unwrap();
        assert_eq!(makespan, 120_000);
    }

    #[test]
    fn deterministic_tie_break_by_id() {
        let tests = vec![t("b", "f", 1_000), t("a", "f", 1_000)];
        let r1 = lpt_pack(&tests, 2, 0);
        let r2 = lpt_pack(&tests, 2, 0);
        assert_eq!(r1.assignment, r2.assignment);
        assert_eq!(r1.assignment[0], vec!["a".to_string()]);
        assert_eq!(r1.assignment[1], vec!["b".to_string()]);
    }
}

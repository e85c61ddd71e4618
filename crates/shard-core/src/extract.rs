//! The extractor: walks a post-run report tree, projects to one runner
//! project, and emits a shard-timing file.

use crate::error::{Result, ShardError};
use crate::identity::{self, TestId};
use crate::timing::DurationMs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info_span};

/// Statuses whose results contribute to a test's summed duration.
fn counts_toward_duration(status: &str) -> bool {
    matches!(status, "passed" | "failed" | "timedOut" | "flaky")
}

#[derive(Debug, Deserialize)]
struct ReportDoc {
    config: ReportConfig,
    #[serde(default)]
    suites: Vec<ReportSuite>,
}

#[derive(Debug, Deserialize)]
struct ReportConfig {
    #[serde(rename = "rootDir")]
    root_dir: String,
}

#[derive(Debug, Deserialize)]
struct ReportSuite {
    project: ReportProject,
    #[serde(default)]
    suites: Vec<ReportSuiteNode>,
    #[serde(default)]
    tests: Vec<ReportTest>,
}

#[derive(Debug, Deserialize)]
struct ReportProject {
    name: String,
    #[serde(rename = "testDir")]
    test_dir: String,
}

#[derive(Debug, Deserialize)]
struct ReportSuiteNode {
    #[serde(default)]
    suites: Vec<ReportSuiteNode>,
    #[serde(default)]
    tests: Vec<ReportTest>,
}

#[derive(Debug, Deserialize)]
struct ReportTest {
    file: String,
    #[serde(rename = "titlePath")]
    title_path: Vec<String>,
    #[serde(default)]
    results: Vec<ReportAttempt>,
}

#[derive(Debug, Deserialize)]
struct ReportAttempt {
    duration: DurationMs,
    status: String,
}

/// The extractor's output, written as the shard-timing file and consumed
/// by the merger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardTiming {
    pub shard: u32,
    pub project: String,
    pub tests: BTreeMap<TestId, DurationMs>,
}

impl ShardTiming {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ShardError::malformed("shard timing", format!("serialization failed: {e}")))
    }

    /// Load a previously-extracted shard-timing file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ShardError::input_missing(path));
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| ShardError::malformed("shard timing", format!("failed to read '{}': {e}", path.display())))?;
        serde_json::from_str(&content)
            .map_err(|e| ShardError::malformed("shard timing", format!("invalid JSON: {e}")))
    }
}

fn collect_tests<'a>(suites: &'a [ReportSuiteNode], tests: &'a [ReportTest], out: &mut Vec<&'a ReportTest>) {
    out.extend(tests.iter());
    for suite in suites {
        collect_tests(&suite.suites, &suite.tests, out);
    }
}

/// Extract per-test summed durations for `project` from the report at
/// `path`, stamping the result with `shard`.
pub fn extract(path: &Path, project: &str, shard: u32) -> Result<ShardTiming> {
    let span = info_span!("extract", project, shard);
    let _guard = span.enter();

    if !path.exists() {
        return Err(ShardError::input_missing(path));
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| ShardError::malformed("report json", format!("failed to read '{}': {e}", path.display())))?;
    let doc: ReportDoc = serde_json::from_str(&content)
        .map_err(|e| ShardError::malformed("report json", format!("invalid JSON: {e}")))?;

    let root_dir = std::path::PathBuf::from(&doc.config.root_dir);
    let mut tests = BTreeMap::new();

    for suite in &doc.suites {
        if suite.project.name != project {
            continue;
        }
        let test_dir = std::path::PathBuf::from(&suite.project.test_dir);
        let mut raw_tests = Vec::new();
        collect_tests(&suite.suites, &suite.tests, &mut raw_tests);

        for raw in raw_tests {
            let file_path = std::path::PathBuf::from(&raw.file);
            let rel_file = match identity::relative_to(&file_path, &test_dir) {
                Ok(rel) => rel,
                Err(_) => continue,
            };
            let basename = file_path
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            let stripped = identity::strip_discovery_prefix(&raw.title_path, &suite.project.name, &basename);
            let id = identity::build_id(&rel_file, &stripped);

            let total: DurationMs = raw
                .results
                .iter()
                .filter(|r| counts_toward_duration(&r.status))
                .map(|r| r.duration)
                .sum();

            if raw.results.iter().any(|r| counts_toward_duration(&r.status)) {
                tests.insert(id, total);
            }
        }
    }

    debug!(root_dir = %root_dir.display(), count = tests.len(), "extracted shard timing");
    Ok(ShardTiming {
        shard,
        project: project.to_string(),
        tests,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> String {
        serde_json::json!({
            "config": { "rootDir": "/p" },
            "suites": [
                {
                    "project": { "name": "chromium", "testDir": "/p/e2e" },
                    "suites": [],
                    "tests": [
                        {
                            "file": "/p/e2e/a.spec.ts",
                            "titlePath": ["t1"],
                            "results": [
                                { "duration": 1000, "status": "failed" },
                                { "duration": 1200, "status": "passed" }
                            ]
                        },
                        {
                            "file": "/p/e2e/b.spec.ts",
                            "titlePath": ["t2"],
                            "results": [
                                { "duration": 500, "status": "skipped" }
                            ]
                        }
                    ]
                },
                {
                    "project": { "name": "firefox", "testDir": "/p/e2e" },
                    "suites": [],
                    "tests": [
                        {
                            "file": "/p/e2e/a.spec.ts",
                            "titlePath": ["t1"],
                            "results": [ { "duration": 9999, "status": "passed" } ]
                        }
                    ]
                }
            ]
        })
        .to_string()
    }

    fn write_tmp(content: &str) -> tempfile::TempPath {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        use std::io::Write;
        f.write_all(content.as_bytes()).unwrap();
        f.into_temp_path()
    }

    #[test]
    fn sums_retry_durations_for_counted_statuses() {
        let path = write_tmp(&sample_report());
        let timing = extract(&path, "chromium", 1).unwrap();
        assert_eq!(*timing.tests.get("a.spec.ts::t1").unwrap(), 2200);
    }

    #[test]
    fn skipped_only_test_is_excluded() {
        let path = write_tmp(&sample_report());
        let timing = extract(&path, "chromium", 1).unwrap();
        assert!(!timing.tests.contains_key("b.spec.ts::t2"));
    }

    #[test]
    fn filters_to_requested_project_only() {
        let path = write_tmp(&sample_report());
        let timing = extract(&path, "chromium", 1).unwrap();
        assert_eq!(timing.tests.len(), 1);
        assert_eq!(timing.shard, 1);
        assert_eq!(timing.project, "chromium");
    }

    #[test]
    fn missing_file_is_fatal() {
        let err = extract(Path::new("/no/such/report.json"), "chromium", 1).unwrap_err();
        assert!(matches!(err, ShardError::InputMissing { .. }));
    }

    #[test]
    fn shard_timing_round_trips_through_json() {
        let timing = extract(&write_tmp(&sample_report()), "chromium", 1).unwrap();
        let path = write_tmp(&timing.to_json().unwrap());
        let reloaded = ShardTiming::load(&path).unwrap();
        assert_eq!(reloaded.shard, timing.shard);
        assert_eq!(reloaded.tests, timing.tests);
    }
}

//! Parsing of the external test runner's discovery ("list mode") JSON.
//!
//! Discovery is explicitly out of scope for this system (an external
//! process emits the listing); this module only consumes its output.

use crate::error::{Result, ShardError};
use crate::identity::{self, TestId};
use serde::Deserialize;
use std::path::PathBuf;

/// A single discovered test, immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredTest {
    pub id: TestId,
    /// Relative to the owning project's `testDir`, forward slashes.
    pub file: String,
    /// Ordered suite names ending with the test title, already stripped
    /// of any leading file/project-name artifact.
    pub title_path: Vec<String>,
    /// The owning project's `testDir`, used to build the downstream
    /// filter-line prefix at conversion time.
    pub test_dir: PathBuf,
}

/// The parsed discovery document: a common `rootDir` plus the deduplicated
/// set of tests across every project listed.
///
/// Per the open question in spec.md §9, when two projects (e.g. two
/// browsers) enumerate what is structurally the same test under the same
/// `testDir`, they produce the same `TestId`; we keep only the first
/// occurrence rather than scheduling it twice.
#[derive(Debug, Clone)]
pub struct Discovery {
    pub root_dir: PathBuf,
    pub tests: Vec<DiscoveredTest>,
}

#[derive(Debug, Deserialize)]
struct DiscoveryDoc {
    config: ConfigSection,
    #[serde(default)]
    suites: Vec<ProjectSuite>,
}

#[derive(Debug, Deserialize)]
struct ConfigSection {
    #[serde(rename = "rootDir")]
    root_dir: String,
}

#[derive(Debug, Deserialize)]
struct ProjectSuite {
    project: ProjectInfo,
    #[serde(default)]
    suites: Vec<SuiteNode>,
    #[serde(default)]
    tests: Vec<RawTest>,
}

#[derive(Debug, Deserialize)]
struct ProjectInfo {
    name: String,
    #[serde(rename = "testDir")]
    test_dir: String,
}

#[derive(Debug, Deserialize)]
struct SuiteNode {
    #[serde(default)]
    suites: Vec<SuiteNode>,
    #[serde(default)]
    tests: Vec<RawTest>,
}

#[derive(Debug, Deserialize)]
struct RawTest {
    file: String,
    #[serde(rename = "titlePath")]
    title_path: Vec<String>,
}

fn collect_tests<'a>(suites: &'a [SuiteNode], tests: &'a [RawTest], out: &mut Vec<&'a RawTest>) {
    out.extend(tests.iter());
    for suite in suites {
        collect_tests(&suite.suites, &suite.tests, out);
    }
}

impl Discovery {
    /// Parse a discovery JSON document.
    pub fn parse(content: &str) -> Result<Self> {
        let doc: DiscoveryDoc = serde_json::from_str(content)
            .map_err(|e| ShardError::malformed("discovery json", format!("invalid JSON: {e}")))?;

        let root_dir = PathBuf::from(&doc.config.root_dir);
        let mut seen = std::collections::HashSet::new();
        let mut tests = Vec::new();

        for project_suite in &doc.suites {
            let test_dir = PathBuf::from(&project_suite.project.test_dir);
            let mut raw_tests = Vec::new();
            collect_tests(&project_suite.suites, &project_suite.tests, &mut raw_tests);

            for raw in raw_tests {
                let file_path = PathBuf::from(&raw.file);
                let rel_file = identity::relative_to(&file_path, &test_dir)?;
                let basename = file_path
                    .file_name()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default();

                let stripped = identity::strip_discovery_prefix(
                    &raw.title_path,
                    &project_suite.project.name,
                    &basename,
                );

                let id = identity::build_id(&rel_file, &stripped);
                if seen.insert(id.clone()) {
                    tests.push(DiscoveredTest {
                        id,
                        file: rel_file,
                        title_path: stripped,
                        test_dir: test_dir.clone(),
                    });
                }
            }
        }

        Ok(Self { root_dir, tests })
    }

    /// Load and parse a discovery document from a file path.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Err(ShardError::input_missing(path));
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| ShardError::malformed("discovery json", format!("failed to read '{}': {e}", path.display())))?;
        Self::parse(&content)
    }
}

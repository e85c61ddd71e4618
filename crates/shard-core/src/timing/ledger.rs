//! Ledger load, migrate, and atomic persist.

use crate::error::{Result, ShardError};
use crate::identity::TestId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Milliseconds. Kept as an integer so persisted diffs stay stable; EMA
/// updates round to the nearest millisecond.
pub type DurationMs = u64;

/// Current ledger schema version. Version 1 is transparently migrated on load.
pub const CURRENT_VERSION: u32 = 2;

/// A single test's smoothed duration history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimingEntry {
    /// The file component of the test's id, kept denormalized for fast
    /// per-file aggregation in the oracle.
    pub file: String,
    /// EMA-smoothed duration in milliseconds.
    pub duration: DurationMs,
    /// Number of observations folded into this entry.
    pub runs: u32,
    /// Timestamp of the most recent observation folded in.
    #[serde(rename = "lastRun")]
    pub last_run: DateTime<Utc>,
}

/// The persisted timing ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingLedger {
    pub version: u32,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
    /// `BTreeMap` keeps keys lexically sorted, which is what makes the
    /// persisted JSON diff-stable across runs.
    pub tests: BTreeMap<TestId, TimingEntry>,
}

/// The flat v1 shape: `fileId -> durationMs`.
#[derive(Debug, Deserialize)]
struct LedgerV1 {
    #[allow(dead_code)]
    version: u32,
    tests: BTreeMap<TestId, DurationMs>,
}

impl TimingLedger {
    /// An empty ledger, as returned when no ledger file exists.
    pub fn empty() -> Self {
        Self {
            version: CURRENT_VERSION,
            updated_at: Utc::now(),
            tests: BTreeMap::new(),
        }
    }

    /// Load the ledger at `path`. A missing file is equivalent to an empty
    /// ledger. A present-but-unparseable file is a fatal [`ShardError::Malformed`].
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "timing ledger not found, starting empty");
            return Ok(Self::empty());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            ShardError::malformed("timing ledger", format!("failed to read '{}': {e}", path.display()))
        })?;

        Self::parse(&content)
    }

    /// Parse ledger JSON, migrating v1 to v2 transparently.
    pub fn parse(content: &str) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_str(content)
            .map_err(|e| ShardError::malformed("timing ledger", format!("invalid JSON: {e}")))?;

        let version = raw
            .get("version")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| ShardError::malformed("timing ledger", "missing 'version' field"))?;

        match version {
            1 => {
                let v1: LedgerV1 = serde_json::from_value(raw)
                    .map_err(|e| ShardError::malformed("timing ledger", format!("invalid v1 ledger: {e}")))?;
                warn!(count = v1.tests.len(), "migrating v1 timing ledger to v2");
                let now = Utc::now();
                let tests = v1
                    .tests
                    .into_iter()
                    .map(|(id, duration)| {
                        let file = crate::identity::file_of(&id).to_string();
                        (
                            id,
                            TimingEntry {
                                file,
                                duration,
                                runs: 1,
                                last_run: now,
                            },
                        )
                    })
                    .collect();
                Ok(Self {
                    version: CURRENT_VERSION,
                    updated_at: now,
                    tests,
                })
            }
            2 => serde_json::from_value(raw)
                .map_err(|e| ShardError::malformed("timing ledger", format!("invalid v2 ledger: {e}"))),
            other => Err(ShardError::malformed(
                "timing ledger",
                format!("unsupported ledger version: {other}"),
            )),
        }
    }

    /// Serialize and atomically publish the ledger to `path`: write to a
    /// temp file in the same directory, fsync, then rename.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(|e| ShardError::transient_io(path, e))?;

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ShardError::malformed("timing ledger", format!("serialization failed: {e}")))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| ShardError::transient_io(path, e))?;
        use std::io::Write;
        tmp.write_all(json.as_bytes())
            .map_err(|e| ShardError::transient_io(path, e))?;
        tmp.as_file().sync_all().map_err(|e| ShardError::transient_io(path, e))?;
        tmp.persist(path)
            .map_err(|e| ShardError::transient_io(path, e.error))?;

        debug!(path = %path.display(), tests = self.tests.len(), "timing ledger persisted");
        Ok(())
    }
}

impl Default for TimingLedger {
    fn default() -> Self {
        Self::empty()
    }
}

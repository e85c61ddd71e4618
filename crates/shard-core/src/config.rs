//! Optional TOML config file (`.shard-scheduler.toml`) letting a CI workflow
//! pin defaults once instead of repeating CLI flags per invocation.
//!
//! CLI flags always win over config values; config values win over the
//! hard-coded defaults below.

use crate::error::{Result, ShardError};
use crate::timing::{DEFAULT_ALPHA, DEFAULT_PRUNE_DAYS};
use serde::Deserialize;
use std::path::Path;

/// Default file name looked up in the current directory when no `--config`
/// flag is given.
pub const DEFAULT_CONFIG_PATH: &str = ".shard-scheduler.toml";

fn default_alpha() -> f64 {
    DEFAULT_ALPHA
}

fn default_prune_days() -> i64 {
    DEFAULT_PRUNE_DAYS
}

fn default_file_affinity() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    500
}

/// Config-file-level defaults for the assigner and merger.
#[derive(Debug, Clone, Deserialize)]
pub struct ShardConfig {
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(default = "default_prune_days")]
    pub prune_days: i64,
    #[serde(default = "default_file_affinity")]
    pub file_affinity: bool,
    #[serde(default)]
    pub file_affinity_penalty: Option<u64>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ShardConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            prune_days: default_prune_days(),
            file_affinity: default_file_affinity(),
            file_affinity_penalty: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Parse `ShardConfig` from raw TOML text.
pub fn parse_toml_config(content: &str) -> Result<ShardConfig> {
    toml::from_str(content).map_err(|e| ShardError::malformed("shard config", format!("TOML parse error: {e}")))
}

/// Load `ShardConfig` from `path`. A missing file yields the defaults
/// rather than an error, since the config file is always optional.
pub fn load_config_from_file(path: &Path) -> Result<ShardConfig> {
    if !path.exists() {
        return Ok(ShardConfig::default());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| ShardError::malformed("shard config", format!("failed to read '{}': {e}", path.display())))?;
    parse_toml_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config_from_file(Path::new("/no/such/.shard-scheduler.toml")).unwrap();
        assert_eq!(config.alpha, DEFAULT_ALPHA);
        assert_eq!(config.prune_days, DEFAULT_PRUNE_DAYS);
        assert!(config.file_affinity);
    }

    #[test]
    fn partial_toml_fills_remaining_defaults() {
        let config = parse_toml_config("alpha = 0.5\n").unwrap();
        assert_eq!(config.alpha, 0.5);
        assert_eq!(config.prune_days, DEFAULT_PRUNE_DAYS);
    }

    #[test]
    fn malformed_toml_is_fatal() {
        let err = parse_toml_config("alpha = [").unwrap_err();
        assert!(matches!(err, ShardError::Malformed { .. }));
    }

    #[test]
    fn full_toml_overrides_every_field() {
        let toml = r#"
            alpha = 0.1
            prune_days = 7
            file_affinity = false
            file_affinity_penalty = 12000
            timeout_ms = 2000
        "#;
        let config = parse_toml_config(toml).unwrap();
        assert_eq!(config.alpha, 0.1);
        assert_eq!(config.prune_days, 7);
        assert!(!config.file_affinity);
        assert_eq!(config.file_affinity_penalty, Some(12_000));
        assert_eq!(config.timeout_ms, 2_000);
    }
}

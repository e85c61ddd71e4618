use crate::cli::OutputFormat;
use shard_core::config::{load_config_from_file, ShardConfig, DEFAULT_CONFIG_PATH};
use shard_core::discovery::Discovery;
use shard_core::timing::TimingLedger;
use shard_core::{assign, Result};
use std::path::{Path, PathBuf};

#[allow(clippy::too_many_arguments)]
pub fn run(
    test_list: &Path,
    shards: usize,
    timing_file: Option<&Path>,
    timeout_ms: Option<u64>,
    file_affinity: bool,
    no_file_affinity: bool,
    file_affinity_penalty: Option<u64>,
    format: OutputFormat,
    out_dir: Option<&Path>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_path)?;

    let discovery = Discovery::load(test_list)?;
    let ledger = match timing_file {
        Some(path) => TimingLedger::load(path)?,
        None => TimingLedger::empty(),
    };

    let effective_file_affinity = if no_file_affinity {
        false
    } else if file_affinity {
        true
    } else {
        config.file_affinity
    };

    let options = assign::AssignOptions {
        shard_count: shards,
        timeout_ms: timeout_ms.unwrap_or(config.timeout_ms),
        file_affinity: effective_file_affinity,
        file_affinity_penalty: file_affinity_penalty.or(config.file_affinity_penalty),
    };

    let result = assign::assign(&discovery, &ledger, &options)?;

    if let Some(dir) = out_dir {
        std::fs::create_dir_all(dir).map_err(|e| shard_core::ShardError::transient_io(dir, e))?;
        for (shard_key, file_content) in &result.test_list_files {
            let path: PathBuf = dir.join(format!("shard-{shard_key}.txt"));
            std::fs::write(&path, file_content).map_err(|e| shard_core::ShardError::transient_io(&path, e))?;
        }
    }

    match format {
        OutputFormat::Json => println!("{}", result.to_json()?),
        OutputFormat::Text => print!("{}", result.to_human_summary()),
    }

    Ok(())
}

fn load_config(config_path: Option<&Path>) -> Result<ShardConfig> {
    match config_path {
        Some(path) => load_config_from_file(path),
        None => load_config_from_file(Path::new(DEFAULT_CONFIG_PATH)),
    }
}

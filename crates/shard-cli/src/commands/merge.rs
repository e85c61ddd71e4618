use shard_core::config::{load_config_from_file, DEFAULT_CONFIG_PATH};
use shard_core::extract::ShardTiming;
use shard_core::merger::{self, MergeOptions};
use shard_core::Result;
use std::path::Path;

pub fn run(
    ledger: &Path,
    shard_timing_paths: &[std::path::PathBuf],
    alpha: Option<f64>,
    prune_days: Option<i64>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = match config_path {
        Some(path) => load_config_from_file(path)?,
        None => load_config_from_file(Path::new(DEFAULT_CONFIG_PATH))?,
    };

    // Shard-timing files are folded in deterministic file-name order.
    let mut sorted_paths = shard_timing_paths.to_vec();
    sorted_paths.sort();

    let timings: Vec<ShardTiming> = sorted_paths
        .iter()
        .map(|path| ShardTiming::load(path))
        .collect::<Result<Vec<_>>>()?;

    let options = MergeOptions {
        alpha: alpha.unwrap_or(config.alpha),
        prune_days: prune_days.unwrap_or(config.prune_days),
    };

    let result = merger::merge(ledger, &timings, &options)?;
    println!("ledger now holds {} tests", result.tests.len());
    Ok(())
}

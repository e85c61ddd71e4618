use shard_core::extract;
use shard_core::{Result, ShardError};
use std::path::Path;

pub fn run(report: &Path, project: &str, shard: u32, out: &Path) -> Result<()> {
    let timing = extract::extract(report, project, shard)?;
    let json = timing.to_json()?;

    if let Some(dir) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| ShardError::transient_io(dir, e))?;
    }
    std::fs::write(out, json).map_err(|e| ShardError::transient_io(out, e))?;

    println!("wrote shard timing for project '{project}' shard {shard} to {}", out.display());
    Ok(())
}

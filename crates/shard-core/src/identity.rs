//! Canonical test identifiers and conversion to the downstream filter format.
//!
//! The identity function is the interop backbone between discovery,
//! scheduling, reporting, and re-import (see DESIGN.md). Any change to
//! these rules is a breaking change to the ledger schema.

use crate::error::{Result, ShardError};
use std::path::{Path, PathBuf};

/// Separator used inside a canonical `TestID`. Reserved: a test title may
/// legitimately contain `::`, but an ID is only ever split at the *first*
/// occurrence when recovering the file/title-path split.
pub const ID_SEPARATOR: &str = "::";

/// The separator the downstream test runner's filter accepts between path
/// segments and suite/title segments. `>` is accepted by some runners but
/// we always emit `›` (U+203A).
pub const FILTER_SEPARATOR: &str = " › ";

/// A canonical, stable test identifier: `relFile::seg1::...::segK::title`.
pub type TestId = String;

/// Normalize a path to forward-slash form, regardless of host OS separators.
fn to_forward_slashes(path: &str) -> String {
    path.replace('\\', "/")
}

/// Compute `file` relative to `root`, rejecting paths that escape `root`.
///
/// Both `file` and `root` may be absolute or relative; they are compared
/// component-wise after normalizing separators. The result always uses
/// forward slashes.
pub fn relative_to(file: &Path, root: &Path) -> Result<String> {
    let file_str = to_forward_slashes(&file.to_string_lossy());
    let root_str = to_forward_slashes(&root.to_string_lossy());

    let file_norm = PathBuf::from(&file_str);
    let root_norm = PathBuf::from(&root_str);

    let rel = file_norm.strip_prefix(&root_norm).map_err(|_| {
        ShardError::path_escape(file_str.clone(), root_str.clone())
    })?;

    let rel_str = to_forward_slashes(&rel.to_string_lossy());
    if rel_str.starts_with("..") || rel_str.is_empty() {
        return Err(ShardError::path_escape(file_str, root_str));
    }
    Ok(rel_str)
}

/// Build the canonical internal ID from a relative file path and the
/// ordered suite/title segments.
///
/// `title_path` must already have any leading file-name/project-name
/// artifact stripped (see [`strip_discovery_prefix`]).
pub fn build_id(rel_file: &str, title_path: &[String]) -> TestId {
    let mut id = to_forward_slashes(rel_file);
    for segment in title_path {
        id.push_str(ID_SEPARATOR);
        id.push_str(segment);
    }
    id
}

/// Split a `TestId` at its *first* `::` into `(file, title_tail)`.
///
/// Titles may contain `::`; only the first separator is structural.
pub fn split_id(id: &TestId) -> Option<(&str, &str)> {
    id.split_once(ID_SEPARATOR)
}

/// The file component of a `TestId` (everything before the first `::`).
pub fn file_of(id: &TestId) -> &str {
    split_id(id).map(|(file, _)| file).unwrap_or(id.as_str())
}

/// Convert a `TestId` into the downstream filter-line format, terminated
/// by a trailing newline.
///
/// `root_dir` is the discovery config's `rootDir`; `test_dir` is the
/// project's `testDir`. When they're equal, no prefix is joined.
pub fn to_filter_line(id: &TestId, root_dir: &Path, test_dir: &Path) -> Result<String> {
    let (rel_file, title_tail) = split_id(id)
        .ok_or_else(|| ShardError::malformed("test id", format!("missing '::' in id: {id}")))?;

    let prefix = relative_prefix(root_dir, test_dir)?;

    let path_part = if prefix.is_empty() {
        rel_file.to_string()
    } else {
        format!("{prefix}/{rel_file}")
    };

    let title_part = title_tail.replace(ID_SEPARATOR, FILTER_SEPARATOR);
    Ok(format!("{path_part}{FILTER_SEPARATOR}{title_part}\n"))
}

/// Compute `test_dir` relative to `root_dir`, empty string if they're equal.
fn relative_prefix(root_dir: &Path, test_dir: &Path) -> Result<String> {
    if root_dir == test_dir {
        return Ok(String::new());
    }
    let prefix = relative_to(test_dir, root_dir)?;
    if prefix == "." {
        Ok(String::new())
    } else {
        Ok(prefix)
    }
}

/// Strip a leading `titlePath` element that merely echoes the project name
/// or the file's basename, per spec.md's open question on discovery-tool
/// inconsistency. Returns the cleaned title path.
pub fn strip_discovery_prefix(
    title_path: &[String],
    project_name: &str,
    file_basename: &str,
) -> Vec<String> {
    match title_path.split_first() {
        Some((first, rest)) if first == project_name || first == file_basename => rest.to_vec(),
        _ => title_path.to_vec(),
    }
}

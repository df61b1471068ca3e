//! Asset directory scanning.
//!
//! Finds the files a category declares via glob patterns, both directly in
//! the category directory and in any nested subdirectory. A missing
//! directory is a normal state (projects have divergent layouts) and
//! yields an empty result.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub mod probe;

pub use probe::{probe_file, FileMeta};

/// Scan `root/subpath` for files matching any of the given glob patterns.
///
/// Returns the sorted, deduplicated union of direct and nested matches.
pub fn scan_category(root: &Path, subpath: &str, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let dir = root.join(subpath);

    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = BTreeSet::new();

    for pattern in patterns {
        collect_matches(&dir.join(pattern), &mut files)?;
        collect_matches(&dir.join("**").join(pattern), &mut files)?;
    }

    Ok(files.into_iter().collect())
}

/// Run one glob pattern and collect the files it matches
fn collect_matches(pattern: &Path, files: &mut BTreeSet<PathBuf>) -> Result<()> {
    let pattern_str = pattern.to_string_lossy();

    let paths = glob::glob(&pattern_str)
        .with_context(|| format!("Invalid glob pattern: {}", pattern_str))?;

    for entry in paths {
        // Unreadable entries are skipped; the probe surfaces real failures
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("Skipping unreadable path: {}", e);
                continue;
            }
        };

        if path.is_file() {
            files.insert(path);
        }
    }

    Ok(())
}

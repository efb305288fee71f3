//! Filesystem utilities.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;

/// Join `path` onto `base` unless it is already absolute.
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Files matching an absolute glob pattern, sorted.
pub fn glob_files(pattern: &Path) -> Result<Vec<PathBuf>> {
    let pattern_str = pattern.to_string_lossy();
    let mut results = Vec::new();

    for entry in glob(&pattern_str).with_context(|| format!("invalid glob pattern: {}", pattern_str))? {
        match entry {
            Ok(path) if path.is_file() => results.push(path),
            Ok(_) => {}
            Err(e) => tracing::warn!("glob error: {}", e),
        }
    }

    results.sort();
    Ok(results)
}

//! Locating the compiled binary.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::util::errors::BuildError;

/// Directory cargo writes `triple`/`profile_dir` artifacts to.
pub fn output_dir(work_dir: &Path, triple: &str, profile_dir: &str) -> PathBuf {
    work_dir.join(triple).join(profile_dir)
}

/// Find `base_name + extension` in `work_dir/triple/profile_dir/`.
///
/// Only that directory is searched, not its children (`deps/`,
/// `build/` and `incremental/` hold intermediates with similar names).
/// Names are compared case-insensitively so the result is the same on
/// case-insensitive filesystems.
pub fn locate(
    work_dir: &Path,
    triple: &str,
    profile_dir: &str,
    base_name: &str,
    extension: &str,
) -> Result<PathBuf, BuildError> {
    let dir = output_dir(work_dir, triple, profile_dir);
    let file_name = format!("{}{}", base_name, extension);
    let wanted = file_name.to_lowercase();

    if !dir.is_dir() {
        return Err(BuildError::ArtifactNotFound { dir, file_name });
    }

    let mut matches: Vec<PathBuf> = WalkDir::new(&dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_string_lossy().to_lowercase() == wanted)
        .map(|e| e.into_path())
        .collect();

    match matches.len() {
        0 => Err(BuildError::ArtifactNotFound { dir, file_name }),
        1 => Ok(matches.remove(0)),
        _ => {
            matches.sort();
            Err(BuildError::AmbiguousArtifact {
                dir,
                file_name,
                matches,
            })
        }
    }
}

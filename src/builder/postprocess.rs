//! Release post-processing: compression, then archival.

use std::path::{Path, PathBuf};

use crate::core::platform::TargetPlatform;
use crate::util::errors::BuildError;
use crate::util::process::{Executor, ProcessBuilder};

/// Which post-processing steps to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostProcess {
    /// Compress the binary in place with upx
    pub compress: bool,
    /// Wrap the binary in `<name>.tar.gz`; ignored for Windows targets
    pub archive: bool,
}

impl PostProcess {
    pub fn is_noop(&self) -> bool {
        !self.compress && !self.archive
    }
}

/// Run the requested steps on the release file at `path`.
///
/// Returns the archive path when an archive was made, otherwise `path`.
/// On failure the release file produced so far stays on disk.
pub fn process(
    executor: &dyn Executor,
    path: &Path,
    steps: PostProcess,
    target: &TargetPlatform,
) -> Result<PathBuf, BuildError> {
    if steps.compress {
        let cmd = ProcessBuilder::new("upx").args(["--best", "--lzma"]).arg(path);
        run_step(executor, cmd, "compress", path)?;
    }

    if !steps.archive {
        return Ok(path.to_path_buf());
    }

    if target.is_windows() {
        tracing::debug!("skipping tarball for windows target {}", target);
        return Ok(path.to_path_buf());
    }

    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        return Err(BuildError::PostProcessFailure {
            step: "archive".to_string(),
            path: path.to_path_buf(),
            output: "release path has no parent directory".to_string(),
        });
    };

    let mut archive = path.as_os_str().to_os_string();
    archive.push(".tar.gz");
    let archive = PathBuf::from(archive);

    let cmd = ProcessBuilder::new("tar")
        .arg("-czf")
        .arg(&archive)
        .arg("-C")
        .arg(parent)
        .arg(name);
    run_step(executor, cmd, "archive", path)?;

    Ok(archive)
}

fn run_step(
    executor: &dyn Executor,
    cmd: ProcessBuilder,
    step: &str,
    path: &Path,
) -> Result<(), BuildError> {
    tracing::info!("{}: {}", step, path.display());

    let failure = |output: String| BuildError::PostProcessFailure {
        step: step.to_string(),
        path: path.to_path_buf(),
        output,
    };

    let output = executor
        .exec(&cmd)
        .map_err(|e| failure(format!("{:#}", e)))?;

    if !output.success() {
        return Err(failure(output.combined()));
    }
    Ok(())
}

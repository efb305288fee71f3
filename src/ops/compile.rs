//! Implementation of `shipwright build`.
//!
//! A build walks a fixed sequence of states:
//!
//! ```text
//! Init -> PlatformResolved -> StrategySelected -> ToolsReady -> Compiled
//!      -> ArtifactFound -> Renamed -> PostProcessed -> Done
//! ```
//!
//! Any stage may fail, which ends the build. The output directory is not
//! touched before `Renamed`, and the release file appears there atomically.

use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::builder::artifact;
use crate::builder::context::BuildContext;
use crate::builder::installer::{InstallOptions, ToolInstaller};
use crate::builder::invoker::CargoInvocation;
use crate::builder::postprocess::{self, PostProcess};
use crate::builder::strategy::{self, ToolchainStrategy};
use crate::core::platform::{Os, TargetPlatform};
use crate::core::project::ProjectDescriptor;
use crate::util::errors::BuildError;
use crate::util::hash::sha256_file;
use crate::util::process::Executor;

/// Where a build is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BuildState {
    Init,
    PlatformResolved,
    StrategySelected,
    ToolsReady,
    Compiled,
    ArtifactFound,
    Renamed,
    PostProcessed,
    Done,
    Failed,
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Paths and names the build needs besides the project itself.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Cargo.toml of the runtime crate
    pub manifest_path: PathBuf,
    /// Name of the runtime binary inside that crate
    pub binary_name: String,
    /// Cargo target directory
    pub work_dir: PathBuf,
    /// Where release files are written
    pub output_dir: PathBuf,
}

/// A finished release.
#[derive(Debug, Clone)]
pub struct BuildResult {
    /// Final file: the archive when one was made, else the binary
    pub path: PathBuf,
    pub size: u64,
    pub release_name: String,
    pub elapsed: Duration,
    pub sha256: String,
    pub target: TargetPlatform,
    pub strategy: ToolchainStrategy,
}

/// Drives builds through the pipeline stages.
pub struct Orchestrator<'a> {
    executor: &'a dyn Executor,
    host: TargetPlatform,
    installer: ToolInstaller<'a>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(executor: &'a dyn Executor, host: TargetPlatform, install: InstallOptions) -> Self {
        Orchestrator {
            executor,
            host,
            installer: ToolInstaller::new(executor, install),
        }
    }

    /// Use a preconfigured installer.
    pub fn with_installer(
        executor: &'a dyn Executor,
        host: TargetPlatform,
        installer: ToolInstaller<'a>,
    ) -> Self {
        Orchestrator {
            executor,
            host,
            installer,
        }
    }

    pub fn host(&self) -> &TargetPlatform {
        &self.host
    }

    /// Build the target configured in the project's `[release]` table.
    pub fn compile(
        &self,
        project: &ProjectDescriptor,
        options: &CompileOptions,
    ) -> Result<BuildResult, BuildError> {
        let target = project.release.target_platform(&self.host)?;
        self.compile_target(project, &target, options)
    }

    /// Build one release for `target`.
    pub fn compile_target(
        &self,
        project: &ProjectDescriptor,
        target: &TargetPlatform,
        options: &CompileOptions,
    ) -> Result<BuildResult, BuildError> {
        let mut run = Run::new(target);
        match self.run(&mut run, project, target, options) {
            Ok(result) => {
                run.advance(BuildState::Done);
                Ok(result)
            }
            Err(e) => {
                tracing::debug!("{}: failed during {}", target, run.state);
                run.state = BuildState::Failed;
                Err(e)
            }
        }
    }

    /// Build several targets in parallel.
    ///
    /// Each target gets its own work directory, `work_dir/<platform-id>`.
    /// Targets sharing a platform id would write the same release file, so
    /// only the first of them is built.
    pub fn compile_many(
        &self,
        project: &ProjectDescriptor,
        targets: &[TargetPlatform],
        options: &CompileOptions,
    ) -> Vec<(TargetPlatform, Result<BuildResult, BuildError>)> {
        let mut seen = HashSet::new();
        let targets: Vec<TargetPlatform> = targets
            .iter()
            .filter(|t| {
                let fresh = seen.insert(t.identifier());
                if !fresh {
                    tracing::warn!("skipping {}: another target already builds {}", t, t.identifier());
                }
                fresh
            })
            .copied()
            .collect();

        if targets.len() == 1 {
            let target = targets[0];
            return vec![(target, self.compile_target(project, &target, options))];
        }

        targets
            .par_iter()
            .map(|target| {
                let options = CompileOptions {
                    work_dir: options.work_dir.join(target.identifier()),
                    ..options.clone()
                };
                (*target, self.compile_target(project, target, &options))
            })
            .collect()
    }

    fn run(
        &self,
        run: &mut Run,
        project: &ProjectDescriptor,
        target: &TargetPlatform,
        options: &CompileOptions,
    ) -> Result<BuildResult, BuildError> {
        let started = Instant::now();
        let release = &project.release;

        if release.standalone && !target.is_compatible_with(&self.host) {
            return Err(BuildError::StandaloneCrossBuild {
                target: target.to_string(),
                host: self.host.to_string(),
            });
        }
        let explicit = strategy::requested_strategy(release.zig, release.xwin)?;
        for kind in project.entry.shadowed() {
            tracing::warn!("ignoring `entry.{}`: a higher-precedence entry point is set", kind);
        }
        run.advance(BuildState::PlatformResolved);

        let selection = strategy::select(&self.host, target, explicit)?;
        if selection.upgraded {
            tracing::info!(
                "building {} on {} needs cross-compilation; using {}",
                target,
                self.host,
                selection.strategy
            );
        }
        run.advance(BuildState::StrategySelected);

        let tools = self.installer.ensure(&self.host, target, selection.strategy)?;
        run.advance(BuildState::ToolsReady);

        let release_name = project.release_name(target);
        let context = BuildContext::new(project, target, &release_name, Uuid::new_v4());
        let invocation = CargoInvocation {
            strategy: selection.strategy,
            manifest_path: options.manifest_path.clone(),
            triple: target.triple(),
            profile: release.profile,
            target_dir: options.work_dir.clone(),
            binary_name: Some(options.binary_name.clone()),
            context: &context,
            tools: &tools,
            raise_fd_limit: selection.strategy == ToolchainStrategy::ZigCross
                && self.host.os() == Os::Macos,
        };
        invocation.invoke(self.executor)?;
        run.advance(BuildState::Compiled);

        let built = artifact::locate(
            &options.work_dir,
            target.triple(),
            release.profile.output_dir_name(),
            &options.binary_name,
            target.file_extension(),
        )?;
        run.advance(BuildState::ArtifactFound);

        let release_path = publish(&built, &options.output_dir, &release_name)?;
        run.advance(BuildState::Renamed);

        let steps = PostProcess {
            compress: release.upx,
            archive: release.tarball,
        };
        let path = postprocess::process(self.executor, &release_path, steps, target)?;
        run.advance(BuildState::PostProcessed);

        let size = std::fs::metadata(&path)
            .map_err(|e| BuildError::io(format!("failed to stat {}", path.display()), e))?
            .len();
        let sha256 = sha256_file(&path)
            .map_err(|e| BuildError::io(format!("failed to hash {}", path.display()), e))?;

        Ok(BuildResult {
            path,
            size,
            release_name,
            elapsed: started.elapsed(),
            sha256,
            target: *target,
            strategy: selection.strategy,
        })
    }
}

struct Run {
    target: String,
    state: BuildState,
}

impl Run {
    fn new(target: &TargetPlatform) -> Self {
        Run {
            target: target.to_string(),
            state: BuildState::Init,
        }
    }

    fn advance(&mut self, next: BuildState) {
        debug_assert!(next > self.state);
        tracing::debug!("{}: {} -> {}", self.target, self.state, next);
        self.state = next;
    }
}

/// Move the compiled binary to `output_dir/release_name`.
///
/// The copy goes through a temporary file in the output directory, so the
/// release path either holds the complete binary or nothing new.
fn publish(built: &Path, output_dir: &Path, release_name: &str) -> Result<PathBuf, BuildError> {
    let dest = output_dir.join(release_name);

    std::fs::create_dir_all(output_dir).map_err(|e| {
        BuildError::io(format!("failed to create {}", output_dir.display()), e)
    })?;

    let mut tmp = NamedTempFile::new_in(output_dir)
        .map_err(|e| BuildError::io(format!("failed to create a file in {}", output_dir.display()), e))?;
    let mut src = File::open(built)
        .map_err(|e| BuildError::io(format!("failed to open {}", built.display()), e))?;
    std::io::copy(&mut src, tmp.as_file_mut())
        .map_err(|e| BuildError::io(format!("failed to copy {}", built.display()), e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o755))
            .map_err(|e| BuildError::io("failed to mark release executable", e))?;
    }

    tmp.persist(&dest)
        .map_err(|e| BuildError::io(format!("failed to write {}", dest.display()), e.error))?;

    if let Err(e) = std::fs::remove_file(built) {
        tracing::debug!("could not remove {}: {}", built.display(), e);
    }

    tracing::info!("release written to {}", dest.display());
    Ok(dest)
}

//! Compiler invocation.

use std::path::PathBuf;

use crate::builder::context::BuildContext;
use crate::builder::installer::PreparedTools;
use crate::builder::strategy::ToolchainStrategy;
use crate::core::profile::BuildProfile;
use crate::util::errors::BuildError;
use crate::util::process::{Executor, ProcessBuilder};

/// Shell prelude raising the open-file limit before running `"$@"`.
const RAISE_FD_LIMIT: &str = "ulimit -n 8192 2>/dev/null; exec \"$@\"";

/// One `cargo` build of the runtime manifest for a single target.
#[derive(Debug, Clone)]
pub struct CargoInvocation<'a> {
    pub strategy: ToolchainStrategy,
    pub manifest_path: PathBuf,
    pub triple: &'static str,
    pub profile: BuildProfile,
    /// Always passed explicitly; artifacts are searched for here
    pub target_dir: PathBuf,
    /// Restrict the build to one binary of the runtime crate
    pub binary_name: Option<String>,
    pub context: &'a BuildContext,
    pub tools: &'a PreparedTools,
    /// Run cargo under a shell with a raised open-file limit. zig runs out
    /// of descriptors under the macOS default.
    pub raise_fd_limit: bool,
}

impl CargoInvocation<'_> {
    /// The command line this invocation runs.
    pub fn command(&self) -> ProcessBuilder {
        let cargo = if self.raise_fd_limit {
            ProcessBuilder::new("sh").args(["-c", RAISE_FD_LIMIT, "sh", "cargo"])
        } else {
            ProcessBuilder::new("cargo")
        };

        let mut cmd = cargo
            .args(self.strategy.cargo_subcommand())
            .arg("--manifest-path")
            .arg(&self.manifest_path)
            .args(["--profile", self.profile.cargo_name()])
            .args(["--target", self.triple])
            .arg("--target-dir")
            .arg(&self.target_dir);

        if let Some(bin) = &self.binary_name {
            cmd = cmd.args(["--bin", bin.as_str()]);
        }

        cmd.envs(self.context.vars())
            .envs(self.tools.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .prepend_path(&self.tools.path_prepend)
    }

    /// Run the build and wait for it.
    pub fn invoke(&self, executor: &dyn Executor) -> Result<(), BuildError> {
        let cmd = self.command();
        let command = cmd.display_command();
        tracing::info!("compiling for {} with {}", self.triple, self.strategy);

        let output = executor.exec(&cmd).map_err(|e| BuildError::BuildFailure {
            command: command.clone(),
            code: None,
            output: format!("{:#}", e),
        })?;

        if !output.success() {
            return Err(BuildError::BuildFailure {
                command,
                code: output.code,
                output: output.combined(),
            });
        }

        Ok(())
    }
}

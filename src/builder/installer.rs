//! Host tool installation and validation.
//!
//! This is the only place that talks to `rustup` or to OS package managers.
//! All steps are idempotent. PATH and environment changes are not applied
//! to this process; they are returned in [`PreparedTools`] and handed to
//! the compiler invocation.
//!
//! Installation steps:
//! 1. Optionally pin `stable-<host-triple>` as the default toolchain
//! 2. `rustup target add <triple>` (required)
//! 3. Wrapper tools for the selected strategy (zig, cargo-zigbuild, cargo-xwin)
//! 4. MSVC build tools for native MSVC builds on Windows hosts
//! 5. Best-effort auxiliary packages (MinGW, MSYS2), only with `auto_packages`

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::builder::strategy::ToolchainStrategy;
use crate::core::platform::{Abi, Arch, Os, TargetPlatform};
use crate::util::errors::BuildError;
use crate::util::process::{find_executable_in, Executor, ProcessBuilder};

/// Environment variable telling the runtime build which Windows ABI is used.
pub const MSVC_TOGGLE_VAR: &str = "SHIPWRIGHT_MSVC";

const VC_TOOLS_COMPONENT: &str = "Microsoft.VisualStudio.Component.VC.Tools.x86.x64";

/// Installer settings.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Allow installing missing tools and system packages
    pub auto_packages: bool,
    /// Run `rustup default stable-<host-triple>` before anything else
    pub pin_default_toolchain: bool,
    /// Extra directories searched for tools and prepended to the child PATH
    pub tool_path: Vec<PathBuf>,
}

/// Result of a successful [`ToolInstaller::ensure`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreparedTools {
    /// Variables to set on the compiler process
    pub env: Vec<(String, String)>,
    /// Directories to put in front of the compiler's PATH
    pub path_prepend: Vec<PathBuf>,
    /// Best-effort steps that failed
    pub warnings: Vec<String>,
}

impl PreparedTools {
    fn warn(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }
}

type Locator = Box<dyn Fn(&str, &[PathBuf]) -> Option<PathBuf> + Send + Sync>;

/// Ensures host tools are present for a target and strategy.
pub struct ToolInstaller<'a> {
    executor: &'a dyn Executor,
    options: InstallOptions,
    locate: Locator,
    /// Triples already added by this installer; the lock also serializes
    /// concurrent `rustup target add` calls.
    added_targets: Mutex<HashSet<String>>,
}

impl<'a> ToolInstaller<'a> {
    pub fn new(executor: &'a dyn Executor, options: InstallOptions) -> Self {
        ToolInstaller {
            executor,
            options,
            locate: Box::new(find_executable_in),
            added_targets: Mutex::new(HashSet::new()),
        }
    }

    /// Replace how executables are looked up.
    pub fn with_locator(
        mut self,
        locate: impl Fn(&str, &[PathBuf]) -> Option<PathBuf> + Send + Sync + 'static,
    ) -> Self {
        self.locate = Box::new(locate);
        self
    }

    /// Make sure everything needed to build `target` with `strategy` is
    /// present on `host`.
    pub fn ensure(
        &self,
        host: &TargetPlatform,
        target: &TargetPlatform,
        strategy: ToolchainStrategy,
    ) -> Result<PreparedTools, BuildError> {
        let mut prepared = PreparedTools {
            path_prepend: self.options.tool_path.clone(),
            ..Default::default()
        };

        if self.options.pin_default_toolchain {
            let channel = format!("stable-{}", host.triple());
            self.run_required(
                ProcessBuilder::new("rustup").args(["default", channel.as_str()]),
                format!("rustup default {}", channel),
            )?;
        }

        self.add_target(target.triple())?;

        match strategy {
            ToolchainStrategy::ZigCross => {
                self.require_tool(
                    "zig",
                    "Install zig with `pip install ziglang` or from https://ziglang.org/download, then make sure it is on PATH",
                    None,
                )?;
                self.require_tool(
                    "cargo-zigbuild",
                    "Install the wrapper with `cargo install --locked cargo-zigbuild`",
                    Some("cargo-zigbuild"),
                )?;
            }
            ToolchainStrategy::Xwin => {
                self.require_tool(
                    "cargo-xwin",
                    "Install the wrapper with `cargo install --locked cargo-xwin`",
                    Some("cargo-xwin"),
                )?;
            }
            ToolchainStrategy::Native => {
                if host.os() == Os::Windows && target.abi() == Some(Abi::Msvc) {
                    self.ensure_msvc()?;
                }
            }
        }

        if target.is_windows() {
            let msvc = target.abi() == Some(Abi::Msvc);
            prepared.env.push((
                MSVC_TOGGLE_VAR.to_string(),
                if msvc { "1" } else { "0" }.to_string(),
            ));
        }

        if strategy == ToolchainStrategy::Native {
            self.auxiliary_packages(host, target, &mut prepared);
        }

        Ok(prepared)
    }

    /// `rustup target add`, at most once per triple.
    fn add_target(&self, triple: &str) -> Result<(), BuildError> {
        let mut added = self
            .added_targets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if added.contains(triple) {
            tracing::debug!("target {} already added", triple);
            return Ok(());
        }

        self.run_required(
            ProcessBuilder::new("rustup").args(["target", "add", triple]),
            format!("rustup target add {}", triple),
        )?;
        added.insert(triple.to_string());
        Ok(())
    }

    fn run_required(&self, cmd: ProcessBuilder, remediation: String) -> Result<(), BuildError> {
        let step = cmd.display_command();
        let output = self
            .executor
            .exec(&cmd)
            .map_err(|e| BuildError::ToolInstallFailure {
                step: step.clone(),
                output: format!("{:#}", e),
                remediation: Some(
                    "Install rustup from https://rustup.rs and make sure it is on PATH".to_string(),
                ),
            })?;

        if !output.success() {
            return Err(BuildError::ToolInstallFailure {
                step,
                output: output.combined(),
                remediation: Some(format!("Run `{}` manually and retry", remediation)),
            });
        }
        Ok(())
    }

    /// Check that `tool` resolves; install it through cargo when allowed.
    fn require_tool(
        &self,
        tool: &str,
        remediation: &str,
        cargo_crate: Option<&str>,
    ) -> Result<(), BuildError> {
        if let Some(path) = (self.locate)(tool, &self.options.tool_path) {
            tracing::debug!("found {} at {}", tool, path.display());
            return Ok(());
        }

        let missing = || BuildError::MissingCrossTool {
            tool: tool.to_string(),
            remediation: remediation.to_string(),
        };

        let Some(krate) = cargo_crate.filter(|_| self.options.auto_packages) else {
            return Err(missing());
        };

        tracing::info!("installing {} with cargo", krate);
        let cmd = ProcessBuilder::new("cargo").args(["install", "--locked", krate]);
        let step = cmd.display_command();
        let output = self
            .executor
            .exec(&cmd)
            .map_err(|_| missing())?;

        if !output.success() {
            return Err(BuildError::ToolInstallFailure {
                step,
                output: output.combined(),
                remediation: Some(remediation.to_string()),
            });
        }
        Ok(())
    }

    /// Native MSVC builds need the Visual C++ build tools.
    fn ensure_msvc(&self) -> Result<(), BuildError> {
        let on_path = ["cl", "link"]
            .iter()
            .all(|tool| (self.locate)(tool, &self.options.tool_path).is_some());
        if on_path || self.msvc_installed() {
            return Ok(());
        }

        let remediation = format!(
            "Install the Visual Studio Build Tools with the `{}` component (https://visualstudio.microsoft.com/downloads/)",
            VC_TOOLS_COMPONENT
        );

        if !self.options.auto_packages {
            return Err(BuildError::ToolInstallFailure {
                step: "locate MSVC build tools".to_string(),
                output: "no Visual Studio installation with the C++ toolset was found".to_string(),
                remediation: Some(remediation),
            });
        }

        tracing::warn!("MSVC build tools not found; installing them with winget, this can take a while");
        let overrides = format!(
            "--add {} --add Microsoft.VisualStudio.Component.Windows11SDK.22621 --wait --passive",
            VC_TOOLS_COMPONENT
        );
        let cmd = ProcessBuilder::new("winget").args([
            "install",
            "-e",
            "--id",
            "Microsoft.VisualStudio.2022.BuildTools",
            "--override",
            overrides.as_str(),
        ]);
        let step = cmd.display_command();

        match self.executor.exec(&cmd) {
            Ok(output) if output.success() => Ok(()),
            Ok(output) => Err(BuildError::ToolInstallFailure {
                step,
                output: output.combined(),
                remediation: Some(remediation),
            }),
            Err(e) => Err(BuildError::ToolInstallFailure {
                step,
                output: format!("{:#}", e),
                remediation: Some(remediation),
            }),
        }
    }

    /// Ask vswhere for an installation carrying the C++ toolset.
    fn msvc_installed(&self) -> bool {
        let program_files = std::env::var("ProgramFiles(x86)")
            .unwrap_or_else(|_| "C:\\Program Files (x86)".to_string());
        let vswhere = PathBuf::from(program_files)
            .join("Microsoft Visual Studio")
            .join("Installer")
            .join("vswhere.exe");

        let cmd = ProcessBuilder::new(&vswhere).args([
            "-latest",
            "-products",
            "*",
            "-requires",
            VC_TOOLS_COMPONENT,
            "-property",
            "installationPath",
            "-format",
            "value",
        ]);

        match self.executor.exec(&cmd) {
            Ok(output) if output.success() => !output.stdout.trim().is_empty(),
            Ok(_) => false,
            Err(e) => {
                tracing::debug!("failed to run vswhere: {}", e);
                false
            }
        }
    }

    /// MinGW toolchains for GNU Windows targets. Failures only warn: cargo
    /// reports a definitive error later if the linker is really missing.
    fn auxiliary_packages(
        &self,
        host: &TargetPlatform,
        target: &TargetPlatform,
        prepared: &mut PreparedTools,
    ) {
        if !(target.is_windows() && target.abi() == Some(Abi::Gnu)) {
            return;
        }

        match host.os() {
            Os::Linux if self.options.auto_packages => {
                let cmd = if (self.locate)("apt-get", &[]).is_some() {
                    ProcessBuilder::new("sudo").args(["apt-get", "install", "-y", "mingw-w64"])
                } else if (self.locate)("pacman", &[]).is_some() {
                    ProcessBuilder::new("sudo").args([
                        "pacman",
                        "-S",
                        "--needed",
                        "--noconfirm",
                        "mingw-w64-toolchain",
                    ])
                } else {
                    prepared.warn(
                        "no supported package manager found to install MinGW; install mingw-w64 manually"
                            .to_string(),
                    );
                    return;
                };
                self.best_effort(cmd, prepared);
            }
            Os::Windows if target.arch() == Arch::Amd64 => {
                let msys2 = std::env::var_os("MSYS2_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("C:\\msys64"));

                if self.options.auto_packages {
                    if !msys2.exists() {
                        self.best_effort(
                            ProcessBuilder::new("winget").args(["install", "-e", "--id", "MSYS2.MSYS2"]),
                            prepared,
                        );
                    }
                    self.best_effort(
                        ProcessBuilder::new(msys2.join("usr").join("bin").join("bash.exe")).args([
                            "-lc",
                            "pacman -S mingw-w64-ucrt-x86_64-gcc --noconfirm --needed",
                        ]),
                        prepared,
                    );
                }

                let ucrt = msys2.join("ucrt64").join("bin");
                if ucrt.exists() {
                    prepared.path_prepend.push(ucrt);
                }
            }
            _ => {}
        }
    }

    fn best_effort(&self, cmd: ProcessBuilder, prepared: &mut PreparedTools) {
        let shown = cmd.display_command();
        match self.executor.exec(&cmd) {
            Ok(output) if output.success() => {
                tracing::info!("installed auxiliary packages: `{}`", shown);
            }
            Ok(output) => prepared.warn(format!(
                "`{}` failed with exit code {:?}; continuing",
                shown, output.code
            )),
            Err(e) => prepared.warn(format!("could not run `{}`: {}; continuing", shown, e)),
        }
    }
}

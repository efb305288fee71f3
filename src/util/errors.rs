//! Error taxonomy for the build pipeline.
//!
//! Every variant is fatal for the build it belongs to. Best-effort steps
//! (auxiliary package installs) never surface here; they are logged as
//! warnings instead.

use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::Diagnostic;

/// Error raised by a pipeline stage.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum BuildError {
    #[error("unsupported platform: {os}/{arch}{}", abi.as_deref().map(|a| format!(" ({})", a)).unwrap_or_default())]
    #[diagnostic(
        code(shipwright::platform::unsupported),
        help("run `shipwright targets` to list supported platforms")
    )]
    UnsupportedPlatform {
        os: String,
        arch: String,
        abi: Option<String>,
    },

    #[error("conflicting toolchain strategies: {reason}")]
    #[diagnostic(code(shipwright::strategy::conflict))]
    ConflictingStrategy { reason: String },

    #[error("standalone builds must run on the target platform (target {target}, host {host})")]
    #[diagnostic(
        code(shipwright::standalone::cross),
        help("build standalone releases on a {target} host, or drop `standalone`")
    )]
    StandaloneCrossBuild { target: String, host: String },

    #[error("missing cross-compilation tool `{tool}`")]
    #[diagnostic(code(shipwright::tools::missing), help("{remediation}"))]
    MissingCrossTool { tool: String, remediation: String },

    #[error("failed to prepare toolchain: {step}")]
    #[diagnostic(code(shipwright::tools::install))]
    ToolInstallFailure {
        step: String,
        output: String,
        remediation: Option<String>,
    },

    #[error("compilation failed: `{command}` exited with {}", exit_code_display(*code))]
    #[diagnostic(code(shipwright::build::failed))]
    BuildFailure {
        command: String,
        code: Option<i32>,
        output: String,
    },

    #[error("compiled binary `{file_name}` not found in {}", dir.display())]
    #[diagnostic(code(shipwright::artifact::not_found))]
    ArtifactNotFound { dir: PathBuf, file_name: String },

    #[error("{} files match `{file_name}` in {}", matches.len(), dir.display())]
    #[diagnostic(code(shipwright::artifact::ambiguous))]
    AmbiguousArtifact {
        dir: PathBuf,
        file_name: String,
        matches: Vec<PathBuf>,
    },

    #[error("post-processing step `{step}` failed for {}", path.display())]
    #[diagnostic(code(shipwright::postprocess::failed))]
    PostProcessFailure {
        step: String,
        path: PathBuf,
        output: String,
    },

    #[error("{context}")]
    #[diagnostic(code(shipwright::io))]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

fn exit_code_display(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

impl BuildError {
    /// Wrap an I/O error with a description of what was being done.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        BuildError::Io {
            context: context.into(),
            source,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string());

        match self {
            BuildError::UnsupportedPlatform { .. } => diag
                .with_context("no compiler triple is known for this combination")
                .with_suggestion("Run `shipwright targets` to list supported platforms"),

            BuildError::ConflictingStrategy { .. } => diag
                .with_context("only one cross-compilation wrapper can be active per build")
                .with_suggestion("Enable at most one of `zig` and `xwin`"),

            BuildError::StandaloneCrossBuild { target, .. } => diag
                .with_context("standalone releases bundle host-specific runtime files")
                .with_suggestion(format!("Run the build on a {} machine", target))
                .with_suggestion("Disable `release.standalone`"),

            BuildError::MissingCrossTool { remediation, .. } => {
                diag.with_suggestion(remediation.clone())
            }

            BuildError::ToolInstallFailure {
                output,
                remediation,
                ..
            } => {
                let mut diag = with_output(diag, output);
                if let Some(remediation) = remediation {
                    diag = diag.with_suggestion(remediation.clone());
                }
                diag
            }

            BuildError::BuildFailure { output, .. } => with_output(diag, output)
                .with_suggestion("Fix the compiler errors above and run the build again"),

            BuildError::ArtifactNotFound { .. } => diag
                .with_context("the compiler reported success but produced no binary at the expected path")
                .with_suggestion("Check that `binary_name` matches the runtime manifest's [[bin]] name"),

            BuildError::AmbiguousArtifact { matches, .. } => {
                let mut diag = diag;
                for path in matches {
                    diag = diag.with_context(format!("candidate: {}", path.display()));
                }
                diag.with_suggestion("Remove the stale binaries from the work directory")
            }

            BuildError::PostProcessFailure { path, output, .. } => with_output(diag, output)
                .with_context(format!("the release file is kept at {}", path.display())),

            BuildError::Io { source, .. } => diag.with_context(source.to_string()),
        }
    }
}

fn with_output(mut diag: Diagnostic, output: &str) -> Diagnostic {
    for line in output.lines().filter(|l| !l.trim().is_empty()) {
        diag = diag.with_context(line.to_string());
    }
    diag
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_failure_carries_output() {
        let err = BuildError::BuildFailure {
            command: "cargo build".to_string(),
            code: Some(101),
            output: "error[E0425]: cannot find value `x`\n\nerror: aborting".to_string(),
        };

        assert!(err.to_string().contains("exit code 101"));
        let text = err.to_diagnostic().format(false);
        assert!(text.contains("E0425"));
        assert!(text.contains("error: aborting"));
    }

    #[test]
    fn test_missing_tool_names_remediation() {
        let err = BuildError::MissingCrossTool {
            tool: "zig".to_string(),
            remediation: "pip install ziglang".to_string(),
        };

        let text = err.to_diagnostic().format(false);
        assert!(text.contains("missing cross-compilation tool `zig`"));
        assert!(text.contains("pip install ziglang"));
    }

    #[test]
    fn test_signal_termination_display() {
        let err = BuildError::BuildFailure {
            command: "cargo build".to_string(),
            code: None,
            output: String::new(),
        };
        assert!(err.to_string().contains("terminated by signal"));
    }
}

//! Environment and toolchain health checks.
//!
//! `shipwright doctor` reports which of the tools the build pipeline may
//! call are available, so a missing wrapper shows up before a build fails.
//!
//! ## Checks Performed
//!
//! - Rust toolchain (`cargo`, `rustup`) and installed target triples
//! - Cross-compilation wrappers (`zig`, `cargo-zigbuild`, `cargo-xwin`)
//! - Post-processing tools (`upx`, `tar`)

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::core::platform::{host_platform, supported_platforms};
use crate::util::process::{find_executable_in, Executor, ProcessBuilder};

/// Result of a single health check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    /// Human-readable status message
    pub message: String,
    pub path: Option<PathBuf>,
    pub version: Option<String>,
    pub duration: Duration,
    /// Whether this check is required or optional
    pub required: bool,
}

impl CheckResult {
    /// Create a passing check result.
    pub fn pass(name: impl Into<String>, message: impl Into<String>) -> Self {
        CheckResult {
            name: name.into(),
            passed: true,
            message: message.into(),
            path: None,
            version: None,
            duration: Duration::ZERO,
            required: true,
        }
    }

    /// Create a failing check result.
    pub fn fail(name: impl Into<String>, message: impl Into<String>) -> Self {
        CheckResult {
            passed: false,
            ..CheckResult::pass(name, message)
        }
    }

    /// Mark this check as optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.path = Some(path);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

/// Summary of all health checks.
#[derive(Debug, Clone, Default)]
pub struct DoctorReport {
    pub checks: Vec<CheckResult>,
    pub total_duration: Duration,
    /// Environment information
    pub environment: BTreeMap<String, String>,
}

impl DoctorReport {
    pub fn new() -> Self {
        DoctorReport::default()
    }

    pub fn add(&mut self, check: CheckResult) {
        self.checks.push(check);
    }

    /// Check if all required checks passed.
    pub fn all_required_passed(&self) -> bool {
        self.checks.iter().filter(|c| c.required).all(|c| c.passed)
    }

    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    pub fn failed_count(&self) -> usize {
        self.checks.iter().filter(|c| !c.passed).count()
    }

    pub fn required_failed_count(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| c.required && !c.passed)
            .count()
    }
}

/// A tool the pipeline may run.
struct ToolCheck {
    name: &'static str,
    program: &'static str,
    version_args: &'static [&'static str],
    required: bool,
    /// Shown when the tool is missing
    hint: &'static str,
}

const TOOLS: &[ToolCheck] = &[
    ToolCheck {
        name: "cargo",
        program: "cargo",
        version_args: &["--version"],
        required: true,
        hint: "install Rust from https://rustup.rs",
    },
    ToolCheck {
        name: "rustup",
        program: "rustup",
        version_args: &["--version"],
        required: true,
        hint: "install rustup from https://rustup.rs",
    },
    ToolCheck {
        name: "zig",
        program: "zig",
        version_args: &["version"],
        required: false,
        hint: "needed for cross builds: `pip install ziglang`",
    },
    ToolCheck {
        name: "cargo-zigbuild",
        program: "cargo-zigbuild",
        version_args: &["--version"],
        required: false,
        hint: "needed for cross builds: `cargo install --locked cargo-zigbuild`",
    },
    ToolCheck {
        name: "cargo-xwin",
        program: "cargo-xwin",
        version_args: &["--version"],
        required: false,
        hint: "needed for windows msvc targets on other hosts: `cargo install --locked cargo-xwin`",
    },
    ToolCheck {
        name: "upx",
        program: "upx",
        version_args: &["--version"],
        required: false,
        hint: "needed for `upx = true`: https://upx.github.io",
    },
    ToolCheck {
        name: "tar",
        program: "tar",
        version_args: &["--version"],
        required: false,
        hint: "needed for `tarball = true`",
    },
];

/// Run every check.
pub fn doctor(executor: &dyn Executor, tool_path: &[PathBuf]) -> DoctorReport {
    doctor_with(executor, &|name| find_executable_in(name, tool_path))
}

fn doctor_with(executor: &dyn Executor, locate: &dyn Fn(&str) -> Option<PathBuf>) -> DoctorReport {
    let start = Instant::now();
    let mut report = DoctorReport::new();

    let host = host_platform()
        .map(|p| format!("{} ({})", p, p.triple()))
        .unwrap_or_else(|e| e.to_string());
    report.environment.insert("host".to_string(), host);

    for tool in TOOLS {
        report.add(check_tool(executor, locate, tool));
    }

    if locate("rustup").is_some() {
        report.add(check_installed_targets(executor));
    }

    report.total_duration = start.elapsed();
    report
}

fn check_tool(
    executor: &dyn Executor,
    locate: &dyn Fn(&str) -> Option<PathBuf>,
    tool: &ToolCheck,
) -> CheckResult {
    let start = Instant::now();

    let result = match locate(tool.program) {
        Some(path) => {
            let version = executor
                .exec(&ProcessBuilder::new(&path).args(tool.version_args))
                .ok()
                .filter(|o| o.success())
                .and_then(|o| o.stdout.lines().next().map(|l| l.trim().to_string()))
                .unwrap_or_else(|| "unknown version".to_string());

            CheckResult::pass(tool.name, format!("{} is available", tool.name))
                .with_path(path)
                .with_version(version)
        }
        None => CheckResult::fail(tool.name, format!("{} not found ({})", tool.name, tool.hint)),
    };

    let result = result.with_duration(start.elapsed());
    if tool.required {
        result
    } else {
        result.optional()
    }
}

/// Which of the supported triples rustup already has.
fn check_installed_targets(executor: &dyn Executor) -> CheckResult {
    let start = Instant::now();
    let cmd = ProcessBuilder::new("rustup").args(["target", "list", "--installed"]);

    let result = match executor.exec(&cmd) {
        Ok(output) if output.success() => {
            let installed: Vec<&str> = output.stdout.lines().map(str::trim).collect();
            let supported: Vec<String> = supported_platforms()
                .iter()
                .filter(|p| installed.contains(&p.triple()))
                .map(|p| p.triple().to_string())
                .collect();

            if supported.is_empty() {
                CheckResult::fail("targets", "no supported target triples are installed")
            } else {
                CheckResult::pass("targets", supported.join(", "))
            }
        }
        Ok(output) => CheckResult::fail("targets", output.combined().trim().to_string()),
        Err(e) => CheckResult::fail("targets", format!("{:#}", e)),
    };

    result.with_duration(start.elapsed()).optional()
}

/// Format the doctor report for display.
pub fn format_report(report: &DoctorReport, verbose: bool) -> String {
    let mut lines = vec!["Shipwright Doctor".to_string(), "=================".to_string(), String::new()];

    if verbose {
        lines.push("Environment:".to_string());
        for (key, value) in &report.environment {
            lines.push(format!("  {}: {}", key, value));
        }
        lines.push(String::new());
    }

    lines.push("Checks:".to_string());
    for check in &report.checks {
        let status = if check.passed { "[OK]" } else { "[!!]" };
        let required = if check.required { "" } else { " (optional)" };
        lines.push(format!("  {} {}{}", status, check.name, required));

        if verbose || !check.passed {
            lines.push(format!("      {}", check.message));
        }
        if verbose {
            if let Some(path) = &check.path {
                lines.push(format!("      Path: {}", path.display()));
            }
            if let Some(version) = &check.version {
                lines.push(format!("      Version: {}", version));
            }
        }
    }
    lines.push(String::new());

    let failed = report.failed_count();
    let required_failed = report.required_failed_count();
    lines.push(format!(
        "Summary: {} passed, {} failed",
        report.passed_count(),
        failed
    ));

    if required_failed > 0 {
        lines.push(format!(
            "\nWarning: {} required check(s) failed. Builds will not work.",
            required_failed
        ));
    } else if failed > 0 {
        lines.push(format!(
            "\nAll required checks passed. {} optional check(s) failed.",
            failed
        ));
    } else {
        lines.push("\nAll checks passed.".to_string());
    }

    lines.join("\n") + "\n"
}

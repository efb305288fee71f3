//! Subprocess execution utilities.
//!
//! Every external tool the pipeline runs goes through an [`Executor`], so
//! stages can be exercised against a recording mock in tests.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Set several environment variables.
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            self = self.env(key, value);
        }
        self
    }

    /// Put directories in front of the child's `PATH`.
    ///
    /// The parent process environment is left untouched.
    pub fn prepend_path(self, dirs: &[PathBuf]) -> Self {
        if dirs.is_empty() {
            return self;
        }

        let current = self
            .env
            .get("PATH")
            .map(std::ffi::OsString::from)
            .or_else(|| std::env::var_os("PATH"))
            .unwrap_or_default();

        let mut paths: Vec<PathBuf> = dirs.to_vec();
        paths.extend(std::env::split_paths(&current));

        match std::env::join_paths(paths) {
            Ok(joined) => {
                let joined = joined.to_string_lossy().into_owned();
                self.env("PATH", joined)
            }
            Err(e) => {
                tracing::warn!("could not extend PATH: {}", e);
                self
            }
        }
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Get an environment variable set on this builder.
    pub fn get_env(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(|s| s.as_str())
    }

    /// Build the Command.
    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Execute the command and wait for completion, capturing output.
    pub fn exec(&self) -> Result<ProcessOutput> {
        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let output = cmd
            .output()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))?;

        Ok(ProcessOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code; `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Stdout followed by stderr, for diagnostics.
    pub fn combined(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (true, _) => self.stderr.clone(),
            (false, true) => self.stdout.clone(),
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr),
        }
    }
}

/// Runs external commands.
pub trait Executor: Send + Sync {
    /// Run the command to completion. An `Err` means the process could not
    /// be started at all; a non-zero exit is reported through the output.
    fn exec(&self, cmd: &ProcessBuilder) -> Result<ProcessOutput>;
}

/// Executor that spawns real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn exec(&self, cmd: &ProcessBuilder) -> Result<ProcessOutput> {
        tracing::debug!("running `{}`", cmd.display_command());
        cmd.exec()
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Find an executable in PATH or in any of the extra directories.
pub fn find_executable_in(name: &str, extra_dirs: &[PathBuf]) -> Option<PathBuf> {
    if extra_dirs.is_empty() {
        return find_executable(name);
    }

    let mut paths: Vec<PathBuf> = extra_dirs.to_vec();
    if let Some(path) = std::env::var_os("PATH") {
        paths.extend(std::env::split_paths(&path));
    }
    let joined = std::env::join_paths(paths).ok()?;
    let cwd = std::env::current_dir().ok()?;

    which::which_in(name, Some(joined), cwd).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_process_builder() {
        let output = ProcessBuilder::new("echo").arg("hello").exec().unwrap();

        assert!(output.success());
        assert!(output.stdout.contains("hello"));
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_output_not_error() {
        let output = ProcessBuilder::new("sh")
            .args(["-c", "echo oops >&2; exit 3"])
            .exec()
            .unwrap();

        assert!(!output.success());
        assert_eq!(output.code, Some(3));
        assert!(output.combined().contains("oops"));
    }

    #[test]
    fn test_display_command() {
        let pb = ProcessBuilder::new("cargo").args(["build", "--target", "x86_64-unknown-linux-gnu"]);

        assert_eq!(
            pb.display_command(),
            "cargo build --target x86_64-unknown-linux-gnu"
        );
    }

    #[test]
    fn test_prepend_path() {
        let dir = PathBuf::from("/opt/toolchain/bin");
        let pb = ProcessBuilder::new("cargo").prepend_path(&[dir.clone()]);

        let path = pb.get_env("PATH").unwrap();
        let first = std::env::split_paths(path).next().unwrap();
        assert_eq!(first, dir);
    }

    #[test]
    fn test_combined_output() {
        let out = ProcessOutput {
            code: Some(1),
            stdout: "compiling\n".to_string(),
            stderr: "error: boom\n".to_string(),
        };
        assert_eq!(out.combined(), "compiling\nerror: boom\n");
    }
}

//! Test utilities and mocks for shipwright unit tests.
//!
//! The pipeline runs every external tool through
//! [`Executor`](crate::util::process::Executor); [`MockExecutor`] stands in
//! for it, answering commands from a list of expectations and recording each
//! command line it sees.
//!
//! # Example
//!
//! ```rust,ignore
//! use shipwright::test_support::{MockExecutor, MockProcessOutput};
//!
//! #[test]
//! fn test_example() {
//!     let exec = MockExecutor::new();
//!     exec.expect_prefix("rustup target add", MockProcessOutput::success(""));
//!
//!     // Hand `&exec` to the code under test, then inspect `exec.calls()`.
//! }
//! ```

pub mod fixtures;

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{bail, Result};

use crate::util::process::{Executor, ProcessBuilder, ProcessOutput};

pub use fixtures::*;

/// Mock process output for testing command execution.
#[derive(Debug, Clone)]
pub struct MockProcessOutput {
    /// Exit status code (0 = success).
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl MockProcessOutput {
    /// Create a successful output with the given stdout.
    pub fn success(stdout: impl Into<String>) -> Self {
        MockProcessOutput {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Create a failure output with the given stderr and status code.
    pub fn failure(status: i32, stderr: impl Into<String>) -> Self {
        MockProcessOutput {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    fn to_output(&self) -> ProcessOutput {
        ProcessOutput {
            code: Some(self.status),
            stdout: self.stdout.clone(),
            stderr: self.stderr.clone(),
        }
    }
}

impl Default for MockProcessOutput {
    fn default() -> Self {
        MockProcessOutput::success("")
    }
}

/// Pattern for matching commands in MockExecutor.
#[derive(Debug, Clone)]
pub enum CommandPattern {
    /// Exact match on full command string.
    Exact(String),
    /// Match if command starts with prefix.
    StartsWith(String),
    /// Match if command contains substring.
    Contains(String),
    /// Match using a regex pattern.
    Regex(String),
    /// Match any command.
    Any,
}

impl CommandPattern {
    /// Check if this pattern matches the given command.
    pub fn matches(&self, cmd: &str) -> bool {
        match self {
            CommandPattern::Exact(s) => cmd == s,
            CommandPattern::StartsWith(s) => cmd.starts_with(s),
            CommandPattern::Contains(s) => cmd.contains(s),
            CommandPattern::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(cmd))
                .unwrap_or(false),
            CommandPattern::Any => true,
        }
    }
}

/// Side effect run when an expectation matches, e.g. writing the binary a
/// real `cargo build` would have produced.
pub type SideEffect = Arc<dyn Fn(&ProcessBuilder) + Send + Sync>;

/// Expectation for a command execution.
#[derive(Clone)]
pub struct CommandExpectation {
    pub pattern: CommandPattern,
    pub output: MockProcessOutput,
    /// Number of times this expectation can be used (None = unlimited).
    pub times: Option<usize>,
    pub used: usize,
    pub effect: Option<SideEffect>,
}

impl CommandExpectation {
    pub fn new(pattern: CommandPattern, output: MockProcessOutput) -> Self {
        CommandExpectation {
            pattern,
            output,
            times: None,
            used: 0,
            effect: None,
        }
    }

    /// Set the number of times this expectation can be used.
    pub fn times(mut self, n: usize) -> Self {
        self.times = Some(n);
        self
    }

    /// Run `effect` every time the expectation matches.
    pub fn with_effect(mut self, effect: impl Fn(&ProcessBuilder) + Send + Sync + 'static) -> Self {
        self.effect = Some(Arc::new(effect));
        self
    }

    pub fn available(&self) -> bool {
        match self.times {
            Some(n) => self.used < n,
            None => true,
        }
    }
}

#[derive(Default)]
struct MockState {
    expectations: Vec<CommandExpectation>,
    calls: Vec<String>,
    default_output: Option<MockProcessOutput>,
}

/// Mock process executor.
///
/// Commands without a matching expectation fail to "spawn", which the
/// pipeline reports the same way as a missing program.
#[derive(Default)]
pub struct MockExecutor {
    state: Mutex<MockState>,
}

impl MockExecutor {
    pub fn new() -> Self {
        MockExecutor::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add an expectation for an exact command match.
    pub fn expect(&self, cmd: &str, output: MockProcessOutput) -> &Self {
        self.expect_pattern(CommandExpectation::new(
            CommandPattern::Exact(cmd.to_string()),
            output,
        ))
    }

    /// Add an expectation for a command starting with a prefix.
    pub fn expect_prefix(&self, prefix: &str, output: MockProcessOutput) -> &Self {
        self.expect_pattern(CommandExpectation::new(
            CommandPattern::StartsWith(prefix.to_string()),
            output,
        ))
    }

    /// Add an expectation for a command containing a substring.
    pub fn expect_contains(&self, substring: &str, output: MockProcessOutput) -> &Self {
        self.expect_pattern(CommandExpectation::new(
            CommandPattern::Contains(substring.to_string()),
            output,
        ))
    }

    /// Add a custom expectation.
    pub fn expect_pattern(&self, expectation: CommandExpectation) -> &Self {
        self.state().expectations.push(expectation);
        self
    }

    /// Set a default output for commands that don't match any expectation.
    pub fn set_default(&self, output: MockProcessOutput) -> &Self {
        self.state().default_output = Some(output);
        self
    }

    /// All command lines executed so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Commands whose program is `program`.
    pub fn calls_to(&self, program: &str) -> Vec<String> {
        let prefix = format!("{} ", program);
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(&prefix) || c == program)
            .collect()
    }

    /// Verify that all expectations with a specific count were satisfied.
    pub fn verify(&self) -> Result<()> {
        for (i, exp) in self.state().expectations.iter().enumerate() {
            if let Some(expected) = exp.times {
                if exp.used != expected {
                    bail!(
                        "expectation {} was used {} times, expected {}",
                        i,
                        exp.used,
                        expected
                    );
                }
            }
        }
        Ok(())
    }
}

impl Executor for MockExecutor {
    fn exec(&self, cmd: &ProcessBuilder) -> Result<ProcessOutput> {
        let full_cmd = cmd.display_command();

        let matched = {
            let mut state = self.state();
            state.calls.push(full_cmd.clone());

            let found = state
                .expectations
                .iter_mut()
                .find(|exp| exp.pattern.matches(&full_cmd) && exp.available())
                .map(|exp| {
                    exp.used += 1;
                    (exp.output.clone(), exp.effect.clone())
                });

            match found {
                Some(found) => Some(found),
                None => state.default_output.clone().map(|o| (o, None)),
            }
        };

        // Effects run outside the lock so they may inspect the executor.
        match matched {
            Some((output, effect)) => {
                if let Some(effect) = effect {
                    effect(cmd);
                }
                Ok(output.to_output())
            }
            None => bail!("unexpected command: {}", full_cmd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_executor_records_calls() {
        let exec = MockExecutor::new();
        exec.expect("rustup target add x86_64-unknown-linux-gnu", MockProcessOutput::success(""));
        exec.expect_prefix("cargo", MockProcessOutput::failure(101, "boom"));

        let ok = exec
            .exec(&ProcessBuilder::new("rustup").args(["target", "add", "x86_64-unknown-linux-gnu"]))
            .unwrap();
        assert!(ok.success());

        let failed = exec.exec(&ProcessBuilder::new("cargo").arg("build")).unwrap();
        assert_eq!(failed.code, Some(101));
        assert_eq!(failed.stderr, "boom");

        assert!(exec.exec(&ProcessBuilder::new("upx")).is_err());
        assert_eq!(exec.calls().len(), 3);
        assert_eq!(exec.calls_to("cargo"), vec!["cargo build"]);
    }

    #[test]
    fn test_expectation_times_and_effects() {
        let exec = MockExecutor::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        exec.expect_pattern(
            CommandExpectation::new(CommandPattern::Regex(r"^tar -czf \S+".to_string()), MockProcessOutput::success(""))
                .times(1)
                .with_effect(move |cmd| sink.lock().unwrap().push(cmd.get_args().len())),
        );

        let tar = ProcessBuilder::new("tar").args(["-czf", "a.tar.gz", "-C", "/out", "a"]);
        exec.exec(&tar).unwrap();
        assert!(exec.exec(&tar).is_err());

        assert_eq!(*seen.lock().unwrap(), vec![5]);
        exec.verify().unwrap();
    }
}

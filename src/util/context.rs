//! Global context for shipwright operations.
//!
//! Provides centralized access to the working directory, the user-wide
//! `~/.shipwright` directory, and project file discovery.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::util::config::{load_config, Config, PROJECT_FILE};

/// Global context containing paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Home directory for global shipwright data (~/.shipwright/)
    home: PathBuf,
}

impl GlobalContext {
    /// Create a new GlobalContext with defaults.
    ///
    /// `SHIPWRIGHT_HOME` overrides the home directory.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;

        let home = match std::env::var_os("SHIPWRIGHT_HOME") {
            Some(home) if !home.is_empty() => PathBuf::from(home),
            _ => directories::BaseDirs::new()
                .map(|b| b.home_dir().join(".shipwright"))
                .unwrap_or_else(|| PathBuf::from(".shipwright")),
        };

        Ok(GlobalContext { cwd, home })
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        let mut ctx = Self::new()?;
        ctx.cwd = cwd;
        Ok(ctx)
    }

    pub fn with_home(mut self, home: PathBuf) -> Self {
        self.home = home;
        self
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the shipwright home directory (~/.shipwright/).
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Get the global configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Project-local settings file for the project rooted at `root`.
    pub fn project_config_path(root: &Path) -> PathBuf {
        root.join(".shipwright").join("config.toml")
    }

    /// Merged settings for the project rooted at `root`.
    pub fn config(&self, root: &Path) -> Config {
        load_config(&self.config_path(), &Self::project_config_path(root))
    }

    /// Find `shipwright.toml`, starting from cwd and searching upward.
    pub fn find_project_file(&self) -> Result<PathBuf> {
        let mut current = self.cwd.clone();
        loop {
            let candidate = current.join(PROJECT_FILE);
            if candidate.is_file() {
                return Ok(candidate);
            }
            if !current.pop() {
                bail!(
                    "could not find `{}` in `{}` or any parent directory\n\
                     hint: run `shipwright init` to create one",
                    PROJECT_FILE,
                    self.cwd.display()
                );
            }
        }
    }
}

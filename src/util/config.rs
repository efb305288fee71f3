//! Configuration file support for shipwright.
//!
//! Two kinds of files are read:
//! - The project file, `shipwright.toml`, describing one application.
//!   It is versioned; older schemas are migrated on load.
//! - Tool settings, `config.toml`, in two locations:
//!   - Global: `~/.shipwright/config.toml` - User-wide defaults
//!   - Project: `.shipwright/config.toml` - Project-specific overrides
//!
//! Project settings take precedence over global settings, environment
//! variables over both, and command-line flags over everything.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::installer::InstallOptions;
use crate::core::profile::BuildProfile;
use crate::core::project::{
    Application, Dependencies, Directories, Entry, ProjectDescriptor, Python, Release, TargetSpec,
    Torch, Uv, SCHEMA_VERSION,
};

/// Name of the project file.
pub const PROJECT_FILE: &str = "shipwright.toml";

/// Parse project file content, migrating older schemas.
pub fn parse_project(content: &str) -> Result<ProjectDescriptor> {
    let mut value: toml::Table = toml::from_str(content).context("invalid TOML")?;

    let schema = match value.remove("schema") {
        None => SCHEMA_VERSION as i64,
        Some(toml::Value::Integer(n)) => n,
        Some(other) => bail!("`schema` must be an integer, found `{}`", other),
    };

    match schema {
        1 => {
            let legacy: LegacyProject = toml::Value::Table(value)
                .try_into()
                .context("invalid schema 1 project")?;
            tracing::debug!("migrating schema 1 project file");
            Ok(legacy.migrate())
        }
        2 => toml::Value::Table(value)
            .try_into()
            .context("invalid project file"),
        other => bail!(
            "unsupported schema version {} (this shipwright understands 1 and {})",
            other,
            SCHEMA_VERSION
        ),
    }
}

/// Load a project file and resolve its paths against its directory.
pub fn load_project(path: &Path) -> Result<ProjectDescriptor> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read project file: {}", path.display()))?;

    let mut project = parse_project(&content)
        .with_context(|| format!("failed to parse project file: {}", path.display()))?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    project
        .resolve_paths(base)
        .with_context(|| format!("invalid project file: {}", path.display()))?;

    Ok(project)
}

/// Schema 1 layout: flat `[app]` with `;`-separated lists and a `[build]`
/// table holding target and release options.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LegacyProject {
    app: LegacyApp,
    python: Python,
    astral: Uv,
    torch: Torch,
    entry: Entry,
    build: LegacyBuild,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LegacyApp {
    name: Option<String>,
    author: Option<String>,
    version: Option<String>,
    about: Option<String>,
    icon: Option<PathBuf>,
    versions_dir: Option<String>,
    wheels: Option<String>,
    pypi: Option<String>,
    reqtxt: Option<PathBuf>,
    keep_open: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LegacyBuild {
    system: Option<String>,
    arch: Option<String>,
    profile: BuildProfile,
    rolling: bool,
    keep_open: bool,
    standalone: bool,
    upx: bool,
    zigbuild: bool,
    msvc: bool,
    tarball: bool,
    build_dir: Option<PathBuf>,
    output: Option<PathBuf>,
}

fn split_list(value: Option<String>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl LegacyProject {
    fn migrate(self) -> ProjectDescriptor {
        let defaults = Application::default();
        let build = self.build;

        if build.build_dir.is_some() || build.output.is_some() {
            tracing::warn!(
                "`build.build_dir` and `build.output` are no longer read from the project file; \
                 set `work_dir`/`output_dir` in .shipwright/config.toml instead"
            );
        }

        let mut directories = Directories::default();
        if let Some(versions) = self.app.versions_dir {
            directories.versions = versions;
        }

        ProjectDescriptor {
            app: Application {
                name: self.app.name.unwrap_or(defaults.name),
                author: self.app.author.unwrap_or(defaults.author),
                version: self.app.version.unwrap_or(defaults.version),
                about: self.app.about.unwrap_or(defaults.about),
                icon: self.app.icon,
                keep_open: self.app.keep_open || build.keep_open,
            },
            dependencies: Dependencies {
                wheels: split_list(self.app.wheels),
                pypi: split_list(self.app.pypi),
                requirements: self.app.reqtxt,
                rolling: build.rolling,
            },
            directories,
            python: self.python,
            uv: self.astral,
            torch: self.torch,
            entry: self.entry,
            release: Release {
                target: TargetSpec {
                    os: build.system,
                    arch: build.arch,
                    abi: None,
                    triple: None,
                },
                profile: build.profile,
                standalone: build.standalone,
                zig: build.zigbuild,
                xwin: false,
                msvc: build.msvc,
                upx: build.upx,
                tarball: build.tarball,
                auto_packages: false,
            },
        }
    }
}

/// Tool settings from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub build: BuildSettings,
}

/// `[build]` settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Cargo target directory for runtime builds
    pub work_dir: Option<PathBuf>,
    /// Where release files are written
    pub output_dir: Option<PathBuf>,
    /// Cargo.toml of the runtime crate
    pub runtime_manifest: Option<PathBuf>,
    /// Binary target inside the runtime crate
    pub binary_name: Option<String>,
    /// Allow installing missing tools and system packages
    pub auto_packages: Option<bool>,
    /// Pin `stable-<host>` as the default rustup toolchain before building
    pub pin_default_toolchain: Option<bool>,
    /// Extra directories searched for tools
    #[serde(default)]
    pub tool_path: Vec<PathBuf>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        let b = other.build;
        if b.work_dir.is_some() {
            self.build.work_dir = b.work_dir;
        }
        if b.output_dir.is_some() {
            self.build.output_dir = b.output_dir;
        }
        if b.runtime_manifest.is_some() {
            self.build.runtime_manifest = b.runtime_manifest;
        }
        if b.binary_name.is_some() {
            self.build.binary_name = b.binary_name;
        }
        if b.auto_packages.is_some() {
            self.build.auto_packages = b.auto_packages;
        }
        if b.pin_default_toolchain.is_some() {
            self.build.pin_default_toolchain = b.pin_default_toolchain;
        }
        if !b.tool_path.is_empty() {
            self.build.tool_path = b.tool_path;
        }
    }

    /// Apply overrides from environment variables.
    pub fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| get(key).filter(|v| !v.is_empty());

        if let Some(dir) = non_empty("CARGO_TARGET_DIR") {
            self.build.work_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = non_empty("SHIPWRIGHT_RELEASE_DIR") {
            self.build.output_dir = Some(PathBuf::from(dir));
        }
        if let Some(manifest) = non_empty("SHIPWRIGHT_RUNTIME_MANIFEST") {
            self.build.runtime_manifest = Some(PathBuf::from(manifest));
        }
    }

    /// Installer options derived from these settings.
    pub fn install_options(&self, auto_packages: bool) -> InstallOptions {
        InstallOptions {
            auto_packages: auto_packages || self.build.auto_packages.unwrap_or(false),
            pin_default_toolchain: self.build.pin_default_toolchain.unwrap_or(false),
            tool_path: self.build.tool_path.clone(),
        }
    }
}

/// Load merged configuration from global and project locations, then apply
/// environment overrides.
///
/// Order of precedence (highest to lowest):
/// 1. Environment variables
/// 2. Project config (.shipwright/config.toml)
/// 3. Global config (~/.shipwright/config.toml)
/// 4. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        config.merge(Config::load_or_default(global_path));
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config.apply_env(|key| std::env::var(key).ok());
    config
}

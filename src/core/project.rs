//! Project descriptor: the complete, validated input of one build.
//!
//! The descriptor is assembled once per invocation (see
//! [`crate::util::config`]) and then only read. Decisions that look like
//! mutations (strategy upgrades, ABI toggles) are returned as separate
//! values by the pipeline stages.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::platform::{self, Abi, Os, TargetPlatform};
use crate::core::profile::BuildProfile;
use crate::core::release::release_name;
use crate::util::errors::BuildError;
use crate::util::fs::{absolutize, glob_files};

/// Current schema version of `shipwright.toml`.
pub const SCHEMA_VERSION: u32 = 2;

/// Root project description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectDescriptor {
    pub app: Application,
    pub dependencies: Dependencies,
    pub directories: Directories,
    pub python: Python,
    pub uv: Uv,
    pub torch: Torch,
    pub entry: Entry,
    pub release: Release,
}

/// Application metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Application {
    pub name: String,
    pub author: String,
    pub version: String,
    pub about: String,
    pub icon: Option<PathBuf>,
    /// Keep the terminal open after the application exits
    pub keep_open: bool,
}

impl Default for Application {
    fn default() -> Self {
        Application {
            name: "Application".to_string(),
            author: String::new(),
            version: "0.0.0".to_string(),
            about: "No description provided".to_string(),
            icon: None,
            keep_open: false,
        }
    }
}

/// Runtime dependency declarations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dependencies {
    /// Wheel files, directories of wheels, or glob patterns
    pub wheels: Vec<String>,
    /// Registry package specs (`numpy>=2`)
    pub pypi: Vec<String>,
    /// Path to a requirements file
    pub requirements: Option<PathBuf>,
    /// Upgrade dependencies on every run instead of pinning them
    pub rolling: bool,
}

/// Install directories, relative to the runtime's workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Directories {
    pub common: String,
    pub versions: String,
}

impl Default for Directories {
    fn default() -> Self {
        Directories {
            common: "Shipwright".to_string(),
            versions: "Versions".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Python {
    pub version: String,
    pub bundle: bool,
}

impl Default for Python {
    fn default() -> Self {
        Python {
            version: "3.13".to_string(),
            bundle: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Uv {
    pub version: String,
    pub bundle: bool,
}

impl Default for Uv {
    fn default() -> Self {
        Uv {
            version: "0.6.13".to_string(),
            bundle: false,
        }
    }
}

/// Optional PyTorch installation. An empty version disables it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Torch {
    pub version: String,
    pub backend: String,
}

impl Default for Torch {
    fn default() -> Self {
        Torch {
            version: String::new(),
            backend: "auto".to_string(),
        }
    }
}

impl Torch {
    pub fn enabled(&self) -> bool {
        !self.version.trim().is_empty()
    }
}

/// Entry point candidates. See [`Entry::resolve`] for precedence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Entry {
    pub module: Option<String>,
    pub script: Option<PathBuf>,
    pub code: Option<String>,
    pub command: Option<String>,
}

/// The entry point selected for the executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryPoint {
    Module(String),
    Script(PathBuf),
    Code(String),
    Command(String),
}

impl EntryPoint {
    pub fn kind(&self) -> &'static str {
        match self {
            EntryPoint::Module(_) => "module",
            EntryPoint::Script(_) => "script",
            EntryPoint::Code(_) => "code",
            EntryPoint::Command(_) => "command",
        }
    }

    pub fn value(&self) -> String {
        match self {
            EntryPoint::Module(s) | EntryPoint::Code(s) | EntryPoint::Command(s) => s.clone(),
            EntryPoint::Script(p) => p.display().to_string(),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&String> {
    value.as_ref().filter(|s| !s.trim().is_empty())
}

impl Entry {
    /// Select the entry point: module, then script, then code, then command.
    pub fn resolve(&self) -> Option<EntryPoint> {
        if let Some(module) = non_empty(&self.module) {
            return Some(EntryPoint::Module(module.clone()));
        }
        if let Some(script) = self.script.as_ref().filter(|p| !p.as_os_str().is_empty()) {
            return Some(EntryPoint::Script(script.clone()));
        }
        if let Some(code) = non_empty(&self.code) {
            return Some(EntryPoint::Code(code.clone()));
        }
        non_empty(&self.command).map(|c| EntryPoint::Command(c.clone()))
    }

    /// Entry kinds that are set but shadowed by a higher-precedence one.
    pub fn shadowed(&self) -> Vec<&'static str> {
        let set = [
            ("module", non_empty(&self.module).is_some()),
            (
                "script",
                self.script.as_ref().is_some_and(|p| !p.as_os_str().is_empty()),
            ),
            ("code", non_empty(&self.code).is_some()),
            ("command", non_empty(&self.command).is_some()),
        ];

        set.iter()
            .filter(|(_, present)| *present)
            .skip(1)
            .map(|(kind, _)| *kind)
            .collect()
    }
}

/// Target selection inside `[release]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetSpec {
    pub os: Option<String>,
    pub arch: Option<String>,
    pub abi: Option<String>,
    /// A full compiler triple; takes precedence over os/arch/abi
    pub triple: Option<String>,
}

impl TargetSpec {
    /// A fully specified entry for an already resolved platform.
    pub fn resolved(target: &TargetPlatform) -> Self {
        TargetSpec {
            os: Some(target.os().to_string()),
            arch: Some(target.arch().to_string()),
            abi: target.abi().map(|a| a.to_string()),
            triple: Some(target.triple().to_string()),
        }
    }
}

/// Release settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Release {
    pub target: TargetSpec,
    pub profile: BuildProfile,
    /// Bundle every runtime dependency for offline use
    pub standalone: bool,
    /// Cross-compile with cargo-zigbuild
    pub zig: bool,
    /// Cross-compile MSVC targets with cargo-xwin
    pub xwin: bool,
    /// Shorthand for `target.abi = "msvc"`
    pub msvc: bool,
    /// Compress the binary with upx
    pub upx: bool,
    /// Wrap non-Windows binaries in a .tar.gz (keeps the executable bit)
    pub tarball: bool,
    /// Allow installing auxiliary system packages
    pub auto_packages: bool,
}

impl Release {
    /// Resolve the configured target, filling unset parts from `host`.
    pub fn target_platform(&self, host: &TargetPlatform) -> Result<TargetPlatform, BuildError> {
        if let Some(triple) = self.target.triple.as_deref() {
            return platform::from_triple(triple);
        }

        let os = self
            .target
            .os
            .clone()
            .unwrap_or_else(|| host.os().to_string());
        let arch = self
            .target
            .arch
            .clone()
            .unwrap_or_else(|| host.arch().to_string());

        let abi = match (&self.target.abi, self.msvc) {
            (Some(abi), _) => Some(abi.clone()),
            (None, true) => Some(Abi::Msvc.to_string()),
            (None, false) if self.target.os.is_none() && self.target.arch.is_none() => {
                host.abi().map(|a| a.to_string())
            }
            (None, false) => None,
        };

        platform::resolve_str(&os, &arch, abi.as_deref())
    }

    /// Resolve a `--target` value from the command line.
    ///
    /// `msvc` still applies when the value names a Windows platform without
    /// an ABI, so `windows-amd64` with `msvc` set means the MSVC triple.
    pub fn resolve_cli_target(&self, spec: &str) -> Result<TargetPlatform, BuildError> {
        let parsed = platform::parse_target(spec)?;
        let names_abi = platform::from_triple(spec).is_ok() || spec.split('-').count() > 2;

        if self.msvc && !names_abi && parsed.os() == Os::Windows {
            return platform::resolve(parsed.os(), parsed.arch(), Some(Abi::Msvc));
        }
        Ok(parsed)
    }
}

impl ProjectDescriptor {
    /// Backend qualifier appended to release names, if any.
    pub fn backend_qualifier(&self) -> Option<&str> {
        if self.torch.enabled() {
            Some(self.torch.backend.as_str())
        } else {
            None
        }
    }

    /// Release file name for `target`.
    pub fn release_name(&self, target: &TargetPlatform) -> String {
        release_name(
            &self.app.name,
            target,
            &self.app.version,
            self.backend_qualifier(),
        )
    }

    /// Serialize to JSON for the build environment.
    ///
    /// `release.target` holds the platform actually being built, and a
    /// top-level `uuid` identifies this build so the runtime can tell two
    /// builds of the same version apart.
    pub fn build_json(&self, target: &TargetPlatform, build_id: Uuid) -> String {
        let mut resolved = self.clone();
        resolved.release.target = TargetSpec::resolved(target);

        // Plain data with string keys; serialization cannot fail.
        let mut value = serde_json::to_value(&resolved).unwrap_or_default();
        if let Some(object) = value.as_object_mut() {
            object.insert("uuid".to_string(), serde_json::Value::String(build_id.to_string()));
        }
        value.to_string()
    }

    /// Validate and make relative paths absolute against `base`.
    ///
    /// Wheel patterns are expanded to concrete files here, so the pipeline
    /// only ever sees paths that exist.
    pub fn resolve_paths(&mut self, base: &Path) -> Result<()> {
        if self.app.name.trim().is_empty() {
            bail!("`app.name` must not be empty");
        }
        if self.app.version.trim().is_empty() {
            bail!("`app.version` must not be empty");
        }

        self.dependencies.wheels = resolve_wheels(base, &self.dependencies.wheels)?
            .into_iter()
            .map(|p| p.display().to_string())
            .collect();

        if let Some(reqs) = self.dependencies.requirements.take() {
            let reqs = absolutize(base, &reqs);
            if !reqs.is_file() {
                bail!("requirements file not found: {}", reqs.display());
            }
            self.dependencies.requirements = Some(reqs);
        }

        self.app.icon = self.app.icon.take().map(|icon| absolutize(base, &icon));
        self.entry.script = self.entry.script.take().map(|s| absolutize(base, &s));

        Ok(())
    }
}

/// Expand wheel declarations into concrete files.
///
/// A declaration may be a file, a directory (all `*.whl` and `*.tar.gz`
/// inside it), or a glob pattern. Declarations matching nothing are errors.
pub fn resolve_wheels(base: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut wheels = Vec::new();

    for pattern in patterns {
        let path = absolutize(base, Path::new(pattern));
        let before = wheels.len();

        if path.is_file() {
            wheels.push(path);
        } else if path.is_dir() {
            for ext in ["*.whl", "*.tar.gz"] {
                wheels.extend(glob_files(&path.join(ext))?);
            }
        } else if pattern.contains('*') || pattern.contains('?') {
            wheels.extend(glob_files(&path)?);
        }

        if wheels.len() == before {
            bail!("wheel pattern `{}` did not match any files", pattern);
        }
    }

    wheels.sort();
    wheels.dedup();
    Ok(wheels)
}

//! Test fixtures for common test scenarios.
//!
//! Project files in both schema versions, and canned tool behavior for
//! driving the build pipeline against a [`MockExecutor`](super::MockExecutor).

use std::path::{Path, PathBuf};

use super::{CommandExpectation, CommandPattern, MockProcessOutput};

/// Fixture for a project directory.
#[derive(Debug, Clone)]
pub struct ProjectFixture {
    /// shipwright.toml content.
    pub manifest: String,
    /// Extra files (path relative to project root -> content).
    pub files: Vec<(PathBuf, String)>,
}

impl ProjectFixture {
    /// A schema 2 project named `name`.
    pub fn new(name: &str, version: &str) -> Self {
        ProjectFixture {
            manifest: manifests::simple(name, version),
            files: Vec::new(),
        }
    }

    /// A project with custom shipwright.toml content.
    pub fn with_manifest(manifest: impl Into<String>) -> Self {
        ProjectFixture {
            manifest: manifest.into(),
            files: Vec::new(),
        }
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.push((path.into(), content.into()));
        self
    }

    /// Write the fixture under `base_path` and return the project file path.
    pub fn write_to(&self, base_path: &Path) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(base_path)?;
        let manifest_path = base_path.join("shipwright.toml");
        std::fs::write(&manifest_path, &self.manifest)?;

        for (path, content) in &self.files {
            let full = base_path.join(path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(full, content)?;
        }

        Ok(manifest_path)
    }
}

/// shipwright.toml templates.
pub mod manifests {
    /// Minimal schema 2 project.
    pub fn simple(name: &str, version: &str) -> String {
        format!(
            r#"schema = 2

[app]
name = "{name}"
version = "{version}"

[entry]
module = "{name}"
"#
        )
    }

    /// Legacy schema 1 project with flat `[app]` lists and a `[build]` table.
    pub fn legacy(name: &str) -> String {
        format!(
            r#"schema = 1

[app]
name = "{name}"
version = "0.4.0"
pypi = "numpy>=2;rich"
keep_open = true

[build]
system = "windows"
arch = "amd64"
profile = "small"
msvc = true
upx = true
"#
        )
    }
}

/// Canned outputs and behaviors of external tools.
pub mod tool_outputs {
    use super::*;

    /// Profile name passed to cargo -> output directory name.
    fn profile_dir(cargo_profile: &str) -> &str {
        if cargo_profile == "dev" {
            "debug"
        } else {
            cargo_profile
        }
    }

    fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(|s| s.as_str())
    }

    /// A `cargo` invocation that succeeds and leaves `file_name` where cargo
    /// would put it: `<target-dir>/<triple>/<profile-dir>/`.
    ///
    /// Also matches cargo run through the `sh -c` open-file-limit wrapper.
    pub fn cargo_build_success(file_name: &str) -> CommandExpectation {
        let file_name = file_name.to_string();
        CommandExpectation::new(
            CommandPattern::Regex(r"^(sh -c .* )?cargo ".to_string()),
            MockProcessOutput::success("    Finished `release` profile [optimized] target(s)"),
        )
        .with_effect(move |cmd| {
            let args = cmd.get_args();
            let (Some(dir), Some(triple), Some(profile)) = (
                flag_value(args, "--target-dir"),
                flag_value(args, "--target"),
                flag_value(args, "--profile"),
            ) else {
                return;
            };

            let out = Path::new(dir).join(triple).join(profile_dir(profile));
            std::fs::create_dir_all(&out).unwrap();
            std::fs::write(out.join(&file_name), b"\x7fELF runtime").unwrap();
        })
    }

    /// A `cargo` invocation that fails to compile.
    pub fn cargo_build_failure() -> CommandExpectation {
        CommandExpectation::new(
            CommandPattern::StartsWith("cargo".to_string()),
            MockProcessOutput::failure(
                101,
                "error: linker `cc` not found\n  |\n  = note: No such file or directory",
            ),
        )
    }

    pub fn rustup_ok() -> CommandExpectation {
        CommandExpectation::new(
            CommandPattern::StartsWith("rustup".to_string()),
            MockProcessOutput::success("info: component 'rust-std' is up to date"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_project_fixture_write_to() {
        let tmp = TempDir::new().unwrap();
        let path = ProjectFixture::new("demo", "1.2.3")
            .with_file("dist/demo-1.2.3-py3-none-any.whl", "")
            .write_to(tmp.path())
            .unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("name = \"demo\""));
        assert!(tmp.path().join("dist/demo-1.2.3-py3-none-any.whl").is_file());
    }

    #[test]
    fn test_legacy_template() {
        let legacy = manifests::legacy("old");
        assert!(legacy.contains("schema = 1"));
        assert!(legacy.contains("[build]"));
    }
}

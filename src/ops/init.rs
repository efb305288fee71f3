//! Implementation of `shipwright init`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::core::project::SCHEMA_VERSION;
use crate::util::config::PROJECT_FILE;

/// Options for `shipwright init`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Application name; defaults to the directory name
    pub name: Option<String>,
}

/// Render a commented template project file.
pub fn project_template(name: &str) -> String {
    let module = name.to_lowercase().replace(['-', ' '], "_");
    format!(
        r#"schema = {SCHEMA_VERSION}

[app]
name = "{name}"
author = ""
version = "0.1.0"
about = "No description provided"
# icon = "assets/icon.ico"

[dependencies]
# Wheel files, directories of wheels, or glob patterns
wheels = []
pypi = []
# requirements = "requirements.txt"

[python]
version = "3.13"

[entry]
module = "{module}"

[release]
profile = "release"
# zig = true
# upx = true
# tarball = true
"#
    )
}

/// Write a template `shipwright.toml` into `path`.
pub fn init_project(path: &Path, opts: &InitOptions) -> Result<PathBuf> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }

    let manifest_path = path.join(PROJECT_FILE);
    if manifest_path.exists() {
        bail!("`{}` already exists in `{}`", PROJECT_FILE, path.display());
    }

    let name = match &opts.name {
        Some(name) => name.clone(),
        None => path
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "application".to_string()),
    };

    fs::write(&manifest_path, project_template(&name))
        .with_context(|| format!("failed to write {}", PROJECT_FILE))?;

    Ok(manifest_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::config::parse_project;
    use tempfile::TempDir;

    #[test]
    fn test_template_parses() {
        let project = parse_project(&project_template("My App")).unwrap();
        assert_eq!(project.app.name, "My App");
        assert_eq!(project.entry.module.as_deref(), Some("my_app"));
    }

    #[test]
    fn test_init_uses_directory_name() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("cooltool");
        let path = init_project(&dir, &InitOptions { name: None }).unwrap();

        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("name = \"cooltool\""));
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let tmp = TempDir::new().unwrap();
        let opts = InitOptions {
            name: Some("demo".to_string()),
        };
        init_project(tmp.path(), &opts).unwrap();
        assert!(init_project(tmp.path(), &opts).is_err());
    }
}

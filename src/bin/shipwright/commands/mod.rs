//! Command implementations

pub mod build;
pub mod completions;
pub mod doctor;
pub mod init;
pub mod name;
pub mod targets;

use std::path::PathBuf;

use anyhow::Result;

use crate::cli::ProjectArgs;
use shipwright::core::project::ProjectDescriptor;
use shipwright::util::config::load_project;
use shipwright::util::GlobalContext;

/// The project file and its parsed contents.
pub struct LoadedProject {
    pub path: PathBuf,
    pub root: PathBuf,
    pub descriptor: ProjectDescriptor,
}

/// Locate and load `shipwright.toml`.
pub fn load(ctx: &GlobalContext, args: &ProjectArgs) -> Result<LoadedProject> {
    let path = match &args.config {
        Some(path) => shipwright::util::fs::absolutize(ctx.cwd(), path),
        None => ctx.find_project_file()?,
    };
    let descriptor = load_project(&path)?;
    let root = path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| ctx.cwd().to_path_buf());

    Ok(LoadedProject {
        path,
        root,
        descriptor,
    })
}

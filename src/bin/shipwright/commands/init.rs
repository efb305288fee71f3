//! `shipwright init` command

use std::path::PathBuf;

use anyhow::Result;

use crate::cli::InitArgs;
use shipwright::ops::init::{init_project, InitOptions};
use shipwright::util::shell::{Shell, Status};

pub fn execute(args: InitArgs, no_color: bool) -> Result<()> {
    let path = args.path.unwrap_or_else(|| PathBuf::from("."));

    let manifest = init_project(&path, &InitOptions { name: args.name })?;

    Shell::from_flags(false, no_color, false).status(Status::Created, manifest.display());

    Ok(())
}

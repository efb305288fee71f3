//! `shipwright name` command

use anyhow::Result;

use crate::cli::NameArgs;
use shipwright::core::platform::host_platform;
use shipwright::util::GlobalContext;

pub fn execute(args: NameArgs) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let project = super::load(&ctx, &args.project)?;
    let host = host_platform()?;

    let target = match &args.target {
        Some(spec) => project.descriptor.release.resolve_cli_target(spec)?,
        None => project.descriptor.release.target_platform(&host)?,
    };

    println!("{}", project.descriptor.release_name(&target));

    Ok(())
}

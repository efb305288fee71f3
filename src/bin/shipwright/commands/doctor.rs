//! `shipwright doctor` command

use anyhow::Result;

use crate::cli::DoctorArgs;
use shipwright::ops::{doctor, format_report};
use shipwright::util::process::SystemExecutor;
use shipwright::util::GlobalContext;

pub fn execute(_args: DoctorArgs, verbose: bool) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let config = ctx.config(ctx.cwd());

    let report = doctor(&SystemExecutor, &config.build.tool_path);

    print!("{}", format_report(&report, verbose));

    // Exit with error code if required checks failed
    if !report.all_required_passed() {
        std::process::exit(1);
    }

    Ok(())
}

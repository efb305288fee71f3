//! `shipwright targets` command

use anyhow::Result;

use crate::cli::TargetsArgs;
use shipwright::core::platform::{host_platform, supported_platforms};

pub fn execute(args: TargetsArgs) -> Result<()> {
    let platforms = supported_platforms();

    if args.json {
        let entries: Vec<_> = platforms
            .iter()
            .map(|p| {
                serde_json::json!({
                    "id": p.to_string(),
                    "os": p.os(),
                    "arch": p.arch(),
                    "abi": p.abi(),
                    "triple": p.triple(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    let host = host_platform().ok();
    for platform in &platforms {
        let marker = if Some(*platform) == host { " (host)" } else { "" };
        println!("{:<20} {}{}", platform.to_string(), platform.triple(), marker);
    }

    Ok(())
}

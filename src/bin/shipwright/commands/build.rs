//! `shipwright build` command

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;

use crate::cli::BuildArgs;
use shipwright::builder::events::BuildEvent;
use shipwright::core::platform::{host_platform, TargetPlatform};
use shipwright::core::project::ProjectDescriptor;
use shipwright::ops::compile::{CompileOptions, Orchestrator};
use shipwright::util::config::Config;
use shipwright::util::fs::absolutize;
use shipwright::util::process::SystemExecutor;
use shipwright::util::shell::{format_duration, format_size, Shell, Status};
use shipwright::util::GlobalContext;

/// Runtime binary target built when nothing else is configured.
const DEFAULT_BINARY: &str = "runtime";

pub fn execute(args: BuildArgs, verbose: bool, no_color: bool) -> Result<()> {
    let shell = Shell::from_flags(verbose, no_color, args.json);
    let ctx = GlobalContext::new()?;
    let loaded = super::load(&ctx, &args.project)?;

    let mut project = loaded.descriptor;
    apply_overrides(&mut project, &args);

    let config = ctx.config(&loaded.root);
    let options = compile_options(&args, &config, ctx.cwd(), &loaded.root);
    tracing::debug!("runtime manifest: {}", options.manifest_path.display());
    tracing::debug!("work dir: {}", options.work_dir.display());

    let host = host_platform()?;
    let requested = if args.target.is_empty() {
        vec![project.release.target_platform(&host)?]
    } else {
        args.target
            .iter()
            .map(|spec| project.release.resolve_cli_target(spec))
            .collect::<Result<Vec<TargetPlatform>, _>>()?
    };

    // Targets sharing an identifier would write the same release file.
    let mut seen = HashSet::new();
    let mut targets = Vec::with_capacity(requested.len());
    for target in requested {
        if seen.insert(target.identifier()) {
            targets.push(target);
        } else {
            shell.status(Status::Warning, format!("{} requested more than once", target));
        }
    }

    let executor = SystemExecutor;
    let orchestrator = Orchestrator::new(
        &executor,
        host,
        config.install_options(project.release.auto_packages),
    );

    let started = Instant::now();
    for target in &targets {
        shell.event(&BuildEvent::started(project.release.profile.as_str(), target.triple()));
        shell.status(
            Status::Building,
            format!("{} for {} [{}]", project.app.name, target, project.release.profile),
        );
    }

    let spinner = shell.spinner(format!("compiling {} target(s)", targets.len()));
    let results = orchestrator.compile_many(&project, &targets, &options);
    spinner.finish();

    let mut failed = 0;
    for (target, result) in &results {
        match result {
            Ok(built) => {
                shell.event(&BuildEvent::artifact(built));
                shell.status(
                    Status::Finished,
                    format!(
                        "{} ({}, {}) in {}",
                        built.path.display(),
                        format_size(built.size),
                        built.strategy,
                        format_duration(built.elapsed)
                    ),
                );
                tracing::debug!("sha256 {}", built.sha256);
            }
            Err(e) => {
                failed += 1;
                shell.event(&BuildEvent::failed(target.triple(), e));
                shell.diagnostic(&e.to_diagnostic().with_location(&loaded.path));
            }
        }
    }

    let built = (results.len() - failed) as u64;
    shell.event(&BuildEvent::finished(
        failed == 0,
        started.elapsed().as_millis() as u64,
        built,
    ));

    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

/// Fold command line switches into the release table.
fn apply_overrides(project: &mut ProjectDescriptor, args: &BuildArgs) {
    let release = &mut project.release;
    if let Some(profile) = args.profile {
        release.profile = profile;
    }
    release.zig |= args.zig;
    release.xwin |= args.xwin;
    release.msvc |= args.msvc;
    release.upx |= args.upx;
    release.tarball |= args.tarball;
    release.standalone |= args.standalone;
    release.auto_packages |= args.auto_packages;
}

/// Resolve directories: command line, then settings, then defaults under the
/// project root.
fn compile_options(args: &BuildArgs, config: &Config, cwd: &Path, root: &Path) -> CompileOptions {
    let pick = |cli: &Option<PathBuf>, setting: &Option<PathBuf>, default: PathBuf| match (cli, setting) {
        (Some(path), _) => absolutize(cwd, path),
        (None, Some(path)) => absolutize(root, path),
        (None, None) => default,
    };

    CompileOptions {
        manifest_path: pick(
            &args.manifest,
            &config.build.runtime_manifest,
            root.join("runtime").join("Cargo.toml"),
        ),
        binary_name: config
            .build
            .binary_name
            .clone()
            .unwrap_or_else(|| DEFAULT_BINARY.to_string()),
        work_dir: pick(
            &args.work_dir,
            &config.build.work_dir,
            root.join(".shipwright").join("target"),
        ),
        output_dir: pick(&args.output, &config.build.output_dir, root.join("release")),
    }
}

//! Shipwright CLI - release builds for Python application launchers

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("shipwright=debug")
    } else {
        EnvFilter::new("shipwright=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    // Execute command
    match cli.command {
        Commands::Build(args) => commands::build::execute(args, cli.verbose, cli.no_color),
        Commands::Name(args) => commands::name::execute(args),
        Commands::Targets(args) => commands::targets::execute(args),
        Commands::Doctor(args) => commands::doctor::execute(args, cli.verbose),
        Commands::Init(args) => commands::init::execute(args, cli.no_color),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

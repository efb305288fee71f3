//! CLI definitions using clap.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use shipwright::core::profile::BuildProfile;

/// Shipwright - release builds for self-contained Python application launchers
#[derive(Parser)]
#[command(name = "shipwright")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build release binaries
    Build(BuildArgs),

    /// Print the release file name for a target
    Name(NameArgs),

    /// List supported target platforms
    Targets(TargetsArgs),

    /// Check which build tools are available
    Doctor(DoctorArgs),

    /// Write a template shipwright.toml
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Options shared by commands that read the project file.
#[derive(Args, Clone, Default)]
pub struct ProjectArgs {
    /// Path to shipwright.toml (searched upward from the current directory by default)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct BuildArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Target platform, as `os-arch[-abi]` or a compiler triple (repeatable)
    #[arg(long, short = 't', value_name = "TARGET")]
    pub target: Vec<String>,

    /// Build profile: develop, release, fast, fastest, small, smallest
    #[arg(long, short = 'p', value_parser = parse_profile)]
    pub profile: Option<BuildProfile>,

    /// Cross-compile with cargo-zigbuild
    #[arg(long)]
    pub zig: bool,

    /// Cross-compile MSVC targets with cargo-xwin
    #[arg(long)]
    pub xwin: bool,

    /// Use the MSVC ABI for Windows targets
    #[arg(long)]
    pub msvc: bool,

    /// Compress the binary with upx
    #[arg(long)]
    pub upx: bool,

    /// Wrap non-Windows binaries in a .tar.gz
    #[arg(long)]
    pub tarball: bool,

    /// Bundle every runtime dependency for offline use
    #[arg(long)]
    pub standalone: bool,

    /// Allow installing missing tools and system packages
    #[arg(long)]
    pub auto_packages: bool,

    /// Cargo target directory
    #[arg(long, value_name = "DIR", env = "CARGO_TARGET_DIR", hide_env = true)]
    pub work_dir: Option<PathBuf>,

    /// Directory release files are written to
    #[arg(long, short = 'o', value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Cargo.toml of the runtime crate
    #[arg(long, value_name = "PATH")]
    pub manifest: Option<PathBuf>,

    /// Print build events as JSON lines on stdout
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct NameArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Target platform, as `os-arch[-abi]` or a compiler triple
    #[arg(long, short = 't', value_name = "TARGET")]
    pub target: Option<String>,
}

#[derive(Args)]
pub struct TargetsArgs {
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct DoctorArgs {}

#[derive(Args)]
pub struct InitArgs {
    /// Application name (defaults to directory name)
    #[arg(long)]
    pub name: Option<String>,

    /// Directory to initialize (defaults to current directory)
    pub path: Option<PathBuf>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

fn parse_profile(s: &str) -> Result<BuildProfile, String> {
    BuildProfile::from_str(s)
}

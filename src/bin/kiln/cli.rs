//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use kiln::util::shell::ColorChoice;

/// Kiln - build a library and the executables that use it, in order
#[derive(Parser)]
#[command(name = "kiln")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    pub color: ColorChoice,

    /// Path to Kiln.toml (defaults to the one in the current directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub manifest_path: Option<PathBuf>,

    /// Toolchain executable, overriding the config
    #[arg(long, global = true, env = "KILN_TOOL", value_name = "TOOL")]
    pub tool: Option<String>,

    /// Output directory, overriding the config
    #[arg(long, global = true, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Defaults to `build`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build every target in order, stopping at the first failure
    Build(BuildArgs),

    /// Print the toolchain commands a build would run
    Plan(PlanArgs),

    /// Remove the artifacts kiln produced
    Clean,
}

#[derive(Args, Default)]
pub struct BuildArgs {
    /// Only build these targets (declared order is kept)
    #[arg(long = "target", value_name = "NAME")]
    pub targets: Vec<String>,
}

#[derive(Args, Default)]
pub struct PlanArgs {
    /// Only plan these targets
    #[arg(long = "target", value_name = "NAME")]
    pub targets: Vec<String>,
}

//! Kiln CLI - sequential native build orchestration

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{BuildArgs, Cli, Commands};
use kiln::util::{Project, Shell};

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();

    // Log to stderr so relayed stdout stays clean
    let filter = if cli.verbose {
        EnvFilter::new("kiln=debug")
    } else {
        EnvFilter::new("kiln=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let shell = Arc::new(Shell::from_flags(cli.quiet, cli.verbose, cli.color));

    let project = Project::discover(cli.manifest_path.as_deref())?
        .with_tool(cli.tool)
        .with_out_dir(cli.out_dir);

    match cli.command.unwrap_or(Commands::Build(BuildArgs::default())) {
        Commands::Build(args) => commands::build::execute(&project, &shell, args),
        Commands::Plan(args) => commands::plan::execute(&project, args),
        Commands::Clean => commands::clean::execute(&project, &shell),
    }
}

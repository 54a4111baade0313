//! Command implementations

pub mod build;
pub mod clean;
pub mod plan;

use std::sync::Arc;

use kiln::builder::BuildOrchestrator;
use kiln::util::process::SystemRunner;
use kiln::util::shell::ConsoleSink;
use kiln::util::Project;

/// An orchestrator configured from the project, relaying to the console.
pub fn orchestrator(project: &Project) -> BuildOrchestrator<SystemRunner> {
    let runner = SystemRunner::new(Arc::new(ConsoleSink::new()));
    BuildOrchestrator::new(runner, project.root())
        .with_toolchain(project.toolchain_command())
        .with_out_dir(project.out_dir())
}

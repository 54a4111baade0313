//! `kiln plan` command

use anyhow::Result;

use crate::cli::PlanArgs;
use kiln::util::Project;

pub fn execute(project: &Project, args: PlanArgs) -> Result<i32> {
    let targets = project.config().select(&args.targets)?;
    let orchestrator = super::orchestrator(project);

    for (target, invocation) in targets.iter().zip(orchestrator.plan(&targets)) {
        println!("# {} ({})", target.name(), target.kind());
        println!("cd {} && {}", invocation.cwd().display(), invocation.display_command());
    }

    Ok(0)
}

//! `kiln build` command

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

use crate::cli::BuildArgs;
use kiln::builder::BuildObserver;
use kiln::core::{BuildResult, TargetSpec};
use kiln::util::shell::{format_duration, Shell, Status};
use kiln::util::Project;

pub fn execute(project: &Project, shell: &Arc<Shell>, args: BuildArgs) -> Result<i32> {
    let targets = project.config().select(&args.targets)?;

    let orchestrator = super::orchestrator(project).with_observer(ShellObserver {
        shell: Arc::clone(shell),
        root: project.root().to_path_buf(),
    });

    let start = Instant::now();
    let status = orchestrator.run_all(&targets);

    if let Some(failed) = status.failed() {
        shell.error(format!(
            "target `{}` failed: {}",
            failed.target.name(),
            failed.diagnostic().unwrap_or("unknown error")
        ));
        return Ok(status.exit_code());
    }

    shell.status(
        Status::Finished,
        format!(
            "{} target(s) in {}",
            status.results.len(),
            format_duration(start.elapsed())
        ),
    );
    Ok(0)
}

/// Prints a status line around each target.
struct ShellObserver {
    shell: Arc<Shell>,
    root: std::path::PathBuf,
}

impl BuildObserver for ShellObserver {
    fn on_start(&self, target: &TargetSpec, artifact: &Path) {
        let shown = artifact.strip_prefix(&self.root).unwrap_or(artifact);
        self.shell.status(
            Status::Building,
            format!("{} ({}) -> {}", target.name(), target.kind(), shown.display()),
        );
    }

    fn on_finish(&self, result: &BuildResult) {
        if result.succeeded {
            self.shell.status(
                Status::Built,
                format!(
                    "{} in {}",
                    result.target.name(),
                    format_duration(result.duration())
                ),
            );
        }
    }
}

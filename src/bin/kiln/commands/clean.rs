//! `kiln clean` command

use std::sync::Arc;

use anyhow::{Context, Result};

use kiln::builder::stager::STAGING_DIR;
use kiln::util::fs::{remove_dir_all_if_exists, remove_file_if_exists};
use kiln::util::shell::{Shell, Status};
use kiln::util::Project;

/// Remove each target's artifact, its companion files and the staging
/// directory. Other files in the output directory are left alone.
pub fn execute(project: &Project, shell: &Arc<Shell>) -> Result<i32> {
    let orchestrator = super::orchestrator(project);
    let out_dir = orchestrator.out_dir();

    for target in project.config().target_specs() {
        let artifact = orchestrator.stager().locate(out_dir, &target);
        for path in artifact.installed_files() {
            let removed = remove_file_if_exists(&path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
            if removed {
                shell.status(Status::Removed, path.display());
            }
        }
    }

    let staging = out_dir.join(STAGING_DIR);
    if remove_dir_all_if_exists(&staging)? {
        shell.status(Status::Removed, staging.display());
    }

    Ok(0)
}

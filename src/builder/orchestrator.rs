//! Sequential build orchestration.
//!
//! Targets are built strictly one after another, in declared order. The
//! first failure ends the run: later targets are never attempted, and the
//! failing target's exit code becomes the process exit code.
//!
//! ```text
//! Pending -> Running(0) -> Running(1) -> ... -> Succeeded
//!                 \             \
//!                  Failed(0)     Failed(1)
//! ```
//!
//! Each target's working directory is handed to the runner explicitly; the
//! orchestrator never changes the process-wide current directory.

use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::builder::invocation::ToolchainCommand;
use crate::builder::stager::ArtifactStager;
use crate::core::result::BuildResult;
use crate::core::target::TargetSpec;
use crate::util::process::{Invocation, ProcessRunner};

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Pending,
    Running(usize),
    Failed(usize),
    Succeeded,
}

impl BuildState {
    pub fn is_terminal(self) -> bool {
        matches!(self, BuildState::Failed(_) | BuildState::Succeeded)
    }
}

/// The outcome of a whole run.
#[derive(Debug, Clone)]
pub struct OverallStatus {
    pub succeeded: bool,
    /// One result per attempted target, in order.
    pub results: Vec<BuildResult>,
    pub state: BuildState,
}

impl OverallStatus {
    /// The result that stopped the run, if any.
    pub fn failed(&self) -> Option<&BuildResult> {
        self.results.iter().find(|r| !r.succeeded)
    }

    /// Process exit code for this run.
    ///
    /// 0 on success, otherwise the failing target's code. Codes outside
    /// 1..=255 (no exit code at all, Windows status codes) map to 1.
    pub fn exit_code(&self) -> i32 {
        match self.failed() {
            None => 0,
            Some(result) if (1..=255).contains(&result.exit_code) => result.exit_code,
            Some(_) => 1,
        }
    }
}

/// Hooks for reporting progress.
pub trait BuildObserver {
    /// Called once the artifact location is prepared, before the tool runs.
    fn on_start(&self, _target: &TargetSpec, _artifact: &Path) {}

    /// Called with every produced result.
    fn on_finish(&self, _result: &BuildResult) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl BuildObserver for NoopObserver {}

/// Drives the toolchain over an ordered list of targets.
pub struct BuildOrchestrator<R> {
    runner: R,
    stager: ArtifactStager,
    toolchain: ToolchainCommand,
    project_root: PathBuf,
    out_dir: PathBuf,
    observer: Box<dyn BuildObserver>,
}

impl<R: ProcessRunner> BuildOrchestrator<R> {
    /// Create an orchestrator for the project at `project_root`, which
    /// should be absolute. Artifacts go to `<project_root>/bin` by default.
    pub fn new(runner: R, project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        BuildOrchestrator {
            runner,
            stager: ArtifactStager::new(),
            toolchain: ToolchainCommand::default(),
            out_dir: project_root.join("bin"),
            project_root,
            observer: Box::new(NoopObserver),
        }
    }

    pub fn with_toolchain(mut self, toolchain: ToolchainCommand) -> Self {
        self.toolchain = toolchain;
        self
    }

    pub fn with_stager(mut self, stager: ArtifactStager) -> Self {
        self.stager = stager;
        self
    }

    /// Set the output directory. Relative paths are taken from the project root.
    pub fn with_out_dir(mut self, out_dir: impl AsRef<Path>) -> Self {
        self.out_dir = self.project_root.join(out_dir);
        self
    }

    pub fn with_observer(mut self, observer: impl BuildObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// The stager used to place artifacts.
    pub fn stager(&self) -> &ArtifactStager {
        &self.stager
    }

    /// Build `targets` in order, stopping at the first failure.
    pub fn run_all(&self, targets: &[TargetSpec]) -> OverallStatus {
        let mut state = BuildState::Pending;
        let mut results = Vec::with_capacity(targets.len());

        for (index, target) in targets.iter().enumerate() {
            state = transition(state, BuildState::Running(index));

            let result = self.build_target(target);
            self.observer.on_finish(&result);
            let succeeded = result.succeeded;
            results.push(result);

            if !succeeded {
                state = transition(state, BuildState::Failed(index));
                return OverallStatus {
                    succeeded: false,
                    results,
                    state,
                };
            }
        }

        state = transition(state, BuildState::Succeeded);
        OverallStatus {
            succeeded: true,
            results,
            state,
        }
    }

    /// The invocations `run_all` would perform, without touching anything.
    pub fn plan(&self, targets: &[TargetSpec]) -> Vec<Invocation> {
        targets
            .iter()
            .map(|target| {
                let staged = self.stager.locate(&self.out_dir, target);
                self.toolchain
                    .invocation(target, staged.staging_path(), &self.working_dir(target))
            })
            .collect()
    }

    fn build_target(&self, target: &TargetSpec) -> BuildResult {
        let started = Instant::now();

        let staged = match self.stager.prepare(&self.out_dir, target) {
            Ok(staged) => staged,
            Err(err) => return BuildResult::from_error(target, &err, started.elapsed()),
        };
        self.observer.on_start(target, staged.path());

        let cwd = self.working_dir(target);
        let invocation = self
            .toolchain
            .invocation(target, staged.staging_path(), &cwd);
        let result = self.runner.run(target, &invocation);

        if !result.succeeded {
            staged.discard();
            return result;
        }

        match staged.commit() {
            Ok(()) => result,
            Err(err) => BuildResult::from_error(target, &err, started.elapsed()),
        }
    }

    fn working_dir(&self, target: &TargetSpec) -> PathBuf {
        match target.working_dir() {
            Some(dir) => self.project_root.join(dir),
            None => self.project_root.clone(),
        }
    }
}

fn transition(from: BuildState, to: BuildState) -> BuildState {
    tracing::debug!("build state {:?} -> {:?}", from, to);
    to
}

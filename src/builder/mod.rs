//! Build execution: toolchain command lines, artifact staging and the
//! sequential orchestrator.

pub mod invocation;
pub mod orchestrator;
pub mod stager;

pub use invocation::ToolchainCommand;
pub use orchestrator::{BuildObserver, BuildOrchestrator, BuildState, NoopObserver, OverallStatus};
pub use stager::{ArtifactStager, StagedArtifact};

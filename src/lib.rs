//! Kiln - drives a native toolchain over an ordered list of build targets.
//!
//! Each target is one toolchain invocation producing one artifact. Targets
//! run strictly in sequence; the first failure stops the run. Toolchain
//! output is relayed live, line by line, on the stream it was written to.

pub mod builder;
pub mod core;
pub mod util;

pub use crate::builder::{ArtifactStager, BuildOrchestrator, OverallStatus};
pub use crate::core::{BuildError, BuildResult, ErrorKind, Platform, TargetKind, TargetSpec};
pub use crate::util::context::Project;
pub use crate::util::process::{ProcessRunner, SystemRunner};

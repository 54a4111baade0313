//! Core data types: targets, results and the error taxonomy.

pub mod error;
pub mod result;
pub mod target;

pub use error::{BuildError, ErrorKind, NO_EXIT_CODE};
pub use result::{BuildFailure, BuildResult};
pub use target::{ArtifactSuffixes, Platform, TargetKind, TargetSpec};

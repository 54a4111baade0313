//! Per-target build results.

use std::time::Duration;

use crate::core::error::{BuildError, ErrorKind};
use crate::core::target::TargetSpec;

/// Why a target failed, with a message fit for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildFailure {
    pub kind: ErrorKind,
    pub diagnostic: String,
}

/// The outcome of attempting one target. Produced once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    pub target: TargetSpec,
    pub exit_code: i32,
    pub succeeded: bool,
    pub duration_ms: u64,
    pub failure: Option<BuildFailure>,
}

impl BuildResult {
    pub fn success(target: &TargetSpec, duration: Duration) -> Self {
        BuildResult {
            target: target.clone(),
            exit_code: 0,
            succeeded: true,
            duration_ms: millis(duration),
            failure: None,
        }
    }

    pub fn from_error(target: &TargetSpec, err: &BuildError, duration: Duration) -> Self {
        BuildResult {
            target: target.clone(),
            exit_code: err.exit_code(),
            succeeded: false,
            duration_ms: millis(duration),
            failure: Some(BuildFailure {
                kind: err.kind(),
                diagnostic: err.to_string(),
            }),
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        self.failure.as_ref().map(|f| f.kind)
    }

    pub fn diagnostic(&self) -> Option<&str> {
        self.failure.as_ref().map(|f| f.diagnostic.as_str())
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

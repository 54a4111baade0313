//! Build error types.

use std::fmt;
use std::io;

use thiserror::Error;

/// Exit code recorded when the toolchain never reported one.
pub const NO_EXIT_CODE: i32 = -1;

/// Closed classification of the ways a target can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The tool could not be resolved on the search path.
    ToolNotFound,
    /// The OS refused to create the process.
    SpawnFailed,
    /// Filesystem or pipe failure around the invocation.
    Io,
    /// The tool ran and reported failure.
    ToolExitedNonZero,
    /// The tool terminated abnormally (signal or fault).
    Crashed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ToolNotFound => "tool-not-found",
            ErrorKind::SpawnFailed => "spawn-failed",
            ErrorKind::Io => "io",
            ErrorKind::ToolExitedNonZero => "tool-exited-non-zero",
            ErrorKind::Crashed => "crashed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised while building a single target.
///
/// These never escape a [`ProcessRunner`](crate::util::process::ProcessRunner);
/// they are folded into a [`BuildResult`](crate::core::result::BuildResult).
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("`{tool}` was not found; ensure it is installed and on PATH")]
    ToolNotFound { tool: String },

    #[error("failed to spawn `{program}`: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("`{program}` failed with exit code {code}")]
    ToolExitedNonZero { program: String, code: i32 },

    #[error("`{program}` terminated abnormally ({detail})")]
    Crashed {
        program: String,
        code: i32,
        detail: String,
    },
}

impl BuildError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        BuildError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BuildError::ToolNotFound { .. } => ErrorKind::ToolNotFound,
            BuildError::SpawnFailed { .. } => ErrorKind::SpawnFailed,
            BuildError::Io { .. } => ErrorKind::Io,
            BuildError::ToolExitedNonZero { .. } => ErrorKind::ToolExitedNonZero,
            BuildError::Crashed { .. } => ErrorKind::Crashed,
        }
    }

    /// The exit code to record for this failure.
    ///
    /// Failures that happen before or around the process get [`NO_EXIT_CODE`].
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildError::ToolExitedNonZero { code, .. } | BuildError::Crashed { code, .. } => *code,
            _ => NO_EXIT_CODE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_exit_code() {
        let err = BuildError::ToolNotFound {
            tool: "odin".into(),
        };
        assert_eq!(err.kind(), ErrorKind::ToolNotFound);
        assert_eq!(err.exit_code(), NO_EXIT_CODE);
        assert!(err.to_string().contains("`odin` was not found"));

        let err = BuildError::ToolExitedNonZero {
            program: "odin".into(),
            code: 3,
        };
        assert_eq!(err.kind(), ErrorKind::ToolExitedNonZero);
        assert_eq!(err.exit_code(), 3);

        let err = BuildError::Crashed {
            program: "odin".into(),
            code: 137,
            detail: "signal 9".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Crashed);
        assert_eq!(err.exit_code(), 137);
    }

    #[test]
    fn test_io_error_message_includes_context() {
        let err = BuildError::io(
            "failed to create directory `bin`",
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().starts_with("failed to create directory `bin`: "));
    }
}

//! Toolchain command lines.
//!
//! Every target is built with
//! `<tool> <subcommand> <source-root> -out:<artifact> [library args] [extra args]`.

use std::path::Path;

use crate::core::target::TargetSpec;
use crate::util::process::Invocation;

/// Template for the toolchain invocation shared by all targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainCommand {
    tool: String,
    subcommand: String,
    library_args: Vec<String>,
}

impl ToolchainCommand {
    pub fn new(tool: impl Into<String>, subcommand: impl Into<String>) -> Self {
        ToolchainCommand {
            tool: tool.into(),
            subcommand: subcommand.into(),
            library_args: Vec::new(),
        }
    }

    /// The Odin compiler: `odin build`, with `-build-mode:dynamic` for libraries.
    pub fn odin() -> Self {
        ToolchainCommand::new("odin", "build").with_library_args(["-build-mode:dynamic"])
    }

    pub fn with_library_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.library_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Build the invocation for `target`, writing its artifact to `output`
    /// and running from `cwd`.
    pub fn invocation(&self, target: &TargetSpec, output: &Path, cwd: &Path) -> Invocation {
        let mut invocation = Invocation::new(&self.tool, cwd)
            .arg(&self.subcommand)
            .arg(target.source_root())
            .arg(format!("-out:{}", output.display()));

        if target.kind().is_library() {
            invocation = invocation.args(&self.library_args);
        }

        invocation.args(target.extra_args())
    }
}

impl Default for ToolchainCommand {
    fn default() -> Self {
        ToolchainCommand::odin()
    }
}

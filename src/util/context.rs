//! Project context: where the project lives and how it is configured.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::builder::invocation::ToolchainCommand;
use crate::util::config::Config;

/// A located project with its effective configuration.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Locate the project.
    ///
    /// With `manifest_path`, the project root is the directory containing it
    /// and the file must exist. Otherwise the current directory is the root
    /// and `Kiln.toml` there is optional.
    pub fn discover(manifest_path: Option<&Path>) -> Result<Self> {
        match manifest_path {
            Some(path) => {
                let path = std::path::absolute(path)
                    .with_context(|| format!("invalid manifest path: {}", path.display()))?;
                let config = Config::load(&path)?;
                let root = path
                    .parent()
                    .map(Path::to_path_buf)
                    .with_context(|| format!("manifest has no parent directory: {}", path.display()))?;
                Ok(Project { root, config })
            }
            None => {
                let root = std::env::current_dir().context("failed to get current directory")?;
                Project::at(root)
            }
        }
    }

    /// Load the project rooted at `root`.
    pub fn at(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let config = Config::discover(&root)?;
        Ok(Project { root, config })
    }

    /// Replace the toolchain executable.
    pub fn with_tool(mut self, tool: Option<String>) -> Self {
        if let Some(tool) = tool {
            self.config.toolchain.tool = tool;
        }
        self
    }

    /// Replace the output directory.
    pub fn with_out_dir(mut self, out_dir: Option<PathBuf>) -> Self {
        if let Some(out_dir) = out_dir {
            self.config.build.out_dir = out_dir;
        }
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Absolute output directory.
    pub fn out_dir(&self) -> PathBuf {
        self.root.join(&self.config.build.out_dir)
    }

    pub fn toolchain_command(&self) -> ToolchainCommand {
        self.config.toolchain_command(&self.root)
    }
}

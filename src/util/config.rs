//! Project configuration (`Kiln.toml`).
//!
//! The file is optional. Without it kiln builds the default pair of targets:
//! the `DSL_BUILD_SYS` dynamic library from `BuildSystem/`, then the
//! `dieselc` executable from the project root, both with `odin build`.
//!
//! ```toml
//! [toolchain]
//! tool = "odin"
//! subcommand = "build"
//! library-args = ["-build-mode:dynamic"]
//!
//! [build]
//! out-dir = "bin"
//!
//! [[target]]
//! name = "DSL_BUILD_SYS"
//! kind = "library"
//! working-dir = "BuildSystem"
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::invocation::ToolchainCommand;
use crate::core::target::{TargetKind, TargetSpec};
use crate::util::fs::read_to_string;

/// Name of the project configuration file.
pub const MANIFEST_NAME: &str = "Kiln.toml";

/// Kiln configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Toolchain settings
    pub toolchain: ToolchainConfig,

    /// Build settings
    pub build: BuildConfig,

    /// Targets, built in declaration order
    #[serde(rename = "target")]
    pub targets: Vec<TargetConfig>,
}

/// How the toolchain is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ToolchainConfig {
    /// Tool name looked up on PATH, or a path relative to the project root
    pub tool: String,

    /// First argument of every invocation
    pub subcommand: String,

    /// Arguments added for library targets only
    pub library_args: Vec<String>,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        ToolchainConfig {
            tool: "odin".to_string(),
            subcommand: "build".to_string(),
            library_args: vec!["-build-mode:dynamic".to_string()],
        }
    }
}

/// Build settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct BuildConfig {
    /// Output directory, relative to the project root
    pub out_dir: PathBuf,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            out_dir: PathBuf::from("bin"),
        }
    }
}

/// One `[[target]]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct TargetConfig {
    pub name: String,

    pub kind: TargetKind,

    /// Passed to the tool as is, so relative to `working-dir`
    #[serde(default = "default_source_root")]
    pub source_root: PathBuf,

    /// Artifact base name; defaults to `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_name: Option<String>,

    /// Directory to run the tool from, relative to the project root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_args: Vec<String>,
}

fn default_source_root() -> PathBuf {
    PathBuf::from(".")
}

impl TargetConfig {
    pub fn to_spec(&self) -> TargetSpec {
        let mut spec = TargetSpec::new(&self.name, self.kind, &self.source_root)
            .with_extra_args(self.extra_args.iter().cloned());
        if let Some(ref output_name) = self.output_name {
            spec = spec.with_output_name(output_name);
        }
        if let Some(ref dir) = self.working_dir {
            spec = spec.with_working_dir(dir);
        }
        spec
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            toolchain: ToolchainConfig::default(),
            build: BuildConfig::default(),
            targets: vec![
                TargetConfig {
                    name: "DSL_BUILD_SYS".to_string(),
                    kind: TargetKind::Library,
                    source_root: default_source_root(),
                    output_name: None,
                    working_dir: Some(PathBuf::from("BuildSystem")),
                    extra_args: Vec::new(),
                },
                TargetConfig {
                    name: "dieselc".to_string(),
                    kind: TargetKind::Executable,
                    source_root: default_source_root(),
                    output_name: None,
                    working_dir: None,
                    extra_args: Vec::new(),
                },
            ],
        }
    }
}

impl Config {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("failed to parse config: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config: {}", path.display()))?;
        Ok(config)
    }

    /// Load `Kiln.toml` from `root` if present, otherwise use the defaults.
    pub fn discover(root: &Path) -> Result<Self> {
        let path = root.join(MANIFEST_NAME);
        if path.is_file() {
            tracing::debug!("loading config from {}", path.display());
            Self::load(&path)
        } else {
            tracing::debug!("no {} in {}, using defaults", MANIFEST_NAME, root.display());
            Ok(Config::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.targets.is_empty() {
            bail!("no targets declared");
        }
        if self.toolchain.tool.trim().is_empty() {
            bail!("toolchain.tool must not be empty");
        }

        let mut seen = HashSet::new();
        for target in &self.targets {
            if target.name.trim().is_empty() {
                bail!("target names must not be empty");
            }
            if !seen.insert(target.name.as_str()) {
                bail!("duplicate target `{}`", target.name);
            }
            check_artifact_name("name", &target.name)?;
            if let Some(ref output_name) = target.output_name {
                check_artifact_name("output-name", output_name)?;
            }
        }
        Ok(())
    }

    /// All targets in declaration order.
    pub fn target_specs(&self) -> Vec<TargetSpec> {
        self.targets.iter().map(TargetConfig::to_spec).collect()
    }

    /// The named targets, in declaration order. An empty selection means all.
    pub fn select(&self, names: &[String]) -> Result<Vec<TargetSpec>> {
        if names.is_empty() {
            return Ok(self.target_specs());
        }

        for name in names {
            if !self.targets.iter().any(|t| &t.name == name) {
                let available: Vec<&str> = self.targets.iter().map(|t| t.name.as_str()).collect();
                bail!(
                    "no target named `{}`; available targets: {}",
                    name,
                    available.join(", ")
                );
            }
        }

        Ok(self
            .targets
            .iter()
            .filter(|t| names.contains(&t.name))
            .map(TargetConfig::to_spec)
            .collect())
    }

    /// The toolchain command line template.
    ///
    /// A tool given as a relative path is anchored at `project_root`, so it
    /// does not move with each target's working directory.
    pub fn toolchain_command(&self, project_root: &Path) -> ToolchainCommand {
        let tool = &self.toolchain.tool;
        let tool = if Path::new(tool).components().count() > 1 {
            project_root.join(tool).to_string_lossy().into_owned()
        } else {
            tool.clone()
        };
        ToolchainCommand::new(tool, &self.toolchain.subcommand)
            .with_library_args(self.toolchain.library_args.iter().cloned())
    }
}

/// Artifact names become file names inside the output directory, so they
/// must not be able to point anywhere else.
fn check_artifact_name(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("target {} must not be empty", field);
    }
    if value == "." || value == ".." || value.contains(['/', '\\']) {
        bail!(
            "target {} `{}` must be a plain file name without path separators",
            field,
            value
        );
    }
    Ok(())
}

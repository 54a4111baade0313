//! Target definitions - what gets built.
//!
//! A [`TargetSpec`] describes one toolchain invocation that produces one
//! artifact, either a dynamic library or an executable. Filename suffixes
//! are chosen by [`Platform`] through a single lookup table.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The kind of artifact a target produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Dynamic library (.so / .dylib / .dll)
    #[serde(alias = "lib", alias = "dylib", alias = "shared")]
    Library,

    /// Executable binary
    #[serde(alias = "exe", alias = "bin")]
    Executable,
}

impl TargetKind {
    /// The filename suffix for this kind on `platform`, including the dot.
    pub fn suffix(self, platform: Platform) -> &'static str {
        let suffixes = platform.suffixes();
        match self {
            TargetKind::Library => suffixes.dynamic_library,
            TargetKind::Executable => suffixes.executable,
        }
    }

    /// Get the output filename for an artifact named `name`.
    pub fn output_filename(self, name: &str, platform: Platform) -> String {
        format!("{}{}", name, self.suffix(platform))
    }

    pub fn is_library(self) -> bool {
        matches!(self, TargetKind::Library)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TargetKind::Library => "library",
            TargetKind::Executable => "executable",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Platform families that decide artifact suffixes.
///
/// Discriminants index [`SUFFIX_TABLE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Windows = 0,
    Darwin = 1,
    Unix = 2,
}

/// Filename suffixes for the artifacts of one platform family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactSuffixes {
    pub dynamic_library: &'static str,
    pub executable: &'static str,
}

const SUFFIX_TABLE: [ArtifactSuffixes; 3] = [
    // Windows
    ArtifactSuffixes {
        dynamic_library: ".dll",
        executable: ".exe",
    },
    // Darwin
    ArtifactSuffixes {
        dynamic_library: ".dylib",
        executable: "",
    },
    // Unix
    ArtifactSuffixes {
        dynamic_library: ".so",
        executable: "",
    },
];

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Windows, Platform::Darwin, Platform::Unix];

    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Map an OS identifier (as in `std::env::consts::OS`) to a family.
    ///
    /// Anything that is neither Windows nor Apple is treated as Unix.
    pub fn from_os(os: &str) -> Self {
        match os {
            "windows" => Platform::Windows,
            "macos" | "ios" | "darwin" => Platform::Darwin,
            _ => Platform::Unix,
        }
    }

    pub fn suffixes(self) -> ArtifactSuffixes {
        SUFFIX_TABLE[self as usize]
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Windows => "windows",
            Platform::Darwin => "darwin",
            Platform::Unix => "unix",
        };
        f.write_str(name)
    }
}

/// A declarative description of one build target.
///
/// Immutable once built; the `with_*` methods consume the spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    name: String,
    kind: TargetKind,
    source_root: PathBuf,
    output_name: String,
    extra_args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl TargetSpec {
    /// Create a target whose artifact is named after the target.
    pub fn new(name: impl Into<String>, kind: TargetKind, source_root: impl Into<PathBuf>) -> Self {
        let name = name.into();
        TargetSpec {
            output_name: name.clone(),
            name,
            kind,
            source_root: source_root.into(),
            extra_args: Vec::new(),
            working_dir: None,
        }
    }

    /// Set the artifact base name (without platform suffix).
    pub fn with_output_name(mut self, output_name: impl Into<String>) -> Self {
        self.output_name = output_name.into();
        self
    }

    /// Append toolchain arguments passed after the generated ones.
    pub fn with_extra_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run the toolchain from `dir` (relative to the project root) instead
    /// of the project root itself.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    /// Source root, handed to the toolchain verbatim and therefore
    /// relative to the target's working directory.
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    pub fn extra_args(&self) -> &[String] {
        &self.extra_args
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }
}

//! Artifact staging.
//!
//! The toolchain never writes to an artifact's final location. It writes
//! into `<out-dir>/.kiln-staging/`, and the file is renamed into place only
//! after the tool reports success, so a failed build cannot leave a
//! truncated artifact where a good one used to be.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::core::error::BuildError;
use crate::core::target::{Platform, TargetSpec};
use crate::util::fs::{ensure_dir, remove_file_if_exists};

/// Name of the staging directory inside the output directory.
pub const STAGING_DIR: &str = ".kiln-staging";

/// Extensions of files a toolchain may write next to an artifact with the
/// same stem (import libraries, export files, debug info).
pub const COMPANION_EXTENSIONS: [&str; 3] = ["lib", "exp", "pdb"];

/// Computes artifact locations and prepares the output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactStager {
    platform: Platform,
}

impl Default for ArtifactStager {
    fn default() -> Self {
        ArtifactStager::new()
    }
}

impl ArtifactStager {
    /// A stager for the platform kiln is running on.
    pub fn new() -> Self {
        ArtifactStager::for_platform(Platform::current())
    }

    pub fn for_platform(platform: Platform) -> Self {
        ArtifactStager { platform }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Artifact filename with the platform suffix.
    pub fn file_name(&self, target: &TargetSpec) -> String {
        target
            .kind()
            .output_filename(target.output_name(), self.platform)
    }

    /// Where `target`'s artifact goes under `out_dir`. Touches nothing.
    pub fn locate(&self, out_dir: &Path, target: &TargetSpec) -> StagedArtifact {
        let file_name = self.file_name(target);
        StagedArtifact {
            path: out_dir.join(&file_name),
            staging_path: out_dir.join(STAGING_DIR).join(&file_name),
            output_name: target.output_name().to_string(),
        }
    }

    /// Create the output and staging directories and resolve the artifact.
    ///
    /// Idempotent. Only a stale staged copy of this same artifact is removed;
    /// nothing else in `out_dir` is touched. An artifact name that is not a
    /// single plain file name is an `Io` error.
    pub fn prepare(&self, out_dir: &Path, target: &TargetSpec) -> Result<StagedArtifact, BuildError> {
        let file_name = self.file_name(target);
        if !is_plain_file_name(&file_name) {
            return Err(BuildError::io(
                format!(
                    "artifact name `{}` of target `{}` is not a plain file name",
                    file_name,
                    target.name()
                ),
                io::Error::from(io::ErrorKind::InvalidInput),
            ));
        }

        let out_dir = std::path::absolute(out_dir).map_err(|e| {
            BuildError::io(
                format!("failed to resolve output directory `{}`", out_dir.display()),
                e,
            )
        })?;

        let staged = self.locate(&out_dir, target);
        let staging_dir = out_dir.join(STAGING_DIR);
        ensure_dir(&staging_dir).map_err(|e| {
            BuildError::io(
                format!("failed to create directory `{}`", staging_dir.display()),
                e,
            )
        })?;

        remove_file_if_exists(staged.staging_path()).map_err(|e| {
            BuildError::io(
                format!(
                    "failed to remove stale staged artifact `{}`",
                    staged.staging_path().display()
                ),
                e,
            )
        })?;

        Ok(staged)
    }
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// An artifact's final and staging locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedArtifact {
    path: PathBuf,
    staging_path: PathBuf,
    output_name: String,
}

impl StagedArtifact {
    /// Final absolute location of the artifact.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where the toolchain is told to write.
    pub fn staging_path(&self) -> &Path {
        &self.staging_path
    }

    /// Move the staged artifact, and any companion files the tool wrote next
    /// to it (import libraries, debug info), into the output directory.
    pub fn commit(&self) -> Result<(), BuildError> {
        if !self.staging_path.is_file() {
            return Err(BuildError::io(
                format!(
                    "toolchain reported success but wrote no artifact at `{}`",
                    self.staging_path.display()
                ),
                io::Error::from(io::ErrorKind::NotFound),
            ));
        }

        for staged in self.companions()? {
            self.promote(&staged)?;
        }
        self.promote(&self.staging_path)?;

        tracing::debug!("committed {}", self.path.display());
        Ok(())
    }

    /// The artifact and every companion it may have in the output directory.
    pub fn installed_files(&self) -> Vec<PathBuf> {
        let out_dir = self.out_dir();
        let mut files = vec![self.path.clone()];
        files.extend(
            COMPANION_EXTENSIONS
                .iter()
                .map(|ext| out_dir.join(format!("{}.{}", self.output_name, ext))),
        );
        files
    }

    /// Remove whatever the failed build left in staging for this artifact.
    pub fn discard(&self) {
        let mut leftovers = self.companions().unwrap_or_default();
        leftovers.push(self.staging_path.clone());
        for path in leftovers {
            if let Err(e) = remove_file_if_exists(&path) {
                tracing::warn!("failed to remove {}: {}", path.display(), e);
            }
        }
    }

    fn staging_dir(&self) -> &Path {
        self.staging_path.parent().unwrap_or(Path::new(""))
    }

    fn out_dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new(""))
    }

    fn companions(&self) -> Result<Vec<PathBuf>, BuildError> {
        let dir = self.staging_dir();
        let entries = fs::read_dir(dir).map_err(|e| {
            BuildError::io(format!("failed to read directory `{}`", dir.display()), e)
        })?;

        let mut companions = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path == self.staging_path || !path.is_file() {
                continue;
            }
            let same_stem = path
                .file_stem()
                .is_some_and(|stem| stem == self.output_name.as_str());
            let known_extension = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| COMPANION_EXTENSIONS.contains(&ext));
            if same_stem && known_extension {
                companions.push(path);
            }
        }
        companions.sort();
        Ok(companions)
    }

    fn promote(&self, staged: &Path) -> Result<(), BuildError> {
        let Some(file_name) = staged.file_name() else {
            return Ok(());
        };
        let dest = self.out_dir().join(file_name);
        fs::rename(staged, &dest).map_err(|e| {
            BuildError::io(
                format!(
                    "failed to move `{}` to `{}`",
                    staged.display(),
                    dest.display()
                ),
                e,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::core::target::TargetKind;
    use tempfile::TempDir;

    fn library() -> TargetSpec {
        TargetSpec::new("DSL_BUILD_SYS", TargetKind::Library, ".")
    }

    fn executable() -> TargetSpec {
        TargetSpec::new("dieselc", TargetKind::Executable, ".")
    }

    #[test]
    fn test_prepare_suffixes_for_every_platform() {
        let tmp = TempDir::new().unwrap();
        for platform in Platform::ALL {
            let stager = ArtifactStager::for_platform(platform);
            let suffixes = platform.suffixes();

            let lib = stager.prepare(tmp.path(), &library()).unwrap();
            let lib_name = lib.path().file_name().unwrap().to_str().unwrap();
            assert!(lib_name.ends_with(suffixes.dynamic_library), "{}", lib_name);

            let exe = stager.prepare(tmp.path(), &executable()).unwrap();
            let exe_name = exe.path().file_name().unwrap().to_str().unwrap();
            assert_eq!(exe_name, format!("dieselc{}", suffixes.executable));
        }
    }

    #[test]
    fn test_unix_executable_has_no_suffix() {
        let stager = ArtifactStager::for_platform(Platform::Unix);
        assert_eq!(stager.file_name(&executable()), "dieselc");
        assert_eq!(stager.file_name(&library()), "DSL_BUILD_SYS.so");
    }

    #[test]
    fn test_prepare_creates_nested_out_dir() {
        let tmp = TempDir::new().unwrap();
        let out_dir = tmp.path().join("build/out/bin");

        let staged = ArtifactStager::new().prepare(&out_dir, &library()).unwrap();

        assert!(out_dir.is_dir());
        assert!(out_dir.join(STAGING_DIR).is_dir());
        assert!(staged.path().is_absolute());
        assert_eq!(staged.path().parent(), Some(out_dir.as_path()));
        assert_eq!(
            staged.staging_path().file_name(),
            staged.path().file_name()
        );
    }

    #[test]
    fn test_prepare_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let stager = ArtifactStager::new();

        let first = stager.prepare(tmp.path(), &executable()).unwrap();
        let second = stager.prepare(tmp.path(), &executable()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_prepare_leaves_unrelated_files_alone() {
        let tmp = TempDir::new().unwrap();
        let notes = tmp.path().join("README.txt");
        fs::write(&notes, "keep me").unwrap();

        ArtifactStager::new().prepare(tmp.path(), &library()).unwrap();

        assert_eq!(fs::read_to_string(&notes).unwrap(), "keep me");
    }

    #[test]
    fn test_commit_replaces_previous_artifact() {
        let tmp = TempDir::new().unwrap();
        let stager = ArtifactStager::for_platform(Platform::Unix);
        let staged = stager.prepare(tmp.path(), &library()).unwrap();

        fs::write(staged.path(), "old").unwrap();
        fs::write(staged.staging_path(), "new").unwrap();
        staged.commit().unwrap();

        assert_eq!(fs::read_to_string(staged.path()).unwrap(), "new");
        assert!(!staged.staging_path().exists());
    }

    #[test]
    fn test_commit_moves_companion_files() {
        let tmp = TempDir::new().unwrap();
        let stager = ArtifactStager::for_platform(Platform::Windows);
        let staged = stager.prepare(tmp.path(), &library()).unwrap();
        let staging_dir = tmp.path().join(STAGING_DIR);

        fs::write(staged.staging_path(), "dll").unwrap();
        fs::write(staging_dir.join("DSL_BUILD_SYS.lib"), "import lib").unwrap();
        fs::write(staging_dir.join("other.pdb"), "not ours").unwrap();
        staged.commit().unwrap();

        assert!(tmp.path().join("DSL_BUILD_SYS.dll").is_file());
        assert!(tmp.path().join("DSL_BUILD_SYS.lib").is_file());
        assert!(staging_dir.join("other.pdb").is_file());
    }

    #[test]
    fn test_commit_leaves_unknown_same_stem_files_in_staging() {
        let tmp = TempDir::new().unwrap();
        let stager = ArtifactStager::for_platform(Platform::Unix);
        let staged = stager.prepare(tmp.path(), &executable()).unwrap();
        let staging_dir = tmp.path().join(STAGING_DIR);

        fs::write(staged.staging_path(), "exe").unwrap();
        fs::write(staging_dir.join("dieselc.txt"), "scratch").unwrap();
        staged.commit().unwrap();

        assert!(staging_dir.join("dieselc.txt").is_file());
        assert!(!tmp.path().join("dieselc.txt").exists());
    }

    #[test]
    fn test_installed_files_lists_artifact_and_companions() {
        let tmp = TempDir::new().unwrap();
        let stager = ArtifactStager::for_platform(Platform::Windows);
        let staged = stager.locate(tmp.path(), &library());

        let files = staged.installed_files();

        assert_eq!(files[0], tmp.path().join("DSL_BUILD_SYS.dll"));
        assert!(files.contains(&tmp.path().join("DSL_BUILD_SYS.lib")));
        assert!(files.contains(&tmp.path().join("DSL_BUILD_SYS.pdb")));
        assert!(files.iter().all(|f| f.parent() == Some(tmp.path())));
    }

    #[test]
    fn test_prepare_rejects_names_outside_staging() {
        let tmp = TempDir::new().unwrap();
        let notes = tmp.path().join("notes.txt");
        fs::write(&notes, "keep me").unwrap();
        let stager = ArtifactStager::for_platform(Platform::Unix);

        for bad in ["../notes.txt", "sub/app", ".."] {
            let target = executable().with_output_name(bad);
            let err = stager.prepare(tmp.path(), &target).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Io, "{}", bad);
        }

        assert_eq!(fs::read_to_string(&notes).unwrap(), "keep me");
        assert!(!tmp.path().join(STAGING_DIR).exists());
    }

    #[test]
    fn test_commit_without_output_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let staged = ArtifactStager::new().prepare(tmp.path(), &executable()).unwrap();

        let err = staged.commit().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(!staged.path().exists());
    }

    #[test]
    fn test_discard_keeps_previous_artifact() {
        let tmp = TempDir::new().unwrap();
        let stager = ArtifactStager::for_platform(Platform::Unix);
        let staged = stager.prepare(tmp.path(), &library()).unwrap();

        fs::write(staged.path(), "good").unwrap();
        fs::write(staged.staging_path(), "partial").unwrap();
        staged.discard();

        assert_eq!(fs::read_to_string(staged.path()).unwrap(), "good");
        assert!(!staged.staging_path().exists());
    }
}

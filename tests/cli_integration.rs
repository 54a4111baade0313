//! CLI integration tests for Kiln.
//!
//! A shell script named `odin` stands in for the real compiler. It writes
//! the file named by `-out:`, echoes to both streams, and exits with `N`
//! when given `-fail:N`.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

const FAKE_ODIN: &str = r#"#!/bin/sh
out=""
code=""
for arg in "$@"; do
  case "$arg" in
    -out:*) out="${arg#-out:}" ;;
    -fail:*) code="${arg#-fail:}" ;;
  esac
done
echo "odin: building $2 in $(basename "$(pwd)")"
echo "odin: checking $2" >&2
if [ -n "$code" ]; then
  echo "odin: forced failure" >&2
  exit "$code"
fi
printf 'artifact' > "$out"
"#;

struct Fixture {
    _tmp: TempDir,
    root: PathBuf,
    tools: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("project");
        let tools = tmp.path().join("tools");
        fs::create_dir_all(root.join("BuildSystem")).unwrap();
        fs::create_dir_all(&tools).unwrap();

        let odin = tools.join("odin");
        fs::write(&odin, FAKE_ODIN).unwrap();
        fs::set_permissions(&odin, fs::Permissions::from_mode(0o755)).unwrap();

        Fixture {
            _tmp: tmp,
            root,
            tools,
        }
    }

    fn manifest(&self, contents: &str) {
        fs::write(self.root.join("Kiln.toml"), contents).unwrap();
    }

    fn kiln(&self) -> Command {
        let mut cmd = Command::cargo_bin("kiln").unwrap();
        cmd.current_dir(&self.root)
            .env("PATH", format!("{}:/usr/bin:/bin", self.tools.display()))
            .env_remove("KILN_TOOL");
        cmd
    }

    fn bin(&self) -> PathBuf {
        self.root.join("bin")
    }
}

fn lib_name(name: &str) -> String {
    if cfg!(target_os = "macos") {
        format!("{}.dylib", name)
    } else {
        format!("{}.so", name)
    }
}

fn exists(path: &Path) -> bool {
    path.is_file()
}

const TWO_TARGETS: &str = r#"
[[target]]
name = "core"
kind = "library"
working-dir = "BuildSystem"

[[target]]
name = "app"
kind = "executable"
"#;

// ============================================================================
// kiln build
// ============================================================================

#[test]
fn test_no_arguments_builds_default_targets() {
    let fx = Fixture::new();

    fx.kiln()
        .assert()
        .success()
        .stdout(predicate::str::contains("odin: building . in BuildSystem"))
        .stdout(predicate::str::contains("odin: building . in project"))
        .stderr(predicate::str::contains("odin: checking ."))
        .stderr(predicate::str::contains("Building"))
        .stderr(predicate::str::contains("Finished"));

    assert!(exists(&fx.bin().join(lib_name("DSL_BUILD_SYS"))));
    assert!(exists(&fx.bin().join("dieselc")));
}

#[test]
fn test_build_with_manifest() {
    let fx = Fixture::new();
    fx.manifest(TWO_TARGETS);

    fx.kiln().arg("build").assert().success();

    assert!(exists(&fx.bin().join(lib_name("core"))));
    assert!(exists(&fx.bin().join("app")));
    assert!(!fx.bin().join(".kiln-staging").join("app").exists());
}

#[test]
fn test_library_failure_stops_and_propagates_exit_code() {
    let fx = Fixture::new();
    fx.manifest(
        r#"
[[target]]
name = "core"
kind = "library"
working-dir = "BuildSystem"
extra-args = ["-fail:3"]

[[target]]
name = "app"
kind = "executable"
"#,
    );

    fx.kiln()
        .assert()
        .code(3)
        .stderr(predicate::str::contains("odin: forced failure"))
        .stderr(predicate::str::contains("target `core` failed"))
        .stdout(predicate::str::contains("in project").not());

    assert!(!fx.bin().join("app").exists());
    assert!(!fx.bin().join(lib_name("core")).exists());
}

#[test]
fn test_missing_tool_fails_cleanly() {
    let fx = Fixture::new();
    fx.manifest(TWO_TARGETS);

    fx.kiln()
        .args(["--tool", "kiln-test-missing-tool"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("`kiln-test-missing-tool` was not found"));
}

#[test]
fn test_tool_from_environment() {
    let fx = Fixture::new();
    fx.manifest(TWO_TARGETS);

    fx.kiln()
        .env("KILN_TOOL", "kiln-test-missing-tool")
        .assert()
        .failure()
        .stderr(predicate::str::contains("kiln-test-missing-tool"));
}

#[test]
fn test_build_selected_target() {
    let fx = Fixture::new();
    fx.manifest(TWO_TARGETS);

    fx.kiln().args(["build", "--target", "app"]).assert().success();

    assert!(exists(&fx.bin().join("app")));
    assert!(!fx.bin().join(lib_name("core")).exists());
}

#[test]
fn test_unknown_target_is_error() {
    let fx = Fixture::new();
    fx.manifest(TWO_TARGETS);

    fx.kiln()
        .args(["build", "--target", "nope"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no target named `nope`"));
}

#[test]
fn test_invalid_manifest_is_error() {
    let fx = Fixture::new();
    fx.manifest("[[target]]\nname = \"x\"\nkind = \"archive\"\n");

    fx.kiln()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to parse config"));
}

#[test]
fn test_output_name_with_path_is_rejected() {
    let fx = Fixture::new();
    fx.manifest(
        r#"
[[target]]
name = "app"
kind = "executable"
output-name = "../notes.txt"
"#,
    );
    fs::write(fx.root.join("notes.txt"), "keep").unwrap();

    fx.kiln()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid config"))
        .stderr(predicate::str::contains("output-name"));

    assert_eq!(fs::read_to_string(fx.root.join("notes.txt")).unwrap(), "keep");
    assert!(!fx.bin().exists());
}

#[test]
fn test_out_dir_override() {
    let fx = Fixture::new();
    fx.manifest(TWO_TARGETS);

    fx.kiln().args(["--out-dir", "dist"]).assert().success();

    assert!(exists(&fx.root.join("dist").join("app")));
    assert!(!fx.bin().exists());
}

// ============================================================================
// kiln plan
// ============================================================================

#[test]
fn test_plan_prints_commands_without_building() {
    let fx = Fixture::new();
    fx.manifest(TWO_TARGETS);

    fx.kiln()
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("# core (library)"))
        .stdout(predicate::str::contains("odin build . -out:"))
        .stdout(predicate::str::contains("-build-mode:dynamic"));

    assert!(!fx.bin().exists());
}

// ============================================================================
// kiln clean
// ============================================================================

#[test]
fn test_clean_removes_only_kiln_artifacts() {
    let fx = Fixture::new();
    fx.manifest(TWO_TARGETS);

    fx.kiln().assert().success();
    fs::write(fx.bin().join("notes.txt"), "keep").unwrap();
    fs::write(fx.bin().join("app.pdb"), "debug info").unwrap();
    fs::write(fx.bin().join("app.md"), "keep").unwrap();

    fx.kiln()
        .arg("clean")
        .assert()
        .success()
        .stderr(predicate::str::contains("Removed"));

    assert!(!fx.bin().join("app").exists());
    assert!(!fx.bin().join(lib_name("core")).exists());
    assert!(!fx.bin().join(".kiln-staging").exists());
    assert!(!fx.bin().join("app.pdb").exists());
    assert!(exists(&fx.bin().join("notes.txt")));
    assert!(exists(&fx.bin().join("app.md")));
}

//! Subprocess execution with live output relay.
//!
//! [`SystemRunner`] resolves the tool on the search path, spawns it through a
//! [`Launcher`], drains stdout and stderr on two scoped threads, and waits for
//! the child in exactly one place. Every failure is folded into the returned
//! [`BuildResult`].

use std::ffi::{OsStr, OsString};
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crate::core::error::{BuildError, NO_EXIT_CODE};
use crate::core::result::BuildResult;
use crate::core::target::TargetSpec;
use crate::util::shell::{OutputSink, Stream};

/// One toolchain invocation: program, arguments and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    cwd: PathBuf,
}

impl Invocation {
    /// Create an invocation of `program` run from `cwd`.
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Invocation {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// The program as given, before search-path resolution.
    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Display the command for messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }

    fn build_command(&self, resolved: &Path) -> Command {
        let mut cmd = Command::new(resolved);
        cmd.args(&self.args)
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

/// Runs one target's toolchain invocation to completion.
pub trait ProcessRunner {
    fn run(&self, target: &TargetSpec, invocation: &Invocation) -> BuildResult;
}

/// Creates the child process. Split out so tests can observe spawn attempts.
pub trait Launcher: Send + Sync {
    fn launch(&self, command: &mut Command) -> io::Result<Child>;
}

/// Launches through [`Command::spawn`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StdLauncher;

impl Launcher for StdLauncher {
    fn launch(&self, command: &mut Command) -> io::Result<Child> {
        command.spawn()
    }
}

/// Resolves tool names to executables.
#[derive(Debug, Clone, Default)]
pub struct ToolResolver {
    search_path: Option<OsString>,
}

impl ToolResolver {
    /// Resolve against the `PATH` of this process.
    pub fn from_env() -> Self {
        ToolResolver::default()
    }

    /// Resolve against an explicit search path instead of `PATH`.
    pub fn with_search_path(search_path: impl Into<OsString>) -> Self {
        ToolResolver {
            search_path: Some(search_path.into()),
        }
    }

    /// Find `tool`. Names containing a path separator resolve against `cwd`.
    pub fn resolve(&self, tool: &str, cwd: &Path) -> Option<PathBuf> {
        let search_path = self
            .search_path
            .clone()
            .or_else(|| std::env::var_os("PATH"));
        which::which_in(tool, search_path, cwd).ok()
    }
}

/// [`ProcessRunner`] backed by real child processes.
pub struct SystemRunner<L = StdLauncher> {
    resolver: ToolResolver,
    launcher: L,
    sink: Arc<dyn OutputSink>,
}

impl SystemRunner<StdLauncher> {
    /// Create a runner relaying child output to `sink`.
    pub fn new(sink: Arc<dyn OutputSink>) -> Self {
        SystemRunner {
            resolver: ToolResolver::from_env(),
            launcher: StdLauncher,
            sink,
        }
    }
}

impl<L: Launcher> SystemRunner<L> {
    pub fn with_launcher<M: Launcher>(self, launcher: M) -> SystemRunner<M> {
        SystemRunner {
            resolver: self.resolver,
            launcher,
            sink: self.sink,
        }
    }

    pub fn with_resolver(mut self, resolver: ToolResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    fn execute(&self, invocation: &Invocation) -> Result<(), BuildError> {
        let program = self
            .resolver
            .resolve(invocation.program(), invocation.cwd())
            .ok_or_else(|| BuildError::ToolNotFound {
                tool: invocation.program().to_string(),
            })?;

        tracing::debug!(
            "running `{}` in {} (resolved to {})",
            invocation.display_command(),
            invocation.cwd().display(),
            program.display()
        );

        let mut command = invocation.build_command(&program);
        let mut child =
            self.launcher
                .launch(&mut command)
                .map_err(|source| BuildError::SpawnFailed {
                    program: invocation.program().to_string(),
                    source,
                })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let sink: &dyn OutputSink = &*self.sink;

        let (stdout_relay, stderr_relay) = thread::scope(|scope| {
            let out = scope.spawn(move || relay_stream(stdout, Stream::Stdout, sink));
            let err = scope.spawn(move || relay_stream(stderr, Stream::Stderr, sink));
            (join_relay(out, Stream::Stdout), join_relay(err, Stream::Stderr))
        });

        let read_failure = [&stdout_relay, &stderr_relay]
            .into_iter()
            .find_map(|relay| match relay {
                Err(RelayFailure::Read(stream, e)) => Some((*stream, e.kind())),
                _ => None,
            });
        if read_failure.is_some() {
            // The child may be blocked on a pipe nobody drains any more.
            let _ = child.kill();
        }

        let status = child.wait().map_err(|source| {
            BuildError::io(
                format!("failed to wait for `{}`", invocation.program()),
                source,
            )
        })?;

        if let Some((stream, kind)) = read_failure {
            return Err(BuildError::io(
                format!(
                    "failed to read {} of `{}`",
                    stream_name(stream),
                    invocation.program()
                ),
                io::Error::from(kind),
            ));
        }

        match termination(status) {
            Termination::Exited(0) => {}
            Termination::Exited(code) => {
                return Err(BuildError::ToolExitedNonZero {
                    program: invocation.program().to_string(),
                    code,
                })
            }
            Termination::Crashed { code, detail } => {
                return Err(BuildError::Crashed {
                    program: invocation.program().to_string(),
                    code,
                    detail,
                })
            }
        }

        for relay in [stdout_relay, stderr_relay] {
            if let Err(RelayFailure::Write(stream, source)) = relay {
                return Err(BuildError::io(
                    format!(
                        "failed to relay {} of `{}`",
                        stream_name(stream),
                        invocation.program()
                    ),
                    source,
                ));
            }
        }

        Ok(())
    }
}

impl<L: Launcher> ProcessRunner for SystemRunner<L> {
    fn run(&self, target: &TargetSpec, invocation: &Invocation) -> BuildResult {
        let start = Instant::now();
        match self.execute(invocation) {
            Ok(()) => BuildResult::success(target, start.elapsed()),
            Err(err) => {
                tracing::debug!("target `{}` failed: {}", target.name(), err);
                BuildResult::from_error(target, &err, start.elapsed())
            }
        }
    }
}

#[derive(Debug)]
enum RelayFailure {
    Read(Stream, io::Error),
    Write(Stream, io::Error),
}

/// Forward `reader` line by line until EOF.
///
/// A sink failure does not stop the draining, otherwise the child could
/// block forever on a full pipe.
fn relay_stream<R: Read>(
    reader: Option<R>,
    stream: Stream,
    sink: &dyn OutputSink,
) -> Result<(), RelayFailure> {
    let Some(reader) = reader else {
        return Ok(());
    };
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    let mut write_error = None;

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => {
                if write_error.is_none() {
                    if let Err(e) = sink.write_line(stream, &line) {
                        write_error = Some(e);
                    }
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(RelayFailure::Read(stream, e)),
        }
    }

    match write_error {
        Some(e) => Err(RelayFailure::Write(stream, e)),
        None => Ok(()),
    }
}

fn join_relay(
    handle: thread::ScopedJoinHandle<'_, Result<(), RelayFailure>>,
    stream: Stream,
) -> Result<(), RelayFailure> {
    handle.join().unwrap_or_else(|_| {
        Err(RelayFailure::Read(
            stream,
            io::Error::other("relay thread panicked"),
        ))
    })
}

fn stream_name(stream: Stream) -> &'static str {
    match stream {
        Stream::Stdout => "stdout",
        Stream::Stderr => "stderr",
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Termination {
    Exited(i32),
    Crashed { code: i32, detail: String },
}

fn termination(status: ExitStatus) -> Termination {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            let detail = if status.core_dumped() {
                format!("signal {}, core dumped", signal)
            } else {
                format!("signal {}", signal)
            };
            return Termination::Crashed {
                code: 128 + signal,
                detail,
            };
        }
    }

    match status.code() {
        Some(code) if cfg!(windows) && is_ntstatus_error(code) => Termination::Crashed {
            code,
            detail: format!("status {:#010x}", code as u32),
        },
        Some(code) => Termination::Exited(code),
        None => Termination::Crashed {
            code: NO_EXIT_CODE,
            detail: "no exit status".to_string(),
        },
    }
}

/// Windows reports faults such as access violations as NTSTATUS codes with
/// the error severity bits set.
fn is_ntstatus_error(code: i32) -> bool {
    (code as u32) & 0xC000_0000 == 0xC000_0000
}

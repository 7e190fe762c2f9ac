//! Child process orchestration.
//!
//! Commands are spawned without waiting, handed back as opaque
//! [`ProcessHandle`]s, and joined later. Nothing is tracked about a child
//! beyond its handle; exit status is only learned by waiting.

use crate::error::{BuildError, Result};
use crate::log::Logger;
use nix::sys::signal::Signal;
use std::fs::OpenOptions;
use std::os::fd::{AsRawFd, OwnedFd};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};

/// Where a child's stdout goes.
#[derive(Debug, Default)]
pub enum Output {
    #[default]
    Inherit,
    /// An already-open descriptor, e.g. the write end of a pipe
    Fd(OwnedFd),
    /// A file that is created or truncated for the child
    Path(PathBuf),
}

/// An ordered list of arguments plus an optional stdout redirection.
#[derive(Debug, Default)]
pub struct Cmd {
    args: Vec<String>,
    output: Output,
}

impl Cmd {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    pub fn extend<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn append_cmd(&mut self, other: &Cmd) -> &mut Self {
        self.args.extend(other.args.iter().cloned());
        self
    }

    pub fn set_output(&mut self, output: Output) -> &mut Self {
        self.output = output;
        self
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn output(&self) -> &Output {
        &self.output
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Clears arguments and redirection but keeps the allocation.
    pub fn reset(&mut self) {
        self.args.clear();
        self.output = Output::Inherit;
    }

    /// One-line shell-ish rendering for logs; arguments with spaces are single-quoted.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            if arg.contains(' ') {
                out.push('\'');
                out.push_str(arg);
                out.push('\'');
            } else {
                out.push_str(arg);
            }
        }
        out
    }

    /// Appends `args`, runs the command to completion, then resets it for reuse.
    pub fn run<I, S>(&mut self, log: &Logger, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extend(args);
        let result = run_sync(log, self);
        self.reset();
        result
    }
}

/// Opaque handle to a spawned child. [`ProcessHandle::INVALID`] marks a
/// command that never started.
#[derive(Debug)]
pub struct ProcessHandle(Option<Child>);

impl ProcessHandle {
    pub const INVALID: ProcessHandle = ProcessHandle(None);

    pub fn is_valid(&self) -> bool {
        self.0.is_some()
    }

    pub fn pid(&self) -> Option<u32> {
        self.0.as_ref().map(Child::id)
    }
}

/// Starts `cmd` without waiting for it.
///
/// On failure the error is logged and [`ProcessHandle::INVALID`] is returned;
/// waiting on it reports failure immediately.
pub fn spawn_async(log: &Logger, cmd: &Cmd) -> ProcessHandle {
    match spawn(log, cmd) {
        Ok(child) => ProcessHandle(Some(child)),
        Err(_) => ProcessHandle::INVALID,
    }
}

fn spawn(log: &Logger, cmd: &Cmd) -> Result<Child> {
    debug_assert!(!cmd.is_empty(), "cannot run an empty command");
    let Some((program, rest)) = cmd.args.split_first() else {
        let err = BuildError::EmptyCommand;
        log.error(&err);
        return Err(err);
    };

    log.info(format!("CMD: {}", cmd.render()));

    let mut child = Command::new(program);
    child.args(rest);

    match &cmd.output {
        Output::Inherit => {}
        Output::Fd(fd) => {
            // stdin/stdout descriptors mean "leave stdout alone"
            if fd.as_raw_fd() > 1 {
                let dup = fd
                    .try_clone()
                    .map_err(|e| logged(log, BuildError::io("duplicate output descriptor for", program, e)))?;
                child.stdout(Stdio::from(dup));
            }
        }
        Output::Path(path) => {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o755)
                .open(path)
                .map_err(|e| logged(log, BuildError::io("open for command output", path, e)))?;
            child.stdout(Stdio::from(file));
        }
    }

    child.spawn().map_err(|source| {
        logged(
            log,
            BuildError::Spawn {
                program: program.clone(),
                source,
            },
        )
    })
}

fn logged(log: &Logger, err: BuildError) -> BuildError {
    log.error(&err);
    err
}

/// Blocks until the child exits and returns its raw status.
pub(crate) fn reap(log: &Logger, handle: ProcessHandle) -> Result<ExitStatus> {
    let Some(mut child) = handle.0 else {
        return Err(BuildError::InvalidProcess);
    };
    let pid = child.id();
    child.wait().map_err(|e| {
        logged(
            log,
            BuildError::io("wait on command with pid", pid.to_string(), e),
        )
    })
}

/// Waits for one child. Success means it exited with status 0.
pub fn wait(log: &Logger, handle: ProcessHandle) -> Result<()> {
    let status = reap(log, handle)?;
    if status.success() {
        return Ok(());
    }
    let err = match (status.code(), status.signal()) {
        (Some(code), _) => BuildError::Exited { code },
        (None, Some(sig)) => BuildError::Signaled {
            signal: signal_name(sig),
        },
        (None, None) => BuildError::Exited { code: -1 },
    };
    Err(logged(log, err))
}

fn signal_name(sig: i32) -> String {
    match Signal::try_from(sig) {
        Ok(signal) => signal.as_str().to_string(),
        Err(_) => format!("signal {}", sig),
    }
}

/// Waits for every handle, even after a failure, so no child is left unreaped.
pub fn wait_all(log: &Logger, handles: Vec<ProcessHandle>) -> Result<()> {
    let total = handles.len();
    let failed = handles
        .into_iter()
        .map(|h| wait(log, h))
        .filter(Result::is_err)
        .count();

    if failed == 0 {
        Ok(())
    } else {
        Err(BuildError::Partial {
            what: "child processes",
            failed,
            total,
        })
    }
}

/// Spawns and waits. Spawn failures come back as the error that caused them.
pub fn run_sync(log: &Logger, cmd: &Cmd) -> Result<()> {
    let child = spawn(log, cmd)?;
    wait(log, ProcessHandle(Some(child)))
}

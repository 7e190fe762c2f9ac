use crate::files::FileKind;
use std::io;
use std::path::PathBuf;

/// Error type for build engine operations.
///
/// Every variant has already been written to the [`Logger`](crate::log::Logger)
/// by the time it is returned; callers only decide what to do next.
#[derive(Debug)]
pub enum BuildError {
    /// A filesystem or OS call failed for a reason other than "not found"
    Io {
        action: &'static str,
        path: PathBuf,
        source: io::Error,
    },
    /// Tried to run a command with no arguments
    EmptyCommand,
    /// The OS refused to start the child process
    Spawn { program: String, source: io::Error },
    /// Waited on a handle that was never spawned
    InvalidProcess,
    /// Child ran to completion with a nonzero status
    Exited { code: i32 },
    /// Child was killed by a signal
    Signaled { signal: String },
    /// A path exists but is not the kind of file the operation needs
    WrongKind { path: PathBuf, kind: FileKind },
    /// The visitor asked the walk to stop early
    Stopped { root: PathBuf },
    /// Some sub-operations of an aggregate failed; the rest still ran
    Partial {
        what: &'static str,
        failed: usize,
        total: usize,
    },
    /// Program arguments did not include the binary path
    NoProgramPath,
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::Io {
                action,
                path,
                source,
            } => write!(f, "could not {} `{}`: {}", action, path.display(), source),
            BuildError::EmptyCommand => write!(f, "could not run empty command"),
            BuildError::Spawn { program, source } => {
                write!(f, "could not start `{}`: {}", program, source)
            }
            BuildError::InvalidProcess => write!(f, "invalid process handle"),
            BuildError::Exited { code } => write!(f, "command exited with exit code {}", code),
            BuildError::Signaled { signal } => {
                write!(f, "command process was terminated by {}", signal)
            }
            BuildError::WrongKind { path, kind } => write!(
                f,
                "`{}` already exists and is a {} file",
                path.display(),
                kind
            ),
            BuildError::Stopped { root } => write!(f, "walk of `{}` was stopped", root.display()),
            BuildError::Partial {
                what,
                failed,
                total,
            } => write!(f, "{} of {} {} failed", failed, total, what),
            BuildError::NoProgramPath => write!(f, "program arguments are missing argv[0]"),
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuildError::Io { source, .. } | BuildError::Spawn { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl BuildError {
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        BuildError::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = BuildError> = std::result::Result<T, E>;

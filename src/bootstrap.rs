//! Self-rebuilding build programs.
//!
//! A build program here is one produced by `cc -o <binary> <flags> <source>`
//! from a single source file, typically a C `build.c`. Such a program calls
//! [`rebuild_yourself`] first thing in `main`: each run asks the compiler which
//! headers the source pulls in, and when the running binary is older than any
//! of them it recompiles itself in place and re-runs with the same arguments.
//!
//! A program built some other way (a Rust binary built by cargo, for one)
//! must not call [`rebuild_yourself`], since the recompile would overwrite it
//! with whatever `cc` makes of [`SelfRebuild::source`]. It can still keep a
//! separate build program current with [`needs_rebuild`] and [`rebuild`].

use crate::error::{BuildError, Result};
use crate::files::{delete, file_exists, read_from, rename};
use crate::freshness::{is_stale, parse_dependency_record};
use crate::log::{Level, Logger};
use crate::process::{self, Cmd, Output, run_sync, spawn_async};
use std::ffi::OsString;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};

/// First program argument that forces a rebuild without relaunching.
pub const FORCE_REBUILD_ARG: &str = "nom_rebuild";

pub const DEFAULT_CC: &str = "cc";

/// Dependency-only mode: print a make rule for the source on stdout.
pub const DEFAULT_PROBE_ARGS: &[&str] = &["-MM", "-o", "-"];

pub const DEFAULT_FLAGS: &[&str] = &[
    "-Wall",
    "-Wextra",
    "-pedantic",
    "-Wshadow",
    "-Wformat=2",
    "-Wno-unused-parameter",
    "-Wno-unused-function",
    "-Wno-implicit-fallthrough",
];

/// How the build program compiles itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfRebuild {
    pub cc: String,
    pub flags: Vec<String>,
    /// The build program's own source file
    pub source: PathBuf,
    /// Arguments that make `cc` print the source's dependency rule on stdout
    /// instead of compiling it
    pub probe_args: Vec<String>,
    /// Honor [`FORCE_REBUILD_ARG`]
    pub allow_force: bool,
}

impl SelfRebuild {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            cc: DEFAULT_CC.to_string(),
            flags: DEFAULT_FLAGS.iter().map(|f| f.to_string()).collect(),
            source: source.into(),
            probe_args: DEFAULT_PROBE_ARGS.iter().map(|a| a.to_string()).collect(),
            allow_force: false,
        }
    }
}

/// Rebuilds and re-runs the current program if its source changed.
///
/// `args[0]` must be a binary that `spec` builds; see the module docs.
/// Returns only when the binary is up to date. Otherwise the process exits:
/// with the relaunched binary's status after a successful rebuild, or with 1
/// if the rebuild failed (the previous binary is put back first).
pub fn rebuild_yourself(log: &Logger, args: &[String], spec: &SelfRebuild) {
    let Some(binary) = args.first().map(Path::new) else {
        log.error(BuildError::NoProgramPath);
        std::process::exit(1);
    };

    if spec.allow_force && args.get(1).is_some_and(|a| a == FORCE_REBUILD_ARG) {
        let code = if rebuild(log, binary, spec).is_ok() { 0 } else { 1 };
        std::process::exit(code);
    }

    if !needs_rebuild(log, binary, spec) {
        return;
    }
    if rebuild(log, binary, spec).is_err() {
        std::process::exit(1);
    }
    std::process::exit(relaunch(log, args));
}

/// Whether `binary` is older than its source or any header the source includes.
/// A failed dependency probe counts as stale.
pub fn needs_rebuild(log: &Logger, binary: &Path, spec: &SelfRebuild) -> bool {
    match probe_dependencies(log, spec) {
        Some(deps) if !deps.is_empty() => is_stale(log, binary, &deps),
        _ => true,
    }
}

/// Runs `cc` in dependency-only mode on the program source and returns the
/// files it depends on.
pub fn probe_dependencies(log: &Logger, spec: &SelfRebuild) -> Option<Vec<String>> {
    let (reader, writer) = match io::pipe() {
        Ok(pipe) => pipe,
        Err(e) => {
            log.error(format!("could not create pipe: {}", e));
            return None;
        }
    };

    let mut cmd = Cmd::new();
    cmd.append(&spec.cc)
        .extend(spec.probe_args.iter().cloned())
        .extend(spec.flags.iter().cloned())
        .append(spec.source.to_string_lossy())
        .set_output(Output::Fd(writer.into()));

    let handle = log.quieted(Level::Error, || spawn_async(log, &cmd));
    // Close our copy of the write end so the read below sees EOF.
    drop(cmd);

    let record = read_from(log, reader);
    let probed = log.quieted(Level::Error, || process::wait(log, handle));
    if probed.is_err() {
        return None;
    }
    record.map(|r| parse_dependency_record(&r))
}

/// Recompiles the program to `binary` without relaunching it.
///
/// The old binary is moved to `<binary>.old` for the duration of the compile
/// and restored if the compile fails, so a working binary is always left behind.
pub fn rebuild(log: &Logger, binary: &Path, spec: &SelfRebuild) -> Result<()> {
    let backup = backup_path(binary);
    let had_binary = file_exists(log, binary);
    if had_binary {
        rename(log, binary, &backup)?;
    }

    let mut cmd = Cmd::new();
    cmd.append(&spec.cc)
        .append("-o")
        .append(binary.to_string_lossy())
        .extend(spec.flags.iter().cloned())
        .append(spec.source.to_string_lossy());

    if let Err(err) = run_sync(log, &cmd) {
        if had_binary {
            let _ = rename(log, &backup, binary);
        }
        return Err(err);
    }

    if had_binary {
        // Already logged; a leftover backup does not make the new binary unusable.
        let _ = delete(log, &backup);
    }
    Ok(())
}

fn backup_path(binary: &Path) -> PathBuf {
    let mut os: OsString = binary.as_os_str().to_owned();
    os.push(".old");
    PathBuf::from(os)
}

/// Runs `args` as a child and returns the status to exit with.
fn relaunch(log: &Logger, args: &[String]) -> i32 {
    let mut cmd = Cmd::new();
    cmd.extend(args.iter().cloned());
    let handle = spawn_async(log, &cmd);
    match process::reap(log, handle) {
        Ok(status) => status
            .code()
            .or_else(|| status.signal().map(|s| 128 + s))
            .unwrap_or(1),
        Err(_) => 1,
    }
}

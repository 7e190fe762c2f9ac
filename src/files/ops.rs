use super::{FileKind, Walk, walk_tree};
use crate::error::{BuildError, Result};
use crate::log::Logger;
use std::collections::VecDeque;
use std::fs::{self, DirBuilder};
use std::io::{self, Read};
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

const DIR_MODE: u32 = 0o755;

pub fn file_kind(log: &Logger, path: &Path) -> FileKind {
    match fs::metadata(path) {
        Ok(meta) => FileKind::from_metadata(&meta),
        Err(e) => {
            log.error(BuildError::io("stat", path, e));
            FileKind::Failed
        }
    }
}

pub fn file_exists(log: &Logger, path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(_) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            log.error(BuildError::io("check if exists", path, e));
            false
        }
    }
}

/// Reads a whole file. `None` if it is missing (silently) or unreadable (logged).
pub fn read_file(log: &Logger, path: &Path) -> Option<String> {
    match fs::read(path) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => {
            log.error(BuildError::io("read", path, e));
            None
        }
    }
}

/// Drains a reader such as the read end of a pipe.
pub fn read_from(log: &Logger, mut reader: impl Read) -> Option<String> {
    let mut bytes = Vec::new();
    match reader.read_to_end(&mut bytes) {
        Ok(_) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            log.error(format!("could not read from pipe: {}", e));
            None
        }
    }
}

pub fn write_file(log: &Logger, path: &Path, data: impl AsRef<[u8]>) -> Result<()> {
    fs::write(path, data).map_err(|e| {
        let err = BuildError::io("write", path, e);
        log.error(&err);
        err
    })?;
    log.info(format!("created file `{}`", path.display()));
    Ok(())
}

pub fn current_dir(log: &Logger) -> Result<PathBuf> {
    std::env::current_dir().map_err(|e| {
        let err = BuildError::io("get current directory", ".", e);
        log.error(&err);
        err
    })
}

pub fn rename(log: &Logger, from: &Path, to: &Path) -> Result<()> {
    log.info(format!("renaming {} -> {}", from.display(), to.display()));
    fs::rename(from, to).map_err(|e| {
        let err = BuildError::io("rename", from, e);
        log.error(format!("{} to `{}`", err, to.display()));
        err
    })
}

/// Creates `path` and any missing parents.
///
/// An existing directory is success; an existing file of any other kind, at
/// any level, is an error.
pub fn mkdir_recursive(log: &Logger, path: &Path) -> Result<()> {
    let mut builder = DirBuilder::new();
    builder.mode(DIR_MODE);

    // Fast path: the parent usually exists.
    match builder.create(path) {
        Ok(()) => {
            log.info(format!("created directory `{}`", path.display()));
            return Ok(());
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return expect_dir(log, path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(fail(log, BuildError::io("create directory", path, e))),
    }

    // Walk upwards until a parent can be created, remembering what is missing.
    let mut missing = vec![path];
    let mut current = path;
    loop {
        let parent = match current.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => {
                return Err(fail(
                    log,
                    BuildError::io(
                        "create directory",
                        path,
                        io::Error::new(io::ErrorKind::NotFound, "no existing parent directory"),
                    ),
                ));
            }
        };
        match builder.create(parent) {
            Ok(()) => {
                log.info(format!("created directory `{}`", parent.display()));
                break;
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                expect_dir(log, parent)?;
                break;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                missing.push(parent);
                current = parent;
            }
            Err(e) => return Err(fail(log, BuildError::io("create directory", parent, e))),
        }
    }

    for dir in missing.into_iter().rev() {
        match builder.create(dir) {
            Ok(()) => log.info(format!("created directory `{}`", dir.display())),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => expect_dir(log, dir)?,
            Err(e) => return Err(fail(log, BuildError::io("create directory", dir, e))),
        }
    }
    Ok(())
}

fn expect_dir(log: &Logger, path: &Path) -> Result<()> {
    match file_kind(log, path) {
        FileKind::Directory => Ok(()),
        FileKind::Failed => Err(BuildError::WrongKind {
            path: path.to_path_buf(),
            kind: FileKind::Failed,
        }),
        kind => Err(fail(
            log,
            BuildError::WrongKind {
                path: path.to_path_buf(),
                kind,
            },
        )),
    }
}

fn fail(log: &Logger, err: BuildError) -> BuildError {
    log.error(&err);
    err
}

/// Removes a file or a whole directory tree. A missing path is success.
///
/// A symbolic link is removed itself, never what it points to.
pub fn delete(log: &Logger, path: &Path) -> Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(fail(log, BuildError::io("stat", path, e))),
    };

    if meta.file_type().is_dir() {
        return delete_dir(log, path);
    }
    fs::remove_file(path).map_err(|e| fail(log, BuildError::io("remove", path, e)))?;
    log.info(format!("deleted file `{}`", path.display()));
    Ok(())
}

/// Removes a directory tree bottom-up.
///
/// Files and links are unlinked as the walk meets them; directories are
/// queued at the front and removed afterwards from the front, so children
/// always go before their parents. Every removal is attempted even after a
/// failure, and the failures are reported together.
pub fn delete_dir(log: &Logger, root: &Path) -> Result<()> {
    let mut dirs: VecDeque<PathBuf> = VecDeque::new();
    let mut failed = 0usize;
    let mut total = 0usize;

    let walked = walk_tree(log, root, |entry| {
        if entry.depth == 0 {
            return Walk::Continue;
        }
        total += 1;
        if entry.kind == FileKind::Directory && !entry.link {
            dirs.push_front(entry.path.clone());
            return Walk::Continue;
        }
        match fs::remove_file(&entry.path) {
            Ok(()) => log.info(format!("deleted file `{}`", entry.path.display())),
            Err(e) => {
                log.error(BuildError::io("remove file", &entry.path, e));
                failed += 1;
            }
        }
        Walk::Continue
    });
    match walked {
        Ok(()) => {}
        Err(BuildError::Partial { failed: f, .. }) => failed += f,
        Err(_) => failed += 1,
    }

    dirs.push_back(root.to_path_buf());
    total += 1;
    failed += remove_dirs(log, dirs);

    if failed > 0 {
        return Err(BuildError::Partial {
            what: "removals",
            failed,
            total,
        });
    }
    Ok(())
}

/// Removes each directory in queue order; returns how many could not be removed.
fn remove_dirs(log: &Logger, dirs: VecDeque<PathBuf>) -> usize {
    dirs.iter()
        .filter(|dir| remove_empty_dir(log, dir).is_err())
        .count()
}

fn remove_empty_dir(log: &Logger, dir: &Path) -> Result<()> {
    match fs::remove_dir(dir) {
        Ok(()) => {
            log.info(format!("deleted directory `{}`", dir.display()));
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(fail(log, BuildError::io("remove dir", dir, e))),
    }
}

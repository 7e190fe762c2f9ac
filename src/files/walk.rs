//! Depth-first tree walking driven by an explicit stack.
//!
//! Every entry under the root (the root included) is handed to the visitor
//! exactly once. Sibling order follows the stack and is not specified.

use super::FileKind;
use crate::error::{BuildError, Result};
use crate::log::Logger;
use std::collections::VecDeque;
use std::ffi::{OsStr, OsString};
use std::fs::{self, Metadata};
use std::io;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};

/// Visitor verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Continue,
    Stop,
}

/// One step of a traversal.
///
/// `root_end` and `name_start` are byte offsets into `path`: the walk root is
/// `path[..root_end]` and the final component starts at `name_start`.
#[derive(Debug)]
pub struct FileVisit {
    pub path: PathBuf,
    pub kind: FileKind,
    pub root_end: usize,
    pub name_start: usize,
    /// Nesting below the walk root; the root itself is 0
    pub depth: usize,
    /// Entry is a symbolic link. `kind` and `metadata` describe its target,
    /// or the link itself when it dangles.
    pub link: bool,
    pub metadata: Metadata,
}

impl FileVisit {
    fn bytes(&self) -> &[u8] {
        self.path.as_os_str().as_bytes()
    }

    pub fn file_name(&self) -> &OsStr {
        OsStr::from_bytes(&self.bytes()[self.name_start..])
    }

    /// Directory of this entry relative to the walk root; empty at the top level.
    pub fn relative_dir(&self) -> &Path {
        let bytes = self.bytes();
        if self.depth == 0 || self.name_start <= self.root_end + 1 {
            return Path::new("");
        }
        Path::new(OsStr::from_bytes(
            &bytes[self.root_end + 1..self.name_start - 1],
        ))
    }

    /// Path relative to the walk root; empty for the root itself.
    pub fn relative_path(&self) -> &Path {
        if self.depth == 0 {
            return Path::new("");
        }
        Path::new(OsStr::from_bytes(&self.bytes()[self.root_end + 1..]))
    }
}

/// Walks `root` depth-first, calling `visit` for every entry.
///
/// A missing root is an empty walk. Per-entry stat and directory read errors
/// are logged, the walk keeps going, and the result reports them at the end.
/// Returning [`Walk::Stop`] ends the walk immediately.
///
/// Symbolic links are reported but never descended into, except when the
/// root itself is one.
pub fn walk_tree<F>(log: &Logger, root: impl AsRef<Path>, mut visit: F) -> Result<()>
where
    F: FnMut(&FileVisit) -> Walk,
{
    let root = root.as_ref();
    if !super::file_exists(log, root) {
        return Ok(());
    }

    let root_bytes = trim_trailing_slash(root.as_os_str().as_bytes());
    let root_end = root_bytes.len();
    let root_name_start = root_bytes
        .iter()
        .rposition(|&b| b == b'/')
        .map_or(0, |i| i + 1);

    let mut stack: VecDeque<(PathBuf, usize, usize)> = VecDeque::new();
    stack.push_back((
        PathBuf::from(OsString::from_vec(root_bytes.to_vec())),
        root_name_start,
        0,
    ));

    let mut failed = 0usize;
    let mut seen = 0usize;

    while let Some((path, name_start, depth)) = stack.pop_back() {
        seen += 1;
        let (metadata, link) = match stat_entry(&path) {
            Ok(stat) => stat,
            Err(e) => {
                log.error(BuildError::io("stat", &path, e));
                failed += 1;
                continue;
            }
        };
        let kind = FileKind::from_metadata(&metadata);

        let entry = FileVisit {
            path,
            kind,
            root_end,
            name_start,
            depth,
            link,
            metadata,
        };
        if visit(&entry) == Walk::Stop {
            // Dropping the stack releases everything still queued.
            return Err(BuildError::Stopped {
                root: root.to_path_buf(),
            });
        }

        if kind != FileKind::Directory || (link && depth > 0) {
            continue;
        }

        let children = match list_children(&entry.path) {
            Ok(children) => children,
            Err(err) => {
                log.error(&err);
                failed += 1;
                continue;
            }
        };
        let parent = entry.path.as_os_str().as_bytes();
        for name in children {
            let mut child = Vec::with_capacity(parent.len() + 1 + name.len());
            child.extend_from_slice(parent);
            child.push(b'/');
            child.extend_from_slice(trim_trailing_slash(name.as_bytes()));
            stack.push_back((
                PathBuf::from(OsString::from_vec(child)),
                parent.len() + 1,
                depth + 1,
            ));
        }
    }

    if failed > 0 {
        return Err(BuildError::Partial {
            what: "directory entries",
            failed,
            total: seen,
        });
    }
    Ok(())
}

/// Visits only the immediate children of `dir`, with the same contract as
/// [`walk_tree`]. The directory itself is not visited.
pub fn read_dir<F>(log: &Logger, dir: impl AsRef<Path>, mut visit: F) -> Result<()>
where
    F: FnMut(&FileVisit) -> Walk,
{
    let dir = dir.as_ref();
    if !super::file_exists(log, dir) {
        return Ok(());
    }

    let dir_bytes = trim_trailing_slash(dir.as_os_str().as_bytes());
    let children = list_children(dir).inspect_err(|err| log.error(err))?;

    let mut failed = 0usize;
    let total = children.len();
    let mut buf = Vec::with_capacity(dir_bytes.len() + 32);

    for name in children {
        buf.clear();
        buf.extend_from_slice(dir_bytes);
        buf.push(b'/');
        buf.extend_from_slice(trim_trailing_slash(name.as_bytes()));
        let path = PathBuf::from(OsStr::from_bytes(&buf));

        let (metadata, link) = match stat_entry(&path) {
            Ok(stat) => stat,
            Err(e) => {
                log.error(BuildError::io("stat", &path, e));
                failed += 1;
                continue;
            }
        };
        let entry = FileVisit {
            kind: FileKind::from_metadata(&metadata),
            path,
            root_end: dir_bytes.len(),
            name_start: dir_bytes.len() + 1,
            depth: 1,
            link,
            metadata,
        };
        if visit(&entry) == Walk::Stop {
            return Err(BuildError::Stopped {
                root: dir.to_path_buf(),
            });
        }
    }

    if failed > 0 {
        return Err(BuildError::Partial {
            what: "directory entries",
            failed,
            total,
        });
    }
    Ok(())
}

/// `lstat` first, then the link target if the entry is a link.
fn stat_entry(path: &Path) -> io::Result<(Metadata, bool)> {
    let meta = fs::symlink_metadata(path)?;
    if !meta.file_type().is_symlink() {
        return Ok((meta, false));
    }
    match fs::metadata(path) {
        Ok(target) => Ok((target, true)),
        Err(_) => Ok((meta, true)),
    }
}

/// Names of the entries of `dir`; `std::fs::read_dir` already skips `.` and `..`.
fn list_children(dir: &Path) -> Result<Vec<OsString>> {
    let entries =
        fs::read_dir(dir).map_err(|e| BuildError::io("open directory", dir, e))?;
    entries
        .map(|entry| entry.map(|e| e.file_name()))
        .collect::<io::Result<Vec<_>>>()
        .map_err(|e| BuildError::io("read directory", dir, e))
}

fn trim_trailing_slash(bytes: &[u8]) -> &[u8] {
    match bytes {
        [rest @ .., b'/'] if !rest.is_empty() => rest,
        _ => bytes,
    }
}

//! Filesystem traversal and the small file operations the build needs.

mod ops;
mod walk;

pub use ops::{
    current_dir, delete, delete_dir, file_exists, file_kind, mkdir_recursive, read_file, read_from,
    rename, write_file,
};
pub use walk::{FileVisit, Walk, read_dir, walk_tree};

use std::fmt;
use std::fs::Metadata;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    Directory,
    Other,
    /// `stat` itself failed
    Failed,
}

impl FileKind {
    pub fn from_metadata(meta: &Metadata) -> Self {
        let ft = meta.file_type();
        if ft.is_file() {
            FileKind::Regular
        } else if ft.is_dir() {
            FileKind::Directory
        } else {
            FileKind::Other
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileKind::Regular => "regular",
            FileKind::Directory => "directory",
            FileKind::Other => "other",
            FileKind::Failed => "failed",
        })
    }
}

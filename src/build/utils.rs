use crate::config::{CompileConfig, NomConfig};
use crate::files::{FileKind, FileVisit};
use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

pub const SOURCE_EXT: &str = "c";
pub const OBJECT_EXT: &str = "o";
pub const DEPS_EXT: &str = "d";

// --- Helper: Load Config ---
pub fn load_config(path: &Path) -> Result<CompileConfig> {
    if !path.exists() {
        return Err(anyhow::anyhow!(
            "{} not found.\n\n\
            💡 Tip: create one with a [build] table (cc, target, src_dir, obj_dir, flags).",
            path.display()
        ));
    }
    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} - check file permissions", path.display()))?;
    let config: NomConfig = toml::from_str(&config_str).with_context(|| {
        format!(
            "Failed to parse {} - check for syntax errors (missing quotes, brackets)",
            path.display()
        )
    })?;
    Ok(config.build)
}

/// Regular files ending in `.c`.
pub fn is_source(entry: &FileVisit) -> bool {
    entry.kind == FileKind::Regular
        && entry.path.extension().is_some_and(|ext| ext == SOURCE_EXT)
}

/// Directory under the object root that mirrors the source's directory.
pub fn object_dir(config: &CompileConfig, entry: &FileVisit) -> PathBuf {
    let rel = entry.relative_dir();
    if rel.as_os_str().is_empty() {
        config.obj_dir.clone()
    } else {
        config.obj_dir.join(rel)
    }
}

/// `<obj_dir>/<relative dir>/<stem>.o` for a source entry.
pub fn object_path(config: &CompileConfig, entry: &FileVisit) -> PathBuf {
    let mut name = entry
        .path
        .file_stem()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".");
    name.push(OBJECT_EXT);
    object_dir(config, entry).join(name)
}

/// The dependency record the compiler writes beside an object file.
pub fn deps_path(object: &Path) -> PathBuf {
    object.with_extension(DEPS_EXT)
}

pub fn arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

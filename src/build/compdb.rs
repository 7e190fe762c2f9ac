//! Compilation database (`compile_commands.json`) for editors and linters.
//!
//! Uses the same walk and object-path mirroring as [`compile`](super::compile),
//! but never checks staleness and never runs anything.

use super::utils::{arg, is_source, object_path};
use crate::config::CompileConfig;
use crate::error::{BuildError, Result};
use crate::files::{Walk, current_dir, walk_tree, write_file};
use crate::log::Logger;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};

pub const COMPILE_DB_FILE: &str = "compile_commands.json";

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CompileCommand {
    pub directory: PathBuf,
    pub file: PathBuf,
    pub arguments: Vec<String>,
}

/// One entry per source file, in walk order.
pub fn describe(log: &Logger, config: &CompileConfig) -> Result<Vec<CompileCommand>> {
    let cwd = current_dir(log)?;
    let mut entries = Vec::new();

    walk_tree(log, &config.src_dir, |entry| {
        if !is_source(entry) {
            return Walk::Continue;
        }
        let mut arguments = vec![
            config.cc.clone(),
            "-c".to_string(),
            "-o".to_string(),
            arg(&object_path(config, entry)),
        ];
        arguments.extend(config.flags.iter().cloned());
        arguments.push(arg(&entry.path));

        entries.push(CompileCommand {
            directory: cwd.clone(),
            file: entry.path.clone(),
            arguments,
        });
        Walk::Continue
    })?;

    Ok(entries)
}

/// Writes [`describe`]'s output as pretty JSON to `out`.
pub fn write_compilation_database(log: &Logger, config: &CompileConfig, out: &Path) -> Result<()> {
    let entries = describe(log, config)?;
    let json = serde_json::to_string_pretty(&entries).map_err(|e| {
        let err = BuildError::io("serialize", out, io::Error::other(e));
        log.error(&err);
        err
    })?;
    write_file(log, out, json + "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_entries_have_full_argument_vector() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/sub")).unwrap();
        fs::write(dir.path().join("src/sub/x.c"), "").unwrap();
        fs::write(dir.path().join("src/readme.md"), "").unwrap();

        let config = CompileConfig {
            cc: "gcc".to_string(),
            src_dir: dir.path().join("src"),
            obj_dir: PathBuf::from("obj"),
            flags: vec!["-Wall".to_string(), "-O2".to_string()],
            ..Default::default()
        };
        let entries = describe(&Logger::silent(), &config).unwrap();
        assert_eq!(entries.len(), 1);

        let src = dir.path().join("src/sub/x.c").to_string_lossy().into_owned();
        assert_eq!(
            entries[0].arguments,
            vec!["gcc", "-c", "-o", "obj/sub/x.o", "-Wall", "-O2", src.as_str()]
        );
        assert!(entries[0].directory.is_absolute());
        assert_eq!(entries[0].file, dir.path().join("src/sub/x.c"));
    }

    #[test]
    fn test_writes_json_array() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/a.c"), "").unwrap();
        fs::write(dir.path().join("src/b.c"), "").unwrap();

        let config = CompileConfig {
            src_dir: dir.path().join("src"),
            obj_dir: dir.path().join("obj"),
            ..Default::default()
        };
        let out = dir.path().join(COMPILE_DB_FILE);
        write_compilation_database(&Logger::silent(), &config, &out).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 2);
        for item in items {
            assert!(item["directory"].is_string());
            assert!(item["file"].as_str().unwrap().ends_with(".c"));
            assert_eq!(item["arguments"][0], "cc");
        }
        // nothing was compiled
        assert!(!dir.path().join("obj").exists());
    }

    #[test]
    fn test_empty_tree_is_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let config = CompileConfig {
            src_dir: dir.path().join("src"),
            ..Default::default()
        };
        let out = dir.path().join(COMPILE_DB_FILE);
        write_compilation_database(&Logger::silent(), &config, &out).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap().trim(), "[]");
    }
}

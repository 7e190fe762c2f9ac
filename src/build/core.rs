use super::utils::{arg, deps_path, is_source, object_dir, object_path};
use crate::config::CompileConfig;
use crate::error::{BuildError, Result};
use crate::files::{Walk, mkdir_recursive, walk_tree};
use crate::freshness::{is_stale, is_stale_by_record};
use crate::log::Logger;
use crate::process::{Cmd, ProcessHandle, run_sync, spawn_async, wait_all};
use std::path::PathBuf;

// --- CORE: Build Project ---
/// Compiles every stale `.c` file under `src_dir` into a mirrored object
/// under `obj_dir`, then links `target` if any object is newer than it.
///
/// All compiles run at once; the link only starts after every one of them
/// has been waited on.
pub fn compile(log: &Logger, config: &CompileConfig) -> Result<()> {
    mkdir_recursive(log, &config.obj_dir)?;

    let mut cmd = Cmd::new();
    let mut handles: Vec<ProcessHandle> = Vec::new();
    let mut objects: Vec<PathBuf> = Vec::new();
    let mut mkdir_failures = 0usize;

    let walked = walk_tree(log, &config.src_dir, |entry| {
        if !is_source(entry) {
            return Walk::Continue;
        }

        if mkdir_recursive(log, &object_dir(config, entry)).is_err() {
            mkdir_failures += 1;
            return Walk::Continue;
        }

        let obj = object_path(config, entry);
        if is_stale_by_record(log, &obj, &deps_path(&obj)) {
            cmd.append(&config.cc)
                .extend(["-c", "-MMD", "-o"])
                .append(arg(&obj))
                .extend(config.flags.iter().cloned())
                .append(arg(&entry.path));
            handles.push(spawn_async(log, &cmd));
            cmd.reset();
        }
        objects.push(obj);
        Walk::Continue
    });

    // Reap every child before reporting anything, even if the walk went wrong.
    let compiled = wait_all(log, handles);
    walked?;
    compiled?;
    if mkdir_failures > 0 {
        return Err(BuildError::Partial {
            what: "object directories",
            failed: mkdir_failures,
            total: objects.len() + mkdir_failures,
        });
    }

    if objects.is_empty() {
        log.warn(format!(
            "no source files found under `{}`, nothing to link",
            config.src_dir.display()
        ));
        return Ok(());
    }

    // Only link if any object file changed (or the target doesn't exist)
    if is_stale(log, &config.target, &objects) {
        cmd.append(&config.cc)
            .append("-o")
            .append(arg(&config.target))
            .extend(config.flags.iter().cloned())
            .extend(objects.iter().map(|o| arg(o)));
        run_sync(log, &cmd)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_failed_compile_skips_link() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/main.c"), "").unwrap();
        fs::write(dir.path().join("src/other.c"), "").unwrap();

        let config = CompileConfig {
            cc: "false".to_string(),
            target: dir.path().join("app"),
            src_dir: dir.path().join("src"),
            obj_dir: dir.path().join("obj"),
            flags: Vec::new(),
        };
        let err = compile(&Logger::silent(), &config).unwrap_err();
        assert!(matches!(
            err,
            BuildError::Partial {
                failed: 2,
                total: 2,
                ..
            }
        ));
        assert!(dir.path().join("obj").is_dir());
        assert!(!dir.path().join("app").exists());
    }

    #[test]
    fn test_empty_tree_warns_and_skips_link() {
        let dir = tempfile::tempdir().unwrap();
        let config = CompileConfig {
            cc: "false".to_string(),
            target: dir.path().join("app"),
            src_dir: dir.path().join("src"),
            obj_dir: dir.path().join("obj"),
            flags: Vec::new(),
        };
        let (log, out) = Logger::capture();
        compile(&log, &config).unwrap();
        assert!(out.contents().contains("[WARNING] no source files found"));
    }

    #[test]
    fn test_compile_mirrors_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/net/proto")).unwrap();
        fs::write(dir.path().join("src/net/proto/tcp.c"), "").unwrap();

        // `true` writes no objects; only the directory layout matters here.
        let config = CompileConfig {
            cc: "true".to_string(),
            target: dir.path().join("app"),
            src_dir: dir.path().join("src"),
            obj_dir: dir.path().join("obj"),
            flags: Vec::new(),
        };
        let _ = compile(&Logger::silent(), &config);
        assert!(dir.path().join("obj/net/proto").is_dir());
    }
}

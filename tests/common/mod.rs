//! Shared fixtures: a throwaway project tree and a fake compiler that records
//! every invocation instead of compiling anything.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

pub struct Project {
    pub dir: tempfile::TempDir,
    pub cc: PathBuf,
    pub invocations: PathBuf,
}

impl Project {
    /// Empty project with `src/` and a fake `cc`.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create test directory");
        fs::create_dir_all(dir.path().join("src")).expect("Failed to create src directory");
        let invocations = dir.path().join("invocations.log");
        let cc = write_fake_cc(dir.path(), &invocations);
        Self {
            dir,
            cc,
            invocations,
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn write(&self, rel: &str, contents: &str) {
        let path = self.path(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    /// Recorded compiler invocations, one argument string per line.
    pub fn invocations(&self) -> Vec<String> {
        fs::read_to_string(&self.invocations)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn compiles(&self) -> usize {
        self.invocations().iter().filter(|l| is_compile(l)).count()
    }

    pub fn links(&self) -> usize {
        self.invocations().iter().filter(|l| !is_compile(l)).count()
    }

    pub fn clear_invocations(&self) {
        let _ = fs::remove_file(&self.invocations);
    }

    /// Spreads the mtimes of a finished build into the past (sources oldest,
    /// then objects, then everything else) so later steps never race the
    /// filesystem clock's granularity.
    pub fn settle(&self) {
        let now = SystemTime::now();
        for entry in walkdir::WalkDir::new(self.root()) {
            let entry = entry.unwrap();
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry.path().strip_prefix(self.root()).unwrap();
            let age = if rel.starts_with("src") {
                120
            } else if rel.starts_with("obj") {
                90
            } else {
                60
            };
            fs::File::options()
                .write(true)
                .open(entry.path())
                .unwrap()
                .set_modified(now - Duration::from_secs(age))
                .unwrap();
        }
    }

    /// Moves a file's mtime into the future, as an editor save would.
    pub fn touch(&self, rel: &str) {
        fs::File::options()
            .write(true)
            .open(self.path(rel))
            .unwrap()
            .set_modified(SystemTime::now() + Duration::from_secs(10))
            .unwrap();
    }
}

fn is_compile(line: &str) -> bool {
    line.split_whitespace().any(|a| a == "-c")
}

/// Writes a shell script that behaves enough like `cc` for the driver:
/// compiles write the `-o` file plus a `.d` record naming the source, links
/// write the `-o` file. Every call is appended to `log`.
fn write_fake_cc(dir: &Path, log: &Path) -> PathBuf {
    let script = format!(
        r#"#!/bin/sh
printf '%s\n' "$*" >> '{log}'
out=""
prev=""
compile=0
for a in "$@"; do
  [ "$prev" = "-o" ] && out="$a"
  [ "$a" = "-c" ] && compile=1
  prev="$a"
  last="$a"
done
if [ "$compile" = 1 ]; then
  printf '%s: %s\n' "$out" "$last" > "${{out%.o}}.d"
fi
printf 'built' > "$out"
"#,
        log = log.display()
    );
    let path = dir.join("fake-cc");
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

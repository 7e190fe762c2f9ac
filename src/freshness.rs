//! Staleness checks and compiler dependency records.
//!
//! A target is stale when it is missing or any of its inputs has a strictly
//! newer modification time. Dependency records are the single Makefile rule
//! that `cc -MMD` / `cc -MM` emit:
//!
//! ```text
//! obj/main.o: src/main.c src/util.h \
//!  src/with\ space.h
//! ```

use crate::log::Logger;
use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// Returns `true` when `target` must be regenerated from `inputs`.
///
/// Never fails: anything unexpected is logged and answered with `true`, since
/// rebuilding is always the safe choice.
pub fn is_stale<P: AsRef<Path>>(log: &Logger, target: impl AsRef<Path>, inputs: &[P]) -> bool {
    let target = target.as_ref();
    let target_mtime = match modified(target) {
        Ok(t) => t,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return true,
        Err(e) => {
            log.error(format!("could not stat `{}`: {}", target.display(), e));
            return true;
        }
    };

    for input in inputs {
        let input = input.as_ref();
        match modified(input) {
            Ok(t) if t > target_mtime => return true,
            Ok(_) => {}
            Err(e) => {
                // An input that does not exist cannot have produced the target.
                log.error(format!("could not stat `{}`: {}", input.display(), e));
                return true;
            }
        }
    }

    false
}

fn modified(path: &Path) -> io::Result<SystemTime> {
    fs::metadata(path)?.modified()
}

/// Extracts the prerequisites of the first rule in a dependency record.
///
/// Returns an empty list when the first line has no `:` at all.
pub fn parse_dependency_record(record: &str) -> Vec<String> {
    let bytes = record.as_bytes();
    let Some(colon) = find_rule_colon(bytes) else {
        return Vec::new();
    };

    let mut deps = Vec::new();
    let mut token: Vec<u8> = Vec::new();
    let mut i = colon + 1;

    while i < bytes.len() {
        match bytes[i] {
            b'\n' => break,
            b'\r' if bytes.get(i + 1) == Some(&b'\n') => break,
            b' ' | b'\t' => flush(&mut token, &mut deps),
            b'\\' => match bytes.get(i + 1) {
                Some(b'\n') => {
                    flush(&mut token, &mut deps);
                    i += 1;
                }
                Some(b'\r') if bytes.get(i + 2) == Some(&b'\n') => {
                    flush(&mut token, &mut deps);
                    i += 2;
                }
                Some(b' ') => {
                    token.push(b' ');
                    i += 1;
                }
                Some(b'#') => {
                    token.push(b'#');
                    i += 1;
                }
                _ => token.push(b'\\'),
            },
            b'$' if bytes.get(i + 1) == Some(&b'$') => {
                token.push(b'$');
                i += 1;
            }
            b => token.push(b),
        }
        i += 1;
    }
    flush(&mut token, &mut deps);

    deps
}

/// Position of the first unescaped `:` before the end of the logical first line.
fn find_rule_colon(bytes: &[u8]) -> Option<usize> {
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b':' => return Some(i),
            b'\n' => return None,
            b'\\' => i += 1,
            _ => {}
        }
        i += 1;
    }
    None
}

fn flush(token: &mut Vec<u8>, deps: &mut Vec<String>) {
    if token.is_empty() {
        return;
    }
    deps.push(String::from_utf8_lossy(token).into_owned());
    token.clear();
}

/// Reads the dependency record stored at `record_path` and checks `target`
/// against it. A missing or unreadable record means "no information", which is
/// answered conservatively with `true`.
pub fn is_stale_by_record(log: &Logger, target: &Path, record_path: &Path) -> bool {
    match crate::files::read_file(log, record_path) {
        Some(record) => is_stale(log, target, &parse_dependency_record(&record)),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;

    fn touch(path: &Path, mtime: SystemTime) {
        let f = File::options()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .unwrap();
        f.set_modified(mtime).unwrap();
    }

    #[test]
    fn test_missing_target_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.c");
        touch(&input, SystemTime::now());
        let log = Logger::silent();

        assert!(is_stale(&log, dir.path().join("a.o"), &[&input]));
        assert!(is_stale::<&Path>(&log, dir.path().join("a.o"), &[]));
    }

    #[test]
    fn test_older_inputs_are_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let now = SystemTime::now();
        let target = dir.path().join("a.o");
        let a = dir.path().join("a.c");
        let b = dir.path().join("b.h");
        touch(&a, now - Duration::from_secs(20));
        touch(&b, now);
        touch(&target, now);

        let log = Logger::silent();
        assert!(!is_stale(&log, &target, &[&a, &b]));
    }

    #[test]
    fn test_newer_input_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let now = SystemTime::now();
        let target = dir.path().join("a.o");
        let a = dir.path().join("a.c");
        let b = dir.path().join("b.h");
        touch(&target, now);
        touch(&a, now - Duration::from_secs(5));
        touch(&b, now + Duration::from_secs(5));

        let log = Logger::silent();
        assert!(is_stale(&log, &target, &[&a, &b]));
    }

    #[test]
    fn test_missing_input_is_logged_and_stale() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a.o");
        touch(&target, SystemTime::now());

        let (log, out) = Logger::capture();
        assert!(is_stale(&log, &target, &[dir.path().join("gone.h")]));
        assert!(out.contents().contains("[ERROR] could not stat"));
        assert!(out.contents().contains("gone.h"));
    }

    #[test]
    fn test_parse_continuation() {
        let deps = parse_dependency_record("out.o: a.c b.c c.h\\\nd.h");
        assert_eq!(deps, vec!["a.c", "b.c", "c.h", "d.h"]);
    }

    #[test]
    fn test_parse_gcc_style_record() {
        let record = "obj/main.o: src/main.c src/util.h \\\n  src/deep/x.h\n";
        assert_eq!(
            parse_dependency_record(record),
            vec!["src/main.c", "src/util.h", "src/deep/x.h"]
        );
    }

    #[test]
    fn test_parse_no_colon() {
        assert!(parse_dependency_record("just some words\nx: y").is_empty());
        assert!(parse_dependency_record("").is_empty());
    }

    #[test]
    fn test_parse_escaped_space_and_dollar() {
        let deps = parse_dependency_record("a.o: my\\ file.c cost$$.h\n");
        assert_eq!(deps, vec!["my file.c", "cost$.h"]);
    }

    #[test]
    fn test_parse_escaped_newline_before_colon() {
        let deps = parse_dependency_record("long\\\nname.o: a.c");
        assert_eq!(deps, vec!["a.c"]);
    }

    #[test]
    fn test_parse_stops_at_first_rule() {
        let deps = parse_dependency_record("a.o: a.c\nb.o: b.c\n");
        assert_eq!(deps, vec!["a.c"]);
    }

    #[test]
    fn test_parse_crlf() {
        let deps = parse_dependency_record("a.o: a.c \\\r\n b.h\r\nc.o: c.c");
        assert_eq!(deps, vec!["a.c", "b.h"]);
    }

    #[test]
    fn test_missing_record_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a.o");
        touch(&target, SystemTime::now());

        let (log, out) = Logger::capture();
        assert!(is_stale_by_record(&log, &target, &dir.path().join("a.d")));
        assert!(out.contents().is_empty());
    }
}

//! Leveled logging sink.
//!
//! Every core operation takes a `&Logger` instead of touching global state, so
//! tests can capture output and the self-rebuild probe can quiet itself without
//! affecting anything else.

use colored::*;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::io::{self, IsTerminal, Write};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Info,
    Warning,
    Error,
}

impl Level {
    fn tag(self, color: bool) -> String {
        let tag = match self {
            Level::Info => "[INFO]",
            Level::Warning => "[WARNING]",
            Level::Error => "[ERROR]",
        };
        if !color {
            return tag.to_string();
        }
        match self {
            Level::Info => tag.cyan().to_string(),
            Level::Warning => tag.yellow().to_string(),
            Level::Error => tag.red().bold().to_string(),
        }
    }
}

pub struct Logger {
    level: Cell<Level>,
    color: bool,
    sink: RefCell<Box<dyn Write>>,
}

impl Logger {
    /// Logger writing to stderr, colored when stderr is a terminal.
    pub fn stderr() -> Self {
        Self {
            level: Cell::new(Level::Info),
            color: io::stderr().is_terminal(),
            sink: RefCell::new(Box::new(io::stderr())),
        }
    }

    /// Logger writing uncolored lines into an arbitrary sink.
    pub fn with_sink(sink: impl Write + 'static) -> Self {
        Self {
            level: Cell::new(Level::Info),
            color: false,
            sink: RefCell::new(Box::new(sink)),
        }
    }

    /// Logger that drops everything.
    pub fn silent() -> Self {
        let log = Self::with_sink(io::sink());
        log.set_level(Level::Error);
        log
    }

    /// Logger plus a handle to the buffer it writes into.
    pub fn capture() -> (Self, Captured) {
        let captured = Captured::default();
        (Self::with_sink(captured.clone()), captured)
    }

    pub fn level(&self) -> Level {
        self.level.get()
    }

    pub fn set_level(&self, level: Level) {
        self.level.set(level);
    }

    /// Runs `f` with the filter raised to at least `level`, then restores it.
    pub fn quieted<T>(&self, level: Level, f: impl FnOnce() -> T) -> T {
        let previous = self.level.get();
        self.level.set(previous.max(level));
        let out = f();
        self.level.set(previous);
        out
    }

    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        if level < self.level.get() {
            return;
        }
        let mut sink = self.sink.borrow_mut();
        // A broken log sink must not fail the build.
        let _ = writeln!(sink, "{} {}", level.tag(self.color), args);
    }

    pub fn info(&self, msg: impl fmt::Display) {
        self.log(Level::Info, format_args!("{}", msg));
    }

    pub fn warn(&self, msg: impl fmt::Display) {
        self.log(Level::Warning, format_args!("{}", msg));
    }

    pub fn error(&self, msg: impl fmt::Display) {
        self.log(Level::Error, format_args!("{}", msg));
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::stderr()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level.get())
            .field("color", &self.color)
            .finish_non_exhaustive()
    }
}

/// Shared in-memory sink returned by [`Logger::capture`].
#[derive(Clone, Default)]
pub struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    pub fn contents(&self) -> String {
        let buf = self.0.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&buf).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for Captured {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut buf = self.0.lock().unwrap_or_else(|e| e.into_inner());
        buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

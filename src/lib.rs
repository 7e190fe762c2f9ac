//! # nom-build - Self-hosting incremental C builds
//!
//! A small library for build programs that compile one source tree with one
//! compiler into one linked target, redoing only the work that changed.
//!
//! ## Quick Start
//!
//! ```no_run
//! use nom_build::{CompileConfig, Logger, build};
//!
//! let log = Logger::stderr();
//! let config = CompileConfig {
//!     cc: "gcc".into(),
//!     flags: vec!["-Wall".into(), "-O2".into()],
//!     ..Default::default()
//! };
//! if build::compile(&log, &config).is_err() {
//!     std::process::exit(1);
//! }
//! ```
//!
//! [`bootstrap::rebuild_yourself`] is for programs that `cc` builds from a
//! single source. A Rust front end keeps such a program current before
//! running it:
//!
//! ```no_run
//! use nom_build::{Logger, SelfRebuild, bootstrap};
//! use std::path::Path;
//!
//! let log = Logger::stderr();
//! let program = Path::new("./build");
//! let spec = SelfRebuild::new("build.c");
//! if bootstrap::needs_rebuild(&log, program, &spec) && bootstrap::rebuild(&log, program, &spec).is_err() {
//!     std::process::exit(1);
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`freshness`] - mtime staleness checks and dependency records
//! - [`process`] - spawning and joining compiler processes
//! - [`files`] - tree walking and filesystem helpers
//! - [`build`] - the incremental compile/link driver, compile database, clean
//! - [`bootstrap`] - rebuilding and relaunching the build program itself

/// Self-rebuild of the build program.
pub mod bootstrap;

/// Incremental compile and link driver.
pub mod build;

/// Build configuration (`nom.toml`).
pub mod config;

/// Error type shared by every operation.
pub mod error;

/// Filesystem traversal and helpers.
pub mod files;

/// Staleness oracle and dependency record parsing.
pub mod freshness;

/// Leveled logging sink.
pub mod log;

/// Child process orchestration.
pub mod process;

pub use bootstrap::SelfRebuild;
pub use config::CompileConfig;
pub use error::BuildError;
pub use log::{Level, Logger};

//! # nom CLI Entry Point
//!
//! Thin command-line front end over the `nom_build` library. It reads
//! `nom.toml`, applies command-line overrides and routes each subcommand to
//! one driver operation:
//!
//! - `compile` (alias `build`, the default) - incremental compile and link
//! - `db` - write `compile_commands.json`
//! - `clean` - remove objects and the target

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::*;
use std::path::{Path, PathBuf};

use nom_build::build;
use nom_build::{CompileConfig, Level, Logger};

const DEFAULT_CONFIG: &str = "nom.toml";

#[derive(Parser)]
#[command(name = "nom")]
#[command(about = "Incremental C builds that only redo what changed", version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the build configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Print every command and filesystem change (default)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Default)]
struct Overrides {
    /// Compiler executable
    #[arg(long, global = true)]
    cc: Option<String>,
    /// Linked output path
    #[arg(long, global = true)]
    target: Option<PathBuf>,
    /// Source root
    #[arg(long = "src", global = true)]
    src_dir: Option<PathBuf>,
    /// Object root
    #[arg(long = "obj", global = true)]
    obj_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile stale sources and relink the target if needed
    #[command(visible_alias = "build")]
    Compile,
    /// Write compile_commands.json for editors and linters
    Db,
    /// Remove the object directory and the target
    Clean,
    /// Generate shell completions
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log = Logger::stderr();
    if cli.quiet {
        log.set_level(Level::Error);
    } else if cli.verbose {
        log.set_level(Level::Info);
    }

    let command = cli.command.unwrap_or(Commands::Compile);
    if let Commands::Completion { shell } = command {
        let mut cmd = Cli::command();
        let bin_name = cmd.get_name().to_string();
        generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
        return Ok(());
    }

    let config = resolve_config(&log, cli.config.as_deref(), cli.overrides)?;

    let result = match command {
        Commands::Compile => build::compile(&log, &config),
        Commands::Db => {
            build::write_compilation_database(&log, &config, Path::new(build::COMPILE_DB_FILE))
        }
        Commands::Clean => build::clean(&log, &config),
        Commands::Completion { .. } => Ok(()),
    };

    // Failures were already logged where they happened.
    if result.is_err() {
        eprintln!("{} {}", "x".red(), "build failed".bold());
        std::process::exit(1);
    }
    Ok(())
}

fn resolve_config(
    log: &Logger,
    explicit: Option<&Path>,
    overrides: Overrides,
) -> Result<CompileConfig> {
    let mut config = match explicit {
        Some(path) => build::load_config(path)?,
        None if Path::new(DEFAULT_CONFIG).exists() => build::load_config(Path::new(DEFAULT_CONFIG))?,
        None => {
            log.info(format!("no {} found, using defaults", DEFAULT_CONFIG));
            CompileConfig::default()
        }
    };

    if let Some(cc) = overrides.cc {
        config.cc = cc;
    }
    if let Some(target) = overrides.target {
        config.target = target;
    }
    if let Some(src) = overrides.src_dir {
        config.src_dir = src;
    }
    if let Some(obj) = overrides.obj_dir {
        config.obj_dir = obj;
    }
    Ok(config)
}

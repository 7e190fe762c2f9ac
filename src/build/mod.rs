mod clean;
mod compdb;
mod core;
mod utils;

pub use clean::clean;
pub use compdb::{COMPILE_DB_FILE, CompileCommand, describe, write_compilation_database};
pub use self::core::compile;
pub use utils::{DEPS_EXT, OBJECT_EXT, SOURCE_EXT, deps_path, load_config};

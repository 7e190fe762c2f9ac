use serde::Deserialize;
use std::path::PathBuf;

/// Everything one build needs. Owned by the caller and never mutated while a
/// build runs.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct CompileConfig {
    /// Compiler executable, also used as the linker driver
    pub cc: String,
    pub target: PathBuf,
    pub src_dir: PathBuf,
    pub obj_dir: PathBuf,
    pub flags: Vec<String>,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            cc: "cc".to_string(),
            target: PathBuf::from("a.out"),
            src_dir: PathBuf::from("src"),
            obj_dir: PathBuf::from("obj"),
            flags: Vec::new(),
        }
    }
}

/// On-disk layout of `nom.toml`.
#[derive(Deserialize, Debug, Default)]
pub struct NomConfig {
    #[serde(default)]
    pub build: CompileConfig,
}

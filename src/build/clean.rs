//! Build artifact cleanup.
//!
//! Removes the object directory and the linked target. Both removals always
//! run; a path that is already gone counts as cleaned.

use crate::config::CompileConfig;
use crate::error::{BuildError, Result};
use crate::files::delete;
use crate::log::Logger;

pub fn clean(log: &Logger, config: &CompileConfig) -> Result<()> {
    let results = [
        delete(log, &config.obj_dir),
        delete(log, &config.target),
    ];
    let failed = results.iter().filter(|r| r.is_err()).count();

    if failed > 0 {
        return Err(BuildError::Partial {
            what: "removals",
            failed,
            total: results.len(),
        });
    }
    Ok(())
}

//! Local file storage primitives
//!
//! Every file the harvester persists goes through [`AtomicWriter`], so a crash
//! never leaves a half written cache entry behind.

mod atomic;
mod lines;

pub use atomic::{AtomicWriter, DEFAULT_FILE_MODE};
pub use lines::{lines_from_file, lines_from_reader};

use std::path::Path;
use thiserror::Error;

/// Errors that can occur while persisting files
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Target has no file name: {0}")]
    InvalidTarget(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type PersistResult<T> = Result<T, PersistError>;

/// Ensures a directory exists, creating missing parents
///
/// Existing directories are left untouched. Returns `true` when the directory
/// had to be created.
pub fn ensure_dir(dir: &Path) -> PersistResult<bool> {
    if dir.is_dir() {
        return Ok(false);
    }
    std::fs::create_dir_all(dir)?;
    tracing::info!("Created directory at {}", dir.display());
    Ok(true)
}

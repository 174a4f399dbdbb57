use crate::storage::PersistError;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use tempfile::{Builder, NamedTempFile};

/// Default mode for cache files and rewritten dumps
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// All-or-nothing file writer
///
/// Content is staged in a hidden temporary file next to the target, flushed
/// to disk, given its final permissions and then renamed over the target.
/// Readers observe either the old or the new content, never a mix. When any
/// step fails the temporary file is removed and the target is not touched.
#[derive(Debug, Clone, Copy)]
pub struct AtomicWriter {
    mode: u32,
}

impl Default for AtomicWriter {
    fn default() -> Self {
        Self::with_mode(DEFAULT_FILE_MODE)
    }
}

impl AtomicWriter {
    /// Creates a writer that leaves files with the given unix permission bits
    pub fn with_mode(mode: u32) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> u32 {
        self.mode
    }

    /// Atomically replaces `target` with `data`
    pub fn write(&self, target: &Path, data: &[u8]) -> Result<(), PersistError> {
        self.write_with(target, |file| file.write_all(data))
    }

    /// Reads `reader` to the end, then writes the bytes like [`write`](Self::write)
    ///
    /// A read error is returned before the temporary file is even created.
    pub fn write_reader<R: Read>(&self, target: &Path, mut reader: R) -> Result<(), PersistError> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        self.write(target, &data)
    }

    /// Atomically replaces `target` with whatever `fill` writes
    ///
    /// `fill` receives the staged file and may stream into it, so the content
    /// never has to be held in memory. An error from `fill` discards the
    /// staged file and leaves `target` as it was.
    pub fn write_with<F>(&self, target: &Path, fill: F) -> Result<(), PersistError>
    where
        F: FnOnce(&mut File) -> io::Result<()>,
    {
        let name = target
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PersistError::InvalidTarget(target.display().to_string()))?;
        let dir = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        // Dropping the handle on any early return deletes the staged file.
        let mut tmp: NamedTempFile = Builder::new()
            .prefix(&format!(".{}.", name))
            .suffix(".tmp")
            .tempfile_in(dir)?;

        fill(tmp.as_file_mut())?;
        tmp.as_file_mut().flush()?;
        tmp.as_file().sync_all()?;
        set_mode(tmp.path(), self.mode)?;

        tmp.persist(target).map_err(|e| PersistError::Io(e.error))?;
        tracing::trace!("Wrote {} atomically", target.display());
        Ok(())
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

//! Continuing an interrupted dump
//!
//! A dump that died mid-write may end in a partial record. Resuming drops the
//! last line of the file, collects the identifiers of the records that remain
//! and reopens the file for appending, so the next run only fetches what is
//! still missing.

use crate::harvest::record::record_ids;
use crate::identifier::IdentifierSet;
use crate::storage::{AtomicWriter, DEFAULT_FILE_MODE};
use crate::Result;
use serde_json::Value;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Bytes read per step while searching backwards for the last line
const TAIL_CHUNK: usize = 64 * 1024;

/// What a resumed dump may skip
#[derive(Debug, Clone, Default)]
pub struct ResumePlan {
    /// Identifiers of the records already in the file
    pub ignore: IdentifierSet,

    /// Number of complete records found
    pub records: usize,

    /// Bytes removed from the end of the file
    pub dropped_bytes: u64,
}

/// Repairs a previous dump and derives its ignore set
#[derive(Debug, Clone)]
pub struct ResumeController {
    path: PathBuf,
}

impl ResumeController {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Repairs the file and scans it
    ///
    /// A missing file is treated as an empty dump.
    pub fn prepare(&self) -> Result<ResumePlan> {
        if !self.path.exists() {
            tracing::info!(
                "{} does not exist yet, starting a new dump",
                self.path.display()
            );
            return Ok(ResumePlan::default());
        }

        let dropped_bytes = self.repair()?;
        let (ignore, records) = self.completed()?;
        tracing::info!(
            "Found {} complete records ({} distinct ISSN) in {}",
            records,
            ignore.size(),
            self.path.display()
        );

        Ok(ResumePlan {
            ignore,
            records,
            dropped_bytes,
        })
    }

    /// Removes the last line of the file, in place and atomically
    ///
    /// Only the tail is scanned to find the cut; the kept prefix is streamed
    /// into the replacement file. Returns the number of bytes dropped.
    pub fn repair(&self) -> Result<u64> {
        let mut file = File::open(&self.path)?;
        let len = file.metadata()?.len();
        let cut = last_line_start(&mut file, len, TAIL_CHUNK)?;
        let dropped = len - cut;

        if dropped > 0 {
            file.seek(SeekFrom::Start(0))?;
            AtomicWriter::with_mode(file_mode(&self.path)).write_with(&self.path, move |tmp| {
                io::copy(&mut file.take(cut), tmp).map(drop)
            })?;
            tracing::debug!(
                "Dropped trailing {} bytes from {}",
                dropped,
                self.path.display()
            );
        }
        Ok(dropped)
    }

    /// Collects the ISSN of every record in the file
    ///
    /// Lines that are not JSON, or carry no ISSN node, are logged and left
    /// out of the set; those identifiers are fetched again.
    pub fn completed(&self) -> Result<(IdentifierSet, usize)> {
        let reader = BufReader::new(File::open(&self.path)?);
        let mut ignore = IdentifierSet::new();
        let mut records = 0;

        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let doc: Value = match serde_json::from_str(&line) {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::warn!("Line {} is not a JSON record: {}", lineno + 1, e);
                    continue;
                }
            };
            match record_ids(&doc).and_then(|ids| ids.issn) {
                Some(issn) => {
                    ignore.add(issn);
                    records += 1;
                }
                None => tracing::warn!("Line {} has no ISSN node", lineno + 1),
            }
        }

        Ok((ignore, records))
    }

    /// Opens the file for appending, creating it if needed
    pub async fn open_append(&self) -> Result<tokio::fs::File> {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        Ok(file)
    }
}

/// Offset at which the last line of a `len` byte stream starts
///
/// A trailing newline terminates the last line rather than starting an empty
/// one, so for `"a\nb\n"` and `"a\nb"` the result is 2. The stream is read
/// backwards in `chunk` sized steps.
fn last_line_start<R: Read + Seek>(reader: &mut R, len: u64, chunk: usize) -> io::Result<u64> {
    if len == 0 {
        return Ok(0);
    }

    let mut buf = vec![0u8; chunk.max(1)];
    let mut end = len;

    reader.seek(SeekFrom::Start(len - 1))?;
    reader.read_exact(&mut buf[..1])?;
    if buf[0] == b'\n' {
        end -= 1;
    }

    while end > 0 {
        let step = end.min(buf.len() as u64);
        let start = end - step;
        let window = &mut buf[..step as usize];
        reader.seek(SeekFrom::Start(start))?;
        reader.read_exact(window)?;
        if let Some(pos) = window.iter().rposition(|b| *b == b'\n') {
            return Ok(start + pos as u64 + 1);
        }
        end = start;
    }

    Ok(0)
}

#[cfg(unix)]
fn file_mode(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o777)
        .unwrap_or(DEFAULT_FILE_MODE)
}

#[cfg(not(unix))]
fn file_mode(_path: &Path) -> u32 {
    DEFAULT_FILE_MODE
}

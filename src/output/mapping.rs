//! ISSN to ISSN-L mapping from a finished dump

use crate::harvest::record_ids;
use serde_json::Value;
use std::io::{self, BufRead, Write};

/// Line counts of a mapping run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MappingStats {
    /// Mapping lines written
    pub written: usize,

    /// Input lines that were not JSON or had no ISSN node
    pub skipped: usize,
}

/// Writes `<issn>\t<issnl>` for every record of a dump
///
/// The ISSN-L column is empty when a record names none. Lines that cannot be
/// decoded, or that have no `@graph` or no ISSN node, are logged and skipped.
pub fn write_mapping<R, W>(dump: R, out: &mut W) -> io::Result<MappingStats>
where
    R: BufRead,
    W: Write,
{
    let mut stats = MappingStats::default();

    for (lineno, line) in dump.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let doc: Value = match serde_json::from_str(line) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!("Line {}: {}", lineno + 1, e);
                stats.skipped += 1;
                continue;
            }
        };

        match record_ids(&doc) {
            Some(ids) => match ids.issn {
                Some(issn) => {
                    writeln!(out, "{}\t{}", issn, ids.issnl.unwrap_or_default())?;
                    stats.written += 1;
                }
                None => {
                    tracing::warn!("Line {}: record has no ISSN node", lineno + 1);
                    stats.skipped += 1;
                }
            },
            None => {
                tracing::warn!("Line {}: record has no @graph", lineno + 1);
                stats.skipped += 1;
            }
        }
    }

    out.flush()?;
    Ok(stats)
}

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Collects the trimmed, non-empty lines of a reader
pub fn lines_from_reader<R: BufRead>(reader: R) -> io::Result<Vec<String>> {
    let mut result = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            result.push(trimmed.to_string());
        }
    }
    Ok(result)
}

/// Collects the trimmed, non-empty lines of a file
pub fn lines_from_file(path: &Path) -> io::Result<Vec<String>> {
    lines_from_reader(BufReader::new(File::open(path)?))
}

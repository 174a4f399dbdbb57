use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};
use url::Url;

/// Cached sitemap index
pub const INDEX_FILE: &str = "sitemap.xml";

/// Sorted identifier list, one per line
pub const LIST_FILE: &str = "issnlist.tsv";

/// Set snapshot of the identifier list
pub const SNAPSHOT_FILE: &str = "issnset.json";

/// One day's cache directory
///
/// Everything derived from the sitemap lives under `<root>/<YYYY-MM-DD>`.
/// Once the date rolls over a new, empty directory is used and the previous
/// one is simply no longer read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEpoch {
    root: PathBuf,
    date: NaiveDate,
}

impl CacheEpoch {
    pub fn new(root: impl Into<PathBuf>, date: NaiveDate) -> Self {
        Self {
            root: root.into(),
            date,
        }
    }

    /// Epoch for the current local date
    pub fn today(root: impl Into<PathBuf>) -> Self {
        Self::new(root, Local::now().date_naive())
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Directory name of this epoch
    pub fn prefix(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    pub fn dir(&self) -> PathBuf {
        self.root.join(self.prefix())
    }

    pub fn index_file(&self) -> PathBuf {
        self.dir().join(INDEX_FILE)
    }

    pub fn list_file(&self) -> PathBuf {
        self.dir().join(LIST_FILE)
    }

    pub fn snapshot_file(&self) -> PathBuf {
        self.dir().join(SNAPSHOT_FILE)
    }

    /// Whether a file name is used by the cache itself
    ///
    /// Covers the index, the derived list files and hidden staging files. A
    /// shard can never be stored under such a name.
    pub fn is_reserved_name(name: &str) -> bool {
        name.starts_with('.') || [INDEX_FILE, LIST_FILE, SNAPSHOT_FILE].contains(&name)
    }

    /// Whether a file in the epoch directory is a cached shard
    pub fn is_shard_file(path: &Path) -> bool {
        match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => !Self::is_reserved_name(name),
            None => false,
        }
    }
}

/// Last non-empty path segment of a URL
///
/// `https://portal.issn.org/sitemap6.xml` yields `sitemap6.xml`.
pub fn shard_name(loc: &str) -> Option<String> {
    let url = Url::parse(loc.trim()).ok()?;
    let name = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    if name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}

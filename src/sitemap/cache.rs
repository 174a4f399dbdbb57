//! Sitemap cache
//!
//! Builds the identifier list for one epoch in three steps, each skipped when
//! its output is already on disk:
//!
//! 1. Fetch the sitemap index
//! 2. Fetch every shard listed in the index
//! 3. Parse all cached shards, then dedupe, sort and persist the identifiers
//!
//! Cached files are never modified once written. A failed build leaves only
//! complete files behind, which a retry reuses.

use crate::config::Config;
use crate::harvest::BatchProcessor;
use crate::identifier::IdentifierSet;
use crate::sitemap::epoch::{shard_name, CacheEpoch};
use crate::sitemap::parser::{extract_identifiers, parse_index, SitemapIndex};
use crate::storage::{ensure_dir, AtomicWriter};
use crate::{IssnError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;

/// Shard files handed to a parsing worker at a time
pub const SHARD_BATCH_SIZE: usize = 2;

/// On-disk form of the identifier set
#[derive(Debug, Serialize, Deserialize)]
struct SetSnapshot {
    /// SHA-256 of the list file the set was built from
    digest: String,
    identifiers: IdentifierSet,
}

/// Fetches and caches the sitemap of one epoch and derives the identifier list
pub struct SitemapCache {
    client: Client,
    index_url: String,
    epoch: CacheEpoch,
    writer: AtomicWriter,
    workers: usize,
    list: OnceCell<Vec<String>>,
}

impl SitemapCache {
    /// Creates a cache using the given HTTP client
    pub fn with_client(client: Client, config: &Config, epoch: CacheEpoch) -> Self {
        Self {
            client,
            index_url: config.cache.sitemap_index.clone(),
            epoch,
            writer: AtomicWriter::default(),
            workers: config.harvest.workers.max(1),
            list: OnceCell::new(),
        }
    }

    pub fn epoch(&self) -> &CacheEpoch {
        &self.epoch
    }

    /// Fetches the sitemap index unless it is already cached
    ///
    /// Creates the epoch directory on first use. Returns `true` when the
    /// index was downloaded.
    pub async fn ensure_index(&self) -> Result<bool> {
        ensure_dir(&self.epoch.dir())?;

        let target = self.epoch.index_file();
        if target.exists() {
            tracing::debug!("Sitemap index cached at {}", target.display());
            return Ok(false);
        }

        tracing::info!("Fetching sitemap index {}", self.index_url);
        self.fetch_to(&self.index_url, &target).await?;
        Ok(true)
    }

    /// Reads the shard locations from the cached index
    pub async fn shard_index(&self) -> Result<SitemapIndex> {
        self.ensure_index().await?;

        let path = self.epoch.index_file();
        let xml = tokio::fs::read_to_string(&path).await?;
        parse_index(&xml).map_err(|e| IssnError::Xml {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Fetches every shard that is not cached yet
    ///
    /// Every location is mapped to its cache file before anything is
    /// fetched; a location without a file name, or one whose name is
    /// reserved or shared with another shard, fails the build. Shards are
    /// then fetched one after another and the first failure aborts. Returns
    /// the number of shards downloaded.
    pub async fn ensure_shards(&self) -> Result<usize> {
        let index = self.shard_index().await?;
        let targets = self.shard_targets(&index)?;
        let listed = targets.len();
        let mut fetched = 0;

        for (loc, target) in targets {
            if target.exists() {
                tracing::debug!("{} cached at {}", loc, target.display());
                continue;
            }

            tracing::info!("Fetching {}", loc);
            self.fetch_to(loc, &target).await?;
            fetched += 1;
        }

        tracing::info!(
            "{} shards listed, {} fetched, {} cached",
            listed,
            fetched,
            listed - fetched
        );
        Ok(fetched)
    }

    /// The sorted, deduplicated identifier list of this epoch
    ///
    /// Computed on the first call (or read from `issnlist.tsv` when present)
    /// and kept for the lifetime of the cache.
    pub async fn list(&self) -> Result<&[String]> {
        let list = self.list.get_or_try_init(|| self.load_list()).await?;
        Ok(list.as_slice())
    }

    /// The identifier list as a set, backed by `issnset.json`
    ///
    /// A snapshot that is missing, unreadable, or built from a different list
    /// is rebuilt.
    pub async fn snapshot(&self) -> Result<IdentifierSet> {
        let list = self.list().await?;
        let digest = hex::encode(Sha256::digest(tokio::fs::read(self.epoch.list_file()).await?));
        let path = self.epoch.snapshot_file();

        if path.exists() {
            let data = tokio::fs::read(&path).await?;
            match serde_json::from_slice::<SetSnapshot>(&data) {
                Ok(snapshot) if snapshot.digest == digest => {
                    tracing::debug!("Using set snapshot {}", path.display());
                    return Ok(snapshot.identifiers);
                }
                Ok(_) => tracing::info!("Set snapshot {} is stale, rebuilding", path.display()),
                Err(e) => tracing::warn!("Unreadable set snapshot {}: {}", path.display(), e),
            }
        }

        let snapshot = SetSnapshot {
            digest,
            identifiers: list.iter().cloned().collect(),
        };
        self.writer.write(&path, &serde_json::to_vec(&snapshot)?)?;
        tracing::info!(
            "Wrote set snapshot with {} identifiers to {}",
            snapshot.identifiers.size(),
            path.display()
        );
        Ok(snapshot.identifiers)
    }

    async fn load_list(&self) -> Result<Vec<String>> {
        let path = self.epoch.list_file();
        if path.exists() {
            let content = tokio::fs::read_to_string(&path).await?;
            let list: Vec<String> = content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect();
            tracing::info!("Read {} identifiers from {}", list.len(), path.display());
            return Ok(list);
        }

        self.ensure_shards().await?;
        let files = self.cached_shard_files()?;
        tracing::info!("Extracting identifiers from {} shard files", files.len());

        let mut output = Vec::new();
        BatchProcessor::new(self.workers, SHARD_BATCH_SIZE)
            .run(files, &mut output, |batch: Vec<PathBuf>| async move {
                match tokio::task::spawn_blocking(move || parse_shard_batch(&batch)).await {
                    Ok(parsed) => parsed,
                    Err(e) => Err(IssnError::Worker(e.to_string())),
                }
            })
            .await?;

        let set: IdentifierSet = String::from_utf8_lossy(&output)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        let list = set.sorted_values();

        let mut content = list.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        self.writer.write(&path, content.as_bytes())?;
        tracing::info!("Wrote {} identifiers to {}", list.len(), path.display());
        Ok(list)
    }

    /// Cache file of every distinct shard location, in index order
    fn shard_targets<'a>(&self, index: &'a SitemapIndex) -> Result<Vec<(&'a str, PathBuf)>> {
        let mut owners: HashMap<String, &str> = HashMap::new();
        let mut targets = Vec::new();

        for loc in index.locations() {
            let name = shard_name(loc).ok_or_else(|| IssnError::MissingShardName {
                loc: loc.to_string(),
            })?;
            let collision = || IssnError::ShardNameCollision {
                loc: loc.to_string(),
                name: name.clone(),
            };
            if CacheEpoch::is_reserved_name(&name) {
                return Err(collision());
            }
            match owners.get(&name) {
                Some(owner) if *owner == loc => continue,
                Some(_) => return Err(collision()),
                None => {}
            }
            owners.insert(name.clone(), loc);
            targets.push((loc, self.epoch.dir().join(&name)));
        }

        Ok(targets)
    }

    /// Cached shard files in name order
    fn cached_shard_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(self.epoch.dir())? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_file() && CacheEpoch::is_shard_file(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    async fn fetch_to(&self, url: &str, target: &Path) -> Result<()> {
        let http_err = |source| IssnError::Http {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(http_err)?;
        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(IssnError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(http_err)?;
        self.writer.write(target, &body)?;
        tracing::debug!("Cached {} bytes at {}", body.len(), target.display());
        Ok(())
    }
}

/// Parses shard files into newline separated identifiers
fn parse_shard_batch(paths: &[PathBuf]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    for path in paths {
        let xml = std::fs::read_to_string(path)?;
        let identifiers = extract_identifiers(&xml).map_err(|e| IssnError::Xml {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        tracing::debug!("{} identifiers in {}", identifiers.len(), path.display());
        for id in identifiers {
            buf.extend_from_slice(id.as_bytes());
            buf.push(b'\n');
        }
    }
    Ok(buf)
}

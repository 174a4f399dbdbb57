//! Metadata harvest
//!
//! This module contains the dump pipeline:
//! - Ordered batch processing over a fixed worker pool
//! - HTTP fetching with per-item retries
//! - Link generation and ignore filtering
//! - Resuming an interrupted dump

mod batch;
mod engine;
mod fetcher;
mod links;
mod record;
mod resume;

pub use batch::{BatchProcessor, BatchStats};
pub use engine::BatchFetchEngine;
pub use fetcher::{build_http_client, RecordFetcher};
pub use links::{build_links, resource_link};
pub use record::{record_ids, FetchRecord, RecordIds, ISSNL_ID_PREFIX, ISSN_ID_PREFIX};
pub use resume::{ResumeController, ResumePlan};

use crate::config::Config;
use crate::identifier::IdentifierSet;
use crate::sitemap::{CacheEpoch, SitemapCache};
use crate::storage::lines_from_file;
use crate::{ConfigError, ConfigResult, IssnError, Result};
use std::path::PathBuf;
use tokio::io::AsyncWrite;

/// Where the identifiers to skip come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreSource {
    /// Fetch everything
    None,
    /// Newline delimited list of identifiers to skip
    File(PathBuf),
    /// Previous dump to repair and continue
    Resume(PathBuf),
}

impl IgnoreSource {
    /// Combines the two optional inputs
    ///
    /// An ignore file and a resume file cannot be used together, since
    /// resuming derives its own ignore set.
    pub fn from_options(
        ignore_file: Option<PathBuf>,
        resume_file: Option<PathBuf>,
    ) -> ConfigResult<Self> {
        match (ignore_file, resume_file) {
            (Some(_), Some(_)) => Err(ConfigError::Validation(
                "use either an ignore file or a resume file, not both".to_string(),
            )),
            (Some(path), None) => Ok(IgnoreSource::File(path)),
            (None, Some(path)) => Ok(IgnoreSource::Resume(path)),
            (None, None) => Ok(IgnoreSource::None),
        }
    }
}

/// Links to fetch and where their output goes
#[derive(Debug, Clone, Default)]
pub struct DumpPlan {
    /// Metadata URLs in catalog order
    pub links: Vec<String>,

    /// Identifiers left out
    pub ignored: usize,

    /// Existing dump to append to, instead of standard output
    pub append_to: Option<PathBuf>,
}

/// Runs a full dump: identifier list, ignore filtering, batch fetch
pub struct Harvester {
    cache: SitemapCache,
    engine: BatchFetchEngine,
    resource_url: String,
}

impl Harvester {
    /// Creates a harvester for one cache epoch
    ///
    /// The sitemap cache and the fetch engine share a single HTTP client.
    pub fn new(config: &Config, epoch: CacheEpoch) -> Result<Self> {
        let client = build_http_client(&config.user_agent).map_err(|source| IssnError::Http {
            url: config.cache.sitemap_index.clone(),
            source,
        })?;
        Ok(Self {
            cache: SitemapCache::with_client(client.clone(), config, epoch),
            engine: BatchFetchEngine::new(client, &config.harvest),
            resource_url: config.harvest.resource_url.clone(),
        })
    }

    pub fn cache(&self) -> &SitemapCache {
        &self.cache
    }

    /// Resolves the ignore set and builds the links to fetch
    ///
    /// A resume source is repaired before the identifier list is loaded.
    pub async fn plan(&self, source: &IgnoreSource) -> Result<DumpPlan> {
        let (ignore, append_to) = match source {
            IgnoreSource::None => (None, None),
            IgnoreSource::File(path) => {
                let ignore: IdentifierSet = lines_from_file(path)?.into_iter().collect();
                tracing::info!("{} to ignore from {}", ignore.size(), path.display());
                (Some(ignore), None)
            }
            IgnoreSource::Resume(path) => {
                let plan = ResumeController::new(path.clone()).prepare()?;
                (Some(plan.ignore), Some(path.clone()))
            }
        };

        let identifiers = self.cache.list().await?;
        let links = build_links(identifiers, ignore.as_ref(), &self.resource_url);

        Ok(DumpPlan {
            ignored: identifiers.len() - links.len(),
            links,
            append_to,
        })
    }

    /// Fetches the planned links into `sink`
    pub async fn run<W>(&self, plan: DumpPlan, sink: &mut W) -> Result<BatchStats>
    where
        W: AsyncWrite + Unpin,
    {
        self.engine.run(plan.links, sink).await
    }

    /// Plans and runs a dump, writing to standard output or appending to the resumed file
    pub async fn dump(&self, source: &IgnoreSource) -> Result<BatchStats> {
        let plan = self.plan(source).await?;
        match plan.append_to.clone() {
            Some(path) => {
                let mut file = ResumeController::new(path).open_append().await?;
                self.run(plan, &mut file).await
            }
            None => {
                let mut stdout = tokio::io::stdout();
                self.run(plan, &mut stdout).await
            }
        }
    }
}

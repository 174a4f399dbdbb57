use crate::config::HarvestConfig;
use crate::harvest::batch::{BatchProcessor, BatchStats};
use crate::harvest::fetcher::RecordFetcher;
use crate::Result;
use reqwest::Client;
use std::sync::Arc;
use tokio::io::AsyncWrite;

/// Downloads metadata for a list of links with a fixed worker pool
///
/// Links are cut into batches of `batch-size`; each of the `workers` workers
/// fetches one batch at a time, item by item, so at most `workers` requests
/// are open at once. Batch output lands in the sink in dispatch order. The
/// first link that exhausts its retry budget aborts the run.
pub struct BatchFetchEngine {
    processor: BatchProcessor,
    fetcher: Arc<RecordFetcher>,
}

impl BatchFetchEngine {
    pub fn new(client: Client, config: &HarvestConfig) -> Self {
        Self::from_parts(
            BatchProcessor::new(config.workers, config.batch_size),
            RecordFetcher::new(client, config),
        )
    }

    pub fn from_parts(processor: BatchProcessor, fetcher: RecordFetcher) -> Self {
        Self {
            processor,
            fetcher: Arc::new(fetcher),
        }
    }

    /// Fetches every link and writes one JSON line per decoded document
    pub async fn run<W>(&self, links: Vec<String>, sink: &mut W) -> Result<BatchStats>
    where
        W: AsyncWrite + Unpin,
    {
        tracing::info!(
            "Attempting to download {} links ({} workers, batch size {})",
            links.len(),
            self.processor.workers(),
            self.processor.batch_size()
        );

        let fetcher = Arc::clone(&self.fetcher);
        let stats = self
            .processor
            .run(links, sink, move |batch| {
                let fetcher = Arc::clone(&fetcher);
                async move { fetcher.fetch_batch(batch).await }
            })
            .await?;

        tracing::info!(
            "Wrote {} records for {} links in {} batches ({} bytes)",
            stats.lines,
            stats.items,
            stats.batches,
            stats.bytes
        );
        Ok(stats)
    }
}

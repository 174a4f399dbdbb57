//! Ordered batch processing over a fixed worker pool
//!
//! Work items are cut into contiguous batches. A fixed number of workers pull
//! whole batches from a shared queue, and every batch produces one output
//! buffer. Buffers are written to the sink in dispatch order, whatever order
//! the workers finish in, so a given input always yields the same output.

use crate::{IssnError, Result};
use std::collections::{BTreeMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

/// Counters for a finished run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    /// Batches written to the sink
    pub batches: usize,

    /// Work items contained in the written batches
    pub items: usize,

    /// Newline terminated lines written to the sink
    pub lines: usize,

    /// Bytes written to the sink
    pub bytes: u64,
}

/// Fixed size worker pool that keeps batch output in dispatch order
#[derive(Debug, Clone, Copy)]
pub struct BatchProcessor {
    workers: usize,
    batch_size: usize,
}

type Queue<T> = Arc<Mutex<VecDeque<(usize, Vec<T>)>>>;

impl BatchProcessor {
    /// Creates a processor; zero values are raised to one
    pub fn new(workers: usize, batch_size: usize) -> Self {
        Self {
            workers: workers.max(1),
            batch_size: batch_size.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Processes `items` with `work` and streams the results into `sink`
    ///
    /// The first failing batch stops the run: idle workers stop taking new
    /// batches, batches already in flight are allowed to finish, and the
    /// error is returned. Batches dispatched before the failing one that
    /// completed are still written; nothing after it is.
    ///
    /// # Arguments
    ///
    /// * `items` - Work items in dispatch order
    /// * `sink` - Destination for the concatenated batch outputs
    /// * `work` - Turns one batch into its serialized output
    ///
    /// # Returns
    ///
    /// * `Ok(BatchStats)` - Every batch completed and was written
    /// * `Err(IssnError)` - A batch, a worker, or the sink failed
    pub async fn run<T, W, F, Fut>(&self, items: Vec<T>, sink: &mut W, work: F) -> Result<BatchStats>
    where
        T: Send + 'static,
        W: AsyncWrite + Unpin,
        F: Fn(Vec<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<u8>>> + Send + 'static,
    {
        let batches = partition(items, self.batch_size);
        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        let mut stats = BatchStats::default();

        if batches.is_empty() {
            sink.flush().await?;
            return Ok(stats);
        }

        let queue: Queue<T> = Arc::new(Mutex::new(batches.into_iter().enumerate().collect()));
        let stop = Arc::new(AtomicBool::new(false));
        let work = Arc::new(work);
        let (tx, mut rx) = mpsc::channel::<(usize, Result<Vec<u8>>)>(self.workers);

        let pool = self.workers.min(sizes.len());
        tracing::debug!(
            "Dispatching {} batches of up to {} items to {} workers",
            sizes.len(),
            self.batch_size,
            pool
        );

        let mut handles = Vec::with_capacity(pool);
        for _ in 0..pool {
            let queue = Arc::clone(&queue);
            let stop = Arc::clone(&stop);
            let work = Arc::clone(&work);
            let tx = tx.clone();
            handles.push(tokio::spawn(async move {
                while !stop.load(Ordering::SeqCst) {
                    let next = queue.lock().ok().and_then(|mut q| q.pop_front());
                    let Some((index, batch)) = next else {
                        break;
                    };
                    let result = (*work)(batch).await;
                    let failed = result.is_err();
                    if failed {
                        stop.store(true, Ordering::SeqCst);
                    }
                    if tx.send((index, result)).await.is_err() || failed {
                        break;
                    }
                }
            }));
        }
        drop(tx);

        let mut outcome: Result<()> = Ok(());
        let mut pending: BTreeMap<usize, Vec<u8>> = BTreeMap::new();
        let mut next = 0usize;
        let mut failed_at: Option<usize> = None;

        'recv: while let Some((index, result)) = rx.recv().await {
            match result {
                Ok(buf) => {
                    pending.insert(index, buf);
                }
                Err(err) => {
                    tracing::error!("Batch {} failed: {}", index, err);
                    failed_at = Some(failed_at.map_or(index, |f| f.min(index)));
                    if outcome.is_ok() {
                        outcome = Err(err);
                    }
                }
            }

            // Write the contiguous run of finished batches.
            while failed_at.map_or(true, |f| next < f) {
                let Some(buf) = pending.remove(&next) else {
                    break;
                };
                if let Err(err) = sink.write_all(&buf).await {
                    stop.store(true, Ordering::SeqCst);
                    if outcome.is_ok() {
                        outcome = Err(err.into());
                    }
                    break 'recv;
                }
                stats.batches += 1;
                stats.items += sizes[next];
                stats.lines += buf.iter().filter(|b| **b == b'\n').count();
                stats.bytes += buf.len() as u64;
                next += 1;
            }
        }

        stop.store(true, Ordering::SeqCst);
        drop(rx);

        for handle in handles {
            if let Err(err) = handle.await {
                if outcome.is_ok() {
                    outcome = Err(IssnError::Worker(err.to_string()));
                }
            }
        }

        sink.flush().await?;
        outcome?;

        if next != sizes.len() {
            return Err(IssnError::Worker(format!(
                "only {} of {} batches completed",
                next,
                sizes.len()
            )));
        }

        Ok(stats)
    }
}

/// Splits items into contiguous batches of at most `size` items
fn partition<T>(items: Vec<T>, size: usize) -> Vec<Vec<T>> {
    let mut batches = Vec::with_capacity(items.len().div_ceil(size));
    let mut current = Vec::with_capacity(size);
    for item in items {
        current.push(item);
        if current.len() == size {
            batches.push(std::mem::replace(&mut current, Vec::with_capacity(size)));
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

//! HTTP fetcher for per-identifier metadata
//!
//! This module handles:
//! - Building the shared HTTP client with the configured user agent
//! - Fetching one metadata document with a bounded number of attempts
//! - Fetching a whole batch into newline delimited, compact JSON

use crate::config::{HarvestConfig, UserAgentConfig};
use crate::harvest::record::FetchRecord;
use crate::{IssnError, Result};
use reqwest::Client;
use std::fmt;
use std::time::Duration;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Example
///
/// ```no_run
/// use issnlister::config::UserAgentConfig;
/// use issnlister::harvest::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Why a single attempt failed
#[derive(Debug)]
enum AttemptFailure {
    /// Connection failure, timeout or broken body stream
    Transport(String),
    /// Response status >= 400
    Status(String),
    /// Body is not a JSON object
    Decode(String),
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::Transport(msg)
            | AttemptFailure::Status(msg)
            | AttemptFailure::Decode(msg) => f.write_str(msg),
        }
    }
}

/// Fetches metadata documents with per-item retries
///
/// Every failure (transport error, HTTP status >= 400, body that is not a
/// JSON object) uses up one attempt. When the budget is spent the fetch fails
/// with [`IssnError::RetriesExhausted`] carrying one reason per attempt.
/// With `skip_undecodable` set, a body that does not decode is logged and
/// skipped instead.
#[derive(Debug, Clone)]
pub struct RecordFetcher {
    client: Client,
    retry_budget: u32,
    retry_delay: Duration,
    skip_undecodable: bool,
}

impl RecordFetcher {
    pub fn new(client: Client, config: &HarvestConfig) -> Self {
        Self {
            client,
            retry_budget: config.retry_budget.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            skip_undecodable: config.skip_undecodable,
        }
    }

    /// Fetches and decodes one document
    ///
    /// # Returns
    ///
    /// * `Ok(Some(record))` - Decoded document
    /// * `Ok(None)` - Undecodable body skipped (only with `skip_undecodable`)
    /// * `Err(IssnError::RetriesExhausted)` - Every attempt failed
    pub async fn fetch(&self, url: &str) -> Result<Option<FetchRecord>> {
        let mut failures = Vec::with_capacity(self.retry_budget as usize);

        for attempt in 1..=self.retry_budget {
            match self.attempt(url).await {
                Ok(record) => return Ok(Some(record)),
                Err(AttemptFailure::Decode(reason)) if self.skip_undecodable => {
                    tracing::warn!("Skipping undecodable record: {}", reason);
                    return Ok(None);
                }
                Err(failure) => {
                    tracing::warn!(
                        "Attempt {}/{} failed: {}",
                        attempt,
                        self.retry_budget,
                        failure
                    );
                    failures.push(failure.to_string());
                    if attempt < self.retry_budget && !self.retry_delay.is_zero() {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        Err(IssnError::RetriesExhausted {
            url: url.to_string(),
            attempts: failures,
        })
    }

    /// Fetches every link of a batch, in order
    ///
    /// Blank lines and lines starting with `#` are ignored. Each decoded
    /// document becomes one compact JSON line of the returned buffer.
    pub async fn fetch_batch(&self, links: Vec<String>) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        for link in &links {
            let link = link.trim();
            if link.is_empty() || link.starts_with('#') {
                continue;
            }
            if let Some(record) = self.fetch(link).await? {
                serde_json::to_writer(&mut buf, &record)?;
                buf.push(b'\n');
            }
        }
        Ok(buf)
    }

    async fn attempt(&self, url: &str) -> std::result::Result<FetchRecord, AttemptFailure> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AttemptFailure::Transport(format!("{} on {}", e, url)))?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(AttemptFailure::Status(format!("got {} on {}", status, url)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AttemptFailure::Transport(format!("{} on {}", e, url)))?;

        serde_json::from_slice::<FetchRecord>(&body).map_err(|e| {
            tracing::debug!("Undecodable body from {}: {}", url, String::from_utf8_lossy(&body));
            AttemptFailure::Decode(format!("{} failed with {}", url, e))
        })
    }
}

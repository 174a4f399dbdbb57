//! issnlister: harvest the ISSN registry catalog
//!
//! This crate caches the two-level sitemap published by the ISSN portal,
//! derives a sorted, deduplicated list of serial numbers from it and downloads
//! the public JSON metadata for every number with a fixed pool of workers.
//! Interrupted dumps can be continued without fetching completed records again.

pub mod config;
pub mod harvest;
pub mod identifier;
pub mod output;
pub mod sitemap;
pub mod storage;

use thiserror::Error;

/// Main error type for issnlister operations
#[derive(Debug, Error)]
pub enum IssnError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Identifier error: {0}")]
    Identifier(#[from] IdentifierError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Failed to fetch {url}: HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Malformed XML in {path}: {message}")]
    Xml { path: String, message: String },

    #[error("Sitemap location has no file name: {loc}")]
    MissingShardName { loc: String },

    #[error("Sitemap location {loc} maps to cache file {name}, which is already taken")]
    ShardNameCollision { loc: String, name: String },

    #[error("Giving up on {url} after {} attempts: {}", attempts.len(), attempts.join("; "))]
    RetriesExhausted { url: String, attempts: Vec<String> },

    #[error("Persist error: {0}")]
    Persist(#[from] storage::PersistError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Worker failed: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised while normalizing or validating a serial number
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("Invalid ISSN length: '{input}'")]
    InvalidLength { input: String },

    #[error("Invalid characters in ISSN: '{input}'")]
    InvalidCharacters { input: String },
}

/// Result type alias for issnlister operations
pub type Result<T> = std::result::Result<T, IssnError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for identifier operations
pub type IdentifierResult<T> = std::result::Result<T, IdentifierError>;

// Re-export commonly used types
pub use config::Config;
pub use harvest::{BatchFetchEngine, Harvester, IgnoreSource, ResumeController};
pub use identifier::{IdentifierSet, Issn};
pub use sitemap::{CacheEpoch, SitemapCache};
pub use storage::AtomicWriter;

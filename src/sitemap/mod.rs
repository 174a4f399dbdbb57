//! Sitemap caching
//!
//! This module contains:
//! - The per-day cache directory layout
//! - Strict decoding of sitemap index and shard documents
//! - The cache that fetches, parses and persists the identifier list

mod cache;
mod epoch;
mod parser;

pub use cache::{SitemapCache, SHARD_BATCH_SIZE};
pub use epoch::{shard_name, CacheEpoch, INDEX_FILE, LIST_FILE, SNAPSHOT_FILE};
pub use parser::{
    extract_identifiers, identifier_from_loc, parse_index, parse_urlset, ParseError, ShardRef,
    SitemapIndex,
};

//! Configuration module for issnlister
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key has a default, so the file is optional.
//!
//! # Example
//!
//! ```no_run
//! use issnlister::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("issnlister.toml")).unwrap();
//! println!("Harvest will use {} workers", config.harvest.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CacheConfig, Config, HarvestConfig, UserAgentConfig, DEFAULT_RESOURCE_URL,
    DEFAULT_RETRY_BUDGET, DEFAULT_SITEMAP_INDEX, ISSN_PLACEHOLDER,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;

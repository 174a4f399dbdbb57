use serde::Deserialize;
use std::path::PathBuf;

/// Default location of the registry's sitemap index
pub const DEFAULT_SITEMAP_INDEX: &str = "https://portal.issn.org/sitemap.xml";

/// Default metadata endpoint, `{issn}` is replaced by the canonical identifier
pub const DEFAULT_RESOURCE_URL: &str = "https://portal.issn.org/resource/ISSN/{issn}?format=json";

/// Placeholder substituted in [`HarvestConfig::resource_url`]
pub const ISSN_PLACEHOLDER: &str = "{issn}";

/// Attempts per identifier before a dump gives up
pub const DEFAULT_RETRY_BUDGET: u32 = 10;

/// Main configuration structure for issnlister
///
/// Built once at startup (defaults, optional TOML file, then command line
/// overrides) and handed to every component by reference.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub harvest: HarvestConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
}

/// Sitemap cache configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Root directory holding one subdirectory per epoch
    pub directory: PathBuf,

    /// URL of the sitemap index
    #[serde(rename = "sitemap-index")]
    pub sitemap_index: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: default_cache_dir(),
            sitemap_index: DEFAULT_SITEMAP_INDEX.to_string(),
        }
    }
}

/// Metadata harvest configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Number of concurrent workers
    pub workers: usize,

    /// Number of links handed to a worker at a time
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    /// Attempts per link before the dump fails
    #[serde(rename = "retry-budget")]
    pub retry_budget: u32,

    /// Pause between two attempts on the same link (milliseconds)
    #[serde(rename = "retry-delay-ms")]
    pub retry_delay_ms: u64,

    /// Skip bodies that are not JSON instead of retrying them
    #[serde(rename = "skip-undecodable")]
    pub skip_undecodable: bool,

    /// Metadata URL template containing `{issn}`
    #[serde(rename = "resource-url")]
    pub resource_url: String,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            workers: cpus * 2,
            batch_size: 100,
            retry_budget: DEFAULT_RETRY_BUDGET,
            retry_delay_ms: 250,
            skip_undecodable: false,
            resource_url: DEFAULT_RESOURCE_URL.to_string(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the harvester
    pub name: String,

    /// Version of the harvester
    pub version: String,

    /// URL with information about the harvester
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://github.com/miku/issnlister".to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (ContactURL)`
    pub fn header_value(&self) -> String {
        format!("{}/{} ({})", self.name, self.version, self.contact_url)
    }
}

/// Resolves `$XDG_CACHE_HOME/issnlister`, falling back to `~/.cache/issnlister`
fn default_cache_dir() -> PathBuf {
    let base = std::env::var_os("XDG_CACHE_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| home::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(std::env::temp_dir);
    base.join(env!("CARGO_PKG_NAME"))
}

use crate::config::types::{
    CacheConfig, Config, HarvestConfig, UserAgentConfig, ISSN_PLACEHOLDER,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_cache_config(&config.cache)?;
    validate_harvest_config(&config.harvest)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

/// Validates cache configuration
fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.directory.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "cache directory cannot be empty".to_string(),
        ));
    }

    validate_http_url("sitemap-index", &config.sitemap_index)?;

    Ok(())
}

/// Validates harvest configuration
fn validate_harvest_config(config: &HarvestConfig) -> Result<(), ConfigError> {
    if config.workers < 1 {
        return Err(ConfigError::Validation(format!(
            "workers must be >= 1, got {}",
            config.workers
        )));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch-size must be >= 1, got {}",
            config.batch_size
        )));
    }

    if config.retry_budget < 1 {
        return Err(ConfigError::Validation(format!(
            "retry-budget must be >= 1, got {}",
            config.retry_budget
        )));
    }

    if !config.resource_url.contains(ISSN_PLACEHOLDER) {
        return Err(ConfigError::Validation(format!(
            "resource-url must contain the {} placeholder, got '{}'",
            ISSN_PLACEHOLDER, config.resource_url
        )));
    }

    let sample = config.resource_url.replace(ISSN_PLACEHOLDER, "0000-0000");
    validate_http_url("resource-url", &sample)?;

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.name.is_empty() {
        return Err(ConfigError::Validation(
            "user-agent name cannot be empty".to_string(),
        ));
    }

    if !config
        .name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "user-agent name must contain only alphanumeric characters, '-' and '_', got '{}'",
            config.name
        )));
    }

    Ok(())
}

/// Checks that a URL parses and uses an HTTP scheme
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use HTTP or HTTPS, got '{}'",
            field, value
        )));
    }

    Ok(())
}

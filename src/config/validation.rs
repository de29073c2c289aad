use crate::config::types::{
    AntiDetectionConfig, Config, CrawlConfig, OutputConfig, PacingConfig, ValidationConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_pacing_config(&config.pacing)?;
    validate_anti_detection_config(&config.anti_detection)?;
    validate_validation_config(&config.validation)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the catalog walk configuration
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use http or https",
            config.base_url
        )));
    }

    for region in &config.regions {
        validate_region(region)?;
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.max_houses_per_page < 1 {
        return Err(ConfigError::Validation(format!(
            "max_houses_per_page must be >= 1, got {}",
            config.max_houses_per_page
        )));
    }

    if config.max_total_houses < 1 {
        return Err(ConfigError::Validation(format!(
            "max_total_houses must be >= 1, got {}",
            config.max_total_houses
        )));
    }

    Ok(())
}

/// Validates a region slug
fn validate_region(region: &str) -> Result<(), ConfigError> {
    let region = region.trim();

    if region.is_empty() {
        return Err(ConfigError::Validation(
            "region slugs cannot be empty".to_string(),
        ));
    }

    if !region
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "region '{}' must contain only alphanumeric characters, '-' or '_'",
            region
        )));
    }

    Ok(())
}

/// Validates pacing configuration
fn validate_pacing_config(config: &PacingConfig) -> Result<(), ConfigError> {
    if config.min_delay_ms > config.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "min_delay_ms ({}) must not exceed max_delay_ms ({})",
            config.min_delay_ms, config.max_delay_ms
        )));
    }

    if config.timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "timeout_ms must be >= 100ms, got {}ms",
            config.timeout_ms
        )));
    }

    Ok(())
}

/// Validates retry, proxy and user-agent settings
fn validate_anti_detection_config(config: &AntiDetectionConfig) -> Result<(), ConfigError> {
    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    for proxy in &config.proxies {
        Url::parse(proxy).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid proxy URL '{}': {}", proxy, e))
        })?;
    }

    if config.user_agents.iter().any(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user_agents entries cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates price and area bounds
fn validate_validation_config(config: &ValidationConfig) -> Result<(), ConfigError> {
    if config.min_price > config.max_price {
        return Err(ConfigError::Validation(format!(
            "min_price ({}) must not exceed max_price ({})",
            config.min_price, config.max_price
        )));
    }

    if !config.min_area.is_finite() || !config.max_area.is_finite() || config.min_area < 0.0 {
        return Err(ConfigError::Validation(format!(
            "area bounds must be finite and non-negative, got [{}, {}]",
            config.min_area, config.max_area
        )));
    }

    if config.min_area > config.max_area {
        return Err(ConfigError::Validation(format!(
            "min_area ({}) must not exceed max_area ({})",
            config.min_area, config.max_area
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.path.trim().is_empty() {
        return Err(ConfigError::Validation("output path cannot be empty".to_string()));
    }

    if let Some(log_path) = &config.verification_log {
        if log_path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "verification_log path cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

use crate::config::types::{ApiConfig, Config, CrawlerConfig, DataConfig, FilterConfig, ServerConfig};
use crate::pipeline::RecordField;
use crate::ConfigError;
use chrono::NaiveDate;
use std::net::SocketAddr;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_api_config(&config.api)?;
    validate_crawler_config(&config.crawler)?;
    validate_data_config(&config.data)?;
    validate_filter_config(&config.filter)?;
    validate_server_config(&config.server)?;
    Ok(())
}

/// Validates remote API configuration
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler pacing configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.request_timeout < 1 {
        return Err(ConfigError::Validation(
            "request-timeout must be >= 1s".to_string(),
        ));
    }

    if config.max_connect_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max-connect-attempts must be >= 1, got {}",
            config.max_connect_attempts
        )));
    }

    if config.max_page_size < 1 || config.max_page_size > 100 {
        return Err(ConfigError::Validation(format!(
            "max-page-size must be between 1 and 100, got {}",
            config.max_page_size
        )));
    }

    Ok(())
}

/// Validates dataset paths
fn validate_data_config(config: &DataConfig) -> Result<(), ConfigError> {
    if config.raw_path.is_empty() {
        return Err(ConfigError::Validation(
            "raw-path cannot be empty".to_string(),
        ));
    }

    if config.filtered_path.is_empty() {
        return Err(ConfigError::Validation(
            "filtered-path cannot be empty".to_string(),
        ));
    }

    if config.raw_path == config.filtered_path {
        return Err(ConfigError::Validation(
            "raw-path and filtered-path must differ".to_string(),
        ));
    }

    Ok(())
}

/// Validates filter configuration
fn validate_filter_config(config: &FilterConfig) -> Result<(), ConfigError> {
    for field in &config.required_fields {
        field.parse::<RecordField>().map_err(|_| {
            ConfigError::Validation(format!("Unknown required field '{}'", field))
        })?;
    }

    NaiveDate::parse_from_str(&config.created_after, "%Y-%m-%d").map_err(|e| {
        ConfigError::Validation(format!(
            "created-after '{}' is not a YYYY-MM-DD date: {}",
            config.created_after, e
        ))
    })?;

    Ok(())
}

/// Validates read API configuration
fn validate_server_config(config: &ServerConfig) -> Result<(), ConfigError> {
    config.bind_address.parse::<SocketAddr>().map_err(|e| {
        ConfigError::Validation(format!(
            "bind-address '{}' is not a socket address: {}",
            config.bind_address, e
        ))
    })?;

    if config.authorized_users.iter().any(|u| u.login.is_empty()) {
        return Err(ConfigError::Validation(
            "authorized user login cannot be empty".to_string(),
        ));
    }

    Ok(())
}

use crate::config::types::{AuthorizedUser, Config};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Environment variable holding the remote API token
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Environment variable holding extra read API credentials as a JSON array
pub const AUTHORIZED_USERS_ENV: &str = "AUTHORIZED_USERS";

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use user_harvest::config::load_config;
///
/// let config = load_config(Path::new("harvest.toml")).unwrap();
/// println!("Listing from: {}", config.api.base_url);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Overlays secrets taken from the process environment
///
/// The token from `GITHUB_TOKEN` is used only when the file sets none.
/// Credentials from `AUTHORIZED_USERS` are appended to the file's list.
pub fn apply_environment(config: &mut Config) -> Result<(), ConfigError> {
    if config.api.token.is_none() {
        config.api.token = std::env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty());
    }

    if let Ok(raw) = std::env::var(AUTHORIZED_USERS_ENV) {
        let extra = parse_authorized_users(&raw)?;
        config.server.authorized_users.extend(extra);
    }

    validate(config)
}

/// Parses a JSON array of `{"login": .., "password": ..}` objects
pub fn parse_authorized_users(raw: &str) -> Result<Vec<AuthorizedUser>, ConfigError> {
    Ok(serde_json::from_str(raw)?)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

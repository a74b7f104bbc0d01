//! Configuration module for User-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and overlaying secrets taken from the environment.
//!
//! # Example
//!
//! ```no_run
//! use user_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Raw output goes to: {}", config.data.raw_path);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ApiConfig, AuthorizedUser, Config, CrawlerConfig, DataConfig, FilterConfig, ServerConfig,
};

// Re-export parser functions
pub use parser::{
    apply_environment, compute_config_hash, load_config, load_config_with_hash,
    parse_authorized_users, parse_config, AUTHORIZED_USERS_ENV, TOKEN_ENV,
};

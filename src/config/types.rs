use serde::Deserialize;

/// Main configuration structure for User-Harvest
///
/// Every section is optional; omitted keys fall back to the defaults the
/// remote API and the read API were designed around.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Remote user-listing API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the remote API (listing is `{base}/users`)
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Access token sent as `Authorization: token <value>`
    #[serde(default)]
    pub token: Option<String>,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            user_agent: default_user_agent(),
        }
    }
}

/// Crawl pacing and retry configuration (all delays in seconds)
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Per-request timeout
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Attempts made by a single fetch before reporting no response
    #[serde(rename = "max-connect-attempts", default = "default_connect_attempts")]
    pub max_connect_attempts: u32,

    /// Backoff after a connection failure, multiplied by the attempt number
    #[serde(rename = "connect-backoff-base", default = "default_connect_backoff")]
    pub connect_backoff_base: u64,

    /// Delay applied when quota headers are missing or unparsable
    #[serde(rename = "missing-quota-delay", default = "default_long_delay")]
    pub missing_quota_delay: u64,

    /// Delay before retrying after a 5xx response
    #[serde(rename = "server-error-delay", default = "default_long_delay")]
    pub server_error_delay: u64,

    /// Delay before retrying after a 429 response
    #[serde(rename = "too-many-requests-delay", default = "default_too_many_requests_delay")]
    pub too_many_requests_delay: u64,

    /// Reconnections tolerated per request before the crawl gives up.
    /// Unset means the crawl keeps reconnecting indefinitely.
    #[serde(rename = "max-reconnects", default)]
    pub max_reconnects: Option<u32>,

    /// Largest `per_page` value requested from the listing endpoint
    #[serde(rename = "max-page-size", default = "default_page_size")]
    pub max_page_size: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            max_connect_attempts: default_connect_attempts(),
            connect_backoff_base: default_connect_backoff(),
            missing_quota_delay: default_long_delay(),
            server_error_delay: default_long_delay(),
            too_many_requests_delay: default_too_many_requests_delay(),
            max_reconnects: None,
            max_page_size: default_page_size(),
        }
    }
}

/// Dataset file locations
#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// Raw crawl output
    #[serde(rename = "raw-path", default = "default_raw_path")]
    pub raw_path: String,

    /// Deduplicated and filtered output served by the read API
    #[serde(rename = "filtered-path", default = "default_filtered_path")]
    pub filtered_path: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            raw_path: default_raw_path(),
            filtered_path: default_filtered_path(),
        }
    }
}

/// Dataset filter configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    /// Fields that must be present and non-empty
    #[serde(rename = "required-fields", default = "default_required_fields")]
    pub required_fields: Vec<String>,

    /// Oldest accepted creation date (`YYYY-MM-DD`)
    #[serde(rename = "created-after", default = "default_created_after")]
    pub created_after: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            required_fields: default_required_fields(),
            created_after: default_created_after(),
        }
    }
}

/// Read API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on
    #[serde(rename = "bind-address", default = "default_bind_address")]
    pub bind_address: String,

    /// Credentials accepted through HTTP Basic auth
    #[serde(rename = "authorized-users", default)]
    pub authorized_users: Vec<AuthorizedUser>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            authorized_users: Vec::new(),
        }
    }
}

/// One allow-listed login/password pair
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthorizedUser {
    pub login: String,
    pub password: String,
}

fn default_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_user_agent() -> String {
    format!("user-harvest/{}", env!("CARGO_PKG_VERSION"))
}

fn default_request_timeout() -> u64 {
    10
}

fn default_connect_attempts() -> u32 {
    3
}

fn default_connect_backoff() -> u64 {
    5
}

fn default_long_delay() -> u64 {
    60
}

fn default_too_many_requests_delay() -> u64 {
    5
}

fn default_page_size() -> u32 {
    100
}

fn default_raw_path() -> String {
    "data/users.json".to_string()
}

fn default_filtered_path() -> String {
    "data/filtered_users.json".to_string()
}

fn default_required_fields() -> Vec<String> {
    vec!["bio".to_string(), "avatar_url".to_string()]
}

fn default_created_after() -> String {
    "2015-01-01".to_string()
}

fn default_bind_address() -> String {
    "127.0.0.1:8000".to_string()
}

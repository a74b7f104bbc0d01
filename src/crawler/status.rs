//! HTTP status classification
//!
//! Every response of the remote API is mapped to a [`RetryDecision`]:
//!
//! | Status | Condition | Outcome |
//! |--------|-----------|---------|
//! | 403 | `X-RateLimit-Reset` present | throttle for the quota delay |
//! | 403 | no reset header (bad token) | fatal |
//! | 5xx | | throttle for the server-error delay |
//! | 429 | | throttle for the too-many-requests delay |
//! | 404 | | skippable |
//! | other non-200 | | fatal |
//! | 200 | | proceed |

use crate::crawler::rate_limit::{RateLimitAdvisor, RATE_LIMIT_RESET};
use crate::config::CrawlerConfig;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;

/// Flat retry decision for one response
///
/// At most one of the paths applies: fatal, skippable, or a throttle of
/// `delay_seconds`. Use [`action`](Self::action) to branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    pub is_error: bool,
    pub is_fatal: bool,
    pub is_skippable: bool,
    pub delay_seconds: u64,
}

/// What the caller should do with a classified response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    /// Use the response body
    Proceed,
    /// Wait this many seconds, then repeat the same request
    Throttle(u64),
    /// Count the item or page as failed and move on
    Skip,
    /// Stop the whole crawl
    Abort,
}

impl RetryDecision {
    /// Successful response
    pub const PROCEED: Self = Self {
        is_error: false,
        is_fatal: false,
        is_skippable: false,
        delay_seconds: 0,
    };

    /// Failure that halts the crawl
    pub const FATAL: Self = Self {
        is_error: true,
        is_fatal: true,
        is_skippable: false,
        delay_seconds: 0,
    };

    /// Failure limited to one item or page
    pub const SKIP: Self = Self {
        is_error: true,
        is_fatal: false,
        is_skippable: true,
        delay_seconds: 0,
    };

    /// Transient failure retried after `delay_seconds`
    pub const fn throttle(delay_seconds: u64) -> Self {
        Self {
            is_error: true,
            is_fatal: false,
            is_skippable: false,
            delay_seconds,
        }
    }

    /// Collapses the flat record into the single path it describes
    pub fn action(&self) -> RetryAction {
        if !self.is_error {
            RetryAction::Proceed
        } else if self.is_fatal {
            RetryAction::Abort
        } else if self.is_skippable {
            RetryAction::Skip
        } else {
            RetryAction::Throttle(self.delay_seconds)
        }
    }
}

/// Maps status codes to retry decisions
#[derive(Debug, Clone, Copy)]
pub struct StatusClassifier {
    advisor: RateLimitAdvisor,
    server_error_delay: u64,
    too_many_requests_delay: u64,
}

impl StatusClassifier {
    /// Creates a classifier with explicit delays (in seconds)
    pub fn new(advisor: RateLimitAdvisor, server_error_delay: u64, too_many_requests_delay: u64) -> Self {
        Self {
            advisor,
            server_error_delay,
            too_many_requests_delay,
        }
    }

    /// Creates a classifier from the crawler configuration
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(
            RateLimitAdvisor::new(config.missing_quota_delay),
            config.server_error_delay,
            config.too_many_requests_delay,
        )
    }

    /// The advisor used for quota delays
    pub fn advisor(&self) -> &RateLimitAdvisor {
        &self.advisor
    }

    /// Classifies a response by status code and headers
    pub fn classify(&self, status: StatusCode, headers: &HeaderMap) -> RetryDecision {
        if status == StatusCode::FORBIDDEN {
            let has_reset = headers
                .get(RATE_LIMIT_RESET)
                .map(|v| !v.is_empty())
                .unwrap_or(false);

            if has_reset {
                tracing::warn!("API call forbidden (quota issue)");
                return RetryDecision::throttle(self.advisor.advise(headers));
            }

            tracing::error!("API call forbidden (token issue)");
            return RetryDecision::FATAL;
        }

        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), "Remote server error, retrying later");
            return RetryDecision::throttle(self.server_error_delay);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!("Too many requests");
            return RetryDecision::throttle(self.too_many_requests_delay);
        }

        if status == StatusCode::NOT_FOUND {
            tracing::warn!("Resource not found");
            return RetryDecision::SKIP;
        }

        if status != StatusCode::OK {
            tracing::error!(status = status.as_u16(), "Unexpected response from remote API");
            return RetryDecision::FATAL;
        }

        RetryDecision::PROCEED
    }
}

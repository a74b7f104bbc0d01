//! Quota-aware pacing
//!
//! The remote API reports its request quota on every response through the
//! `X-RateLimit-Remaining` and `X-RateLimit-Reset` headers. The advisor turns
//! those into the number of seconds the crawler must wait before its next
//! request. The advice is paid after every response, not only on errors.

use chrono::{Duration as ChronoDuration, Local, Utc};
use reqwest::header::HeaderMap;

/// Header carrying the number of calls left in the current window
pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// Header carrying the unix timestamp at which the window resets
pub const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

/// Computes the delay owed to the remote quota after a response
#[derive(Debug, Clone, Copy)]
pub struct RateLimitAdvisor {
    /// Delay used when quota headers are missing or unparsable
    fallback_delay: u64,
}

impl RateLimitAdvisor {
    /// Creates an advisor that waits `fallback_delay` seconds when the
    /// response carries no usable quota information
    pub fn new(fallback_delay: u64) -> Self {
        Self { fallback_delay }
    }

    /// Returns the delay in seconds owed after a response with these headers
    pub fn advise(&self, headers: &HeaderMap) -> u64 {
        self.advise_at(headers, Utc::now().timestamp())
    }

    /// Same as [`advise`](Self::advise), with an explicit current unix time
    pub fn advise_at(&self, headers: &HeaderMap, now: i64) -> u64 {
        let remaining = header_str(headers, RATE_LIMIT_REMAINING);
        let reset = header_str(headers, RATE_LIMIT_RESET);
        self.delay_for(remaining, reset, now)
    }

    /// Core rule on raw header values
    ///
    /// * either value missing or not an integer: the fallback delay
    /// * calls remaining: no delay
    /// * quota exhausted: seconds until the reset timestamp, never negative
    pub fn delay_for(&self, remaining: Option<&str>, reset: Option<&str>, now: i64) -> u64 {
        let (remaining, reset) = match (parse_int(remaining), parse_int(reset)) {
            (Some(remaining), Some(reset)) => (remaining, reset),
            _ => {
                tracing::warn!(
                    delay = self.fallback_delay,
                    "Response without rate limit data, falling back to fixed delay"
                );
                return self.fallback_delay;
            }
        };

        tracing::trace!(remaining, "Rate limit headers");
        if remaining > 0 {
            return 0;
        }

        let delay = u64::try_from(reset.saturating_sub(now)).unwrap_or(0);
        let resume_at = Local::now() + ChronoDuration::seconds(i64::try_from(delay).unwrap_or(0));
        tracing::info!(
            delay,
            resume_at = %resume_at.format("%H:%M:%S"),
            "Quota reached, delaying calls"
        );
        delay
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn parse_int(value: Option<&str>) -> Option<i64> {
    value.and_then(|v| v.trim().parse::<i64>().ok())
}

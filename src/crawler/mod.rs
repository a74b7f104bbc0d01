//! Crawler module for the remote user-listing API
//!
//! This module contains the ingestion pipeline, including:
//! - Quota-aware pacing from rate limit headers
//! - Status classification into retry, skip, or abort decisions
//! - HTTP fetching with bounded connection retries
//! - A pluggable wait policy for delays and backoff
//! - Per-user detail fetching
//! - Cursor-paginated crawl coordination

mod coordinator;
mod detail;
mod fetcher;
mod pacing;
mod rate_limit;
mod sleeper;
mod status;

pub use coordinator::{plan_pages, run_crawl, Coordinator, CrawlResult, CrawlStop, PagePlan};
pub use detail::{DetailFetcher, DetailOutcome};
pub use fetcher::{build_http_client, FetchOutcome, HttpSession, ResilientFetcher};
pub use rate_limit::{RateLimitAdvisor, RATE_LIMIT_REMAINING, RATE_LIMIT_RESET};
pub use sleeper::Sleeper;
pub use status::{RetryAction, RetryDecision, StatusClassifier};

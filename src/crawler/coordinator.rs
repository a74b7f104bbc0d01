//! Crawler coordinator - paginated listing walk
//!
//! The listing endpoint is paginated by an id cursor (`since`), not by page
//! number. For each planned page the coordinator requests the listing,
//! fetches the detail record of every listed user, and advances the cursor
//! only after a detail record has been fully processed. Resuming with the
//! returned cursor never re-fetches a completed record.

use crate::config::Config;
use crate::crawler::detail::{endpoint, DetailFetcher, DetailOutcome};
use crate::crawler::fetcher::HttpSession;
use crate::crawler::pacing::{settle, Settled};
use crate::crawler::sleeper::Sleeper;
use crate::crawler::status::StatusClassifier;
use crate::models::{ListingEntry, UserRecord};
use crate::HarvestError;
use url::Url;

/// Why a crawl stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlStop {
    /// Every planned page was processed
    Completed,

    /// A fatal status (bad token, unexpected response) halted the crawl
    Fatal {
        /// The offending HTTP status
        status: u16,
    },

    /// The reconnect cap was hit while the host stayed unreachable
    ExhaustedRetries {
        /// URL that could not be fetched
        url: String,
    },

    /// The HTTP client could not be rebuilt after a connection failure
    Disconnected {
        /// Why the rebuild failed
        error: String,
    },
}

impl CrawlStop {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Records collected by a crawl plus its failure counters
///
/// Partial results are always returned, including when the crawl stopped
/// early, so the caller can persist them and resume from `cursor`.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlResult {
    /// Records in discovery order
    pub users: Vec<UserRecord>,

    /// Listing pages skipped (404 or unparsable)
    pub failed_pages: u32,

    /// Users skipped (404 or malformed detail)
    pub failed_users: u32,

    /// Cursor to resume from: the id of the last fully processed record
    pub cursor: u64,

    /// How the crawl ended
    pub stop: CrawlStop,
}

impl CrawlResult {
    fn new(since: u64) -> Self {
        Self {
            users: Vec::new(),
            failed_pages: 0,
            failed_users: 0,
            cursor: since,
            stop: CrawlStop::Completed,
        }
    }

    fn record(&mut self, user: UserRecord) {
        // ids are listed in ascending order; max() keeps the cursor from
        // moving backwards if a detail payload disagrees
        self.cursor = self.cursor.max(user.id);
        self.users.push(user);
    }

    fn finish(mut self, stop: CrawlStop) -> Self {
        tracing::info!(
            users = self.users.len(),
            failed_pages = self.failed_pages,
            failed_users = self.failed_users,
            cursor = self.cursor,
            stop = ?stop,
            "Crawl finished"
        );
        self.stop = stop;
        self
    }
}

/// Listing page sizes for a crawl, produced one page at a time
///
/// Every page holds `max_page_size` users except the last, which holds the
/// remainder: 250 with a cap of 100 yields `100, 100, 50`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePlan {
    left: u64,
    cap: u64,
}

impl PagePlan {
    /// Number of pages still to be yielded
    pub fn page_count(&self) -> u64 {
        self.left.div_ceil(self.cap)
    }

    /// Size of the final page, if any pages remain
    pub fn last_page_size(&self) -> Option<u32> {
        match self.left % self.cap {
            0 if self.left == 0 => None,
            // a full final page; cap came from a u32
            0 => Some(self.cap as u32),
            rest => Some(rest as u32),
        }
    }
}

impl Iterator for PagePlan {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.left == 0 {
            return None;
        }
        let size = self.left.min(self.cap);
        self.left -= size;
        // size <= cap, which came from a u32
        Some(size as u32)
    }
}

/// Plans `target_count` users as listing pages of at most `max_page_size`
pub fn plan_pages(target_count: u64, max_page_size: u32) -> PagePlan {
    PagePlan {
        left: target_count,
        cap: u64::from(max_page_size.max(1)),
    }
}

/// Walks the listing endpoint and collects user details
pub struct Coordinator {
    session: HttpSession,
    classifier: StatusClassifier,
    details: DetailFetcher,
    base_url: Url,
    max_page_size: u32,
}

impl Coordinator {
    /// Creates a coordinator and its HTTP session
    pub fn new(config: &Config) -> Result<Self, HarvestError> {
        Self::with_sleeper(config, Sleeper::default())
    }

    /// Creates a coordinator whose waits all go through `sleeper`
    pub fn with_sleeper(config: &Config, sleeper: Sleeper) -> Result<Self, HarvestError> {
        let base_url = Url::parse(&config.api.base_url)?;
        let classifier = StatusClassifier::from_config(&config.crawler);
        let session = HttpSession::with_sleeper(&config.api, &config.crawler, sleeper)?;

        Ok(Self {
            session,
            classifier,
            details: DetailFetcher::new(base_url.clone(), classifier),
            base_url,
            max_page_size: config.crawler.max_page_size,
        })
    }

    /// Builds `GET {base}/users?per_page={n}&since={cursor}`
    pub fn listing_url(&self, per_page: u32, since: u64) -> Url {
        let mut url = endpoint(&self.base_url, &["users"]);
        url.query_pairs_mut()
            .append_pair("per_page", &per_page.to_string())
            .append_pair("since", &since.to_string());
        url
    }

    /// Crawls up to `target_count` users with ids greater than `since`
    ///
    /// Every stop condition, including a client that cannot be rebuilt, ends
    /// the crawl with the records gathered so far.
    pub async fn crawl(&mut self, target_count: u64, since: u64) -> CrawlResult {
        tracing::info!(target_count, since, "Getting users info");

        let pages = plan_pages(target_count, self.max_page_size);
        let mut result = CrawlResult::new(since);

        for (index, per_page) in pages.enumerate() {
            tracing::info!(
                "==================== Batch {}: {} users, starting at id {} ====================",
                index + 1,
                per_page,
                result.cursor
            );

            let url = self.listing_url(per_page, result.cursor);
            let body = match settle(&mut self.session, &self.classifier, &url).await {
                Settled::Ready(body) => body,
                Settled::Skipped(status) => {
                    tracing::warn!(page = index + 1, status, "Listing page skipped");
                    result.failed_pages += 1;
                    continue;
                }
                Settled::Stopped(stop) => return result.finish(stop),
            };

            let entries: Vec<ListingEntry> = match serde_json::from_str(&body) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(page = index + 1, error = %e, "Malformed listing page skipped");
                    result.failed_pages += 1;
                    continue;
                }
            };

            for entry in entries {
                match self.details.fetch_detail(&entry.login, &mut self.session).await {
                    DetailOutcome::Found(user) => result.record(user),
                    DetailOutcome::NotFound | DetailOutcome::Invalid { .. } => {
                        result.failed_users += 1;
                    }
                    DetailOutcome::Aborted(stop) => return result.finish(stop),
                }
            }

            tracing::debug!(collected = result.users.len(), cursor = result.cursor, "Batch done");
        }

        result.finish(CrawlStop::Completed)
    }
}

/// Runs a complete crawl operation
///
/// # Example
///
/// ```no_run
/// use user_harvest::config::load_config;
/// use user_harvest::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let result = run_crawl(&config, 250, 1000).await?;
/// println!("resume from {}", result.cursor);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: &Config, target_count: u64, since: u64) -> Result<CrawlResult, HarvestError> {
    let mut coordinator = Coordinator::new(config)?;
    Ok(coordinator.crawl(target_count, since).await)
}

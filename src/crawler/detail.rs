//! Per-user detail fetching

use crate::crawler::fetcher::HttpSession;
use crate::crawler::pacing::{settle, Settled};
use crate::crawler::status::StatusClassifier;
use crate::crawler::CrawlStop;
use crate::models::{UserDetailPayload, UserRecord};
use url::Url;

/// Result of a detail fetch
#[derive(Debug, Clone, PartialEq)]
pub enum DetailOutcome {
    /// The user's normalized record
    Found(UserRecord),

    /// The detail endpoint answered 404
    NotFound,

    /// The payload lacked required fields or was not JSON
    Invalid {
        /// Parser error
        reason: String,
    },

    /// A fatal condition upstream; the crawl must stop
    Aborted(CrawlStop),
}

/// Fetches `GET {base}/users/{login}` and normalizes the payload
#[derive(Debug, Clone)]
pub struct DetailFetcher {
    base_url: Url,
    classifier: StatusClassifier,
}

impl DetailFetcher {
    pub fn new(base_url: Url, classifier: StatusClassifier) -> Self {
        Self {
            base_url,
            classifier,
        }
    }

    /// Builds the detail URL for a login, percent-encoding it as a path
    /// segment
    pub fn detail_url(&self, login: &str) -> Url {
        endpoint(&self.base_url, &["users", login])
    }

    /// Fetches one user's detail record
    ///
    /// Throttles and connection failures are retried inside; only terminal
    /// outcomes are returned.
    pub async fn fetch_detail(&self, login: &str, session: &mut HttpSession) -> DetailOutcome {
        tracing::debug!(login, "Getting user details");
        let url = self.detail_url(login);

        match settle(session, &self.classifier, &url).await {
            Settled::Ready(body) => match serde_json::from_str::<UserDetailPayload>(&body) {
                Ok(payload) => DetailOutcome::Found(UserRecord::from_detail(login, payload)),
                Err(e) => {
                    tracing::warn!(login, error = %e, "Malformed user detail payload");
                    DetailOutcome::Invalid {
                        reason: e.to_string(),
                    }
                }
            },
            Settled::Skipped(_) => {
                tracing::info!(login, "User not found");
                DetailOutcome::NotFound
            }
            Settled::Stopped(stop) => DetailOutcome::Aborted(stop),
        }
    }
}

/// Appends path segments to the API base URL
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

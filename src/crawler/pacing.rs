//! The request state machine shared by listing pages and detail records
//!
//! One request is repeated until it settles in a terminal state:
//!
//! ```text
//! fetch ──no response──▶ reconnect ──▶ fetch            (ExhaustedRetries if capped,
//!                                                          Disconnected if rebuild fails)
//!   │
//!   ▼
//! classify ──▶ pay quota delay ──┬─ proceed  ──▶ Ready(body)
//!                                ├─ skip     ──▶ Skipped
//!                                ├─ abort    ──▶ Stopped(Fatal)
//!                                └─ throttle ──▶ sleep ──▶ fetch
//! ```
//!
//! Reconnection is unbounded unless `max-reconnects` is configured: with the
//! default settings a host that never answers keeps the crawl retrying
//! forever. There is no global crawl timeout.

use crate::crawler::fetcher::{FetchOutcome, HttpSession};
use crate::crawler::status::{RetryAction, StatusClassifier};
use crate::crawler::CrawlStop;
use url::Url;

/// Terminal state of one settled request
#[derive(Debug)]
pub(crate) enum Settled {
    /// 200 response and its body
    Ready(String),
    /// Skippable failure with this status code
    Skipped(u16),
    /// The crawl must stop
    Stopped(CrawlStop),
}

/// Drives one request to a terminal state
pub(crate) async fn settle(session: &mut HttpSession, classifier: &StatusClassifier, url: &Url) -> Settled {
    let mut reconnects: u32 = 0;

    loop {
        let response = match session.get(url).await {
            FetchOutcome::Response(response) => response,
            FetchOutcome::Exhausted { attempts, error } => {
                reconnects += 1;
                if let Some(limit) = session.settings().max_reconnects {
                    if reconnects > limit {
                        tracing::error!(url = %url, reconnects = limit, "Giving up on unreachable host");
                        return Settled::Stopped(CrawlStop::ExhaustedRetries {
                            url: url.to_string(),
                        });
                    }
                }
                tracing::warn!(url = %url, attempts, error = %error, "Connection failed, retrying");
                if let Some(stop) = reconnect(session) {
                    return Settled::Stopped(stop);
                }
                continue;
            }
        };

        let status = response.status();
        let decision = classifier.classify(status, response.headers());
        session
            .sleeper()
            .sleep(classifier.advisor().advise(response.headers()))
            .await;

        match decision.action() {
            RetryAction::Proceed => match response.text().await {
                Ok(body) => return Settled::Ready(body),
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Failed to read response body, retrying");
                    if let Some(stop) = reconnect(session) {
                        return Settled::Stopped(stop);
                    }
                }
            },
            RetryAction::Skip => return Settled::Skipped(status.as_u16()),
            RetryAction::Abort => {
                return Settled::Stopped(CrawlStop::Fatal {
                    status: status.as_u16(),
                })
            }
            RetryAction::Throttle(delay) => {
                tracing::info!(url = %url, delay, "Throttled, retrying same request");
                session.sleeper().sleep(delay).await;
            }
        }
    }
}

/// Rebuilds the session's client, or names the stop when that fails
fn reconnect(session: &mut HttpSession) -> Option<CrawlStop> {
    match session.reconnect() {
        Ok(()) => None,
        Err(e) => {
            tracing::error!(error = %e, "Could not rebuild HTTP client");
            Some(CrawlStop::Disconnected {
                error: e.to_string(),
            })
        }
    }
}

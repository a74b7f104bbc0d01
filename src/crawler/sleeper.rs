//! Wait policy for quota delays, throttles and connection backoff

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// How the crawler waits between requests
///
/// [`Sleeper::Tokio`] suspends the task on the tokio timer. A recording
/// sleeper returns immediately and keeps every requested wait, which lets a
/// crawl be replayed against a mock server while its pacing is asserted.
#[derive(Debug, Clone, Default)]
pub enum Sleeper {
    #[default]
    Tokio,

    /// Logs each non-zero wait in seconds instead of sleeping
    Recording(Arc<Mutex<Vec<u64>>>),
}

impl Sleeper {
    pub fn recording() -> Self {
        Self::Recording(Arc::new(Mutex::new(Vec::new())))
    }

    /// Waits for whole seconds; zero returns immediately and is not recorded
    pub async fn sleep(&self, seconds: u64) {
        if seconds == 0 {
            return;
        }

        match self {
            Self::Tokio => tokio::time::sleep(Duration::from_secs(seconds)).await,
            Self::Recording(waits) => {
                waits
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(seconds);
            }
        }
    }

    /// Waits requested so far; always empty for [`Sleeper::Tokio`]
    pub fn recorded(&self) -> Vec<u64> {
        match self {
            Self::Tokio => Vec::new(),
            Self::Recording(waits) => waits
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }
}

//! Fixed-interval polling of remote state
//!
//! Every wait in a run goes through [`Poller`]: check once, and if the
//! resource is not there yet sleep for the interval and check again.

use crate::error::{CloudError, Result};
use crate::progress::WaitProgress;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use twinstack_core::PollSettings;

/// Fixed-interval poller
#[derive(Debug, Clone)]
pub struct Poller {
    interval: Duration,
    /// None polls forever
    max_attempts: Option<u32>,
    show_progress: bool,
}

impl Poller {
    pub fn new(interval: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            interval,
            max_attempts,
            show_progress: false,
        }
    }

    pub fn from_settings(settings: &PollSettings) -> Self {
        Self::new(settings.interval(), settings.max_attempts)
    }

    /// Show a spinner while waiting
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Poll until `check` reports true
    pub async fn until<F, Fut>(&self, what: &str, mut check: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        self.until_some(what, || {
            let fut = check();
            async move { Ok(fut.await?.then_some(())) }
        })
        .await
    }

    /// Poll until `check` yields a value
    ///
    /// Errors from the check end the wait immediately.
    pub async fn until_some<T, F, Fut>(&self, what: &str, mut check: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        let progress = self.show_progress.then(|| WaitProgress::new(what));
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            if let Some(p) = &progress {
                p.set_attempt(what, attempt);
            }

            match check().await {
                Ok(Some(value)) => {
                    if let Some(p) = &progress {
                        p.finish_success(what);
                    }
                    tracing::debug!(what, attempt, "Wait finished");
                    return Ok(value);
                }
                Ok(None) => {
                    tracing::debug!(what, attempt, "Not ready yet");
                }
                Err(e) => {
                    if let Some(p) = &progress {
                        p.finish_error(&e.to_string());
                    }
                    return Err(e);
                }
            }

            if self.exhausted(attempt) {
                let err = CloudError::Timeout(format!("{} ({} attempts)", what, attempt));
                if let Some(p) = &progress {
                    p.finish_error(&err.to_string());
                }
                return Err(err);
            }

            sleep(self.interval).await;
        }
    }

    /// Re-run `op` at the interval until it succeeds
    ///
    /// On exhaustion the last error is returned inside a timeout.
    pub async fn retry<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if self.exhausted(attempt) {
                        return Err(CloudError::Timeout(format!(
                            "{} ({} attempts, last error: {})",
                            what, attempt, e
                        )));
                    }
                    tracing::debug!(what, attempt, error = %e, "Retrying");
                }
            }

            sleep(self.interval).await;
        }
    }

    fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempt >= max)
    }
}

impl Default for Poller {
    fn default() -> Self {
        Self::from_settings(&PollSettings::default())
    }
}

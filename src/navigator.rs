//! URL loading with bounded retries and session replacement.
//!
//! A failed attempt leaves the page in an unknown state, so the session is
//! destroyed and a fresh one is created from the same identity before the
//! next attempt. The caller hands its session in and gets back whichever
//! session finally loaded the page.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::NavigationConfig;
use crate::driver::AutomationDriver;
use crate::session::Session;
use crate::{HarvestError, Result};

/// How one navigation attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStatus {
    Success,
    Timeout,
    ConnectionFailure,
}

/// Record of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationOutcome {
    /// 1-based attempt number.
    pub attempt: u32,
    pub status: AttemptStatus,
    /// Backoff slept after this attempt, if any.
    pub backoff: Option<Duration>,
}

/// A successfully loaded session plus the attempts it took.
#[derive(Debug)]
pub struct Navigated {
    pub session: Session,
    pub outcomes: Vec<NavigationOutcome>,
}

impl Navigated {
    /// Number of attempts made, including the successful one.
    pub fn attempts(&self) -> u32 {
        self.outcomes.len() as u32
    }
}

/// Loads URLs into sessions, replacing the session after each failure.
pub struct Navigator {
    driver: Arc<dyn AutomationDriver>,
    policy: NavigationConfig,
}

impl Navigator {
    pub fn new(driver: Arc<dyn AutomationDriver>, policy: NavigationConfig) -> Self {
        Self { driver, policy }
    }

    /// Loads `url`, retrying up to `max_attempts` times.
    ///
    /// Attempt `n` that fails is followed by a wait of `n * base_delay`
    /// (except after the last attempt). On exhaustion the session has been
    /// destroyed and `NavigationExhausted` carries the last error. A failure
    /// to create a replacement session is returned as is.
    pub async fn navigate(&self, session: Session, url: &str) -> Result<Navigated> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut session = session;
        let mut outcomes = Vec::new();

        for attempt in 1..=max_attempts {
            debug!("Visiting {} (attempt {}/{})", url, attempt, max_attempts);

            let error = match session.page().goto(url, self.policy.timeout()).await {
                Ok(()) => {
                    outcomes.push(NavigationOutcome {
                        attempt,
                        status: AttemptStatus::Success,
                        backoff: None,
                    });
                    return Ok(Navigated { session, outcomes });
                }
                Err(e) => e,
            };

            warn!("Navigation to {} failed on attempt {}: {}", url, attempt, error);
            let status = classify(&error);
            let identity = Arc::clone(session.identity());
            session.destroy().await;

            if attempt == max_attempts {
                outcomes.push(NavigationOutcome {
                    attempt,
                    status,
                    backoff: None,
                });
                return Err(HarvestError::NavigationExhausted {
                    url: url.to_string(),
                    attempts: attempt,
                    source: Box::new(error),
                });
            }

            let backoff = self.policy.base_delay() * attempt;
            outcomes.push(NavigationOutcome {
                attempt,
                status,
                backoff: Some(backoff),
            });
            tokio::time::sleep(backoff).await;

            session = Session::create(self.driver.as_ref(), identity).await?;
        }

        // max_attempts >= 1, so the loop always returns.
        Err(HarvestError::Config(
            "navigation.max_attempts must be at least 1".to_string(),
        ))
    }
}

fn classify(error: &HarvestError) -> AttemptStatus {
    match error {
        HarvestError::NavigationTimeout(_) => AttemptStatus::Timeout,
        _ => AttemptStatus::ConnectionFailure,
    }
}

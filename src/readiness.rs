//! Readiness gate: wait until any "content is present" signal shows up.

use std::time::Duration;

use futures::future::{select_ok, BoxFuture, FutureExt};
use tracing::debug;

use crate::driver::PageHandle;

/// Races every signal selector and resolves on the first match.
///
/// Returns `false` when `timeout` elapses or every signal fails. This is
/// never an error: a missing signal does not prove missing content, the
/// selectors may simply have drifted.
pub async fn await_ready(page: &dyn PageHandle, signals: &[String], timeout: Duration) -> bool {
    if signals.is_empty() {
        return false;
    }

    let waits: Vec<BoxFuture<'_, crate::Result<&str>>> = signals
        .iter()
        .map(|css| {
            async move {
                page.wait_for_selector(css).await?;
                Ok(css.as_str())
            }
            .boxed()
        })
        .collect();

    match tokio::time::timeout(timeout, select_ok(waits)).await {
        Ok(Ok((css, _rest))) => {
            debug!("Ready signal '{}' matched", css);
            true
        }
        Ok(Err(e)) => {
            debug!("All ready signals failed, last error: {}", e);
            false
        }
        Err(_) => {
            debug!(
                "No ready signal within {}ms, proceeding with current content",
                timeout.as_millis()
            );
            false
        }
    }
}

//! Incremental loader: scroll to coax lazily rendered content into the DOM.

use tracing::{debug, warn};

use crate::config::ScrollPlan;
use crate::driver::PageHandle;

/// Scrolls `plan.step_px` at a time, sleeping `plan.delay` after each step,
/// until the cumulative advance reaches `plan.budget_px`.
///
/// A scroll failure ends the expansion early; whatever rendered so far is
/// still extracted by the caller.
pub async fn expand(page: &dyn PageHandle, plan: &ScrollPlan) {
    if plan.step_px == 0 {
        return;
    }

    let mut total: u32 = 0;
    while total < plan.budget_px {
        if let Err(e) = page.scroll_by(plan.step_px).await {
            warn!("Scroll stopped after {}px: {}", total, e);
            return;
        }
        total = total.saturating_add(plan.step_px);
        tokio::time::sleep(plan.delay()).await;
    }
    debug!("Scrolled {}px", total);
}

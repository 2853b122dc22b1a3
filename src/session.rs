//! Browsing sessions.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::driver::{AutomationDriver, PageHandle};
use crate::identity::Identity;
use crate::Result;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// An isolated browsing context with its identity already applied.
///
/// A session is owned by exactly one acquisition run. After a navigation
/// failure it is destroyed and replaced, never repaired.
pub struct Session {
    id: u64,
    identity: Arc<Identity>,
    page: Box<dyn PageHandle>,
}

impl Session {
    /// Opens a page and applies `identity` before any navigation can happen.
    pub async fn create(driver: &dyn AutomationDriver, identity: Arc<Identity>) -> Result<Self> {
        let page = driver.open_page().await?;
        if let Err(e) = page.apply_identity(&identity).await {
            // Do not leak the context when identity cannot be applied.
            if let Err(close_err) = page.close().await {
                warn!("Failed to close page after identity error: {}", close_err);
            }
            return Err(e);
        }

        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        debug!(
            "Session {} created ({} cookies)",
            id,
            identity.cookies.len()
        );
        Ok(Self { id, identity, page })
    }

    /// Releases all resources. Errors are logged, never returned, so this is
    /// safe to call on a broken session.
    pub async fn destroy(self) {
        if let Err(e) = self.page.close().await {
            warn!("Failed to close session {}: {}", self.id, e);
        } else {
            debug!("Session {} destroyed", self.id);
        }
    }

    /// Process-unique session number, for logs.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The identity this session was created with.
    pub fn identity(&self) -> &Arc<Identity> {
        &self.identity
    }

    /// The underlying page.
    pub fn page(&self) -> &dyn PageHandle {
        self.page.as_ref()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("cookies", &self.identity.cookies.len())
            .finish()
    }
}

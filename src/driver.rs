//! Automation driver abstraction over a JavaScript-capable browser.
//!
//! The acquisition engine only talks to these traits. The headless Chromium
//! implementation lives in `browser`; tests script their own.

use std::time::Duration;

use async_trait::async_trait;

use crate::identity::Identity;
use crate::Result;

/// Launches isolated pages on a shared rendering engine.
///
/// Implementations must tolerate concurrent `open_page` calls from
/// independent runs.
#[async_trait]
pub trait AutomationDriver: Send + Sync {
    /// Opens a fresh, isolated browsing context with a single page.
    ///
    /// Fails with `AutomationUnavailable` if the engine cannot be started.
    async fn open_page(&self) -> Result<Box<dyn PageHandle>>;
}

/// One rendered page inside an isolated context.
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Applies cookies, headers, user agent and viewport.
    async fn apply_identity(&self, identity: &Identity) -> Result<()>;

    /// Loads a URL, failing if it does not settle within `timeout`.
    async fn goto(&self, url: &str, timeout: Duration) -> Result<()>;

    /// Resolves once an element matches `css`. May never resolve; callers
    /// bound it with their own timeout.
    async fn wait_for_selector(&self, css: &str) -> Result<()>;

    /// Advances the viewport by `pixels`.
    async fn scroll_by(&self, pixels: u32) -> Result<()>;

    /// Reloads the current document.
    async fn reload(&self, timeout: Duration) -> Result<()>;

    /// Returns the rendered inner text of every element matching `css`.
    async fn query_texts(&self, css: &str) -> Result<Vec<String>>;

    /// Returns the full rendered markup.
    async fn content(&self) -> Result<String>;

    /// Returns the current document URL, if known.
    async fn current_url(&self) -> Option<String>;

    /// Releases the page and its context.
    async fn close(&self) -> Result<()>;
}

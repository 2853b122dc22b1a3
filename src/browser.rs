//! Chrome/Chromium automation driver.
//!
//! This module is only available when the `headless` Cargo feature is enabled.
//! One browser process is shared by every run. Each session gets its own
//! browser context, so cookies applied for one identity never leak into
//! another session, and closing the session disposes the context.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as LaunchConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, Headers, SetCacheDisabledParams, SetExtraHttpHeadersParams,
    SetUserAgentOverrideParams, TimeSinceEpoch,
};
use chromiumoxide::cdp::browser_protocol::page::ReloadParams;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use crate::config::BrowserConfig;
use crate::driver::{AutomationDriver, PageHandle};
use crate::identity::{Cookie, Identity};
use crate::{HarvestError, Result};

const SELECTOR_POLL: Duration = Duration::from_millis(250);

fn cdp(action: &'static str) -> impl FnOnce(CdpError) -> HarvestError {
    move |e| HarvestError::Browser(format!("{}: {}", action, e))
}

/// A lazily launched browser process with bounded concurrent sessions.
pub struct BrowserPool {
    config: BrowserConfig,
    browser: Mutex<Option<Arc<Browser>>>,
    sessions: Arc<Semaphore>,
}

impl BrowserPool {
    pub fn new(config: BrowserConfig) -> Self {
        let max_sessions = config.max_sessions.max(1);
        Self {
            config,
            browser: Mutex::new(None),
            sessions: Arc::new(Semaphore::new(max_sessions)),
        }
    }

    /// Session slots not currently in use.
    pub fn available_sessions(&self) -> usize {
        self.sessions.available_permits()
    }

    /// Launches the browser on first use and returns the shared handle.
    ///
    /// Concurrent callers wait for the same launch. Any failure to find or
    /// start the executable is `AutomationUnavailable`.
    pub async fn acquire_browser(&self) -> Result<Arc<Browser>> {
        let mut guard = self.browser.lock().await;
        if let Some(ref browser) = *guard {
            return Ok(Arc::clone(browser));
        }

        let executable = crate::browser_setup::locate_chrome(self.config.chrome_path.as_deref())?;
        debug!("Launching browser at {}", executable.display());

        let mut builder = LaunchConfig::builder().chrome_executable(executable);
        builder = if self.config.headless {
            builder.arg("--headless=new")
        } else {
            builder.with_head()
        };

        // Hides navigator.webdriver, which the site checks.
        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-features=AutomationControlled")
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-http2")
            .arg("--no-first-run")
            .arg("--mute-audio");

        if let Some(ref proxy) = self.config.proxy_url {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }
        for arg in &self.config.launch_args {
            builder = builder.arg(arg);
        }

        let launch = builder.build().map_err(|e| {
            HarvestError::AutomationUnavailable(format!("Invalid browser config: {}", e))
        })?;
        let (browser, mut handler) = Browser::launch(launch).await.map_err(|e| {
            HarvestError::AutomationUnavailable(format!("Failed to launch browser: {}", e))
        })?;

        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("Browser CDP handler error: {}", e);
                }
            }
            debug!("Browser CDP handler exited");
        });

        let browser = Arc::new(browser);
        *guard = Some(Arc::clone(&browser));
        Ok(browser)
    }

    /// Drops the shared browser handle. The next session relaunches it.
    pub async fn shutdown(&self) {
        if self.browser.lock().await.take().is_some() {
            debug!("Browser pool shut down");
        }
    }
}

/// [`AutomationDriver`] backed by a [`BrowserPool`].
#[derive(Clone)]
pub struct ChromeDriver {
    pool: Arc<BrowserPool>,
}

impl ChromeDriver {
    pub fn new(pool: Arc<BrowserPool>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Arc<BrowserPool> {
        &self.pool
    }
}

#[async_trait]
impl AutomationDriver for ChromeDriver {
    async fn open_page(&self) -> Result<Box<dyn PageHandle>> {
        let permit = Arc::clone(&self.pool.sessions)
            .acquire_owned()
            .await
            .map_err(|e| HarvestError::AutomationUnavailable(format!("Pool closed: {}", e)))?;
        let browser = self.pool.acquire_browser().await?;

        let context = browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(cdp("Failed to create browser context"))?
            .result
            .browser_context_id;

        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context.clone())
            .build()
            .map_err(HarvestError::Browser)?;

        let page = match browser.new_page(target).await {
            Ok(page) => page,
            Err(e) => {
                dispose_context(&browser, context).await;
                return Err(HarvestError::Browser(format!("Failed to open page: {}", e)));
            }
        };

        if let Err(e) = page.execute(SetCacheDisabledParams::new(true)).await {
            debug!("Could not disable cache: {}", e);
        }

        Ok(Box::new(ChromePage {
            page,
            browser,
            context: Some(context),
            _permit: permit,
        }))
    }
}

async fn dispose_context(browser: &Browser, context: BrowserContextId) {
    if let Err(e) = browser
        .execute(DisposeBrowserContextParams::new(context))
        .await
    {
        debug!("Failed to dispose browser context: {}", e);
    }
}

/// One page inside its own browser context.
pub struct ChromePage {
    page: Page,
    browser: Arc<Browser>,
    context: Option<BrowserContextId>,
    _permit: OwnedSemaphorePermit,
}

fn cookie_param(cookie: &Cookie) -> Result<CookieParam> {
    let mut builder = CookieParam::builder()
        .name(cookie.name.as_str())
        .value(cookie.value.as_str())
        .domain(cookie.domain.as_str())
        .path(cookie.path.as_deref().unwrap_or("/"))
        .secure(cookie.secure)
        .http_only(cookie.http_only);
    if let Some(expires) = cookie.expires.filter(|e| *e > 0.0) {
        builder = builder.expires(TimeSinceEpoch::new(expires));
    }
    builder
        .build()
        .map_err(|e| HarvestError::Identity(format!("Cookie '{}': {}", cookie.name, e)))
}

#[async_trait]
impl PageHandle for ChromePage {
    async fn apply_identity(&self, identity: &Identity) -> Result<()> {
        let user_agent = SetUserAgentOverrideParams::builder()
            .user_agent(identity.user_agent.as_str())
            .accept_language(identity.accept_language.as_str())
            .build()
            .map_err(HarvestError::Identity)?;
        self.page
            .set_user_agent(user_agent)
            .await
            .map_err(cdp("Failed to set user agent"))?;

        let headers = Headers::new(serde_json::json!({
            "Accept-Language": identity.accept_language,
        }));
        self.page
            .execute(SetExtraHttpHeadersParams::new(headers))
            .await
            .map_err(cdp("Failed to set headers"))?;

        self.page
            .execute(SetDeviceMetricsOverrideParams::new(
                i64::from(identity.viewport.width),
                i64::from(identity.viewport.height),
                1.0,
                false,
            ))
            .await
            .map_err(cdp("Failed to set viewport"))?;

        if !identity.cookies.is_empty() {
            let cookies = identity
                .cookies
                .iter()
                .map(cookie_param)
                .collect::<Result<Vec<_>>>()?;
            self.page
                .set_cookies(cookies)
                .await
                .map_err(cdp("Failed to set cookies"))?;
        }
        Ok(())
    }

    async fn goto(&self, url: &str, timeout: Duration) -> Result<()> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(HarvestError::Browser(format!("Navigation failed: {}", e))),
            Err(_) => Err(HarvestError::NavigationTimeout(timeout.as_millis() as u64)),
        }
    }

    async fn wait_for_selector(&self, css: &str) -> Result<()> {
        loop {
            if self.page.find_element(css).await.is_ok() {
                return Ok(());
            }
            tokio::time::sleep(SELECTOR_POLL).await;
        }
    }

    async fn scroll_by(&self, pixels: u32) -> Result<()> {
        self.page
            .evaluate(format!("window.scrollBy(0, {})", pixels))
            .await
            .map_err(cdp("Scroll failed"))?;
        Ok(())
    }

    async fn reload(&self, timeout: Duration) -> Result<()> {
        let reload = async {
            self.page.execute(ReloadParams::default()).await?;
            self.page.wait_for_navigation().await?;
            Ok::<_, CdpError>(())
        };
        match tokio::time::timeout(timeout, reload).await {
            Ok(result) => result.map_err(cdp("Reload failed")),
            Err(_) => Err(HarvestError::NavigationTimeout(timeout.as_millis() as u64)),
        }
    }

    async fn query_texts(&self, css: &str) -> Result<Vec<String>> {
        let elements = match self.page.find_elements(css).await {
            Ok(elements) => elements,
            // No match is reported as an error by the protocol.
            Err(CdpError::NotFound) => return Ok(Vec::new()),
            Err(e) => return Err(HarvestError::Browser(format!("Query '{}' failed: {}", css, e))),
        };

        let mut texts = Vec::with_capacity(elements.len());
        for element in elements {
            match element.inner_text().await {
                Ok(Some(text)) => texts.push(text),
                Ok(None) => {}
                Err(e) => debug!("Skipping detached element: {}", e),
            }
        }
        Ok(texts)
    }

    async fn content(&self) -> Result<String> {
        self.page.content().await.map_err(cdp("Failed to read content"))
    }

    async fn current_url(&self) -> Option<String> {
        self.page.url().await.ok().flatten()
    }

    async fn close(&self) -> Result<()> {
        let closed = self.page.clone().close().await;
        if let Some(context) = self.context.clone() {
            dispose_context(&self.browser, context).await;
        }
        closed.map_err(cdp("Failed to close page"))
    }
}

//! Browsing identity: cookies, locale headers, user agent and viewport.
//!
//! An [`Identity`] is an explicit value handed to every session. Providers
//! decide whether it is fixed for the process or re-read for each run.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::IdentityConfig;
use crate::Result;

/// A cookie in the browser export format (`name`, `value`, `domain`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub path: Option<String>,
    /// Seconds since the Unix epoch; absent for session cookies.
    #[serde(default)]
    pub expires: Option<f64>,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
}

impl Cookie {
    /// Creates a cookie for the given domain.
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: Some("/".to_string()),
            expires: None,
            http_only: false,
            secure: true,
        }
    }

    fn is_usable(&self) -> bool {
        !self.name.is_empty() && !self.domain.is_empty()
    }
}

/// Browser viewport dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 1024,
        }
    }
}

/// Everything a session presents to the remote site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub cookies: Vec<Cookie>,
    pub accept_language: String,
    pub user_agent: String,
    pub viewport: Viewport,
}

impl Identity {
    /// Builds an identity without cookies from the configured headers.
    pub fn anonymous(config: &IdentityConfig) -> Self {
        Self {
            cookies: Vec::new(),
            accept_language: config.accept_language.clone(),
            user_agent: config.user_agent.clone(),
            viewport: config.viewport,
        }
    }

    /// Replaces the cookie set.
    pub fn with_cookies(mut self, cookies: Vec<Cookie>) -> Self {
        self.cookies = cookies;
        self
    }

    /// Returns true if no cookies are carried (guest navigation).
    pub fn is_anonymous(&self) -> bool {
        self.cookies.is_empty()
    }
}

/// Parses a cookie export, dropping entries without a name or domain.
pub fn parse_cookies(json: &str) -> Result<Vec<Cookie>> {
    let cookies: Vec<Cookie> = serde_json::from_str(json)?;
    let total = cookies.len();
    let usable: Vec<Cookie> = cookies.into_iter().filter(Cookie::is_usable).collect();
    if usable.len() < total {
        warn!(
            "Skipped {} cookie(s) without name or domain",
            total - usable.len()
        );
    }
    Ok(usable)
}

/// Reads a cookie export from disk.
pub fn load_cookies(path: impl AsRef<Path>) -> Result<Vec<Cookie>> {
    let path = path.as_ref();
    debug!("Loading cookies from {}", path.display());
    let content = std::fs::read_to_string(path)?;
    parse_cookies(&content)
}

/// Source of the identity used for a run.
pub trait IdentityProvider: Send + Sync {
    /// Returns the identity to apply to new sessions.
    fn identity(&self) -> Result<Identity>;
}

/// Always returns the same identity.
#[derive(Debug, Clone)]
pub struct StaticIdentity(Identity);

impl StaticIdentity {
    pub fn new(identity: Identity) -> Self {
        Self(identity)
    }
}

impl IdentityProvider for StaticIdentity {
    fn identity(&self) -> Result<Identity> {
        Ok(self.0.clone())
    }
}

/// Re-reads a cookie export on every call so refreshed cookies are picked up
/// by the next run.
#[derive(Debug, Clone)]
pub struct CookieFileIdentity {
    base: Identity,
    path: PathBuf,
}

impl CookieFileIdentity {
    pub fn new(config: &IdentityConfig, path: impl Into<PathBuf>) -> Self {
        Self {
            base: Identity::anonymous(config),
            path: path.into(),
        }
    }
}

impl IdentityProvider for CookieFileIdentity {
    fn identity(&self) -> Result<Identity> {
        if !self.path.exists() {
            warn!(
                "Cookie file {} not found, continuing as guest",
                self.path.display()
            );
            return Ok(self.base.clone());
        }
        let cookies = load_cookies(&self.path)?;
        Ok(self.base.clone().with_cookies(cookies))
    }
}

/// Builds the provider described by the configuration.
pub fn provider_from_config(config: &IdentityConfig) -> Box<dyn IdentityProvider> {
    match &config.cookies_file {
        Some(path) => Box::new(CookieFileIdentity::new(config, path)),
        None => Box::new(StaticIdentity::new(Identity::anonymous(config))),
    }
}

//! # trend-harvest
//!
//! A resilient acquisition engine for client-rendered timelines: trending
//! labels and the public reactions posted about them.
//!
//! A keyword expands into several equivalent timeline URLs. Each one is
//! loaded in an isolated browser session with bounded retries, given time to
//! render, scrolled to pull in lazily loaded posts, checked for a login wall
//! and run through an ordered extraction cascade. Results are deduplicated
//! and bounded, and exploration stops early once enough has been found.
//!
//! - Session replacement: a failed navigation destroys the session and the
//!   retry starts from a fresh one with the same identity
//! - Extraction cascades that tolerate markup drift
//! - Early stop and a hard cap on collected items
//! - Pluggable automation driver (Chrome via the `headless` feature)
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use trend_harvest::{
//!     provider_from_config, BrowserPool, ChromeDriver, HarvestConfig, Harvester, Target,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = HarvestConfig::default();
//!     let pool = Arc::new(BrowserPool::new(config.browser.clone()));
//!     let identity = provider_from_config(&config.identity);
//!     let harvester = Harvester::new(Arc::new(ChromeDriver::new(pool)), identity, config)?;
//!
//!     let harvest = harvester.acquire(&Target::keyword("#rustlang")).await?;
//!     for item in &harvest.items {
//!         println!("{}", item.text);
//!     }
//!     Ok(())
//! }
//! ```

mod aggregator;
mod batch;
mod candidates;
mod config;
mod driver;
mod error;
pub mod extract;
mod identity;
mod loader;
mod navigator;
mod readiness;
mod result;
mod session;

#[cfg(feature = "headless")]
mod browser;
#[cfg(feature = "headless")]
pub mod browser_setup;

#[cfg(test)]
mod testing;

pub use aggregator::{CandidateOutcome, CandidateReport, Harvest, Harvester, StopPolicy, Target};
pub use batch::{
    harvest_keywords, trend_report, write_json, KeywordReactions, TrendReport, TrendSnapshot,
};
pub use candidates::{build_candidates, dedup_urls, CandidateGenerator};
pub use config::{
    BatchConfig, BrowserConfig, CandidateConfig, HarvestConfig, IdentityConfig, Limits,
    NavigationConfig, ReadinessConfig, RecoveryConfig, ScrollPlan, Signatures, TrendsConfig,
};
pub use driver::{AutomationDriver, PageHandle};
pub use error::{HarvestError, Result};
pub use extract::{
    clean_trend_label, parse_trend_labels, trend_targets, Cascade, ExtractionStrategy,
    SelectorStrategy, TrendLabelStrategy,
};
pub use identity::{
    load_cookies, parse_cookies, provider_from_config, Cookie, CookieFileIdentity, Identity,
    IdentityProvider, StaticIdentity, Viewport,
};
pub use loader::expand;
pub use navigator::{AttemptStatus, NavigationOutcome, Navigated, Navigator};
pub use readiness::await_ready;
pub use result::{dedup_texts, ContentItem, ResultSet, TrendLabel, TrendTarget};
pub use session::Session;

#[cfg(feature = "headless")]
pub use browser::{BrowserPool, ChromeDriver, ChromePage};

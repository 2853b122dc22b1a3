//! Harvester configuration.
//!
//! Every field has a serde default so a partial JSON file only needs to name
//! the values it overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::identity::Viewport;
use crate::{HarvestError, Result};

/// Top-level configuration for acquisition runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    #[serde(default)]
    pub navigation: NavigationConfig,
    #[serde(default)]
    pub readiness: ReadinessConfig,
    /// Scroll plan used before extracting reactions.
    #[serde(default)]
    pub scroll: ScrollPlan,
    /// Scroll plan used on the explore page.
    #[serde(default = "default_trend_scroll")]
    pub trend_scroll: ScrollPlan,
    #[serde(default)]
    pub candidates: CandidateConfig,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub signatures: Signatures,
    #[serde(default)]
    pub recovery: RecoveryConfig,
    #[serde(default)]
    pub trends: TrendsConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            navigation: NavigationConfig::default(),
            readiness: ReadinessConfig::default(),
            scroll: ScrollPlan::default(),
            trend_scroll: default_trend_scroll(),
            candidates: CandidateConfig::default(),
            limits: Limits::default(),
            signatures: Signatures::default(),
            recovery: RecoveryConfig::default(),
            trends: TrendsConfig::default(),
            batch: BatchConfig::default(),
            identity: IdentityConfig::default(),
            browser: BrowserConfig::default(),
        }
    }
}

impl HarvestConfig {
    /// Loads configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would make a run meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.navigation.max_attempts == 0 {
            return Err(HarvestError::Config(
                "navigation.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.limits.hard_cap == 0 {
            return Err(HarvestError::Config(
                "limits.hard_cap must be at least 1".to_string(),
            ));
        }
        if self.batch.concurrency == 0 {
            return Err(HarvestError::Config(
                "batch.concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Retry policy for loading one URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Total attempts before a candidate is given up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Backoff unit; attempt `n` waits `n * base_delay_ms`.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Timeout for a single navigation attempt.
    #[serde(default = "default_navigation_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1500
}

fn default_navigation_timeout_ms() -> u64 {
    90_000
}

impl NavigationConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            timeout_ms: default_navigation_timeout_ms(),
        }
    }
}

/// Presence signals raced after each navigation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessConfig {
    #[serde(default = "default_reaction_signals")]
    pub signals: Vec<String>,
    #[serde(default = "default_trend_signals")]
    pub trend_signals: Vec<String>,
    #[serde(default = "default_readiness_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_reaction_signals() -> Vec<String> {
    vec![
        r#"div[data-testid="tweetText"]"#.to_string(),
        "article".to_string(),
        r#"div[aria-label="Timeline: Search timeline"]"#.to_string(),
        r#"div[role="progressbar"]"#.to_string(),
    ]
}

fn default_trend_signals() -> Vec<String> {
    vec![r#"div[aria-label="Timeline: Explore"]"#.to_string()]
}

fn default_readiness_timeout_ms() -> u64 {
    20_000
}

impl ReadinessConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            signals: default_reaction_signals(),
            trend_signals: default_trend_signals(),
            timeout_ms: default_readiness_timeout_ms(),
        }
    }
}

/// Lazy-load progression: scroll `step_px`, wait `delay_ms`, until `budget_px`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollPlan {
    #[serde(default = "default_step_px")]
    pub step_px: u32,
    #[serde(default = "default_scroll_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_budget_px")]
    pub budget_px: u32,
}

fn default_step_px() -> u32 {
    1000
}

fn default_scroll_delay_ms() -> u64 {
    300
}

fn default_budget_px() -> u32 {
    90_000
}

fn default_trend_scroll() -> ScrollPlan {
    ScrollPlan {
        budget_px: 3000,
        ..ScrollPlan::default()
    }
}

impl ScrollPlan {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for ScrollPlan {
    fn default() -> Self {
        Self {
            step_px: default_step_px(),
            delay_ms: default_scroll_delay_ms(),
            budget_px: default_budget_px(),
        }
    }
}

/// Hosts and query qualifiers used to expand a keyword into URLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateConfig {
    #[serde(default = "default_primary_host")]
    pub primary_host: String,
    /// Fallback host, tried after every primary-host variant.
    #[serde(default = "default_mobile_host")]
    pub mobile_host: Option<String>,
    /// Appended to the localized variants, without a leading separator.
    #[serde(default = "default_locale_query")]
    pub locale_query: String,
    /// Also emit the variants without the locale qualifier.
    #[serde(default = "default_true")]
    pub include_unlocalized: bool,
}

fn default_primary_host() -> String {
    "https://x.com".to_string()
}

fn default_mobile_host() -> Option<String> {
    Some("https://mobile.twitter.com".to_string())
}

fn default_locale_query() -> String {
    "src=typed_query&pf=on&lang=ko".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for CandidateConfig {
    fn default() -> Self {
        Self {
            primary_host: default_primary_host(),
            mobile_host: default_mobile_host(),
            locale_query: default_locale_query(),
            include_unlocalized: true,
        }
    }
}

/// Size policies for a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Limits {
    /// Stop exploring candidates once this many items are gathered.
    #[serde(default = "default_keyword_early_stop")]
    pub keyword_early_stop: usize,
    /// Early stop used when a single source URL is harvested.
    #[serde(default = "default_source_early_stop")]
    pub source_early_stop: usize,
    #[serde(default = "default_hard_cap")]
    pub hard_cap: usize,
    /// Minimum item length in characters after trimming.
    #[serde(default = "default_min_item_chars")]
    pub min_item_chars: usize,
}

fn default_keyword_early_stop() -> usize {
    40
}

fn default_source_early_stop() -> usize {
    20
}

fn default_hard_cap() -> usize {
    300
}

fn default_min_item_chars() -> usize {
    5
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            keyword_early_stop: default_keyword_early_stop(),
            source_early_stop: default_source_early_stop(),
            hard_cap: default_hard_cap(),
            min_item_chars: default_min_item_chars(),
        }
    }
}

/// Regexes recognised in rendered markup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signatures {
    #[serde(default = "default_login_wall")]
    pub login_wall: String,
    #[serde(default = "default_error_banner")]
    pub error_banner: String,
}

fn default_login_wall() -> String {
    "(?i)Sign in|Log in|로그인".to_string()
}

fn default_error_banner() -> String {
    "(?i)Something went wrong|Try reloading".to_string()
}

impl Default for Signatures {
    fn default() -> Self {
        Self {
            login_wall: default_login_wall(),
            error_banner: default_error_banner(),
        }
    }
}

/// Reload behaviour when the site shows its transient error banner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryConfig {
    #[serde(default = "default_banner_reloads")]
    pub banner_reloads: u32,
    #[serde(default = "default_reload_settle_ms")]
    pub reload_settle_ms: u64,
    /// Pause between two candidates of the same run.
    #[serde(default)]
    pub candidate_pause_ms: u64,
}

fn default_banner_reloads() -> u32 {
    3
}

fn default_reload_settle_ms() -> u64 {
    1500
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            banner_reloads: default_banner_reloads(),
            reload_settle_ms: default_reload_settle_ms(),
            candidate_pause_ms: 0,
        }
    }
}

/// Trend discovery endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendsConfig {
    #[serde(default = "default_explore_url")]
    pub explore_url: String,
    /// Page used to check whether the identity is logged in.
    #[serde(default = "default_home_url")]
    pub home_url: String,
    #[serde(default = "default_trend_limit")]
    pub limit: usize,
}

fn default_explore_url() -> String {
    "https://x.com/explore/tabs/trending".to_string()
}

fn default_home_url() -> String {
    "https://x.com/home".to_string()
}

fn default_trend_limit() -> usize {
    10
}

impl Default for TrendsConfig {
    fn default() -> Self {
        Self {
            explore_url: default_explore_url(),
            home_url: default_home_url(),
            limit: default_trend_limit(),
        }
    }
}

/// Multi-keyword harvesting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Pause after each run before its slot is reused.
    #[serde(default = "default_batch_pause_ms")]
    pub pause_ms: u64,
}

fn default_concurrency() -> usize {
    1
}

fn default_batch_pause_ms() -> u64 {
    2000
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            pause_ms: default_batch_pause_ms(),
        }
    }
}

/// Browsing identity applied to every session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_accept_language")]
    pub accept_language: String,
    #[serde(default)]
    pub viewport: Viewport,
    /// Cookie export (JSON array) read at the start of every run.
    #[serde(default)]
    pub cookies_file: Option<PathBuf>,
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36"
        .to_string()
}

fn default_accept_language() -> String {
    "ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7".to_string()
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
            viewport: Viewport::default(),
            cookies_file: None,
        }
    }
}

/// Browser process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_true")]
    pub headless: bool,
    /// Path to the Chrome/Chromium executable. If `None`, auto-detected.
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,
    #[serde(default)]
    pub proxy_url: Option<String>,
    #[serde(default)]
    pub launch_args: Vec<String>,
    /// Maximum number of sessions open at once across all runs.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_max_sessions() -> usize {
    4
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            proxy_url: None,
            launch_args: Vec::new(),
            max_sessions: default_max_sessions(),
        }
    }
}

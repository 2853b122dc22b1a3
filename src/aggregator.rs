//! Acquisition runs: candidates in, bounded and deduplicated content out.
//!
//! A run walks its candidate URLs strictly in order with one session,
//! replacing the session whenever navigation gives up on it. Per-candidate
//! trouble (no session, exhausted navigation, a login wall, nothing
//! extracted) is recorded and skipped; only failures that make the whole run
//! impossible reach the caller.

use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::candidates::CandidateGenerator;
use crate::config::{HarvestConfig, ScrollPlan};
use crate::driver::{AutomationDriver, PageHandle};
use crate::extract::{trend_targets, Cascade};
use crate::identity::IdentityProvider;
use crate::loader::expand;
use crate::navigator::Navigator;
use crate::readiness::await_ready;
use crate::result::{dedup_texts, ContentItem, ResultSet, TrendLabel, TrendTarget};
use crate::session::Session;
use crate::{HarvestError, Result};

/// What a run acquires content for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Target {
    /// A keyword, optionally `#`-prefixed, expanded into candidate URLs.
    Keyword(String),
    /// A single URL visited as is.
    Source(String),
}

impl Target {
    pub fn keyword(keyword: impl Into<String>) -> Self {
        Self::Keyword(keyword.into())
    }

    pub fn source(url: impl Into<String>) -> Self {
        Self::Source(url.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Keyword(k) => k,
            Self::Source(u) => u,
        }
    }
}

/// Thresholds for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopPolicy {
    /// Stop exploring once this many unique items are collected.
    pub early_stop: usize,
    /// Never return more than this many items.
    pub hard_cap: usize,
}

/// How one candidate URL turned out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CandidateOutcome {
    /// Extracted `found` snippets, `added` of which were new, after
    /// `attempts` navigation attempts.
    Accumulated {
        found: usize,
        added: usize,
        attempts: u32,
    },
    /// The page asked for a sign-in instead of showing content.
    LoginWall,
    /// Every navigation attempt failed.
    Exhausted { attempts: u32, error: String },
    /// No session could be prepared for this candidate.
    NoSession { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateReport {
    pub url: String,
    #[serde(flatten)]
    pub outcome: CandidateOutcome,
}

impl CandidateReport {
    fn no_session(url: &str, error: &HarvestError) -> Self {
        Self {
            url: url.to_string(),
            outcome: CandidateOutcome::NoSession {
                error: error.to_string(),
            },
        }
    }
}

/// The result of one acquisition run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Harvest {
    pub target: Target,
    pub items: Vec<ContentItem>,
    /// Candidate URLs in the order they were visited.
    pub tried_urls: Vec<String>,
    pub candidates: Vec<CandidateReport>,
}

impl Harvest {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item texts in first-seen order.
    pub fn texts(&self) -> Vec<String> {
        self.items.iter().map(|i| i.text.clone()).collect()
    }
}

/// What the page looked like after the readiness and loading steps.
enum PageState {
    LoginWall,
    Content(Vec<String>),
}

/// Runs acquisitions against one automation driver.
pub struct Harvester {
    driver: Arc<dyn AutomationDriver>,
    identity: Box<dyn IdentityProvider>,
    navigator: Navigator,
    candidates: CandidateGenerator,
    reactions: Cascade,
    trends: Cascade,
    login_wall: Regex,
    error_banner: Regex,
    config: HarvestConfig,
}

impl Harvester {
    /// Creates a harvester. Fails if a signature pattern does not compile.
    pub fn new(
        driver: Arc<dyn AutomationDriver>,
        identity: Box<dyn IdentityProvider>,
        config: HarvestConfig,
    ) -> Result<Self> {
        config.validate()?;
        let login_wall = compile("login_wall", &config.signatures.login_wall)?;
        let error_banner = compile("error_banner", &config.signatures.error_banner)?;

        Ok(Self {
            navigator: Navigator::new(Arc::clone(&driver), config.navigation.clone()),
            candidates: CandidateGenerator::new(config.candidates.clone()),
            reactions: Cascade::reactions(),
            trends: Cascade::trend_labels(),
            driver,
            identity,
            login_wall,
            error_banner,
            config,
        })
    }

    /// Replaces the reaction cascade.
    pub fn with_reaction_cascade(mut self, cascade: Cascade) -> Self {
        self.reactions = cascade;
        self
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Default thresholds for `target`.
    pub fn stop_policy(&self, target: &Target) -> StopPolicy {
        let limits = &self.config.limits;
        StopPolicy {
            early_stop: match target {
                Target::Keyword(_) => limits.keyword_early_stop,
                Target::Source(_) => limits.source_early_stop,
            },
            hard_cap: limits.hard_cap,
        }
    }

    /// Acquires content for `target` with its default thresholds.
    pub async fn acquire(&self, target: &Target) -> Result<Harvest> {
        self.acquire_with(target, self.stop_policy(target)).await
    }

    /// Acquires content for `target`.
    ///
    /// Fails before any navigation with `InvalidKeyword` for an empty keyword
    /// or `UrlParse` for a malformed source URL. Fails with
    /// `AutomationUnavailable` when the engine cannot be launched. Everything
    /// else ends as a `CandidateOutcome`, and a run that finds nothing
    /// returns an empty `Harvest`.
    pub async fn acquire_with(&self, target: &Target, policy: StopPolicy) -> Result<Harvest> {
        let urls = match target {
            Target::Keyword(keyword) => self.candidates.build(keyword)?,
            Target::Source(source) => vec![url::Url::parse(source.trim())?.to_string()],
        };
        let source_mode = matches!(target, Target::Source(_));

        let identity = Arc::new(self.identity.identity()?);
        info!(
            "Acquiring '{}' over {} candidate(s){}",
            target.as_str(),
            urls.len(),
            if identity.is_anonymous() { " without cookies" } else { "" }
        );

        let mut results = ResultSet::new(self.config.limits.min_item_chars);
        let mut tried_urls = Vec::new();
        let mut reports = Vec::new();
        let mut session: Option<Session> = None;

        for (index, url) in urls.iter().enumerate() {
            if index > 0 && self.config.recovery.candidate_pause_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.recovery.candidate_pause_ms))
                    .await;
            }
            tried_urls.push(url.clone());

            let current = match session.take() {
                Some(s) => s,
                None => match Session::create(self.driver.as_ref(), Arc::clone(&identity)).await {
                    Ok(s) => s,
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        warn!("Skipping {}, no session: {}", url, e);
                        reports.push(CandidateReport::no_session(url, &e));
                        continue;
                    }
                },
            };

            let navigated = match self.navigator.navigate(current, url).await {
                Ok(navigated) => navigated,
                Err(HarvestError::NavigationExhausted {
                    attempts, source, ..
                }) => {
                    warn!("Skipping {} after {} attempts: {}", url, attempts, source);
                    reports.push(CandidateReport {
                        url: url.clone(),
                        outcome: CandidateOutcome::Exhausted {
                            attempts,
                            error: source.to_string(),
                        },
                    });
                    continue;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("Skipping {}, replacement session failed: {}", url, e);
                    reports.push(CandidateReport::no_session(url, &e));
                    continue;
                }
            };
            let attempts = navigated.attempts();
            let current = navigated.session;

            let state = self
                .load_page(
                    current.page(),
                    &self.config.readiness.signals,
                    &self.config.scroll,
                    &self.reactions,
                )
                .await;
            session = Some(current);

            let outcome = match state {
                PageState::LoginWall => {
                    warn!("Login wall on {}", url);
                    CandidateOutcome::LoginWall
                }
                PageState::Content(texts) => {
                    let found = texts.len();
                    let added = results.extend(texts, url);
                    debug!("{}: {} snippets, {} new, {} total", url, found, added, results.len());
                    CandidateOutcome::Accumulated {
                        found,
                        added,
                        attempts,
                    }
                }
            };
            let blocked = outcome == CandidateOutcome::LoginWall;
            reports.push(CandidateReport {
                url: url.clone(),
                outcome,
            });

            if source_mode && blocked {
                break;
            }
            if results.len() >= policy.early_stop {
                info!("Early stop at {} items after {} candidate(s)", results.len(), index + 1);
                break;
            }
        }

        if let Some(session) = session {
            session.destroy().await;
        }

        results.truncate(policy.hard_cap);
        info!("Acquired {} items for '{}'", results.len(), target.as_str());

        Ok(Harvest {
            target: target.clone(),
            items: results.into_items(),
            tried_urls,
            candidates: reports,
        })
    }

    /// Reads up to `limit` trending labels from the explore page.
    ///
    /// A page that never loads or shows a login wall yields an empty list.
    pub async fn discover_trends(&self, limit: usize) -> Result<Vec<TrendLabel>> {
        let Some((session, labels)) = self.explore().await? else {
            return Ok(Vec::new());
        };
        session.destroy().await;

        let mut labels = dedup_texts(labels);
        labels.truncate(limit);
        info!("Discovered {} trend(s)", labels.len());
        Ok(labels.into_iter().map(TrendLabel::new).collect())
    }

    /// Reads up to `limit` trending labels paired with their timeline URLs.
    pub async fn discover_targets(&self, limit: usize) -> Result<Vec<TrendTarget>> {
        let Some((session, labels)) = self.explore().await? else {
            return Ok(Vec::new());
        };
        let markup = session.page().content().await;
        session.destroy().await;

        let labels: Vec<TrendLabel> = dedup_texts(labels).into_iter().map(TrendLabel::new).collect();
        match markup {
            Ok(html) => trend_targets(&html, &self.config.candidates.primary_host, &labels, limit),
            Err(e) => {
                warn!("Could not read explore markup: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// Loads the home page and reports whether the identity is signed in.
    pub async fn check_identity(&self) -> Result<bool> {
        let identity = Arc::new(self.identity.identity()?);
        let session = Session::create(self.driver.as_ref(), identity).await?;
        let navigated = self
            .navigator
            .navigate(session, &self.config.trends.home_url)
            .await?;
        let session = navigated.session;

        await_ready(
            session.page(),
            &self.config.readiness.signals,
            self.config.readiness.timeout(),
        )
        .await;
        let markup = session.page().content().await;
        session.destroy().await;

        let signed_in = !self.login_wall.is_match(&markup?);
        info!(
            "Identity is {}",
            if signed_in { "signed in" } else { "signed out" }
        );
        Ok(signed_in)
    }

    /// Navigates to the explore page and runs the trend cascade.
    async fn explore(&self) -> Result<Option<(Session, Vec<String>)>> {
        let url = &self.config.trends.explore_url;
        let identity = Arc::new(self.identity.identity()?);
        let session = match Session::create(self.driver.as_ref(), identity).await {
            Ok(session) => session,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("No session for the explore page: {}", e);
                return Ok(None);
            }
        };

        let session = match self.navigator.navigate(session, url).await {
            Ok(navigated) => navigated.session,
            Err(HarvestError::NavigationExhausted { source, .. }) => {
                warn!("Explore page unreachable: {}", source);
                return Ok(None);
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Explore page unreachable: {}", e);
                return Ok(None);
            }
        };

        match self
            .load_page(
                session.page(),
                &self.config.readiness.trend_signals,
                &self.config.trend_scroll,
                &self.trends,
            )
            .await
        {
            PageState::Content(labels) => Ok(Some((session, labels))),
            PageState::LoginWall => {
                warn!("Login wall on explore page, check the cookie export");
                session.destroy().await;
                Ok(None)
            }
        }
    }

    /// Readiness, banner recovery, loading, login-wall check and extraction
    /// on an already navigated page.
    async fn load_page(
        &self,
        page: &dyn PageHandle,
        signals: &[String],
        plan: &ScrollPlan,
        cascade: &Cascade,
    ) -> PageState {
        let recovery = &self.config.recovery;
        let mut reloads = 0;
        loop {
            await_ready(page, signals, self.config.readiness.timeout()).await;

            let banner = match page.content().await {
                Ok(html) => self.error_banner.is_match(&html),
                Err(_) => false,
            };
            if !banner || reloads >= recovery.banner_reloads {
                break;
            }
            reloads += 1;
            debug!("Error banner shown, reload {}/{}", reloads, recovery.banner_reloads);
            if let Err(e) = page.reload(self.config.navigation.timeout()).await {
                warn!("Reload failed: {}", e);
            }
            tokio::time::sleep(Duration::from_millis(recovery.reload_settle_ms)).await;
        }

        expand(page, plan).await;

        match page.content().await {
            Ok(html) if self.login_wall.is_match(&html) => return PageState::LoginWall,
            Ok(_) => {}
            Err(e) => debug!("Could not read markup for login check: {}", e),
        }

        PageState::Content(cascade.extract(page).await)
    }
}

fn compile(name: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| HarvestError::Config(format!("Invalid {} pattern: {}", name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CandidateConfig, IdentityConfig, ReadinessConfig};
    use crate::extract::{SelectorStrategy, ARTICLE_LANG, TWEET_TEXT};
    use crate::identity::{Identity, StaticIdentity};
    use crate::testing::{Failure, ScriptedDriver, Visit};

    const LIVE: &str = "https://x.com/hashtag/Test?f=live&src=typed_query&pf=on&lang=ko";
    const TOP: &str = "https://x.com/hashtag/Test?f=top&src=typed_query&pf=on&lang=ko";
    const SEARCH_LIVE: &str = "https://x.com/search?q=%23Test&f=live&src=typed_query&pf=on&lang=ko";
    const SEARCH_TOP: &str = "https://x.com/search?q=%23Test&f=top&src=typed_query&pf=on&lang=ko";

    const LOGIN: &str = "<html><body><h1>Sign in to X</h1></body></html>";

    fn config() -> HarvestConfig {
        HarvestConfig {
            candidates: CandidateConfig {
                mobile_host: None,
                include_unlocalized: false,
                ..Default::default()
            },
            readiness: ReadinessConfig {
                timeout_ms: 100,
                ..Default::default()
            },
            scroll: ScrollPlan {
                step_px: 1000,
                delay_ms: 10,
                budget_px: 2000,
            },
            ..Default::default()
        }
    }

    fn harvester(driver: &ScriptedDriver, config: HarvestConfig) -> Harvester {
        let identity = StaticIdentity::new(Identity::anonymous(&IdentityConfig::default()));
        Harvester::new(Arc::new(driver.clone()), Box::new(identity), config).unwrap()
    }

    fn replies(range: std::ops::Range<usize>) -> Vec<String> {
        range.map(|i| format!("reaction number {}", i)).collect()
    }

    fn with_replies(driver: ScriptedDriver, url: &str, texts: &[String]) -> ScriptedDriver {
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        driver.with_texts(url, TWEET_TEXT, &refs)
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_merges_overlapping_candidates() {
        // Four candidates with ten items each, half shared with the previous one.
        let mut driver = ScriptedDriver::new();
        for (i, url) in [LIVE, TOP, SEARCH_LIVE, SEARCH_TOP].iter().enumerate() {
            driver = with_replies(driver, url, &replies(i * 5..i * 5 + 10));
        }
        let harvest = harvester(&driver, config())
            .acquire(&Target::keyword("#Test"))
            .await
            .unwrap();

        assert_eq!(harvest.len(), 25);
        assert_eq!(harvest.tried_urls, vec![LIVE, TOP, SEARCH_LIVE, SEARCH_TOP]);
        assert_eq!(
            harvest.candidates[1].outcome,
            CandidateOutcome::Accumulated {
                found: 10,
                added: 5,
                attempts: 1,
            }
        );
        assert_eq!(harvest.items[0].source, LIVE);
        assert_eq!(harvest.items[24].source, SEARCH_TOP);
        // One session served the whole run and was released.
        assert_eq!(driver.opened(), 1);
        assert_eq!(driver.closed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_login_wall_moves_on() {
        let driver = with_replies(
            ScriptedDriver::new().with_markup(LIVE, LOGIN),
            LIVE,
            &replies(0..10),
        );
        let driver = with_replies(driver, TOP, &replies(100..103));
        let harvest = harvester(&driver, config())
            .acquire(&Target::keyword("#Test"))
            .await
            .unwrap();

        assert_eq!(harvest.candidates[0].outcome, CandidateOutcome::LoginWall);
        assert_eq!(harvest.len(), 3);
        assert!(harvest.items.iter().all(|i| i.source == TOP));
        assert_eq!(harvest.tried_urls.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_early_stop() {
        let driver = with_replies(ScriptedDriver::new(), LIVE, &replies(0..45));
        let harvest = harvester(&driver, config())
            .acquire(&Target::keyword("#Test"))
            .await
            .unwrap();

        assert_eq!(harvest.len(), 45);
        assert_eq!(harvest.tried_urls, vec![LIVE]);
        assert_eq!(driver.gotos(), vec![LIVE]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_hard_cap() {
        let driver = with_replies(ScriptedDriver::new(), LIVE, &replies(0..30));
        let policy = StopPolicy {
            early_stop: 1000,
            hard_cap: 12,
        };
        let harvest = harvester(&driver, config())
            .acquire_with(&Target::keyword("#Test"), policy)
            .await
            .unwrap();

        assert_eq!(harvest.len(), 12);
        assert_eq!(harvest.tried_urls.len(), 4);
        assert_eq!(harvest.texts()[0], "reaction number 0");
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_filters_short_items() {
        let driver = ScriptedDriver::new().with_texts(
            LIVE,
            TWEET_TEXT,
            &["ㅋㅋㅋ", "good", "  long enough  ", "long enough"],
        );
        let harvest = harvester(&driver, config())
            .acquire(&Target::keyword("#Test"))
            .await
            .unwrap();
        assert_eq!(harvest.texts(), vec!["long enough"]);
        assert!(harvest.items.iter().all(|i| i.text.chars().count() >= 5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_skips_exhausted_candidate() {
        let driver = with_replies(ScriptedDriver::new().always_fail(LIVE), TOP, &replies(0..3));
        let harvest = harvester(&driver, config())
            .acquire(&Target::keyword("#Test"))
            .await
            .unwrap();

        assert!(matches!(
            harvest.candidates[0].outcome,
            CandidateOutcome::Exhausted { attempts: 3, .. }
        ));
        assert_eq!(harvest.len(), 3);
        // Three failed attempts on the first candidate, then one per candidate.
        assert_eq!(driver.gotos().len(), 6);
        assert_eq!(driver.opened(), driver.closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_records_attempts_on_success() {
        let driver = with_replies(
            ScriptedDriver::new().fail_goto(LIVE, vec![Failure::Timeout, Failure::Connection]),
            LIVE,
            &replies(0..3),
        );
        let harvest = harvester(&driver, config())
            .acquire(&Target::keyword("#Test"))
            .await
            .unwrap();

        assert_eq!(
            harvest.candidates[0].outcome,
            CandidateOutcome::Accumulated {
                found: 3,
                added: 3,
                attempts: 3,
            }
        );
        assert_eq!(harvest.len(), 3);
        // The first page plus one replacement per failed attempt.
        assert_eq!(driver.opened(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_skips_candidate_when_replacement_fails() {
        // The first attempt times out and the replacement page cannot be opened.
        let driver = with_replies(
            ScriptedDriver::new()
                .fail_goto(LIVE, vec![Failure::Timeout])
                .fail_open(2),
            TOP,
            &replies(0..3),
        );
        let harvest = harvester(&driver, config())
            .acquire(&Target::keyword("#Test"))
            .await
            .unwrap();

        assert!(matches!(
            &harvest.candidates[0].outcome,
            CandidateOutcome::NoSession { error } if error.contains("transient")
        ));
        assert_eq!(harvest.candidates[1].url, TOP);
        assert_eq!(harvest.len(), 3);
        assert!(harvest.items.iter().all(|i| i.source == TOP));
        assert_eq!(driver.opened(), driver.closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_identity_failures_are_not_fatal() {
        let driver = with_replies(ScriptedDriver::new().fail_identity(), LIVE, &replies(0..3));
        let harvest = harvester(&driver, config())
            .acquire(&Target::keyword("#Test"))
            .await
            .unwrap();

        assert!(harvest.is_empty());
        assert_eq!(harvest.tried_urls.len(), 4);
        assert!(harvest
            .candidates
            .iter()
            .all(|c| matches!(c.outcome, CandidateOutcome::NoSession { .. })));
        assert!(driver.gotos().is_empty());
        assert_eq!(driver.opened(), driver.closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_nothing_found_is_empty() {
        let driver = ScriptedDriver::new();
        let harvest = harvester(&driver, config())
            .acquire(&Target::keyword("#Test"))
            .await
            .unwrap();
        assert!(harvest.is_empty());
        assert_eq!(harvest.tried_urls.len(), 4);
    }

    #[tokio::test]
    async fn test_acquire_invalid_keyword_never_navigates() {
        let driver = ScriptedDriver::new();
        let err = harvester(&driver, config())
            .acquire(&Target::keyword("  "))
            .await
            .unwrap_err();
        assert!(matches!(err, HarvestError::InvalidKeyword(_)));
        assert_eq!(driver.opened(), 0);
    }

    #[tokio::test]
    async fn test_acquire_invalid_source_url() {
        let driver = ScriptedDriver::new();
        let err = harvester(&driver, config())
            .acquire(&Target::source("not a url"))
            .await
            .unwrap_err();
        assert!(matches!(err, HarvestError::UrlParse(_)));
        assert_eq!(driver.opened(), 0);
    }

    #[tokio::test]
    async fn test_acquire_engine_unavailable_is_fatal() {
        let driver = ScriptedDriver::new().unavailable();
        let err = harvester(&driver, config())
            .acquire(&Target::keyword("#Test"))
            .await
            .unwrap_err();
        assert!(matches!(err, HarvestError::AutomationUnavailable(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_source_login_wall_short_circuits() {
        let url = "https://x.com/i/events/1234";
        let driver = with_replies(ScriptedDriver::new().with_markup(url, LOGIN), url, &replies(0..5));
        let harvest = harvester(&driver, config())
            .acquire(&Target::source(url))
            .await
            .unwrap();
        assert!(harvest.is_empty());
        assert_eq!(harvest.candidates[0].outcome, CandidateOutcome::LoginWall);
        assert_eq!(harvest.tried_urls, vec![url]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_source_uses_fallback_strategy() {
        let url = "https://x.com/i/events/1234";
        let driver = ScriptedDriver::new().with_texts(url, ARTICLE_LANG, &["어제 경기 정말 대박"]);
        let harvest = harvester(&driver, config())
            .acquire(&Target::source(url))
            .await
            .unwrap();
        assert_eq!(harvest.texts(), vec!["어제 경기 정말 대박"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_reaction_cascade() {
        let driver = ScriptedDriver::new()
            .with_texts(LIVE, TWEET_TEXT, &["not asked for"])
            .with_texts(LIVE, ARTICLE_LANG, &["only language blocks"]);
        let cascade = Cascade::new().with_strategy(SelectorStrategy::new("lang", ARTICLE_LANG));
        let harvest = harvester(&driver, config())
            .with_reaction_cascade(cascade)
            .acquire(&Target::keyword("#Test"))
            .await
            .unwrap();
        assert_eq!(harvest.texts(), vec!["only language blocks"]);
        assert!(!driver.queries().iter().any(|q| q == TWEET_TEXT));
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_banner_reloaded_until_gone() {
        let driver = with_replies(ScriptedDriver::new().with_banner(LIVE, 2), LIVE, &replies(0..45));
        let harvest = harvester(&driver, config())
            .acquire(&Target::keyword("#Test"))
            .await
            .unwrap();

        let reloads = driver
            .log()
            .into_iter()
            .filter(|v| matches!(v, Visit::Reload(_)))
            .count();
        assert_eq!(reloads, 2);
        assert_eq!(harvest.len(), 45);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_banner_reloads_are_bounded() {
        let driver = ScriptedDriver::new().with_banner(LIVE, 100);
        harvester(&driver, config())
            .acquire(&Target::keyword("#Test"))
            .await
            .unwrap();

        let reloads = driver
            .log()
            .into_iter()
            .filter(|v| *v == Visit::Reload(LIVE.to_string()))
            .count();
        assert_eq!(reloads, 3);
    }

    const EXPLORE: &str = r##"
        <html><body>
        <div aria-label="Timeline: Explore">
            <div dir="ltr" style="color: rgb(231, 233, 234);"><span>#러스트<span>#러스트</span></span></div>
            <div dir="ltr" style="color: rgb(231, 233, 234);"><span>Rust 2024</span></div>
            <div dir="ltr" style="color: rgb(231, 233, 234);"><span>#러스트</span></div>
            <div dir="ltr" style="color: rgb(231, 233, 234);"><span>Ferris</span></div>
            <a href="/hashtag/%EB%9F%AC%EC%8A%A4%ED%8A%B8?src=trend_click">tag</a>
            <a href="/i/events/1234">event</a>
        </div>
        </body></html>
    "##;

    #[tokio::test(start_paused = true)]
    async fn test_discover_trends_dedup_and_limit() {
        let explore = HarvestConfig::default().trends.explore_url;
        let driver = ScriptedDriver::new().with_markup(&explore, EXPLORE);
        let h = harvester(&driver, config());

        let trends = h.discover_trends(10).await.unwrap();
        let labels: Vec<&str> = trends.iter().map(TrendLabel::as_str).collect();
        assert_eq!(labels, vec!["#러스트", "Rust 2024", "Ferris"]);

        let trends = h.discover_trends(2).await.unwrap();
        assert_eq!(trends.len(), 2);
        assert_eq!(driver.opened(), driver.closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_discover_trends_login_wall_is_empty() {
        let explore = HarvestConfig::default().trends.explore_url;
        let driver = ScriptedDriver::new().with_markup(&explore, LOGIN);
        let trends = harvester(&driver, config()).discover_trends(10).await.unwrap();
        assert!(trends.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_discover_trends_unreachable_is_empty() {
        let explore = HarvestConfig::default().trends.explore_url;
        let driver = ScriptedDriver::new().always_fail(&explore);
        let trends = harvester(&driver, config()).discover_trends(10).await.unwrap();
        assert!(trends.is_empty());
        assert_eq!(driver.opened(), driver.closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_discover_targets() {
        let explore = HarvestConfig::default().trends.explore_url;
        let driver = ScriptedDriver::new().with_markup(&explore, EXPLORE);
        let targets = harvester(&driver, config()).discover_targets(10).await.unwrap();

        assert_eq!(targets[0].label, "#러스트");
        assert!(targets[0].url.starts_with("https://x.com/hashtag/"));
        assert_eq!(targets[1].label, "Rust 2024");
        assert_eq!(targets[1].url, "https://x.com/i/events/1234");
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_identity() {
        let home = HarvestConfig::default().trends.home_url;
        let driver = ScriptedDriver::new().with_markup(&home, "<html><body><nav>Home</nav></body></html>");
        assert!(harvester(&driver, config()).check_identity().await.unwrap());

        let driver = ScriptedDriver::new().with_markup(&home, LOGIN);
        assert!(!harvester(&driver, config()).check_identity().await.unwrap());
    }

    #[test]
    fn test_invalid_signature_pattern() {
        let mut config = config();
        config.signatures.login_wall = "(unclosed".to_string();
        let identity = StaticIdentity::new(Identity::anonymous(&IdentityConfig::default()));
        let result = Harvester::new(Arc::new(ScriptedDriver::new()), Box::new(identity), config);
        assert!(matches!(result, Err(HarvestError::Config(_))));
    }

    #[test]
    fn test_stop_policy_per_target() {
        let h = harvester(&ScriptedDriver::new(), config());
        assert_eq!(h.stop_policy(&Target::keyword("a")).early_stop, 40);
        assert_eq!(h.stop_policy(&Target::source("https://x.com")).early_stop, 20);
        assert_eq!(h.stop_policy(&Target::keyword("a")).hard_cap, 300);
    }

    #[test]
    fn test_harvest_serialization() {
        let harvest = Harvest {
            target: Target::keyword("#Test"),
            items: vec![],
            tried_urls: vec![LIVE.to_string()],
            candidates: vec![
                CandidateReport {
                    url: LIVE.to_string(),
                    outcome: CandidateOutcome::LoginWall,
                },
                CandidateReport {
                    url: TOP.to_string(),
                    outcome: CandidateOutcome::Accumulated {
                        found: 4,
                        added: 2,
                        attempts: 2,
                    },
                },
            ],
        };
        let json = serde_json::to_value(&harvest).unwrap();
        assert_eq!(json["target"]["kind"], "keyword");
        assert_eq!(json["candidates"][0]["outcome"], "login_wall");
        assert_eq!(json["candidates"][1]["outcome"], "accumulated");
        assert_eq!(json["candidates"][1]["attempts"], 2);
    }
}

//! Extraction cascade: ordered strategies for pulling text out of a page.
//!
//! The target markup drifts often, so cheap and specific selectors are tried
//! before broad ones. The first strategy that yields any non-blank text wins
//! outright; later strategies are not evaluated and outputs are never merged.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::driver::PageHandle;
use crate::result::{TrendLabel, TrendTarget};
use crate::{HarvestError, Result};

/// Reaction text blocks.
pub const TWEET_TEXT: &str = r#"div[data-testid="tweetText"]"#;
/// Language-annotated blocks inside article containers.
pub const ARTICLE_LANG: &str = "article div[lang]";
/// Span text nested in reaction blocks.
pub const TWEET_TEXT_SPANS: &str = r#"article [data-testid="tweetText"] span"#;
/// Explore/trending timeline container.
pub const EXPLORE_TIMELINE: &str = r#"div[aria-label="Timeline: Explore"]"#;
/// Attribute-styled label blocks inside the explore timeline.
pub const TREND_LABEL: &str = r#"div[dir="ltr"][style="color: rgb(231, 233, 234);"]"#;

/// A rule for pulling raw text snippets from a rendered page.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Returns zero or more raw snippets in document order.
    async fn extract(&self, page: &dyn PageHandle) -> Result<Vec<String>>;
}

/// Reads the inner text of live DOM elements matching a CSS selector.
#[derive(Debug, Clone)]
pub struct SelectorStrategy {
    name: String,
    css: String,
}

impl SelectorStrategy {
    pub fn new(name: impl Into<String>, css: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            css: css.into(),
        }
    }
}

#[async_trait]
impl ExtractionStrategy for SelectorStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    async fn extract(&self, page: &dyn PageHandle) -> Result<Vec<String>> {
        page.query_texts(&self.css).await
    }
}

/// Reads trend labels from the rendered explore markup.
#[derive(Debug, Clone)]
pub struct TrendLabelStrategy {
    container: String,
    label: String,
}

impl TrendLabelStrategy {
    pub fn new(container: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            label: label.into(),
        }
    }
}

impl Default for TrendLabelStrategy {
    fn default() -> Self {
        Self::new(EXPLORE_TIMELINE, TREND_LABEL)
    }
}

#[async_trait]
impl ExtractionStrategy for TrendLabelStrategy {
    fn name(&self) -> &str {
        "trend-labels"
    }

    async fn extract(&self, page: &dyn PageHandle) -> Result<Vec<String>> {
        let html = page.content().await?;
        parse_trend_labels(&html, &self.container, &self.label)
    }
}

/// An ordered list of strategies evaluated generically.
#[derive(Default)]
pub struct Cascade {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl Cascade {
    /// Creates an empty cascade.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a strategy with the lowest priority so far.
    pub fn with_strategy(mut self, strategy: impl ExtractionStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Reaction cascade: text blocks, then language blocks, then nested spans.
    pub fn reactions() -> Self {
        Self::new()
            .with_strategy(SelectorStrategy::new("tweet-text", TWEET_TEXT))
            .with_strategy(SelectorStrategy::new("article-lang", ARTICLE_LANG))
            .with_strategy(SelectorStrategy::new("tweet-text-spans", TWEET_TEXT_SPANS))
    }

    /// Trend-label cascade: a single markup strategy.
    pub fn trend_labels() -> Self {
        Self::new().with_strategy(TrendLabelStrategy::default())
    }

    /// Number of strategies.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Returns the trimmed, non-blank output of the first strategy that has
    /// any. A failing strategy counts as empty. No match is an empty vector,
    /// not an error.
    pub async fn extract(&self, page: &dyn PageHandle) -> Vec<String> {
        for strategy in &self.strategies {
            let raw = match strategy.extract(page).await {
                Ok(raw) => raw,
                Err(e) => {
                    debug!("Strategy '{}' failed: {}", strategy.name(), e);
                    continue;
                }
            };

            let texts: Vec<String> = raw
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();

            if !texts.is_empty() {
                debug!("Strategy '{}' produced {} snippets", strategy.name(), texts.len());
                return texts;
            }
        }

        debug!("No extraction strategy matched");
        Vec::new()
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| HarvestError::Parse(format!("Failed to parse selector '{}': {:?}", css, e)))
}

/// Cuts a label so it starts at its last `#`.
///
/// The explore page sometimes renders the hashtag symbol and its text twice
/// in nested spans, which concatenates to `#tag#tag`.
pub fn clean_trend_label(raw: &str) -> String {
    let label = match raw.rfind('#') {
        Some(idx) => &raw[idx..],
        None => raw,
    };
    label.trim().to_string()
}

/// Collects every descendant span's text, the way the labels are rendered.
fn span_text(element: ElementRef<'_>, span: &Selector) -> String {
    element.select(span).flat_map(|s| s.text()).collect()
}

/// Parses trend labels out of explore markup.
pub fn parse_trend_labels(html: &str, container_css: &str, label_css: &str) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let container = selector(container_css)?;
    let label = selector(label_css)?;
    let span = selector("span")?;

    let mut labels = Vec::new();
    for timeline in document.select(&container) {
        for element in timeline.select(&label) {
            let text = clean_trend_label(&span_text(element, &span));
            if !text.is_empty() {
                labels.push(text);
            }
        }
    }
    Ok(labels)
}

/// Pairs trend labels with the most specific explore link available.
///
/// Hashtag labels prefer their `/hashtag/` link, then a search link naming
/// the tag. Other labels prefer an event link, then a matching search link,
/// then the first hashtag link. Remaining links fill the list with an
/// `(unknown)` label. URLs are unique.
pub fn trend_targets(
    html: &str,
    host: &str,
    labels: &[TrendLabel],
    limit: usize,
) -> Result<Vec<TrendTarget>> {
    let document = Html::parse_document(html);
    let anchor = selector(&format!("{} a[href]", EXPLORE_TIMELINE))?;

    let host = host.trim_end_matches('/');
    let mut events = Vec::new();
    let mut hashtags = Vec::new();
    let mut searches = Vec::new();

    for element in document.select(&anchor) {
        let href = element.value().attr("href").unwrap_or_default();
        if href.is_empty() || href.starts_with('#') {
            continue;
        }
        let path = href.strip_prefix(host).unwrap_or(href);
        let absolute = if href.starts_with("http") {
            href.to_string()
        } else {
            format!("{}{}", host, href)
        };
        if path.starts_with("/i/events/") {
            events.push(absolute);
        } else if path.starts_with("/hashtag/") {
            hashtags.push(absolute);
        } else if path.starts_with("/search?") {
            searches.push(absolute);
        }
    }

    let mut targets: Vec<TrendTarget> = Vec::new();
    let mut push = |label: &str, url: Option<&String>| {
        if let Some(url) = url {
            if !targets.iter().any(|t| &t.url == url) {
                targets.push(TrendTarget::new(label, url.clone()));
            }
        }
    };

    for label in labels.iter().filter(|l| l.is_hashtag()) {
        let tag = urlencoding::encode(label.tag()).into_owned();
        let needle = format!("/hashtag/{}", tag);
        let url = hashtags
            .iter()
            .find(|u| u.contains(&needle))
            .or_else(|| searches.iter().find(|u| u.contains(&tag)));
        push(label.as_str(), url);
    }

    for label in labels.iter().filter(|l| !l.is_hashtag()) {
        let query = urlencoding::encode(label.as_str()).into_owned();
        let url = events
            .first()
            .or_else(|| searches.iter().find(|u| u.contains(&query)))
            .or_else(|| hashtags.first());
        push(label.as_str(), url);
    }

    for url in events.iter().chain(hashtags.iter()).chain(searches.iter()) {
        push("(unknown)", Some(url));
    }

    targets.truncate(limit);
    Ok(targets)
}

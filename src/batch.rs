//! Batch orchestration: many independent acquisitions, one report.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::aggregator::{Harvester, Target};
use crate::result::TrendLabel;
use crate::{HarvestError, Result};

/// Reactions gathered for one keyword of a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordReactions {
    /// 1-based position of the keyword in the batch.
    pub index: usize,
    pub keyword: String,
    pub scraped_at: DateTime<Utc>,
    pub count: usize,
    pub tried_urls: Vec<String>,
    pub reactions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Trends plus reactions for each of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendReport {
    pub scraped_at: DateTime<Utc>,
    pub total: usize,
    pub trends: Vec<KeywordReactions>,
}

impl TrendReport {
    pub fn new(trends: Vec<KeywordReactions>) -> Self {
        Self {
            scraped_at: Utc::now(),
            total: trends.len(),
            trends,
        }
    }

    /// Keywords whose acquisition failed.
    pub fn failures(&self) -> impl Iterator<Item = &KeywordReactions> {
        self.trends.iter().filter(|t| t.error.is_some())
    }
}

/// The trending labels at one point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendSnapshot {
    pub as_of: DateTime<Utc>,
    pub count: usize,
    pub keywords: Vec<TrendLabel>,
}

impl TrendSnapshot {
    pub fn new(keywords: Vec<TrendLabel>) -> Self {
        Self {
            as_of: Utc::now(),
            count: keywords.len(),
            keywords,
        }
    }
}

/// Acquires reactions for every keyword, `batch.concurrency` at a time.
///
/// Each run owns its session. Output follows input order. A keyword that
/// fails is recorded with its error; only `AutomationUnavailable` aborts the
/// batch, since no later keyword could succeed either.
pub async fn harvest_keywords<S: AsRef<str>>(
    harvester: &Harvester,
    keywords: &[S],
) -> Result<Vec<KeywordReactions>> {
    let batch = &harvester.config().batch;
    let pause = Duration::from_millis(batch.pause_ms);
    let total = keywords.len();

    stream::iter(keywords.iter().enumerate())
        .map(|(i, keyword)| {
            let keyword = keyword.as_ref().to_string();
            async move {
                info!("[{}/{}] Harvesting reactions for '{}'", i + 1, total, keyword);
                let outcome = harvester.acquire(&Target::keyword(keyword.as_str())).await;
                let entry = match outcome {
                    Ok(harvest) => {
                        info!("[{}/{}] '{}': {} reactions", i + 1, total, keyword, harvest.len());
                        KeywordReactions {
                            index: i + 1,
                            keyword,
                            scraped_at: Utc::now(),
                            count: harvest.len(),
                            reactions: harvest.texts(),
                            tried_urls: harvest.tried_urls,
                            error: None,
                        }
                    }
                    Err(e @ HarvestError::AutomationUnavailable(_)) => return Err(e),
                    Err(e) => {
                        warn!("[{}/{}] '{}' failed: {}", i + 1, total, keyword, e);
                        KeywordReactions {
                            index: i + 1,
                            keyword,
                            scraped_at: Utc::now(),
                            count: 0,
                            tried_urls: Vec::new(),
                            reactions: Vec::new(),
                            error: Some(e.to_string()),
                        }
                    }
                };
                if i + 1 < total && !pause.is_zero() {
                    tokio::time::sleep(pause).await;
                }
                Ok(entry)
            }
        })
        .buffered(batch.concurrency.max(1))
        .try_collect()
        .await
}

/// Discovers up to `limit` trends and harvests reactions for each.
pub async fn trend_report(harvester: &Harvester, limit: usize) -> Result<TrendReport> {
    let trends = harvester.discover_trends(limit).await?;
    if trends.is_empty() {
        warn!("No trends discovered");
    }
    let keywords: Vec<&str> = trends.iter().map(TrendLabel::as_str).collect();
    let reactions = harvest_keywords(harvester, &keywords).await?;
    Ok(TrendReport::new(reactions))
}

/// Writes `value` as pretty JSON, creating parent directories.
pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    info!("Saved {}", path.display());
    Ok(())
}

//! Candidate generation: one keyword, several equivalent timeline URLs.
//!
//! Priority runs from most specific to most generic: hashtag path before
//! search path, `live` ordering before `top`, localized before plain, and
//! the primary host before the fallback host.

use std::collections::HashSet;

use crate::config::CandidateConfig;
use crate::{HarvestError, Result};

const ORDERINGS: [&str; 2] = ["live", "top"];

/// Expands keywords into ordered, duplicate-free candidate URLs.
#[derive(Debug, Clone)]
pub struct CandidateGenerator {
    config: CandidateConfig,
}

impl CandidateGenerator {
    pub fn new(config: CandidateConfig) -> Self {
        Self { config }
    }

    /// Builds the candidate list for `keyword`.
    ///
    /// Every host yields its hashtag path before its search path. A plain
    /// keyword is tried as a hashtag as is. Fails with `InvalidKeyword` when
    /// nothing searchable remains after trimming.
    pub fn build(&self, keyword: &str) -> Result<Vec<String>> {
        let keyword = keyword.trim();
        let tag = match keyword.strip_prefix('#') {
            Some(tag) => tag.trim(),
            None => keyword,
        };
        if tag.is_empty() {
            return Err(HarvestError::InvalidKeyword(if keyword.is_empty() {
                "keyword is empty".to_string()
            } else {
                format!("'{}' has no text after '#'", keyword)
            }));
        }

        let hashtag = urlencoding::encode(tag).into_owned();
        let query = urlencoding::encode(keyword).into_owned();

        let mut hosts = vec![self.config.primary_host.as_str()];
        if let Some(mobile) = self.config.mobile_host.as_deref() {
            hosts.push(mobile);
        }

        let mut locales = vec![Some(self.config.locale_query.as_str())];
        if self.config.include_unlocalized || self.config.locale_query.is_empty() {
            locales.push(None);
        }

        let mut urls = Vec::new();
        for host in hosts {
            let host = host.trim_end_matches('/');
            let bases = [
                format!("{}/hashtag/{}?", host, hashtag),
                format!("{}/search?q={}&", host, query),
            ];

            for locale in &locales {
                for base in &bases {
                    for ordering in ORDERINGS {
                        urls.push(variant(base, ordering, *locale));
                    }
                }
            }
        }

        Ok(dedup_urls(urls))
    }
}

impl Default for CandidateGenerator {
    fn default() -> Self {
        Self::new(CandidateConfig::default())
    }
}

fn variant(base: &str, ordering: &str, locale: Option<&str>) -> String {
    match locale {
        Some(locale) if !locale.is_empty() => {
            format!("{}f={}&{}", base, ordering, locale.trim_start_matches('&'))
        }
        _ => format!("{}f={}", base, ordering),
    }
}

/// Repairs the `?&` artifact and drops repeats, keeping first-seen order.
pub fn dedup_urls(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter()
        .map(|u| u.replacen("?&", "?", 1))
        .filter(|u| seen.insert(u.clone()))
        .collect()
}

/// Convenience wrapper using the default hosts and locale.
pub fn build_candidates(keyword: &str) -> Result<Vec<String>> {
    CandidateGenerator::default().build(keyword)
}

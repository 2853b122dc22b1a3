//! Scripted automation driver for unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::driver::{AutomationDriver, PageHandle};
use crate::identity::Identity;
use crate::{HarvestError, Result};

/// Something a scripted page was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Visit {
    Identity(usize),
    Goto(String),
    Scroll(u32),
    Reload(String),
    Query(String),
    Content,
}

/// How a scripted navigation attempt fails.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Failure {
    Timeout,
    Connection,
}

#[derive(Default)]
struct State {
    unavailable: bool,
    /// 1-based `open_page` calls that fail with a browser error.
    open_failures: HashSet<usize>,
    identity_fails: bool,
    scroll_fails: bool,
    goto_failures: HashMap<String, VecDeque<Failure>>,
    always_fail: HashSet<String>,
    markup: HashMap<String, String>,
    texts: HashMap<(String, String), Vec<String>>,
    ready: HashMap<String, Vec<String>>,
    banner: HashMap<String, u32>,
    log: Vec<Visit>,
    open_calls: usize,
    opened: usize,
    closed: usize,
}

#[derive(Clone, Default)]
pub(crate) struct ScriptedDriver {
    state: Arc<Mutex<State>>,
}

impl ScriptedDriver {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn edit(self, f: impl FnOnce(&mut State)) -> Self {
        f(&mut self.state.lock().unwrap());
        self
    }

    pub(crate) fn unavailable(self) -> Self {
        self.edit(|s| s.unavailable = true)
    }

    /// Fails the `nth` page opened (1-based) without taking the engine down.
    pub(crate) fn fail_open(self, nth: usize) -> Self {
        self.edit(|s| {
            s.open_failures.insert(nth);
        })
    }

    pub(crate) fn fail_identity(self) -> Self {
        self.edit(|s| s.identity_fails = true)
    }

    pub(crate) fn fail_scroll(self) -> Self {
        self.edit(|s| s.scroll_fails = true)
    }

    /// Fails the next navigations to `url`, one entry per attempt.
    pub(crate) fn fail_goto(self, url: &str, failures: Vec<Failure>) -> Self {
        self.edit(|s| {
            s.goto_failures
                .insert(url.to_string(), failures.into_iter().collect());
        })
    }

    pub(crate) fn always_fail(self, url: &str) -> Self {
        self.edit(|s| {
            s.always_fail.insert(url.to_string());
        })
    }

    pub(crate) fn with_markup(self, url: &str, html: &str) -> Self {
        self.edit(|s| {
            s.markup.insert(url.to_string(), html.to_string());
        })
    }

    pub(crate) fn with_texts(self, url: &str, css: &str, texts: &[&str]) -> Self {
        self.edit(|s| {
            s.texts.insert(
                (url.to_string(), css.to_string()),
                texts.iter().map(|t| t.to_string()).collect(),
            );
        })
    }

    pub(crate) fn with_ready(self, url: &str, css: &str) -> Self {
        self.edit(|s| {
            s.ready
                .entry(url.to_string())
                .or_default()
                .push(css.to_string());
        })
    }

    /// Shows the error banner on `url` until it has been reloaded `reloads` times.
    pub(crate) fn with_banner(self, url: &str, reloads: u32) -> Self {
        self.edit(|s| {
            s.banner.insert(url.to_string(), reloads);
        })
    }

    pub(crate) fn log(&self) -> Vec<Visit> {
        self.state.lock().unwrap().log.clone()
    }

    pub(crate) fn gotos(&self) -> Vec<String> {
        self.log()
            .into_iter()
            .filter_map(|v| match v {
                Visit::Goto(url) => Some(url),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn queries(&self) -> Vec<String> {
        self.log()
            .into_iter()
            .filter_map(|v| match v {
                Visit::Query(css) => Some(css),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn opened(&self) -> usize {
        self.state.lock().unwrap().opened
    }

    pub(crate) fn closed(&self) -> usize {
        self.state.lock().unwrap().closed
    }
}

#[async_trait]
impl AutomationDriver for ScriptedDriver {
    async fn open_page(&self) -> Result<Box<dyn PageHandle>> {
        let mut state = self.state.lock().unwrap();
        if state.unavailable {
            return Err(HarvestError::AutomationUnavailable(
                "scripted engine is down".to_string(),
            ));
        }
        state.open_calls += 1;
        if state.open_failures.contains(&state.open_calls) {
            return Err(HarvestError::Browser(
                "Failed to create browser context: transient".to_string(),
            ));
        }
        state.opened += 1;
        Ok(Box::new(ScriptedPage {
            state: Arc::clone(&self.state),
            current: Mutex::new(None),
        }))
    }
}

pub(crate) struct ScriptedPage {
    state: Arc<Mutex<State>>,
    current: Mutex<Option<String>>,
}

impl ScriptedPage {
    fn current(&self) -> String {
        self.current.lock().unwrap().clone().unwrap_or_default()
    }
}

#[async_trait]
impl PageHandle for ScriptedPage {
    async fn apply_identity(&self, identity: &Identity) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.log.push(Visit::Identity(identity.cookies.len()));
        if state.identity_fails {
            return Err(HarvestError::Identity("cookie rejected by browser".to_string()));
        }
        Ok(())
    }

    async fn goto(&self, url: &str, timeout: Duration) -> Result<()> {
        let failure = {
            let mut state = self.state.lock().unwrap();
            state.log.push(Visit::Goto(url.to_string()));
            if state.always_fail.contains(url) {
                Some(Failure::Connection)
            } else {
                state
                    .goto_failures
                    .get_mut(url)
                    .and_then(|queue| queue.pop_front())
            }
        };
        match failure {
            Some(Failure::Timeout) => Err(HarvestError::NavigationTimeout(
                timeout.as_millis() as u64,
            )),
            Some(Failure::Connection) => Err(HarvestError::Browser(
                "net::ERR_CONNECTION_CLOSED".to_string(),
            )),
            None => {
                *self.current.lock().unwrap() = Some(url.to_string());
                Ok(())
            }
        }
    }

    async fn wait_for_selector(&self, css: &str) -> Result<()> {
        if self.current.lock().unwrap().is_none() {
            return Err(HarvestError::Browser("no document loaded".to_string()));
        }
        let present = {
            let state = self.state.lock().unwrap();
            state
                .ready
                .get(&self.current())
                .is_some_and(|list| list.iter().any(|c| c == css))
        };
        if present {
            Ok(())
        } else {
            futures::future::pending::<()>().await;
            Ok(())
        }
    }

    async fn scroll_by(&self, pixels: u32) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.scroll_fails {
            return Err(HarvestError::Browser("target closed".to_string()));
        }
        state.log.push(Visit::Scroll(pixels));
        Ok(())
    }

    async fn reload(&self, _timeout: Duration) -> Result<()> {
        let url = self.current();
        let mut state = self.state.lock().unwrap();
        state.log.push(Visit::Reload(url.clone()));
        if let Some(left) = state.banner.get_mut(&url) {
            *left = left.saturating_sub(1);
        }
        Ok(())
    }

    async fn query_texts(&self, css: &str) -> Result<Vec<String>> {
        let url = self.current();
        let mut state = self.state.lock().unwrap();
        state.log.push(Visit::Query(css.to_string()));
        Ok(state
            .texts
            .get(&(url, css.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn content(&self) -> Result<String> {
        let url = self.current();
        let mut state = self.state.lock().unwrap();
        state.log.push(Visit::Content);
        if state.banner.get(&url).copied().unwrap_or(0) > 0 {
            return Ok("<html><body><span>Something went wrong. Try reloading.</span></body></html>"
                .to_string());
        }
        Ok(state
            .markup
            .get(&url)
            .cloned()
            .unwrap_or_else(|| "<html><body></body></html>".to_string()))
    }

    async fn current_url(&self) -> Option<String> {
        self.current.lock().unwrap().clone()
    }

    async fn close(&self) -> Result<()> {
        self.state.lock().unwrap().closed += 1;
        Ok(())
    }
}

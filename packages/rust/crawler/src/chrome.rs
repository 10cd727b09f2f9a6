//! Headless Chrome page session for pages that render their contact block
//! with JavaScript. Enabled with the `chrome` feature.
//!
//! `headless_chrome` is synchronous; every call runs on the blocking pool.

use std::sync::Arc;
use std::time::{Duration, Instant};

use headless_chrome::{Browser, LaunchOptions, Tab};
use tracing::{debug, warn};
use url::Url;

use schoolscrape_shared::{CrawlConfig, Result, ScrapeError, WaitCondition};

use crate::session::{LoadedPage, NavigateOptions, NavigationFailure, PageError, PageSession};

/// Poll interval while waiting on a load condition.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long the resource count must stay unchanged to count as network idle.
const IDLE_WINDOW: Duration = Duration::from_millis(500);

/// [`PageSession`] that drives one tab of a headless Chrome instance.
pub struct ChromeSession {
    browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeSession {
    /// Launch a headless browser and open the tab used for the whole run.
    pub fn launch(config: &CrawlConfig) -> Result<Self> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .build()
            .map_err(|e| ScrapeError::Session(format!("invalid browser options: {e}")))?;

        let browser = Browser::new(options)
            .map_err(|e| ScrapeError::Session(format!("failed to launch browser: {e}")))?;
        let tab = browser
            .new_tab()
            .map_err(|e| ScrapeError::Session(format!("failed to open tab: {e}")))?;
        tab.set_default_timeout(config.fetch_timeout);
        tab.set_user_agent(&config.user_agent, None, None)
            .map_err(|e| ScrapeError::Session(format!("failed to set user agent: {e}")))?;

        Ok(Self { browser, tab })
    }

    async fn is_alive(&self) -> bool {
        let browser = self.browser.clone();
        tokio::task::spawn_blocking(move || browser.get_version().is_ok())
            .await
            .unwrap_or(false)
    }
}

impl PageSession for ChromeSession {
    async fn goto(
        &mut self,
        url: &Url,
        opts: &NavigateOptions,
    ) -> std::result::Result<LoadedPage, PageError> {
        debug!(%url, wait = ?opts.wait, "navigating tab");

        let tab = Arc::clone(&self.tab);
        let target = url.to_string();
        let NavigateOptions { wait, timeout } = *opts;

        let joined = tokio::task::spawn_blocking(move || {
            let deadline = Instant::now() + timeout;
            tab.set_default_timeout(timeout);
            tab.navigate_to(&target).map_err(network)?;
            tab.wait_until_navigated().map_err(network)?;
            wait_for(&tab, wait, deadline)?;
            let body = tab.get_content().map_err(network)?;
            Ok::<_, NavigationFailure>((tab.get_url(), body))
        })
        .await;

        match joined {
            Ok(Ok((final_url, body))) => {
                let final_url = Url::parse(&final_url).unwrap_or_else(|_| url.clone());
                Ok(LoadedPage::rendered(final_url, body))
            }
            Ok(Err(reason)) => {
                if !self.is_alive().await {
                    warn!(%url, error = %reason, "browser is gone");
                    return Err(PageError::SessionClosed);
                }
                Err(PageError::navigation(url, reason))
            }
            Err(e) => {
                warn!(%url, error = %e, "browser task aborted");
                Err(PageError::SessionClosed)
            }
        }
    }
}

fn network(e: impl std::fmt::Display) -> NavigationFailure {
    NavigationFailure::Network(e.to_string())
}

/// Extra readiness checks a wait condition needs once navigation finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WaitPlan {
    ready_state_complete: bool,
    network_idle: bool,
}

impl From<WaitCondition> for WaitPlan {
    fn from(wait: WaitCondition) -> Self {
        match wait {
            // `wait_until_navigated` already returns once the DOM is parsed.
            WaitCondition::DomContentLoaded => Self {
                ready_state_complete: false,
                network_idle: false,
            },
            WaitCondition::Load => Self {
                ready_state_complete: true,
                network_idle: false,
            },
            WaitCondition::NetworkIdle => Self {
                ready_state_complete: true,
                network_idle: true,
            },
        }
    }
}

fn wait_for(
    tab: &Tab,
    wait: WaitCondition,
    deadline: Instant,
) -> std::result::Result<(), NavigationFailure> {
    let plan = WaitPlan::from(wait);

    if plan.ready_state_complete {
        poll_until(deadline, || {
            Ok(eval_string(tab, "document.readyState")?.as_deref() == Some("complete"))
        })?;
    }

    if plan.network_idle {
        let mut last_count: Option<u64> = None;
        let mut stable_since = Instant::now();
        poll_until(deadline, || {
            let count = eval_u64(tab, "performance.getEntriesByType('resource').length")?;
            if count != last_count {
                last_count = count;
                stable_since = Instant::now();
            }
            Ok(stable_since.elapsed() >= IDLE_WINDOW)
        })?;
    }
    Ok(())
}

fn poll_until(
    deadline: Instant,
    mut ready: impl FnMut() -> std::result::Result<bool, NavigationFailure>,
) -> std::result::Result<(), NavigationFailure> {
    loop {
        if ready()? {
            return Ok(());
        }
        if Instant::now() + POLL_INTERVAL > deadline {
            return Err(NavigationFailure::Timeout);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

fn eval_string(tab: &Tab, expression: &str) -> std::result::Result<Option<String>, NavigationFailure> {
    let object = tab.evaluate(expression, false).map_err(network)?;
    Ok(object.value.and_then(|v| v.as_str().map(str::to_string)))
}

fn eval_u64(tab: &Tab, expression: &str) -> std::result::Result<Option<u64>, NavigationFailure> {
    let object = tab.evaluate(expression, false).map_err(network)?;
    Ok(object.value.and_then(|v| v.as_u64()))
}

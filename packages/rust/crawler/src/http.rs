//! Plain HTTP page session.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;
use url::Url;

use schoolscrape_shared::{CrawlConfig, Result, ScrapeError};

use crate::session::{LoadedPage, NavigateOptions, NavigationFailure, PageError, PageSession};

/// Redirects followed before a navigation counts as failed.
const MAX_REDIRECTS: usize = 5;

/// [`PageSession`] backed by a `reqwest` client. Serves static markup only;
/// the load condition in [`NavigateOptions`] is satisfied once the body has
/// been read.
pub struct HttpSession {
    client: Client,
}

impl HttpSession {
    /// Create a session with the configured user agent and timeout.
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(config.fetch_timeout.max(Duration::from_millis(1)))
            .build()
            .map_err(|e| ScrapeError::Session(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

impl PageSession for HttpSession {
    async fn goto(
        &mut self,
        url: &Url,
        opts: &NavigateOptions,
    ) -> std::result::Result<LoadedPage, PageError> {
        debug!(%url, "fetching page");

        let response = self
            .client
            .get(url.as_str())
            .timeout(opts.timeout)
            .send()
            .await
            .map_err(|e| PageError::navigation(url, classify(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PageError::navigation(
                url,
                NavigationFailure::Http(status.as_u16()),
            ));
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .text()
            .await
            .map_err(|e| PageError::navigation(url, classify(&e)))?;

        Ok(LoadedPage {
            url: final_url,
            status: Some(status.as_u16()),
            content_type,
            body,
        })
    }
}

fn classify(e: &reqwest::Error) -> NavigationFailure {
    if e.is_timeout() {
        NavigationFailure::Timeout
    } else {
        NavigationFailure::Network(e.to_string())
    }
}

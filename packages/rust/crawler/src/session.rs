//! The page-session capability: navigate to a URL, then read the loaded
//! document.
//!
//! A session only moves bytes. Parsing happens in [`LoadedPage::evaluate`],
//! synchronously, so the non-`Send` document never lives across an await.

use std::future::Future;
use std::time::Duration;

use url::Url;

use schoolscrape_extract::PageDocument;
use schoolscrape_shared::WaitCondition;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a navigation did not produce a page.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationFailure {
    #[error("timed out")]
    Timeout,

    #[error("HTTP {0}")]
    Http(u16),

    #[error("network error: {0}")]
    Network(String),
}

/// Per-target page failure.
///
/// `Unresolved`, `Navigation` and `Evaluation` are recovered per target.
/// `SessionClosed` means the engine itself is gone and ends the run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageError {
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: NavigationFailure },

    #[error("evaluation of {url} failed: {reason}")]
    Evaluation { url: String, reason: String },

    #[error("no contact-page URL: {reason}")]
    Unresolved { reason: String },

    #[error("page session closed")]
    SessionClosed,
}

impl PageError {
    pub fn navigation(url: &Url, reason: NavigationFailure) -> Self {
        Self::Navigation {
            url: url.to_string(),
            reason,
        }
    }

    pub fn evaluation(url: &Url, reason: impl Into<String>) -> Self {
        Self::Evaluation {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Only navigation failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Navigation { .. })
    }
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

/// Options for a single navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigateOptions {
    pub wait: WaitCondition,
    pub timeout: Duration,
}

impl Default for NavigateOptions {
    fn default() -> Self {
        Self {
            wait: WaitCondition::default(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Raw result of a successful navigation.
#[derive(Debug, Clone)]
pub struct LoadedPage {
    /// URL after redirects.
    pub url: Url,
    pub status: Option<u16>,
    pub content_type: Option<String>,
    pub body: String,
}

impl LoadedPage {
    /// A rendered HTML page with no transport metadata (browser sessions).
    pub fn rendered(url: Url, body: impl Into<String>) -> Self {
        Self {
            url,
            status: None,
            content_type: Some("text/html".into()),
            body: body.into(),
        }
    }

    /// True when the body can be parsed as a document.
    ///
    /// An html/xml content type is trusted. A binary type is rejected. Any
    /// other type (servers often send `text/plain`) falls back to sniffing
    /// the body for a leading `<`.
    pub fn is_markup(&self) -> bool {
        let sniffed = self.body.trim_start().starts_with('<');
        match &self.content_type {
            Some(ct) => {
                let ct = ct.to_ascii_lowercase();
                if ct.contains("html") || ct.contains("xml") {
                    true
                } else if is_binary_type(&ct) {
                    false
                } else {
                    sniffed
                }
            }
            None => sniffed,
        }
    }

    /// Parse the body and run `f` against it.
    pub fn evaluate<T>(&self, f: impl FnOnce(&PageDocument) -> T) -> Result<T, PageError> {
        if !self.is_markup() {
            let ct = self.content_type.as_deref().unwrap_or("unknown");
            return Err(PageError::evaluation(
                &self.url,
                format!("body is not markup (content-type {ct})"),
            ));
        }
        let doc = PageDocument::parse(&self.body, Some(self.url.clone()));
        Ok(f(&doc))
    }
}

fn is_binary_type(content_type: &str) -> bool {
    const BINARY_PREFIXES: [&str; 4] = ["image/", "audio/", "video/", "font/"];
    const BINARY_TYPES: [&str; 4] = [
        "application/pdf",
        "application/octet-stream",
        "application/zip",
        "application/msword",
    ];
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    BINARY_PREFIXES.iter().any(|p| essence.starts_with(p))
        || BINARY_TYPES.contains(&essence)
        || essence.starts_with("application/vnd.")
}

/// A page engine that can be driven one navigation at a time.
pub trait PageSession: Send {
    /// Navigate to `url` and return the loaded page.
    ///
    /// Implementations may honour `opts.timeout` themselves;
    /// [`PacedSession`](crate::PacedSession) also bounds every call with it.
    fn goto(
        &mut self,
        url: &Url,
        opts: &NavigateOptions,
    ) -> impl Future<Output = Result<LoadedPage, PageError>> + Send;
}

impl<S: PageSession> PageSession for &mut S {
    fn goto(
        &mut self,
        url: &Url,
        opts: &NavigateOptions,
    ) -> impl Future<Output = Result<LoadedPage, PageError>> + Send {
        (**self).goto(url, opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://www.gscs.ca/BET").unwrap()
    }

    #[test]
    fn evaluate_parses_markup() {
        let page = LoadedPage::rendered(url(), "<p class='phone'>306-555-0100</p>");
        let text = page.evaluate(|doc| doc.full_text()).unwrap();
        assert_eq!(text, "306-555-0100");
    }

    #[test]
    fn evaluate_rejects_non_markup() {
        let page = LoadedPage {
            url: url(),
            status: Some(200),
            content_type: Some("application/pdf".into()),
            body: "%PDF-1.7".into(),
        };
        let err = page.evaluate(|doc| doc.full_text()).unwrap_err();
        assert!(matches!(err, PageError::Evaluation { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn markup_sniffed_without_content_type() {
        let mut page = LoadedPage::rendered(url(), "  <html></html>");
        page.content_type = None;
        assert!(page.is_markup());
        page.body = "{\"json\": true}".into();
        assert!(!page.is_markup());
    }

    #[test]
    fn html_served_as_plain_text_is_markup() {
        let mut page = LoadedPage::rendered(url(), "<html><p class='phone'>306-555-0100</p></html>");
        page.content_type = Some("text/plain; charset=utf-8".into());
        assert!(page.is_markup());
        assert_eq!(page.evaluate(|doc| doc.full_text()).unwrap(), "306-555-0100");

        page.body = "just words".into();
        assert!(!page.is_markup());
    }

    #[test]
    fn binary_types_are_never_markup() {
        let mut page = LoadedPage::rendered(url(), "<svg-looking bytes>");
        for ct in ["application/pdf", "image/png", "application/octet-stream"] {
            page.content_type = Some(ct.into());
            assert!(!page.is_markup(), "{ct}");
        }
    }

    #[test]
    fn error_display() {
        let err = PageError::navigation(&url(), NavigationFailure::Http(404));
        assert_eq!(err.to_string(), "navigation to https://www.gscs.ca/BET failed: HTTP 404");
        assert!(err.is_retryable());
        assert!(!PageError::SessionClosed.is_retryable());
        let unresolved = PageError::Unresolved {
            reason: "empty slug".into(),
        };
        assert_eq!(unresolved.to_string(), "no contact-page URL: empty slug");
        assert!(!unresolved.is_retryable());
    }
}

//! Page sessions and the sequential crawl orchestrator.
//!
//! This crate provides:
//! - [`PageSession`]: the navigation capability, with [`HttpSession`] and
//!   (feature `chrome`) `ChromeSession` implementations
//! - [`PacedSession`]: politeness interval plus per-fetch timeout
//! - [`UrlResolver`]: target → contact-page URL
//! - [`Orchestrator`]: one record per target, failures isolated per target

#[cfg(feature = "chrome")]
pub mod chrome;
pub mod engine;
pub mod http;
pub mod pacing;
pub mod resolve;
pub mod session;

#[cfg(feature = "chrome")]
pub use chrome::ChromeSession;
pub use engine::{
    CrawlOutput, CrawlProgress, Orchestrator, SilentCrawlProgress, TargetOutcome, TargetState,
};
pub use http::HttpSession;
pub use pacing::{PacedSession, Pacer};
pub use resolve::UrlResolver;
pub use session::{LoadedPage, NavigateOptions, NavigationFailure, PageError, PageSession};

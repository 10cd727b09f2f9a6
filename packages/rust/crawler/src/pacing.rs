//! Politeness gap between the end of one fetch and the start of the next,
//! and the per-fetch timeout that applies once a fetch has started.

use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;
use url::Url;

use crate::session::{LoadedPage, NavigateOptions, NavigationFailure, PageError, PageSession};

/// Enforces a minimum idle gap between the end of one fetch and the start
/// of the next.
///
/// The first call never waits. Pacing is a hard floor: retries and
/// contact-page hops pass through the same pacer, and a slow or failed fetch
/// still restarts the interval when it ends.
#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    last_finished: Option<Instant>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_finished: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sleep until the next fetch may start.
    pub async fn wait(&self) {
        if let Some(last) = self.last_finished {
            let due = last + self.interval;
            let now = Instant::now();
            if due > now {
                trace!(wait_ms = (due - now).as_millis() as u64, "pacing");
                tokio::time::sleep_until(due).await;
            }
        }
    }

    /// Mark the current fetch finished, whatever its outcome.
    pub fn finish(&mut self) {
        self.last_finished = Some(Instant::now());
    }
}

/// A [`PageSession`] whose every navigation waits for its [`Pacer`] and is
/// then bounded by `opts.timeout`. Time spent pacing does not count toward
/// the timeout.
pub struct PacedSession<S> {
    inner: S,
    pacer: Pacer,
}

impl<S: PageSession> PacedSession<S> {
    pub fn new(inner: S, interval: Duration) -> Self {
        Self {
            inner,
            pacer: Pacer::new(interval),
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: PageSession> PageSession for PacedSession<S> {
    async fn goto(&mut self, url: &Url, opts: &NavigateOptions) -> Result<LoadedPage, PageError> {
        self.pacer.wait().await;
        let result = match tokio::time::timeout(opts.timeout, self.inner.goto(url, opts)).await {
            Ok(result) => result,
            Err(_) => Err(PageError::navigation(url, NavigationFailure::Timeout)),
        };
        self.pacer.finish();
        result
    }
}

//! Sequential, paced crawl over a population's targets.
//!
//! Targets are visited one at a time in seed order. Every target produces
//! exactly one record; a page failure degrades that record's contact fields
//! to empty strings and the run continues. Only a closed page session ends
//! the run early.

use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};
use url::Url;

use schoolscrape_extract::ExtractionPlan;
use schoolscrape_normalize::{classify_language, classify_type};
use schoolscrape_shared::{
    CrawlConfig, ExtractedFields, LanguageScheme, PopulationConfig, Record, Result, ScrapeError,
    Target, TargetId,
};

use crate::pacing::PacedSession;
use crate::resolve::UrlResolver;
use crate::session::{LoadedPage, NavigateOptions, PageError, PageSession};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Per-target lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    Pending,
    ResolvingUrl,
    Fetching,
    Extracting,
    Done,
    Skipped,
}

/// What happened to one target.
#[derive(Debug, Clone)]
pub struct TargetOutcome {
    pub id: TargetId,
    pub name: String,
    /// Resolved institution page; `None` when no URL could be built.
    pub url: Option<Url>,
    /// `Done` or `Skipped`.
    pub state: TargetState,
    /// Navigation attempts, including retries and the contact-page hop.
    pub attempts: u32,
    /// Why the target was skipped.
    pub error: Option<PageError>,
    pub elapsed: Duration,
}

impl TargetOutcome {
    pub fn is_done(&self) -> bool {
        self.state == TargetState::Done
    }
}

/// Result of a completed crawl.
#[derive(Debug, Clone)]
pub struct CrawlOutput {
    /// One record per target, in seed order.
    pub records: Vec<Record>,
    /// One outcome per target, in seed order.
    pub outcomes: Vec<TargetOutcome>,
    pub duration: Duration,
}

impl CrawlOutput {
    pub fn done_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_done()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes.len() - self.done_count()
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for per-target crawl events.
pub trait CrawlProgress: Send + Sync {
    /// Called before a target's first navigation. `index` is 1-based.
    fn target_started(&self, index: usize, total: usize, target: &Target);
    /// Called once a target is done or skipped.
    fn target_finished(&self, index: usize, total: usize, outcome: &TargetOutcome);
}

/// No-op crawl progress.
pub struct SilentCrawlProgress;

impl CrawlProgress for SilentCrawlProgress {
    fn target_started(&self, _index: usize, _total: usize, _target: &Target) {}
    fn target_finished(&self, _index: usize, _total: usize, _outcome: &TargetOutcome) {}
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

struct ResolvedTarget {
    target: Target,
    /// The resolved URL, or why resolution failed.
    url: std::result::Result<Url, String>,
}

/// Drives a [`PageSession`] across every target of one population.
pub struct Orchestrator {
    config: CrawlConfig,
    plan: ExtractionPlan,
    category: String,
    scheme: LanguageScheme,
    targets: Vec<ResolvedTarget>,
}

impl Orchestrator {
    /// Resolve every target's URL up front. A target without a usable URL
    /// still produces a record; it is skipped when the crawl reaches it.
    pub fn new(
        config: CrawlConfig,
        plan: ExtractionPlan,
        population: &PopulationConfig,
        targets: Vec<Target>,
    ) -> Self {
        let resolver = UrlResolver::for_population(population);
        let targets = targets
            .into_iter()
            .map(|target| {
                let url = resolver.resolve(&target).map_err(|e| {
                    warn!(target = %target.display_name, error = %e, "target has no URL");
                    e.to_string()
                });
                ResolvedTarget { target, url }
            })
            .collect();

        Self {
            config,
            plan,
            category: population.category.clone(),
            scheme: population.language_scheme,
            targets,
        }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// `(target, url)` pairs in crawl order; `None` for unresolvable targets.
    pub fn targets(&self) -> impl Iterator<Item = (&Target, Option<&Url>)> {
        self.targets.iter().map(|t| (&t.target, t.url.as_ref().ok()))
    }

    /// Crawl every target without progress reporting.
    pub async fn run<S: PageSession>(&self, session: &mut S) -> Result<CrawlOutput> {
        self.run_with_progress(session, &SilentCrawlProgress).await
    }

    /// Crawl every target in order.
    ///
    /// Returns `Err` only when the page session closes; every other page
    /// failure is recorded in that target's [`TargetOutcome`].
    #[instrument(skip_all, fields(targets = self.targets.len()))]
    pub async fn run_with_progress<S: PageSession>(
        &self,
        session: &mut S,
        progress: &dyn CrawlProgress,
    ) -> Result<CrawlOutput> {
        let start = Instant::now();
        let total = self.targets.len();
        let mut paced = PacedSession::new(session, self.config.pacing);
        let mut records = Vec::with_capacity(total);
        let mut outcomes = Vec::with_capacity(total);

        info!(
            pacing_ms = self.config.pacing.as_millis() as u64,
            timeout_ms = self.config.fetch_timeout.as_millis() as u64,
            max_attempts = self.config.max_attempts,
            "starting crawl"
        );

        for (i, resolved) in self.targets.iter().enumerate() {
            progress.target_started(i + 1, total, &resolved.target);
            let (record, outcome) = self.crawl_target(&mut paced, resolved).await?;
            progress.target_finished(i + 1, total, &outcome);
            records.push(record);
            outcomes.push(outcome);
        }

        let output = CrawlOutput {
            records,
            outcomes,
            duration: start.elapsed(),
        };

        info!(
            done = output.done_count(),
            skipped = output.skipped_count(),
            duration_ms = output.duration.as_millis() as u64,
            "crawl completed"
        );

        Ok(output)
    }

    async fn crawl_target<S: PageSession>(
        &self,
        session: &mut S,
        resolved: &ResolvedTarget,
    ) -> Result<(Record, TargetOutcome)> {
        let start = Instant::now();
        let target = &resolved.target;
        let mut outcome = TargetOutcome {
            id: target.id.clone(),
            name: target.display_name.clone(),
            url: resolved.url.as_ref().ok().cloned(),
            state: TargetState::Pending,
            attempts: 0,
            error: None,
            elapsed: Duration::ZERO,
        };
        let mut record = self.base_record(target, outcome.url.as_ref());

        // URLs were resolved in `new`; the state is kept for the log trail.
        transition(&mut outcome, TargetState::ResolvingUrl);
        let url = match &resolved.url {
            Ok(url) => url,
            Err(reason) => {
                outcome.error = Some(PageError::Unresolved {
                    reason: reason.clone(),
                });
                transition(&mut outcome, TargetState::Skipped);
                outcome.elapsed = start.elapsed();
                return Ok((record, outcome));
            }
        };
        transition(&mut outcome, TargetState::Fetching);

        let result = match self.fetch(session, url, &mut outcome.attempts).await {
            Ok(page) => {
                transition(&mut outcome, TargetState::Extracting);
                self.extract(session, page, url, &mut outcome.attempts).await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok((fields, source)) => {
                record.address = fields.address;
                record.phone = fields.phone;
                record.email = fields.email;
                record.url = source.to_string();
                transition(&mut outcome, TargetState::Done);
            }
            Err(PageError::SessionClosed) => {
                return Err(ScrapeError::Session(format!(
                    "page session closed while crawling '{}'",
                    target.display_name
                )));
            }
            Err(e) => {
                warn!(
                    target = %target.display_name,
                    %url,
                    error = %e,
                    "target skipped"
                );
                outcome.error = Some(e);
                transition(&mut outcome, TargetState::Skipped);
            }
        }

        outcome.elapsed = start.elapsed();
        Ok((record, outcome))
    }

    /// Extract from the institution page, then from its contact page when one
    /// is linked. Returns the fields and the URL they came from.
    async fn extract<S: PageSession>(
        &self,
        session: &mut S,
        page: LoadedPage,
        url: &Url,
        attempts: &mut u32,
    ) -> std::result::Result<(ExtractedFields, Url), PageError> {
        let texts = &self.config.contact_link_texts;
        let (fields, link) = page.evaluate(|doc| (self.plan.extract(doc), doc.find_link(texts)))?;

        let Some(link) = link.filter(|l| l != url && *l != page.url) else {
            return Ok((fields, url.clone()));
        };

        debug!(%url, contact = %link, "following contact link");
        let hop = match self.fetch(session, &link, attempts).await {
            Ok(contact) => contact.evaluate(|doc| self.plan.extract(doc)),
            Err(e) => Err(e),
        };

        match hop {
            Ok(mut contact_fields) => {
                contact_fields.fill_missing_from(&fields);
                Ok((contact_fields, link))
            }
            Err(PageError::SessionClosed) => Err(PageError::SessionClosed),
            Err(e) => {
                debug!(%url, contact = %link, error = %e, "contact page failed, using institution page");
                Ok((fields, url.clone()))
            }
        }
    }

    /// Navigate with retry. Only navigation failures are retried; the wait
    /// before attempt `n + 1` is `backoff * 2^(n - 1)`.
    async fn fetch<S: PageSession>(
        &self,
        session: &mut S,
        url: &Url,
        attempts: &mut u32,
    ) -> std::result::Result<LoadedPage, PageError> {
        let opts = NavigateOptions {
            wait: self.config.wait,
            timeout: self.config.fetch_timeout,
        };
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            *attempts += 1;
            match session.goto(url, &opts).await {
                Ok(page) => {
                    if !self.config.settle.is_zero() {
                        tokio::time::sleep(self.config.settle).await;
                    }
                    return Ok(page);
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let backoff = self
                        .config
                        .backoff
                        .saturating_mul(2u32.saturating_pow(attempt - 1));
                    debug!(
                        %url,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "navigation failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Record with classification filled in and contact fields empty.
    fn base_record(&self, target: &Target, url: Option<&Url>) -> Record {
        let name = &target.display_name;
        Record {
            name: name.clone(),
            kind: classify_type(name).label().to_string(),
            category: self.category.clone(),
            french_status: classify_language(name, target.decoration_markers, self.scheme)
                .label()
                .to_string(),
            url: url.map(Url::to_string).unwrap_or_default(),
            ..Default::default()
        }
    }
}

fn transition(outcome: &mut TargetOutcome, next: TargetState) {
    debug!(target = %outcome.name, from = ?outcome.state, to = ?next, "target state");
    outcome.state = next;
}

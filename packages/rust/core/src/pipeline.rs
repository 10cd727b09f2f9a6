//! End-to-end scrape pipeline: prior dataset → targets → crawl → merge → write.

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use schoolscrape_crawler::{
    CrawlProgress, HttpSession, Orchestrator, PageSession, TargetOutcome,
};
use schoolscrape_dataset::{
    CsvSink, JsonSink, MergeStats, RecordSink, load_prior, merge, partition_targets,
};
use schoolscrape_extract::ExtractionPlan;
use schoolscrape_normalize::targets_from_population;
use schoolscrape_shared::{
    AppConfig, CrawlConfig, ExtractionConfig, PopulationConfig, Result, ScrapeError, Schema, Target,
};

/// Configuration for one [`run_scrape`].
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// The population to crawl.
    pub population: PopulationConfig,
    /// Crawl pacing, timeouts, retries.
    pub crawl: CrawlConfig,
    /// Per-field strategy overrides.
    pub extraction: ExtractionConfig,
    /// Output column order.
    pub schema: Schema,
    /// Directory for the output files.
    pub output_dir: PathBuf,
    /// Output file stem (`<stem>.csv`, `<stem>.json`).
    pub stem: String,
    /// Prior dataset to merge against.
    pub prior: PathBuf,
    /// Crawl only targets missing from the prior dataset.
    pub only_new: bool,
    pub write_csv: bool,
    pub write_json: bool,
}

impl ScrapeConfig {
    /// Validate `config` and resolve the run settings for one population.
    pub fn from_app(config: &AppConfig, population: Option<&str>) -> Result<Self> {
        config.validate()?;
        let population = config.select_population(population)?.clone();

        let output = &config.output;
        if !output.write_csv && !output.write_json {
            return Err(ScrapeError::config(
                "output.write_csv and output.write_json are both disabled",
            ));
        }

        let output_dir = PathBuf::from(&output.dir);
        let stem = output.stem.clone().unwrap_or_else(|| population.name.clone());
        let prior = match &output.prior {
            Some(path) => PathBuf::from(path),
            None => output_dir.join(format!("{stem}.json")),
        };

        Ok(Self {
            population,
            crawl: CrawlConfig::from(config),
            extraction: config.extraction.clone(),
            schema: config.schema(),
            output_dir,
            stem,
            prior,
            only_new: output.only_new,
            write_csv: output.write_csv,
            write_json: output.write_json,
        })
    }

    pub fn csv_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.csv", self.stem))
    }

    pub fn json_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.json", self.stem))
    }
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub population: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Targets in the population.
    pub targets: usize,
    /// Targets crawled this run (fewer than `targets` with `only_new`).
    pub crawled: usize,
    /// Crawled targets whose page loaded.
    pub done: usize,
    /// Skipped targets with the reason (name, error).
    pub skipped: Vec<(String, String)>,
    pub merge: MergeStats,
    /// Records in the written dataset.
    pub records: usize,
    /// Files written.
    pub outputs: Vec<PathBuf>,
    pub elapsed: std::time::Duration,
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before a target is fetched.
    fn target_started(&self, name: &str, current: usize, total: usize);
    /// Called when a target is done or skipped.
    fn target_finished(&self, outcome: &TargetOutcome, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn target_started(&self, _name: &str, _current: usize, _total: usize) {}
    fn target_finished(&self, _outcome: &TargetOutcome, _current: usize, _total: usize) {}
    fn done(&self, _report: &RunReport) {}
}

/// Adapts a `ProgressReporter` to the `CrawlProgress` interface.
struct PipelineCrawlProgress<'a> {
    inner: &'a dyn ProgressReporter,
}

impl CrawlProgress for PipelineCrawlProgress<'_> {
    fn target_started(&self, index: usize, total: usize, target: &Target) {
        self.inner.target_started(&target.display_name, index, total);
    }

    fn target_finished(&self, index: usize, total: usize, outcome: &TargetOutcome) {
        self.inner.target_finished(outcome, index, total);
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run the pipeline over a plain HTTP session.
pub async fn run_scrape_http(
    config: &ScrapeConfig,
    progress: &dyn ProgressReporter,
) -> Result<RunReport> {
    let mut session = HttpSession::new(&config.crawl)?;
    run_scrape(config, &mut session, progress).await
}

/// Run the pipeline over a headless browser session.
#[cfg(feature = "chrome")]
pub async fn run_scrape_chrome(
    config: &ScrapeConfig,
    progress: &dyn ProgressReporter,
) -> Result<RunReport> {
    let crawl = config.crawl.clone();
    let mut session = tokio::task::spawn_blocking(move || {
        schoolscrape_crawler::ChromeSession::launch(&crawl)
    })
    .await
    .map_err(|e| ScrapeError::Session(format!("browser launch aborted: {e}")))??;
    run_scrape(config, &mut session, progress).await
}

/// Run the full pipeline.
///
/// 1. Load the prior dataset
/// 2. Build targets, optionally keeping only new ones
/// 3. Crawl
/// 4. Merge against the prior dataset
/// 5. Write CSV and JSON
#[instrument(skip_all, fields(population = %config.population.name))]
pub async fn run_scrape<S: PageSession>(
    config: &ScrapeConfig,
    session: &mut S,
    progress: &dyn ProgressReporter,
) -> Result<RunReport> {
    let start = Instant::now();
    let started_at = Utc::now();

    // --- Phase 1: Prior dataset ---
    progress.phase("Loading prior dataset");
    let prior = load_prior(&config.prior, &config.schema)?;

    // --- Phase 2: Targets ---
    progress.phase("Resolving targets");
    let targets = targets_from_population(&config.population)?;
    let total_targets = targets.len();
    let to_crawl = if config.only_new {
        let (new, existing) = partition_targets(&prior, targets);
        info!(new = new.len(), existing = existing.len(), "crawling new targets only");
        new
    } else {
        targets
    };

    let plan = ExtractionPlan::from_config(&config.extraction);
    let orchestrator = Orchestrator::new(config.crawl.clone(), plan, &config.population, to_crawl);

    // --- Phase 3: Crawl ---
    progress.phase("Crawling contact pages");
    let crawl_progress = PipelineCrawlProgress { inner: progress };
    let output = orchestrator.run_with_progress(session, &crawl_progress).await?;

    // --- Phase 4: Merge ---
    progress.phase("Merging with prior dataset");
    let (dataset, merge_stats) = merge(&prior, &output.records);

    // --- Phase 5: Write ---
    progress.phase("Writing dataset");
    let mut sinks: Vec<Box<dyn RecordSink>> = Vec::new();
    if config.write_csv {
        sinks.push(Box::new(CsvSink::new(config.csv_path())));
    }
    if config.write_json {
        sinks.push(Box::new(JsonSink::new(config.json_path())));
    }
    let mut outputs = Vec::with_capacity(sinks.len());
    for sink in &sinks {
        sink.write(&dataset, &config.schema)?;
        outputs.push(sink.path().to_path_buf());
    }

    let report = RunReport {
        population: config.population.name.clone(),
        started_at,
        finished_at: Utc::now(),
        targets: total_targets,
        crawled: output.outcomes.len(),
        done: output.done_count(),
        skipped: output
            .outcomes
            .iter()
            .filter(|o| !o.is_done())
            .map(|o| {
                let reason = o.error.as_ref().map(|e| e.to_string()).unwrap_or_default();
                (o.name.clone(), reason)
            })
            .collect(),
        merge: merge_stats,
        records: dataset.len(),
        outputs,
        elapsed: start.elapsed(),
    };

    info!(
        crawled = report.crawled,
        done = report.done,
        skipped = report.skipped.len(),
        records = report.records,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "scrape completed"
    );

    progress.done(&report);
    Ok(report)
}

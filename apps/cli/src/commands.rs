//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use schoolscrape_core::{ProgressReporter, RunReport, ScrapeConfig, TargetOutcome};
use schoolscrape_shared::{
    AppConfig, config_file_path, init_config, load_config, load_config_from,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// SchoolScrape: collect institution contact records into a dataset.
#[derive(Parser)]
#[command(
    name = "schoolscrape",
    version,
    about = "Scrape institution contact pages into a deduplicated CSV/JSON dataset.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ./schoolscrape.toml, then ~/.schoolscrape/schoolscrape.toml).
    #[arg(long, global = true, env = "SCHOOLSCRAPE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Population to scrape (defaults to the configured or first population).
    #[arg(short, long, global = true)]
    pub population: Option<String>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Scrape only targets missing from the prior dataset.
    #[arg(long)]
    pub only_new: bool,

    /// Output directory (overrides output.dir).
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Render pages with headless Chrome instead of plain HTTP.
    #[cfg(feature = "chrome")]
    #[arg(long)]
    pub browser: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands. Without one, a full scrape runs.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Print every target of the population with its resolved URL.
    Targets,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init {
        /// Overwrite an existing config file.
        #[arg(long)]
        force: bool,
    },
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "schoolscrape=info",
        1 => "schoolscrape=debug",
        _ => "schoolscrape=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        None => cmd_scrape(&cli).await,
        Some(Command::Targets) => cmd_targets(&cli),
        Some(Command::Config { action }) => match action {
            ConfigAction::Init { force } => cmd_config_init(*force),
            ConfigAction::Show => cmd_config_show(&cli),
        },
    }
}

fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

fn scrape_config(cli: &Cli) -> Result<ScrapeConfig> {
    let mut app = resolve_config(cli)?;
    if cli.only_new {
        app.output.only_new = true;
    }
    if let Some(out) = &cli.out {
        app.output.dir = out.to_string_lossy().into_owned();
    }
    Ok(ScrapeConfig::from_app(&app, cli.population.as_deref())?)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_scrape(cli: &Cli) -> Result<()> {
    let config = scrape_config(cli)?;

    info!(
        population = %config.population.name,
        targets = config.population.targets.len(),
        prior = %config.prior.display(),
        only_new = config.only_new,
        "starting scrape"
    );

    let reporter = CliProgress::new();

    #[cfg(feature = "chrome")]
    let report = if cli.browser {
        schoolscrape_core::run_scrape_chrome(&config, &reporter).await?
    } else {
        schoolscrape_core::run_scrape_http(&config, &reporter).await?
    };
    #[cfg(not(feature = "chrome"))]
    let report = schoolscrape_core::run_scrape_http(&config, &reporter).await?;

    print_summary(&report);
    Ok(())
}

fn print_summary(report: &RunReport) {
    println!();
    println!("  Scrape complete: {}", report.population);
    println!("  Started:  {}", report.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Targets:  {} ({} crawled)", report.targets, report.crawled);
    println!("  Found:    {}", report.done);
    println!("  Skipped:  {}", report.skipped.len());
    println!(
        "  Merge:    {} added, {} updated, {} retained",
        report.merge.added, report.merge.updated, report.merge.retained
    );
    println!("  Records:  {}", report.records);
    for path in &report.outputs {
        println!("  Wrote:    {}", path.display());
    }
    println!("  Time:     {:.1}s", report.elapsed.as_secs_f64());

    if !report.skipped.is_empty() {
        println!();
        println!("  Skipped targets:");
        for (name, reason) in &report.skipped {
            println!("    - {name}: {reason}");
        }
    }
    println!();
}

fn cmd_targets(cli: &Cli) -> Result<()> {
    let config = scrape_config(cli)?;
    let targets = schoolscrape_normalize::targets_from_population(&config.population)?;
    let resolver = schoolscrape_crawler::UrlResolver::for_population(&config.population);

    for target in &targets {
        match resolver.resolve(target) {
            Ok(url) => println!("{:<48} {url}", target.display_name),
            Err(e) => println!("{:<48} (skipped: {e})", target.display_name),
        }
    }
    println!();
    println!(
        "  {} targets in '{}', fetched {} ms apart",
        targets.len(),
        config.population.name,
        config.crawl.pacing.as_millis()
    );
    Ok(())
}

fn cmd_config_init(force: bool) -> Result<()> {
    let path = config_file_path()?;
    if path.exists() && !force {
        return Err(eyre!(
            "config already exists at '{}' (use --force to overwrite)",
            path.display()
        ));
    }
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(cli: &Cli) -> Result<()> {
    let config = resolve_config(cli)?;
    config.validate()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn target_started(&self, name: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Fetching [{current}/{total}] {name}"));
    }

    fn target_finished(&self, outcome: &TargetOutcome, current: usize, total: usize) {
        if !outcome.is_done() {
            self.spinner
                .println(format!("  skipped [{current}/{total}] {}", outcome.name));
        }
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}

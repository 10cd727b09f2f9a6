//! Application configuration for SchoolScrape.
//!
//! Config is looked up at `./schoolscrape.toml`, then
//! `~/.schoolscrape/schoolscrape.toml`. CLI flags override config file values,
//! which override defaults. The default population is embedded from
//! `seeds/gscs-catholic.toml`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScrapeError};
use crate::types::{LanguageScheme, Schema, WaitCondition};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "schoolscrape.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".schoolscrape";

/// Placeholder substituted with the slug or override code in URL templates.
pub const SLUG_PLACEHOLDER: &str = "{slug}";

/// Seed list shipped with the binary.
const DEFAULT_SEEDS: &str = include_str!("../seeds/gscs-catholic.toml");

// ---------------------------------------------------------------------------
// Config structs (matching schoolscrape.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Population to run when none is given on the command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population: Option<String>,

    /// Crawl pacing, timeouts and retries.
    #[serde(default)]
    pub crawl: CrawlSection,

    /// Output location and merge behaviour.
    #[serde(default)]
    pub output: OutputConfig,

    /// Column override for both output formats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,

    /// Per-field strategy overrides.
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Seed populations.
    #[serde(default = "default_populations")]
    pub populations: Vec<PopulationConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            population: None,
            crawl: CrawlSection::default(),
            output: OutputConfig::default(),
            schema: None,
            extraction: ExtractionConfig::default(),
            populations: default_populations(),
        }
    }
}

/// `[crawl]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSection {
    /// Minimum ms between the start of two consecutive fetches.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,

    /// Per-fetch timeout in ms.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Extra wait after a page loads, for script-rendered content.
    #[serde(default)]
    pub settle_ms: u64,

    /// Navigation attempts per page (1 = no retry).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base backoff between attempts, doubled on every retry.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Load condition passed to the page session.
    #[serde(default)]
    pub wait: WaitCondition,

    /// User-Agent for the HTTP session.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Link texts that identify a "Contact Us" sub-page. Empty disables the hop.
    #[serde(default)]
    pub contact_link_texts: Vec<String>,
}

impl Default for CrawlSection {
    fn default() -> Self {
        Self {
            pacing_ms: default_pacing_ms(),
            timeout_ms: default_timeout_ms(),
            settle_ms: 0,
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            wait: WaitCondition::default(),
            user_agent: default_user_agent(),
            contact_link_texts: Vec::new(),
        }
    }
}

fn default_pacing_ms() -> u64 {
    3000
}
fn default_timeout_ms() -> u64 {
    30_000
}
fn default_max_attempts() -> u32 {
    2
}
fn default_backoff_ms() -> u64 {
    1000
}
fn default_user_agent() -> String {
    concat!("SchoolScrape/", env!("CARGO_PKG_VERSION")).into()
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory the dataset files are written to.
    #[serde(default = "default_output_dir")]
    pub dir: String,

    /// File stem for `<stem>.csv` / `<stem>.json`. Defaults to the population name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stem: Option<String>,

    /// Prior dataset path. Defaults to `<dir>/<stem>.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior: Option<String>,

    /// Only scrape targets missing from the prior dataset.
    #[serde(default)]
    pub only_new: bool,

    #[serde(default = "default_true")]
    pub write_csv: bool,

    #[serde(default = "default_true")]
    pub write_json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            stem: None,
            prior: None,
            only_new: false,
            write_csv: true,
            write_json: true,
        }
    }
}

fn default_output_dir() -> String {
    ".".into()
}
fn default_true() -> bool {
    true
}

/// Text post-processing applied to a strategy's raw match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PostProcess {
    /// Trim and collapse whitespace.
    #[default]
    Collapse,
    /// Keep only characters that belong in a phone number.
    Phone,
    /// Strip `mailto:`, lowercase, keep the first address-looking token.
    Email,
}

/// One configured extraction strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StrategySpec {
    /// Text of the first element matching a CSS selector.
    Selector {
        selector: String,
        #[serde(default)]
        post: PostProcess,
    },
    /// Attribute of the first element matching a CSS selector.
    Attribute {
        selector: String,
        attribute: String,
        #[serde(default)]
        text_fallback: bool,
        #[serde(default)]
        post: PostProcess,
    },
    /// Microdata `itemprop` lookup (`content` attribute, then text).
    Itemprop {
        name: String,
        #[serde(default)]
        post: PostProcess,
    },
    /// Regex over the visible page text.
    Regex {
        pattern: String,
        #[serde(default)]
        post: PostProcess,
    },
    /// Text following a literal label such as `Phone:`.
    Label {
        label: String,
        #[serde(default)]
        post: PostProcess,
    },
}

/// `[extraction]` section. `None` keeps the built-in chain for that field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Vec<StrategySpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<Vec<StrategySpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Vec<StrategySpec>>,
}

/// A seed entry: a bare name, or a table with an explicit id and URL override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeedEntry {
    Name(String),
    Detailed {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
}

impl SeedEntry {
    /// Raw seed name, decoration included.
    pub fn raw_name(&self) -> &str {
        match self {
            SeedEntry::Name(name) | SeedEntry::Detailed { name, .. } => name,
        }
    }
}

/// `[[populations]]` entry: one seed list and its site conventions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Population name, also the default output stem.
    pub name: String,
    /// Category written to every record (e.g. "Catholic").
    pub category: String,
    /// Contact-page URL template containing `{slug}`.
    pub url_template: String,
    /// How language-program status is derived.
    #[serde(default)]
    pub language_scheme: LanguageScheme,
    /// Seed targets, in output order.
    pub targets: Vec<SeedEntry>,
    /// URL codes or absolute URLs keyed by target id.
    #[serde(default)]
    pub overrides: BTreeMap<String, String>,
}

fn default_populations() -> Vec<PopulationConfig> {
    // Checked by the `embedded_seeds_parse` test.
    vec![toml::from_str(DEFAULT_SEEDS).expect("embedded seed file is valid")]
}

// ---------------------------------------------------------------------------
// Crawl config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime crawl configuration.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Hard floor between the start of two consecutive fetches.
    pub pacing: Duration,
    /// Bound on a single navigation.
    pub fetch_timeout: Duration,
    /// Wait after a successful navigation.
    pub settle: Duration,
    /// Navigation attempts per page, at least 1.
    pub max_attempts: u32,
    /// Base retry backoff.
    pub backoff: Duration,
    pub wait: WaitCondition,
    pub user_agent: String,
    pub contact_link_texts: Vec<String>,
}

impl From<&AppConfig> for CrawlConfig {
    fn from(config: &AppConfig) -> Self {
        let crawl = &config.crawl;
        Self {
            pacing: Duration::from_millis(crawl.pacing_ms),
            fetch_timeout: Duration::from_millis(crawl.timeout_ms),
            settle: Duration::from_millis(crawl.settle_ms),
            max_attempts: crawl.max_attempts.max(1),
            backoff: Duration::from_millis(crawl.backoff_ms),
            wait: crawl.wait,
            user_agent: crawl.user_agent.clone(),
            contact_link_texts: crawl.contact_link_texts.clone(),
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Validation & selection
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Check populations and crawl settings for mistakes that would otherwise
    /// surface halfway through a run.
    pub fn validate(&self) -> Result<()> {
        if self.populations.is_empty() {
            return Err(ScrapeError::config("no populations configured"));
        }

        let mut seen = std::collections::HashSet::new();
        for population in &self.populations {
            if !seen.insert(population.name.as_str()) {
                return Err(ScrapeError::config(format!(
                    "duplicate population name '{}'",
                    population.name
                )));
            }
            population.validate()?;
        }

        if self.crawl.max_attempts == 0 {
            return Err(ScrapeError::config("crawl.max_attempts must be at least 1"));
        }
        if let Some(schema) = &self.schema {
            if schema.columns().is_empty() {
                return Err(ScrapeError::config("schema must have at least one column"));
            }
        }

        if let Some(name) = &self.population {
            self.select_population(Some(name))?;
        }
        Ok(())
    }

    /// Pick a population by name, falling back to the configured default,
    /// then to the first population.
    pub fn select_population(&self, name: Option<&str>) -> Result<&PopulationConfig> {
        match name.or(self.population.as_deref()) {
            Some(name) => self
                .populations
                .iter()
                .find(|p| p.name == name)
                .ok_or_else(|| ScrapeError::config(format!("population '{name}' not found"))),
            None => self
                .populations
                .first()
                .ok_or_else(|| ScrapeError::config("no populations configured")),
        }
    }

    /// Output schema, configured or default.
    pub fn schema(&self) -> Schema {
        self.schema.clone().unwrap_or_default()
    }
}

impl PopulationConfig {
    fn validate(&self) -> Result<()> {
        if !self.url_template.contains(SLUG_PLACEHOLDER) {
            return Err(ScrapeError::config(format!(
                "population '{}': url_template must contain {SLUG_PLACEHOLDER}",
                self.name
            )));
        }
        let sample = self.url_template.replace(SLUG_PLACEHOLDER, "sample");
        url::Url::parse(&sample).map_err(|e| {
            ScrapeError::config(format!(
                "population '{}': invalid url_template '{}': {e}",
                self.name, self.url_template
            ))
        })?;
        if self.targets.is_empty() {
            return Err(ScrapeError::config(format!(
                "population '{}' has no targets",
                self.name
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.schoolscrape/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ScrapeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the user config file (`~/.schoolscrape/schoolscrape.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config. Tries `./schoolscrape.toml`, then the user
/// config file, and returns defaults if neither exists.
pub fn load_config() -> Result<AppConfig> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return load_config_from(&local);
    }

    let path = config_file_path()?;
    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ScrapeError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| ScrapeError::config(format!("failed to parse {}: {e}", path.display())))?;
    tracing::debug!(?path, populations = config.populations.len(), "config loaded");
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ScrapeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ScrapeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ScrapeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_seeds_parse() {
        let populations = default_populations();
        assert_eq!(populations.len(), 1);
        let gscs = &populations[0];
        assert_eq!(gscs.category, "Catholic");
        assert_eq!(gscs.language_scheme, LanguageScheme::NameKeywords);
        assert!(gscs.targets.len() > 40);
        assert_eq!(
            gscs.overrides.get("Bethlehem Catholic High School").map(String::as_str),
            Some("BET")
        );
    }

    #[test]
    fn default_config_validates() {
        AppConfig::default().validate().expect("defaults are valid");
    }

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("pacing_ms"));
        assert!(toml_str.contains("url_template"));

        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.crawl.pacing_ms, 3000);
        assert_eq!(parsed.populations[0].name, config.populations[0].name);
    }

    #[test]
    fn crawl_config_from_app_config() {
        let crawl = CrawlConfig::from(&AppConfig::default());
        assert_eq!(crawl.pacing, Duration::from_secs(3));
        assert_eq!(crawl.fetch_timeout, Duration::from_secs(30));
        assert_eq!(crawl.max_attempts, 2);
        assert!(crawl.contact_link_texts.is_empty());
    }

    #[test]
    fn config_with_custom_population() {
        let toml_str = r#"
population = "public"

[crawl]
pacing_ms = 1000
contact_link_texts = ["Contact Us"]

[[extraction.phone]]
kind = "itemprop"
name = "telephone"
post = "phone"

[[extraction.phone]]
kind = "label"
label = "Tel:"

[[populations]]
name = "public"
category = "Public"
url_template = "https://schools.example.org/{slug}"
language_scheme = "asterisks"
targets = ["Alpha School*", { name = "Beta School", id = "beta", url = "https://beta.example.org/contact" }]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        config.validate().expect("valid");
        assert_eq!(config.crawl.pacing_ms, 1000);
        assert_eq!(config.crawl.timeout_ms, 30_000);

        let phone = config.extraction.phone.as_ref().expect("phone plan");
        assert_eq!(
            phone[0],
            StrategySpec::Itemprop {
                name: "telephone".into(),
                post: PostProcess::Phone
            }
        );

        let population = config.select_population(None).expect("select");
        assert_eq!(population.language_scheme, LanguageScheme::Asterisks);
        assert_eq!(population.targets[0], SeedEntry::Name("Alpha School*".into()));
        assert!(matches!(
            &population.targets[1],
            SeedEntry::Detailed { id: Some(id), .. } if id == "beta"
        ));
    }

    #[test]
    fn template_without_placeholder_is_rejected() {
        let mut config = AppConfig::default();
        config.populations[0].url_template = "https://www.gscs.ca/".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("{slug}"));
    }

    #[test]
    fn unknown_population_is_rejected() {
        let config = AppConfig::default();
        let err = config.select_population(Some("nope")).unwrap_err();
        assert!(err.to_string().contains("'nope' not found"));
    }
}

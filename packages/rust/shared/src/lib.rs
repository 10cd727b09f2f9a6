//! Shared types, error model, and configuration for SchoolScrape.
//!
//! This crate is the foundation depended on by all other SchoolScrape crates.
//! It provides:
//! - [`ScrapeError`]: the unified fatal error type
//! - Domain types ([`Target`], [`ExtractedFields`], [`Record`], [`Schema`])
//! - Configuration ([`AppConfig`], [`CrawlConfig`], [`PopulationConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CrawlConfig, CrawlSection, ExtractionConfig, OutputConfig, PopulationConfig,
    PostProcess, SLUG_PLACEHOLDER, SeedEntry, StrategySpec, config_dir, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{Result, ScrapeError};
pub use types::{
    Column, ExtractedFields, FieldKey, LanguageScheme, Record, Schema, Target, TargetId,
    WaitCondition,
};

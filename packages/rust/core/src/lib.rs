//! Core pipeline orchestration for SchoolScrape.
//!
//! This crate ties together target resolution, crawling, extraction and
//! dataset reconciliation into one end-to-end run (`run_scrape`).

pub mod pipeline;

pub use pipeline::{
    ProgressReporter, RunReport, ScrapeConfig, SilentProgress, run_scrape, run_scrape_http,
};

#[cfg(feature = "chrome")]
pub use pipeline::run_scrape_chrome;

pub use schoolscrape_crawler::{TargetOutcome, TargetState};

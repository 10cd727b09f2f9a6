//! SchoolScrape CLI: institution contact-page scraper.
//!
//! Crawls every target of a configured population, extracts address, phone
//! and email, and merges the results into a CSV/JSON dataset.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}

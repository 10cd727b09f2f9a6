//! Dataset reconciliation and output.
//!
//! This crate provides:
//! - [`load_prior`] / [`partition_targets`]: read the previous run's output
//! - [`merge`]: fold fresh records into it without losing curated values
//! - [`RecordSink`]: [`CsvSink`] and [`JsonSink`] writers

pub mod merge;
pub mod prior;
pub mod writer;

pub use merge::{MergeStats, merge};
pub use prior::{load_prior, partition_targets};
pub use writer::{CsvSink, JsonSink, RecordSink};

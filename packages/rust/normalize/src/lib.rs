//! Name normalization and classification for SchoolScrape.
//!
//! - [`slugify`] / [`clean_name`]: canonical URL segment and display name
//! - [`classify_type`] / [`classify_language`]: fixed taxonomies
//! - [`targets_from_population`]: seed list to immutable targets

mod classify;
mod slug;
mod targets;

pub use classify::{InstitutionType, LanguageStatus, classify_language, classify_type};
pub use slug::{clean_name, decoration_markers, slugify};
pub use targets::targets_from_population;

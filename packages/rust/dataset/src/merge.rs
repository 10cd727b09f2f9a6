//! Merge freshly scraped records into the prior dataset.

use std::collections::HashMap;

use tracing::{debug, info};

use schoolscrape_shared::{FieldKey, Record};

/// Counts from one [`merge`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Fresh records with no prior counterpart.
    pub added: usize,
    /// Prior records a fresh record was merged into.
    pub updated: usize,
    /// Prior records no fresh record touched.
    pub retained: usize,
}

/// Merge `fresh` into `prior` and return the output dataset.
///
/// Output order is the prior order (duplicate keys collapsed into their
/// first occurrence) followed by new records in fresh order. For scraped
/// fields a non-empty fresh value wins; for curated fields a non-empty prior
/// value wins. `prior` itself is left untouched.
pub fn merge(prior: &[Record], fresh: &[Record]) -> (Vec<Record>, MergeStats) {
    let mut output: Vec<Record> = Vec::with_capacity(prior.len() + fresh.len());
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut touched: Vec<bool> = Vec::new();

    for record in prior {
        let key = record.key();
        match index.get(&key) {
            Some(&slot) => {
                debug!(name = %record.name, "collapsing duplicate prior record");
                absorb(&mut output[slot], record);
            }
            None => {
                index.insert(key, output.len());
                output.push(record.clone());
                touched.push(false);
            }
        }
    }

    let mut stats = MergeStats::default();
    for record in fresh {
        let key = record.key();
        match index.get(&key) {
            Some(&slot) => {
                merge_fields(&mut output[slot], record);
                if slot < touched.len() && !touched[slot] {
                    touched[slot] = true;
                    stats.updated += 1;
                }
            }
            None => {
                index.insert(key, output.len());
                output.push(record.clone());
                stats.added += 1;
            }
        }
    }
    stats.retained = touched.iter().filter(|t| !**t).count();

    info!(
        added = stats.added,
        updated = stats.updated,
        retained = stats.retained,
        total = output.len(),
        "merged dataset"
    );
    (output, stats)
}

/// Apply a fresh record to its existing counterpart. The name is the match
/// key and keeps the existing spelling.
fn merge_fields(existing: &mut Record, fresh: &Record) {
    for key in FieldKey::ALL {
        if key == FieldKey::Name {
            continue;
        }
        let incoming = fresh.get(key);
        let current = existing.get_mut(key);
        if key.is_curated() {
            if current.is_empty() && !incoming.is_empty() {
                *current = incoming.to_string();
            }
        } else if !incoming.is_empty() {
            *current = incoming.to_string();
        }
    }
}

/// Fill gaps in the first occurrence of a duplicate from a later one.
fn absorb(first: &mut Record, duplicate: &Record) {
    for key in FieldKey::ALL {
        let current = first.get_mut(key);
        if current.is_empty() {
            *current = duplicate.get(key).to_string();
        }
    }
}

//! Seed list → [`Target`] conversion.

use std::collections::HashSet;

use schoolscrape_shared::{PopulationConfig, Result, ScrapeError, SeedEntry, Target, TargetId};

use crate::slug::{clean_name, decoration_markers};

/// Build the immutable target list for a population, in seed order.
///
/// The id defaults to the cleaned display name; an inline `url` wins over an
/// entry in the population's `overrides` table.
pub fn targets_from_population(population: &PopulationConfig) -> Result<Vec<Target>> {
    let mut seen = HashSet::new();
    let mut targets = Vec::with_capacity(population.targets.len());

    for entry in &population.targets {
        let raw = entry.raw_name();
        let display_name = clean_name(raw);
        if display_name.is_empty() {
            return Err(ScrapeError::validation(format!(
                "population '{}' has a seed entry with an empty name",
                population.name
            )));
        }

        let (id, inline_url) = match entry {
            SeedEntry::Name(_) => (display_name.clone(), None),
            SeedEntry::Detailed { id, url, .. } => (
                id.clone().unwrap_or_else(|| display_name.clone()),
                url.clone(),
            ),
        };

        if !seen.insert(id.clone()) {
            return Err(ScrapeError::validation(format!(
                "population '{}' has duplicate target id '{id}'",
                population.name
            )));
        }

        let url_override = inline_url.or_else(|| population.overrides.get(&id).cloned());

        targets.push(Target {
            id: TargetId(id),
            display_name,
            decoration_markers: decoration_markers(raw),
            url_override,
        });
    }

    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use schoolscrape_shared::LanguageScheme;

    fn population(targets: Vec<SeedEntry>) -> PopulationConfig {
        PopulationConfig {
            name: "test".into(),
            category: "Public".into(),
            url_template: "https://schools.example.org/{slug}".into(),
            language_scheme: LanguageScheme::Asterisks,
            targets,
            overrides: [("Brunskill School".to_string(), "BRU".to_string())].into(),
        }
    }

    #[test]
    fn seeds_become_targets_in_order() {
        let pop = population(vec![
            SeedEntry::Name("Brunskill School*".into()),
            SeedEntry::Name("Caswell School".into()),
            SeedEntry::Detailed {
                name: "Alvin Buckwold School**".into(),
                id: Some("alvin".into()),
                url: Some("https://alvin.example.org/contact".into()),
            },
        ]);
        let targets = targets_from_population(&pop).expect("targets");

        assert_eq!(targets.len(), 3);
        assert_eq!(targets[0].display_name, "Brunskill School");
        assert_eq!(targets[0].decoration_markers, 1);
        assert_eq!(targets[0].url_override.as_deref(), Some("BRU"));

        assert_eq!(targets[1].id, TargetId("Caswell School".into()));
        assert_eq!(targets[1].url_override, None);

        assert_eq!(targets[2].id, TargetId("alvin".into()));
        assert_eq!(targets[2].decoration_markers, 2);
        assert_eq!(
            targets[2].url_override.as_deref(),
            Some("https://alvin.example.org/contact")
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let pop = population(vec![
            SeedEntry::Name("Caswell School".into()),
            SeedEntry::Name("Caswell School*".into()),
        ]);
        let err = targets_from_population(&pop).unwrap_err();
        assert!(err.to_string().contains("duplicate target id"));
    }

    #[test]
    fn empty_names_are_rejected() {
        let pop = population(vec![SeedEntry::Name(" ** ".into())]);
        assert!(targets_from_population(&pop).is_err());
    }
}

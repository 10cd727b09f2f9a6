//! Target → contact-page URL.

use url::Url;

use schoolscrape_normalize::slugify;
use schoolscrape_shared::{PopulationConfig, Result, SLUG_PLACEHOLDER, ScrapeError, Target};

/// Resolves targets against one population's URL template.
#[derive(Debug, Clone)]
pub struct UrlResolver {
    template: String,
}

impl UrlResolver {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn for_population(population: &PopulationConfig) -> Self {
        Self::new(population.url_template.clone())
    }

    /// Resolve one target.
    ///
    /// An override that is an absolute `http(s)` URL is used as is; any other
    /// override is a site code substituted for the placeholder. Without an
    /// override the slugified display name is substituted.
    pub fn resolve(&self, target: &Target) -> Result<Url> {
        let segment = match target.url_override.as_deref().map(str::trim) {
            Some(value) if is_absolute(value) => {
                return Url::parse(value).map_err(|e| {
                    ScrapeError::config(format!(
                        "target '{}': invalid override URL '{value}': {e}",
                        target.id
                    ))
                });
            }
            Some(code) if !code.is_empty() => code.to_string(),
            _ => slugify(&target.display_name),
        };

        if segment.is_empty() {
            return Err(ScrapeError::config(format!(
                "target '{}' has an empty slug; add an override",
                target.id
            )));
        }

        let raw = self.template.replace(SLUG_PLACEHOLDER, &segment);
        Url::parse(&raw).map_err(|e| {
            ScrapeError::config(format!(
                "target '{}': template produced invalid URL '{raw}': {e}",
                target.id
            ))
        })
    }
}

fn is_absolute(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use schoolscrape_shared::TargetId;

    fn target(name: &str, url_override: Option<&str>) -> Target {
        Target {
            id: TargetId(name.into()),
            display_name: name.into(),
            decoration_markers: 0,
            url_override: url_override.map(str::to_string),
        }
    }

    fn resolver() -> UrlResolver {
        UrlResolver::new("https://www.gscs.ca/{slug}")
    }

    #[test]
    fn slug_substituted_into_template() {
        let url = resolver().resolve(&target("École St. Gerard School", None)).unwrap();
        assert_eq!(url.as_str(), "https://www.gscs.ca/stgerard");
    }

    #[test]
    fn code_override_takes_priority() {
        let url = resolver()
            .resolve(&target("Bethlehem Catholic High School", Some("BET")))
            .unwrap();
        assert_eq!(url.as_str(), "https://www.gscs.ca/BET");
    }

    #[test]
    fn absolute_override_used_verbatim() {
        let url = resolver()
            .resolve(&target("St. Anne School", Some("https://stanne.example.org/contact")))
            .unwrap();
        assert_eq!(url.as_str(), "https://stanne.example.org/contact");
    }

    #[test]
    fn empty_slug_is_a_config_error() {
        let err = resolver().resolve(&target("High School", None)).unwrap_err();
        assert!(matches!(err, ScrapeError::Config { .. }));
    }

    #[test]
    fn blank_override_falls_back_to_slug() {
        let url = resolver().resolve(&target("Caswell School", Some("  "))).unwrap();
        assert_eq!(url.as_str(), "https://www.gscs.ca/caswell");
    }
}

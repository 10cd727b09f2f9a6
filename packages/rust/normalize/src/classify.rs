//! Rule-table classification of institutions by name.
//!
//! Rules are case-insensitive substring tests evaluated in precedence order;
//! the first rule that matches wins.

use schoolscrape_shared::LanguageScheme;

/// Institution type derived from the display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstitutionType {
    HighSchool,
    Online,
    SpecialProgram,
    Elementary,
}

impl InstitutionType {
    pub fn label(self) -> &'static str {
        match self {
            InstitutionType::HighSchool => "High School",
            InstitutionType::Online => "Online",
            InstitutionType::SpecialProgram => "Special Program",
            InstitutionType::Elementary => "Elementary",
        }
    }
}

impl std::fmt::Display for InstitutionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Language-program status. The first three come from name keywords, the
/// last three from asterisk markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageStatus {
    FrenchImmersion,
    Bilingual,
    English,
    EnglishOnly,
    EnglishAndFrench,
    FrenchImmersionOnly,
}

impl LanguageStatus {
    pub fn label(self) -> &'static str {
        match self {
            LanguageStatus::FrenchImmersion => "French Immersion",
            LanguageStatus::Bilingual => "Bilingual",
            LanguageStatus::English => "English",
            LanguageStatus::EnglishOnly => "English only",
            LanguageStatus::EnglishAndFrench => "English and French available",
            LanguageStatus::FrenchImmersionOnly => "French Immersion only",
        }
    }
}

impl std::fmt::Display for LanguageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

const TYPE_RULES: &[(&str, InstitutionType)] = &[
    ("high", InstitutionType::HighSchool),
    ("cyber", InstitutionType::Online),
    ("international", InstitutionType::SpecialProgram),
];

const LANGUAGE_RULES: &[(&str, LanguageStatus)] = &[
    ("french", LanguageStatus::FrenchImmersion),
    ("bilingual", LanguageStatus::Bilingual),
];

/// Classify an institution type; Elementary when no rule matches.
pub fn classify_type(name: &str) -> InstitutionType {
    first_match(name, TYPE_RULES).unwrap_or(InstitutionType::Elementary)
}

/// Classify language-program status with the population's scheme.
pub fn classify_language(name: &str, markers: usize, scheme: LanguageScheme) -> LanguageStatus {
    match scheme {
        LanguageScheme::NameKeywords => {
            first_match(name, LANGUAGE_RULES).unwrap_or(LanguageStatus::English)
        }
        LanguageScheme::Asterisks => match markers {
            0 => LanguageStatus::EnglishOnly,
            1 => LanguageStatus::EnglishAndFrench,
            _ => LanguageStatus::FrenchImmersionOnly,
        },
    }
}

fn first_match<T: Copy>(name: &str, rules: &[(&str, T)]) -> Option<T> {
    let lower = name.to_lowercase();
    rules
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|(_, value)| *value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_precedence() {
        assert_eq!(classify_type("Holy Cross High School"), InstitutionType::HighSchool);
        assert_eq!(classify_type("Cyber School"), InstitutionType::Online);
        assert_eq!(
            classify_type("International Student Program"),
            InstitutionType::SpecialProgram
        );
        assert_eq!(classify_type("St. Anne School"), InstitutionType::Elementary);
        // "high" outranks "international".
        assert_eq!(
            classify_type("International High Academy"),
            InstitutionType::HighSchool
        );
        assert_eq!(classify_type("CYBER HIGH"), InstitutionType::HighSchool);
    }

    #[test]
    fn language_by_name_keywords() {
        let scheme = LanguageScheme::NameKeywords;
        assert_eq!(
            classify_language("St. Peter French Immersion School", 0, scheme),
            LanguageStatus::FrenchImmersion
        );
        // Matching is on the English keyword only.
        assert_eq!(
            classify_language("École française de Saskatoon", 0, scheme),
            LanguageStatus::English
        );
        assert_eq!(
            classify_language("Bishop Filevich Ukrainian Bilingual School", 0, scheme),
            LanguageStatus::Bilingual
        );
        assert_eq!(
            classify_language("St. Anne School", 2, scheme),
            LanguageStatus::English
        );
    }

    #[test]
    fn language_by_asterisks() {
        let scheme = LanguageScheme::Asterisks;
        assert_eq!(classify_language("A School", 0, scheme).label(), "English only");
        assert_eq!(
            classify_language("A School", 1, scheme).label(),
            "English and French available"
        );
        assert_eq!(
            classify_language("A School", 2, scheme).label(),
            "French Immersion only"
        );
        assert_eq!(
            classify_language("French School", 5, scheme),
            LanguageStatus::FrenchImmersionOnly
        );
        // Name keywords are ignored under this scheme.
        assert_eq!(
            classify_language("Bilingual School", 0, scheme),
            LanguageStatus::EnglishOnly
        );
    }
}

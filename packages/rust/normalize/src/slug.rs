//! Name canonicalization.
//!
//! Each pass is a function `&str -> String` applied in a fixed order; later
//! passes assume the shape left by earlier ones.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Turn an institution's display name into a URL-safe segment.
///
/// `"École St. Gerard School"` becomes `"stgerard"`.
pub fn slugify(name: &str) -> String {
    let mut result: String = name.nfc().collect();

    result = strip_language_prefix(&result);
    result = remove_generic_words(&result);
    result = remove_whitespace(&result);
    result = strip_diacritics(&result);
    result = keep_alphanumeric(&result);

    result.to_lowercase()
}

/// Strip trailing decoration markers (asterisks) and surrounding whitespace.
pub fn clean_name(raw: &str) -> String {
    raw.trim().trim_end_matches('*').trim_end().to_string()
}

/// Count the trailing asterisks on a raw seed name.
pub fn decoration_markers(raw: &str) -> usize {
    raw.trim_end()
        .chars()
        .rev()
        .take_while(|c| *c == '*')
        .count()
}

/// Remove a leading "École"/"Ecole", anchored at the start only.
fn strip_language_prefix(name: &str) -> String {
    static PREFIX_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)^(?:école|ecole)").expect("valid regex"));

    PREFIX_RE.replace(name, "").into_owned()
}

/// Remove generic institution-type words anywhere, without word boundaries.
fn remove_generic_words(name: &str) -> String {
    static GENERIC_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)school|community|collegiate|elementary|high|centre|center")
            .expect("valid regex")
    });

    GENERIC_RE.replace_all(name, "").into_owned()
}

fn remove_whitespace(name: &str) -> String {
    name.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Decompose and drop combining diacritical marks (U+0300–U+036F).
fn strip_diacritics(name: &str) -> String {
    name.nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .collect()
}

fn keep_alphanumeric(name: &str) -> String {
    name.chars().filter(char::is_ascii_alphanumeric).collect()
}

/// True when the string contains combining marks (i.e. is not fully composed).
#[cfg(test)]
fn has_combining_marks(s: &str) -> bool {
    s.chars().any(unicode_normalization::char::is_combining_mark)
}

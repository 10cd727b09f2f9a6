//! Extraction strategies.
//!
//! Every strategy implements [`ExtractionStrategy`]; a field is extracted by
//! walking an ordered list of them (see [`extract_field`]). A strategy that
//! errors is treated as a miss so the rest of the chain still runs.

use std::sync::LazyLock;

use regex::Regex;
use scraper::Selector;
use tracing::{debug, trace};

use schoolscrape_shared::{PostProcess, StrategySpec};

use crate::document::{PageDocument, collapse_whitespace, element_text};

/// Why a single strategy could not run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StrategyError {
    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// One technique for pulling a field value out of a document.
pub trait ExtractionStrategy: Send + Sync {
    /// Raw match, before post-processing. `Ok(None)` is a plain miss.
    fn try_extract(&self, doc: &PageDocument) -> Result<Option<String>, StrategyError>;

    /// Post-process applied to the raw match.
    fn post_process(&self) -> PostProcess;

    /// Short description for tracing.
    fn describe(&self) -> String;
}

/// Walk `strategies` in priority order and return the first non-empty value.
/// Returns an empty string when every strategy misses.
pub fn extract_field(doc: &PageDocument, strategies: &[Box<dyn ExtractionStrategy>]) -> String {
    for strategy in strategies {
        match strategy.try_extract(doc) {
            Ok(Some(raw)) => {
                let value = apply_post_process(strategy.post_process(), &raw);
                if !value.is_empty() {
                    trace!(strategy = %strategy.describe(), %value, "strategy matched");
                    return value;
                }
            }
            Ok(None) => {}
            Err(e) => {
                debug!(strategy = %strategy.describe(), error = %e, "strategy failed, trying next");
            }
        }
    }
    String::new()
}

/// Build a boxed strategy from its configuration form.
pub fn strategy_from_spec(spec: &StrategySpec) -> Box<dyn ExtractionStrategy> {
    match spec {
        StrategySpec::Selector { selector, post } => {
            Box::new(SelectorLookup::new(selector.clone()).with_post(*post))
        }
        StrategySpec::Attribute {
            selector,
            attribute,
            text_fallback,
            post,
        } => Box::new(AttributeLookup {
            selector: selector.clone(),
            attribute: attribute.clone(),
            text_fallback: *text_fallback,
            post: *post,
        }),
        StrategySpec::Itemprop { name, post } => {
            Box::new(AttributeLookup::itemprop(name).with_post(*post))
        }
        StrategySpec::Regex { pattern, post } => {
            Box::new(RegexScan::new(pattern.clone()).with_post(*post))
        }
        StrategySpec::Label { label, post } => {
            Box::new(LabeledTextScan::new(label.clone()).with_post(*post))
        }
    }
}

// ---------------------------------------------------------------------------
// SelectorLookup
// ---------------------------------------------------------------------------

/// Text of the first element matching a CSS selector that has any text.
#[derive(Debug, Clone)]
pub struct SelectorLookup {
    pub selector: String,
    pub post: PostProcess,
}

impl SelectorLookup {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            post: PostProcess::Collapse,
        }
    }

    pub fn with_post(mut self, post: PostProcess) -> Self {
        self.post = post;
        self
    }
}

impl ExtractionStrategy for SelectorLookup {
    fn try_extract(&self, doc: &PageDocument) -> Result<Option<String>, StrategyError> {
        let sel = parse_selector(&self.selector)?;
        Ok(doc
            .html()
            .select(&sel)
            .map(|el| element_text(&el))
            .find(|text| !text.is_empty()))
    }

    fn post_process(&self) -> PostProcess {
        self.post
    }

    fn describe(&self) -> String {
        format!("selector({})", self.selector)
    }
}

// ---------------------------------------------------------------------------
// AttributeLookup
// ---------------------------------------------------------------------------

/// Attribute value of the first matching element, optionally falling back to
/// the element's text.
#[derive(Debug, Clone)]
pub struct AttributeLookup {
    pub selector: String,
    pub attribute: String,
    pub text_fallback: bool,
    pub post: PostProcess,
}

impl AttributeLookup {
    pub fn new(selector: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            attribute: attribute.into(),
            text_fallback: false,
            post: PostProcess::Collapse,
        }
    }

    /// Microdata lookup: `[itemprop='<name>']`, `content` attribute, then text.
    pub fn itemprop(name: &str) -> Self {
        Self {
            selector: format!("[itemprop='{name}']"),
            attribute: "content".into(),
            text_fallback: true,
            post: PostProcess::Collapse,
        }
    }

    pub fn with_post(mut self, post: PostProcess) -> Self {
        self.post = post;
        self
    }
}

impl ExtractionStrategy for AttributeLookup {
    fn try_extract(&self, doc: &PageDocument) -> Result<Option<String>, StrategyError> {
        let sel = parse_selector(&self.selector)?;
        Ok(doc.html().select(&sel).find_map(|el| {
            let attr = el
                .value()
                .attr(&self.attribute)
                .map(collapse_whitespace)
                .filter(|v| !v.is_empty());
            match attr {
                Some(value) => Some(value),
                None if self.text_fallback => Some(element_text(&el)).filter(|t| !t.is_empty()),
                None => None,
            }
        }))
    }

    fn post_process(&self) -> PostProcess {
        self.post
    }

    fn describe(&self) -> String {
        format!("attribute({} @{})", self.selector, self.attribute)
    }
}

// ---------------------------------------------------------------------------
// RegexScan
// ---------------------------------------------------------------------------

/// First regex match over the visible page text (capture group 1 if present).
#[derive(Debug, Clone)]
pub struct RegexScan {
    pub pattern: String,
    pub post: PostProcess,
}

impl RegexScan {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            post: PostProcess::Collapse,
        }
    }

    pub fn with_post(mut self, post: PostProcess) -> Self {
        self.post = post;
        self
    }
}

impl ExtractionStrategy for RegexScan {
    fn try_extract(&self, doc: &PageDocument) -> Result<Option<String>, StrategyError> {
        let re = Regex::new(&self.pattern).map_err(|e| StrategyError::InvalidPattern {
            pattern: self.pattern.clone(),
            reason: e.to_string(),
        })?;
        let text = doc.full_text();
        Ok(re.captures(&text).and_then(|caps| {
            caps.get(1)
                .or_else(|| caps.get(0))
                .map(|m| m.as_str().to_string())
        }))
    }

    fn post_process(&self) -> PostProcess {
        self.post
    }

    fn describe(&self) -> String {
        format!("regex({})", self.pattern)
    }
}

// ---------------------------------------------------------------------------
// LabeledTextScan
// ---------------------------------------------------------------------------

/// Text following a literal label such as `Phone:`.
///
/// The value is the rest of the label's line, or the next line when the
/// label stands alone (`<strong>Phone:</strong> 306-…`).
#[derive(Debug, Clone)]
pub struct LabeledTextScan {
    pub label: String,
    pub post: PostProcess,
}

impl LabeledTextScan {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            post: PostProcess::Collapse,
        }
    }

    pub fn with_post(mut self, post: PostProcess) -> Self {
        self.post = post;
        self
    }
}

impl ExtractionStrategy for LabeledTextScan {
    fn try_extract(&self, doc: &PageDocument) -> Result<Option<String>, StrategyError> {
        let pattern = format!("(?i){}", regex::escape(self.label.trim()));
        let re = Regex::new(&pattern).map_err(|e| StrategyError::InvalidPattern {
            pattern: self.label.clone(),
            reason: e.to_string(),
        })?;

        let lines = doc.text_lines();
        for (i, line) in lines.iter().enumerate() {
            let Some(m) = re.find(line) else {
                continue;
            };
            let rest = line[m.end()..].trim();
            let candidate = if !rest.is_empty() {
                rest
            } else {
                match lines.get(i + 1) {
                    Some(next) if !starts_with_label(next) => next.as_str(),
                    _ => continue,
                }
            };
            // A hit the post-process would discard does not end the scan.
            if !apply_post_process(self.post, candidate).is_empty() {
                return Ok(Some(candidate.to_string()));
            }
        }
        Ok(None)
    }

    fn post_process(&self) -> PostProcess {
        self.post
    }

    fn describe(&self) -> String {
        format!("label({})", self.label)
    }
}

/// True for lines such as `Fax: 306-…` or a bare `Email:`.
fn starts_with_label(line: &str) -> bool {
    static LABEL_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^\p{L}[\p{L} .'/-]{0,29}:").expect("valid regex"));

    LABEL_RE.is_match(line.trim_start())
}

// ---------------------------------------------------------------------------
// Post-processing
// ---------------------------------------------------------------------------

/// Apply a post-process to a raw match. The result is trimmed and collapsed.
pub fn apply_post_process(post: PostProcess, raw: &str) -> String {
    static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\+?\(?\d[\d\s().-]{5,}\d(?:\s*(?:ext\.?|x)\s*\d+)?").expect("valid regex")
    });
    static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid regex")
    });

    let collapsed = collapse_whitespace(raw);
    match post {
        PostProcess::Collapse => collapsed,
        PostProcess::Phone => PHONE_RE
            .find(&collapsed)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default(),
        PostProcess::Email => {
            let stripped = collapsed
                .strip_prefix("mailto:")
                .unwrap_or(&collapsed)
                .split('?')
                .next()
                .unwrap_or_default();
            EMAIL_RE
                .find(stripped)
                .map(|m| m.as_str().to_lowercase())
                .unwrap_or_default()
        }
    }
}

fn parse_selector(selector: &str) -> Result<Selector, StrategyError> {
    Selector::parse(selector).map_err(|e| StrategyError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(html: &str) -> PageDocument {
        PageDocument::parse(html, None)
    }

    #[test]
    fn selector_lookup_skips_empty_matches() {
        let d = doc(r#"<div class="phone"> </div><div class="phone">306-555-0100</div>"#);
        let s = SelectorLookup::new(".phone");
        assert_eq!(s.try_extract(&d).unwrap().as_deref(), Some("306-555-0100"));
    }

    #[test]
    fn malformed_selector_is_an_error_not_a_panic() {
        let d = doc("<p>x</p>");
        let err = SelectorLookup::new("div[[").try_extract(&d).unwrap_err();
        assert!(matches!(err, StrategyError::InvalidSelector { .. }));
    }

    #[test]
    fn itemprop_prefers_content_attribute() {
        let d = doc(
            r#"<meta itemprop="telephone" content="+1 306 555 0111">
               <span itemprop="email">office@example.org</span>"#,
        );
        let phone = AttributeLookup::itemprop("telephone");
        assert_eq!(phone.try_extract(&d).unwrap().as_deref(), Some("+1 306 555 0111"));
        let email = AttributeLookup::itemprop("email");
        assert_eq!(email.try_extract(&d).unwrap().as_deref(), Some("office@example.org"));
    }

    #[test]
    fn attribute_without_fallback_ignores_text() {
        let d = doc(r#"<a class="mail">office@example.org</a>"#);
        let s = AttributeLookup::new("a.mail", "href");
        assert_eq!(s.try_extract(&d).unwrap(), None);
    }

    #[test]
    fn regex_scan_uses_first_group() {
        let d = doc("<p>Office hours 8-4. Call 306.555.0123 today.</p>");
        let s = RegexScan::new(r"Call ([\d.]+)");
        assert_eq!(s.try_extract(&d).unwrap().as_deref(), Some("306.555.0123"));

        let bad = RegexScan::new("(unclosed");
        assert!(matches!(
            bad.try_extract(&d),
            Err(StrategyError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn label_scan_same_line_and_next_line() {
        let same = doc("<p>Phone: (306) 555-0199</p>");
        let next = doc("<p><b>PHONE:</b></p><p>(306) 555-0142</p>");
        let s = LabeledTextScan::new("Phone:");
        assert_eq!(s.try_extract(&same).unwrap().as_deref(), Some("(306) 555-0199"));
        assert_eq!(s.try_extract(&next).unwrap().as_deref(), Some("(306) 555-0142"));
        assert_eq!(s.try_extract(&doc("<p>Fax: 1</p>")).unwrap(), None);
    }

    #[test]
    fn label_scan_does_not_take_the_next_label_as_value() {
        let d = doc("<p><b>Phone:</b></p><p>Fax: (306) 555-0177</p>");
        let s = LabeledTextScan::new("Phone:").with_post(PostProcess::Phone);
        assert_eq!(s.try_extract(&d).unwrap(), None);
    }

    #[test]
    fn label_scan_moves_past_hits_the_post_process_rejects() {
        let d = doc(
            "<p>Phone: see below</p><p>Phone:</p><p>Fax: 306-555-0177</p>\
             <p>Phone: (306) 555-0142</p>",
        );
        let s = LabeledTextScan::new("Phone:").with_post(PostProcess::Phone);
        assert_eq!(s.try_extract(&d).unwrap().as_deref(), Some("(306) 555-0142"));
        assert_eq!(
            extract_field(&d, &[Box::new(s) as Box<dyn ExtractionStrategy>]),
            "(306) 555-0142"
        );
    }

    #[test]
    fn post_process_variants() {
        assert_eq!(apply_post_process(PostProcess::Collapse, "  a \n b "), "a b");
        assert_eq!(
            apply_post_process(PostProcess::Phone, "Phone: (306) 659-7000 Fax: (306) 659-7001"),
            "(306) 659-7000"
        );
        assert_eq!(apply_post_process(PostProcess::Phone, "Call the office"), "");
        assert_eq!(
            apply_post_process(PostProcess::Email, "mailto:Office@Example.org?subject=Hi"),
            "office@example.org"
        );
        assert_eq!(apply_post_process(PostProcess::Email, "no address"), "");
    }

    #[test]
    fn extract_field_keeps_going_after_errors_and_empties() {
        let d = doc(r#"<span class="tel">306-555-0100</span>"#);
        let strategies: Vec<Box<dyn ExtractionStrategy>> = vec![
            Box::new(SelectorLookup::new("div[[")),
            Box::new(SelectorLookup::new(".phone")),
            Box::new(SelectorLookup::new(".tel").with_post(PostProcess::Phone)),
        ];
        assert_eq!(extract_field(&d, &strategies), "306-555-0100");
        assert_eq!(extract_field(&d, &strategies[..2]), "");
    }

    #[test]
    fn spec_builds_matching_strategy() {
        let spec = StrategySpec::Itemprop {
            name: "telephone".into(),
            post: PostProcess::Phone,
        };
        let s = strategy_from_spec(&spec);
        assert_eq!(s.describe(), "attribute([itemprop='telephone'] @content)");
        assert_eq!(s.post_process(), PostProcess::Phone);
    }
}

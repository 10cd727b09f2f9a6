//! Multi-strategy field extraction for contact pages.
//!
//! This crate provides:
//! - [`PageDocument`]: a parsed page with its visible text
//! - [`ExtractionStrategy`] and its variants ([`SelectorLookup`], [`AttributeLookup`],
//!   [`RegexScan`], [`LabeledTextScan`])
//! - [`FieldPlan`] / [`ExtractionPlan`]: ordered fallback chains per field

pub mod document;
pub mod plan;
pub mod strategy;

pub use document::{PageDocument, collapse_whitespace};
pub use plan::{EMAIL_PATTERN, ExtractionPlan, Field, FieldPlan, PHONE_PATTERN};
pub use strategy::{
    AttributeLookup, ExtractionStrategy, LabeledTextScan, RegexScan, SelectorLookup,
    StrategyError, apply_post_process, extract_field, strategy_from_spec,
};

#[cfg(test)]
mod tests {
    use super::*;
    use schoolscrape_shared::{ExtractionConfig, PostProcess, StrategySpec};

    fn load_fixture(name: &str) -> PageDocument {
        let path = format!("../../../fixtures/html/{name}");
        let content = std::fs::read_to_string(&path)
            .unwrap_or_else(|_| panic!("missing fixture: {path}"));
        PageDocument::parse(&content, None)
    }

    // -----------------------------------------------------------------------
    // Default plan against fixture pages
    // -----------------------------------------------------------------------

    #[test]
    fn class_markup_page() {
        let doc = load_fixture("class_markup.html");
        let fields = ExtractionPlan::default().extract(&doc);
        assert_eq!(fields.address, "110 Gropper Crescent Saskatoon, SK S7M 5N9");
        assert_eq!(fields.phone, "(306) 659-7550");
        assert_eq!(fields.email, "bethlehem@gscs.ca");
    }

    #[test]
    fn microdata_only_page() {
        let doc = load_fixture("microdata.html");
        let fields = ExtractionPlan::default().extract(&doc);
        assert_eq!(fields.address, "1 Anne Street, Saskatoon");
        assert_eq!(fields.phone, "306-659-7000");
        assert_eq!(fields.email, "st.anne@gscs.ca");
    }

    #[test]
    fn labeled_page() {
        let doc = load_fixture("labeled.html");
        let fields = ExtractionPlan::default().extract(&doc);
        assert_eq!(fields.address, "225 Primrose Drive, Saskatoon");
        assert_eq!(fields.phone, "306.659.7630");
        assert_eq!(fields.email, "stgeorge@gscs.ca");
    }

    #[test]
    fn plain_text_page_falls_through_to_regex() {
        let doc = load_fixture("plain_text.html");
        let fields = ExtractionPlan::default().extract(&doc);
        assert_eq!(fields.address, "");
        assert_eq!(fields.phone, "306 659 7900");
        assert_eq!(fields.email, "cyber.school@gscs.ca");
    }

    #[test]
    fn empty_page_yields_empty_fields() {
        let doc = PageDocument::parse("<html><body></body></html>", None);
        let fields = ExtractionPlan::default().extract(&doc);
        assert!(fields.is_empty());
    }

    // -----------------------------------------------------------------------
    // Fallback ordering
    // -----------------------------------------------------------------------

    fn chain(selectors: &[&str]) -> Vec<Box<dyn ExtractionStrategy>> {
        selectors
            .iter()
            .map(|s| Box::new(SelectorLookup::new(*s)) as Box<dyn ExtractionStrategy>)
            .collect()
    }

    #[test]
    fn only_nth_strategy_matches() {
        let doc = PageDocument::parse(r#"<p class="third">third value</p>"#, None);
        let strategies = chain(&[".first", ".second", ".third", ".fourth"]);
        assert_eq!(extract_field(&doc, &strategies), "third value");
    }

    #[test]
    fn order_below_the_winner_is_irrelevant() {
        let doc = PageDocument::parse(
            r#"<p class="a">from a</p><p class="c">from c</p><p class="d">from d</p>"#,
            None,
        );
        let one = chain(&[".missing", ".a", ".c", ".d"]);
        let two = chain(&[".missing", ".a", ".d", ".c"]);
        assert_eq!(extract_field(&doc, &one), "from a");
        assert_eq!(extract_field(&doc, &two), "from a");

        // Raising a lower strategy above the winner does change the result.
        let three = chain(&[".missing", ".d", ".a", ".c"]);
        assert_eq!(extract_field(&doc, &three), "from d");
    }

    #[test]
    fn configured_plan_replaces_only_that_field() {
        let config = ExtractionConfig {
            phone: Some(vec![
                StrategySpec::Selector {
                    selector: "#broken[[".into(),
                    post: PostProcess::Phone,
                },
                StrategySpec::Label {
                    label: "Tel.".into(),
                    post: PostProcess::Phone,
                },
            ]),
            ..Default::default()
        };
        let plan = ExtractionPlan::from_config(&config);
        assert_eq!(plan.phone.strategies.len(), 2);

        let doc = PageDocument::parse(
            r#"<p>Tel. 306-555-0120</p><div class="email">a@b.ca</div>"#,
            None,
        );
        let fields = plan.extract(&doc);
        assert_eq!(fields.phone, "306-555-0120");
        assert_eq!(fields.email, "a@b.ca");
    }
}

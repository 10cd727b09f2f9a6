//! Per-field strategy chains.
//!
//! The built-in chains try class selectors first, then microdata, then
//! label and regex scans for pages without semantic markup.

use schoolscrape_shared::{ExtractedFields, ExtractionConfig, PostProcess, StrategySpec};

use crate::document::PageDocument;
use crate::strategy::{
    AttributeLookup, ExtractionStrategy, LabeledTextScan, RegexScan, SelectorLookup,
    extract_field, strategy_from_spec,
};

/// North American phone number in free text.
pub const PHONE_PATTERN: &str = r"(?:\+?1[\s.-]?)?\(?\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4}";

/// Email address in free text.
pub const EMAIL_PATTERN: &str = r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}";

/// The contact fields a plan extracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Address,
    Phone,
    Email,
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Field::Address => "address",
            Field::Phone => "phone",
            Field::Email => "email",
        }
    }
}

/// A field and its strategies in priority order.
pub struct FieldPlan {
    pub field: Field,
    pub strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl FieldPlan {
    pub fn new(field: Field, strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { field, strategies }
    }

    pub fn from_specs(field: Field, specs: &[StrategySpec]) -> Self {
        Self::new(field, specs.iter().map(strategy_from_spec).collect())
    }

    pub fn extract(&self, doc: &PageDocument) -> String {
        extract_field(doc, &self.strategies)
    }

    /// Built-in chain for a field.
    pub fn default_for(field: Field) -> Self {
        let strategies: Vec<Box<dyn ExtractionStrategy>> = match field {
            Field::Address => vec![
                Box::new(SelectorLookup::new(".address")),
                Box::new(AttributeLookup::itemprop("address")),
                Box::new(SelectorLookup::new(".contact-address")),
                Box::new(SelectorLookup::new(".school-address")),
                Box::new(SelectorLookup::new(".school-info .address")),
                Box::new(LabeledTextScan::new("Address:")),
            ],
            Field::Phone => vec![
                Box::new(SelectorLookup::new(".phone").with_post(PostProcess::Phone)),
                Box::new(AttributeLookup::itemprop("telephone").with_post(PostProcess::Phone)),
                Box::new(SelectorLookup::new(".contact-phone").with_post(PostProcess::Phone)),
                Box::new(SelectorLookup::new(".school-phone").with_post(PostProcess::Phone)),
                Box::new(SelectorLookup::new(".school-info .phone").with_post(PostProcess::Phone)),
                Box::new(
                    AttributeLookup::new("a[href^='tel:']", "href").with_post(PostProcess::Phone),
                ),
                Box::new(LabeledTextScan::new("Phone:").with_post(PostProcess::Phone)),
                Box::new(LabeledTextScan::new("Tel:").with_post(PostProcess::Phone)),
                Box::new(RegexScan::new(PHONE_PATTERN).with_post(PostProcess::Phone)),
            ],
            Field::Email => vec![
                Box::new(SelectorLookup::new(".email").with_post(PostProcess::Email)),
                Box::new(AttributeLookup::itemprop("email").with_post(PostProcess::Email)),
                Box::new(SelectorLookup::new(".contact-email").with_post(PostProcess::Email)),
                Box::new(SelectorLookup::new(".school-email").with_post(PostProcess::Email)),
                Box::new(SelectorLookup::new(".school-info .email").with_post(PostProcess::Email)),
                Box::new(
                    AttributeLookup::new("a[href^='mailto:']", "href").with_post(PostProcess::Email),
                ),
                Box::new(LabeledTextScan::new("Email:").with_post(PostProcess::Email)),
                Box::new(RegexScan::new(EMAIL_PATTERN).with_post(PostProcess::Email)),
            ],
        };
        Self::new(field, strategies)
    }
}

/// The three field plans used for every page of a run.
pub struct ExtractionPlan {
    pub address: FieldPlan,
    pub phone: FieldPlan,
    pub email: FieldPlan,
}

impl ExtractionPlan {
    /// Built-in chains, with any field the config overrides replaced.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        let plan = |field, specs: &Option<Vec<StrategySpec>>| match specs {
            Some(specs) => FieldPlan::from_specs(field, specs),
            None => FieldPlan::default_for(field),
        };
        Self {
            address: plan(Field::Address, &config.address),
            phone: plan(Field::Phone, &config.phone),
            email: plan(Field::Email, &config.email),
        }
    }

    /// Extract all three fields from one document.
    pub fn extract(&self, doc: &PageDocument) -> ExtractedFields {
        ExtractedFields {
            address: self.address.extract(doc),
            phone: self.phone.extract(doc),
            email: self.email.extract(doc),
        }
    }
}

impl Default for ExtractionPlan {
    fn default() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }
}

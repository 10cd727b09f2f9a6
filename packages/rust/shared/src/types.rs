//! Core domain types: targets, extracted fields, records and the output schema.

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

/// Stable identifier for a target, used to key URL overrides.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(pub String);

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One institution to resolve contact data for. Immutable once read from the seed list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Stable identifier (explicit in the seed file, else the display name).
    pub id: TargetId,
    /// Seed name with trailing decoration markers removed.
    pub display_name: String,
    /// Number of trailing asterisks on the raw seed name.
    pub decoration_markers: usize,
    /// Explicit URL code or absolute URL that takes priority over the slug.
    pub url_override: Option<String>,
}

// ---------------------------------------------------------------------------
// ExtractedFields
// ---------------------------------------------------------------------------

/// Contact fields pulled from a single page. Empty string means "not found".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub address: String,
    pub phone: String,
    pub email: String,
}

impl ExtractedFields {
    /// True when no field was found.
    pub fn is_empty(&self) -> bool {
        self.address.is_empty() && self.phone.is_empty() && self.email.is_empty()
    }

    /// Fill every empty field from `other`, keeping fields already found.
    pub fn fill_missing_from(&mut self, other: &ExtractedFields) {
        for (mine, theirs) in [
            (&mut self.address, &other.address),
            (&mut self.phone, &other.phone),
            (&mut self.email, &other.email),
        ] {
            if mine.is_empty() {
                mine.clone_from(theirs);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// The persisted unit of the dataset.
///
/// Deserialization is lenient: it accepts field keys, the spreadsheet header
/// texts, and the legacy `contactPageUrl` / `language` keys; missing or `null`
/// values become empty strings and numbers are stringified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Record {
    #[serde(alias = "Name", deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(rename = "type", alias = "Type", deserialize_with = "lenient_string")]
    pub kind: String,
    #[serde(alias = "Category", deserialize_with = "lenient_string")]
    pub category: String,
    #[serde(
        alias = "French Status",
        alias = "language",
        deserialize_with = "lenient_string"
    )]
    pub french_status: String,
    #[serde(alias = "Address", deserialize_with = "lenient_string")]
    pub address: String,
    #[serde(alias = "Phone", deserialize_with = "lenient_string")]
    pub phone: String,
    #[serde(alias = "Email", deserialize_with = "lenient_string")]
    pub email: String,
    #[serde(alias = "URL", alias = "contactPageUrl", deserialize_with = "lenient_string")]
    pub url: String,
    #[serde(alias = "Principal", deserialize_with = "lenient_string")]
    pub principal: String,
    #[serde(alias = "Superintendent", deserialize_with = "lenient_string")]
    pub superintendent: String,
}

impl Record {
    /// Case-insensitive dataset key.
    pub fn key(&self) -> String {
        Self::key_of(&self.name)
    }

    /// Dataset key for a bare name.
    pub fn key_of(name: &str) -> String {
        name.trim().to_lowercase()
    }

    /// Borrow the value of a field by key.
    pub fn get(&self, key: FieldKey) -> &str {
        match key {
            FieldKey::Type => &self.kind,
            FieldKey::Category => &self.category,
            FieldKey::FrenchStatus => &self.french_status,
            FieldKey::Name => &self.name,
            FieldKey::Address => &self.address,
            FieldKey::Url => &self.url,
            FieldKey::Phone => &self.phone,
            FieldKey::Email => &self.email,
            FieldKey::Principal => &self.principal,
            FieldKey::Superintendent => &self.superintendent,
        }
    }

    /// Mutably borrow the value of a field by key.
    pub fn get_mut(&mut self, key: FieldKey) -> &mut String {
        match key {
            FieldKey::Type => &mut self.kind,
            FieldKey::Category => &mut self.category,
            FieldKey::FrenchStatus => &mut self.french_status,
            FieldKey::Name => &mut self.name,
            FieldKey::Address => &mut self.address,
            FieldKey::Url => &mut self.url,
            FieldKey::Phone => &mut self.phone,
            FieldKey::Email => &mut self.email,
            FieldKey::Principal => &mut self.principal,
            FieldKey::Superintendent => &mut self.superintendent,
        }
    }
}

/// Accept strings, numbers, booleans and `null` for a string field.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Field keys of a [`Record`], as used in the JSON serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKey {
    Type,
    Category,
    FrenchStatus,
    Name,
    Address,
    Url,
    Phone,
    Email,
    Principal,
    Superintendent,
}

impl FieldKey {
    /// Every field, in record declaration order.
    pub const ALL: [FieldKey; 10] = [
        FieldKey::Name,
        FieldKey::Type,
        FieldKey::Category,
        FieldKey::FrenchStatus,
        FieldKey::Address,
        FieldKey::Phone,
        FieldKey::Email,
        FieldKey::Url,
        FieldKey::Principal,
        FieldKey::Superintendent,
    ];

    /// JSON object key for this field.
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKey::Type => "type",
            FieldKey::Category => "category",
            FieldKey::FrenchStatus => "frenchStatus",
            FieldKey::Name => "name",
            FieldKey::Address => "address",
            FieldKey::Url => "url",
            FieldKey::Phone => "phone",
            FieldKey::Email => "email",
            FieldKey::Principal => "principal",
            FieldKey::Superintendent => "superintendent",
        }
    }

    /// Hand-curated fields that a re-scrape must never overwrite.
    pub fn is_curated(self) -> bool {
        matches!(self, FieldKey::Principal | FieldKey::Superintendent)
    }
}

/// One output column: header text and the record field it shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub header: String,
    pub key: FieldKey,
}

impl Column {
    pub fn new(header: impl Into<String>, key: FieldKey) -> Self {
        Self {
            header: header.into(),
            key,
        }
    }
}

/// Ordered column list shared by the tabular and JSON outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema(pub Vec<Column>);

impl Schema {
    pub fn columns(&self) -> &[Column] {
        &self.0
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|c| c.header.as_str())
    }

    /// Find the field shown under a header (exact match, then case-insensitive).
    pub fn key_for_header(&self, header: &str) -> Option<FieldKey> {
        let header = header.trim();
        self.0
            .iter()
            .find(|c| c.header == header)
            .or_else(|| self.0.iter().find(|c| c.header.eq_ignore_ascii_case(header)))
            .map(|c| c.key)
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self(vec![
            Column::new("Type", FieldKey::Type),
            Column::new("Category", FieldKey::Category),
            Column::new("French Status", FieldKey::FrenchStatus),
            Column::new("Name", FieldKey::Name),
            Column::new("Address", FieldKey::Address),
            Column::new("URL", FieldKey::Url),
            Column::new("Phone", FieldKey::Phone),
            Column::new("Email", FieldKey::Email),
            Column::new("Principal", FieldKey::Principal),
            Column::new("Superintendent", FieldKey::Superintendent),
        ])
    }
}

// ---------------------------------------------------------------------------
// Enumerations shared by config and the pipeline
// ---------------------------------------------------------------------------

/// How a population encodes language-program status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LanguageScheme {
    /// Keywords in the name ("french", "bilingual").
    #[default]
    NameKeywords,
    /// Count of trailing asterisks on the seed name.
    Asterisks,
}

/// When a navigation counts as loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WaitCondition {
    #[default]
    DomContentLoaded,
    Load,
    NetworkIdle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_accepts_header_and_legacy_keys() {
        let json = r#"{
            "Name": "St. Anne School",
            "Type": "Elementary",
            "French Status": "English",
            "contactPageUrl": "https://www.gscs.ca/ANN",
            "phone": 3065551234,
            "email": null,
            "Principal": "J. Doe"
        }"#;
        let record: Record = serde_json::from_str(json).expect("parse record");
        assert_eq!(record.name, "St. Anne School");
        assert_eq!(record.kind, "Elementary");
        assert_eq!(record.french_status, "English");
        assert_eq!(record.url, "https://www.gscs.ca/ANN");
        assert_eq!(record.phone, "3065551234");
        assert_eq!(record.email, "");
        assert_eq!(record.principal, "J. Doe");
        assert_eq!(record.superintendent, "");
    }

    #[test]
    fn record_key_is_case_insensitive() {
        let a = Record {
            name: "St. Anne School".into(),
            ..Default::default()
        };
        let b = Record {
            name: "ST. ANNE SCHOOL".into(),
            ..Default::default()
        };
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn default_schema_order() {
        let schema = Schema::default();
        let headers: Vec<&str> = schema.headers().collect();
        assert_eq!(
            headers,
            [
                "Type",
                "Category",
                "French Status",
                "Name",
                "Address",
                "URL",
                "Phone",
                "Email",
                "Principal",
                "Superintendent"
            ]
        );
        assert_eq!(schema.key_for_header("french status"), Some(FieldKey::FrenchStatus));
        assert_eq!(schema.key_for_header("Fax"), None);
    }

    #[test]
    fn fill_missing_keeps_found_fields() {
        let mut contact = ExtractedFields {
            phone: "306-555-0100".into(),
            ..Default::default()
        };
        let main = ExtractedFields {
            address: "1 Main St".into(),
            phone: "306-555-9999".into(),
            email: String::new(),
        };
        contact.fill_missing_from(&main);
        assert_eq!(contact.address, "1 Main St");
        assert_eq!(contact.phone, "306-555-0100");
        assert!(contact.email.is_empty());
    }
}

//! Prior dataset loading and target partitioning.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info, instrument, warn};

use schoolscrape_shared::{FieldKey, Record, Result, ScrapeError, Schema, Target};

/// Load the previous run's output.
///
/// `.json` files hold an array of record objects; `.csv` files carry a header
/// row matched against `schema` (unknown columns are ignored). A missing file
/// is an empty dataset. A malformed file is an error: merging against a
/// half-read baseline would drop curated values.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_prior(path: &Path, schema: &Schema) -> Result<Vec<Record>> {
    if !path.exists() {
        info!("no prior dataset, starting fresh");
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path).map_err(|e| ScrapeError::io(path, e))?;
    if content.trim().is_empty() {
        warn!("prior dataset is empty");
        return Ok(Vec::new());
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let records = match ext.as_deref() {
        Some("json") => parse_json(&content),
        Some("csv") => parse_csv(&content, schema),
        _ => Err("unsupported format (expected .json or .csv)".to_string()),
    }
    .map_err(|reason| {
        ScrapeError::validation(format!("prior dataset {} is malformed: {reason}", path.display()))
    })?;

    let total = records.len();
    let records: Vec<Record> = records.into_iter().filter(|r| !r.key().is_empty()).collect();
    if records.len() < total {
        warn!(dropped = total - records.len(), "ignoring prior records without a name");
    }

    info!(records = records.len(), "loaded prior dataset");
    Ok(records)
}

fn parse_json(content: &str) -> std::result::Result<Vec<Record>, String> {
    serde_json::from_str(content).map_err(|e| e.to_string())
}

fn parse_csv(content: &str, schema: &Schema) -> std::result::Result<Vec<Record>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers().map_err(|e| e.to_string())?.clone();
    let keys: Vec<_> = headers.iter().map(|h| schema.key_for_header(h)).collect();

    if !keys.contains(&Some(FieldKey::Name)) {
        return Err("header row has no name column".into());
    }
    for (header, key) in headers.iter().zip(&keys) {
        if key.is_none() {
            debug!(header, "ignoring unknown column");
        }
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| e.to_string())?;
        let mut record = Record::default();
        for (value, key) in row.iter().zip(&keys) {
            if let Some(key) = key {
                *record.get_mut(*key) = value.to_string();
            }
        }
        records.push(record);
    }
    Ok(records)
}

/// Split targets into those absent from `prior` and those already present,
/// keeping seed order within each half.
pub fn partition_targets(prior: &[Record], targets: Vec<Target>) -> (Vec<Target>, Vec<Target>) {
    let known: HashSet<String> = prior.iter().map(Record::key).collect();
    targets
        .into_iter()
        .partition(|t| !known.contains(&Record::key_of(&t.display_name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use schoolscrape_shared::TargetId;

    fn tmp_file(name: &str, content: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "ss-prior-{}-{}",
            std::process::id(),
            name.replace('.', "-")
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn target(name: &str) -> Target {
        Target {
            id: TargetId(name.into()),
            display_name: name.into(),
            decoration_markers: 0,
            url_override: None,
        }
    }

    #[test]
    fn missing_file_is_empty() {
        let path = std::env::temp_dir().join("ss-prior-does-not-exist.json");
        assert!(load_prior(&path, &Schema::default()).unwrap().is_empty());
    }

    #[test]
    fn json_with_legacy_keys_and_nulls() {
        let path = tmp_file(
            "legacy.json",
            r#"[
                {"name": "St. Anne School", "type": "Elementary", "language": "English",
                 "contactPageUrl": "https://www.gscs.ca/ANN", "phone": null,
                 "principal": "J. Doe"},
                {"Name": "Caswell School", "Phone": "306-555-0101"}
            ]"#,
        );
        let records = load_prior(&path, &Schema::default()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].french_status, "English");
        assert_eq!(records[0].url, "https://www.gscs.ca/ANN");
        assert_eq!(records[0].phone, "");
        assert_eq!(records[0].principal, "J. Doe");
        assert_eq!(records[1].phone, "306-555-0101");
    }

    #[test]
    fn csv_by_schema_headers() {
        let path = tmp_file(
            "prior.csv",
            "Type,Name,Phone,Notes,Principal\n\
             High School,Bethlehem Catholic High School,(306) 659-7550,ignored,A. Smith\n",
        );
        let records = load_prior(&path, &Schema::default()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, "High School");
        assert_eq!(records[0].name, "Bethlehem Catholic High School");
        assert_eq!(records[0].principal, "A. Smith");
        assert_eq!(records[0].email, "");
    }

    #[test]
    fn malformed_json_is_fatal() {
        let path = tmp_file("broken.json", r#"[{"name": "St. Anne"#);
        let err = load_prior(&path, &Schema::default()).unwrap_err();
        assert!(matches!(err, ScrapeError::Validation { .. }));
    }

    #[test]
    fn csv_without_name_column_is_fatal() {
        let path = tmp_file("noname.csv", "Type,Phone\nElementary,1\n");
        let err = load_prior(&path, &Schema::default()).unwrap_err();
        assert!(matches!(err, ScrapeError::Validation { .. }));
    }

    #[test]
    fn unnamed_records_dropped() {
        let path = tmp_file("unnamed.json", r#"[{"name": " "}, {"name": "Caswell School"}]"#);
        let records = load_prior(&path, &Schema::default()).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn partition_is_case_insensitive_and_ordered() {
        let prior = vec![Record {
            name: "ST. ANNE SCHOOL".into(),
            ..Default::default()
        }];
        let targets = vec![
            target("Caswell School"),
            target("St. Anne School"),
            target("Brunskill School"),
        ];
        let (new, existing) = partition_targets(&prior, targets);
        let new: Vec<_> = new.iter().map(|t| t.display_name.as_str()).collect();
        assert_eq!(new, ["Caswell School", "Brunskill School"]);
        assert_eq!(existing.len(), 1);
        assert_eq!(existing[0].display_name, "St. Anne School");
    }
}

//! Connection export loader
//!
//! Reads the CSV export, skipping any free-text preamble before the
//! `First Name` header, and turns each row into a `ConnectionDocument`.

use super::{IngestError, IngestResult};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

const HEADER_MARKER: &str = "First Name";
const REQUIRED_COLUMNS: [&str; 5] = ["First Name", "Last Name", "Company", "URL", "Connected On"];

/// One connection, ready for projection and indexing
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionDocument {
    /// `"{first} {last}"`, trimmed; the Person key
    pub name: String,
    pub company: String,
    pub linkedin_url: String,
    pub email: Option<String>,
    /// Stored exactly as exported
    pub connected_on: String,
    pub title: Option<String>,
    pub industry: Option<String>,
    /// `Key: value` profile block that gets embedded
    pub text: String,
    /// 1-based line in the source file
    pub line: u64,
}

impl ConnectionDocument {
    /// Fields copied onto every chunk of this document
    pub fn metadata(&self) -> BTreeMap<String, String> {
        let mut metadata = BTreeMap::new();
        metadata.insert("name".to_string(), self.name.clone());
        metadata.insert("company".to_string(), self.company.clone());
        metadata.insert("linkedin_url".to_string(), self.linkedin_url.clone());
        metadata.insert("email".to_string(), self.email.clone().unwrap_or_default());
        metadata.insert("connected_on".to_string(), self.connected_on.clone());
        if let Some(title) = &self.title {
            metadata.insert("title".to_string(), title.clone());
        }
        metadata
    }

    /// Whether `connected_on` is a `YYYY-MM-DD` date
    pub fn has_iso_date(&self) -> bool {
        chrono::NaiveDate::parse_from_str(&self.connected_on, "%Y-%m-%d").is_ok()
    }
}

#[derive(Debug, Deserialize)]
struct ExportRow {
    #[serde(rename = "First Name")]
    first_name: String,
    #[serde(rename = "Last Name")]
    last_name: String,
    #[serde(rename = "Company")]
    company: String,
    #[serde(rename = "URL")]
    url: String,
    #[serde(rename = "Connected On")]
    connected_on: String,
    #[serde(rename = "Email Address", default)]
    email: Option<String>,
    #[serde(rename = "Position", default)]
    position: Option<String>,
    #[serde(rename = "Industry", default)]
    industry: Option<String>,
}

/// Load connections from a CSV export on disk
pub fn load_connections(path: &Path) -> IngestResult<Vec<ConnectionDocument>> {
    let content = std::fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let documents = parse_connections(&content)?;
    info!("Loaded {} connections from {}", documents.len(), path.display());
    Ok(documents)
}

/// Parse a CSV export held in memory
pub fn parse_connections(content: &str) -> IngestResult<Vec<ConnectionDocument>> {
    let content = content.trim_start_matches('\u{feff}');
    let skipped = content
        .lines()
        .position(|line| line.trim_start().starts_with(HEADER_MARKER))
        .unwrap_or(0);
    if skipped > 0 {
        debug!("Skipping {} preamble lines", skipped);
    }
    let body: String = content.lines().skip(skipped).collect::<Vec<_>>().join("\n");

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let headers = reader.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(IngestError::MissingColumn(column.to_string()));
        }
    }

    let mut documents = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| IngestError::MalformedRow {
            line: e.position().map(|p| p.line()).unwrap_or(0) + skipped as u64,
            reason: e.to_string(),
        })?;
        let line = record.position().map(|p| p.line()).unwrap_or(0) + skipped as u64;

        // Blank lines are not rows
        if record.iter().all(str::is_empty) {
            continue;
        }

        let row: ExportRow = record.deserialize(Some(&headers)).map_err(|e| IngestError::MalformedRow {
            line,
            reason: e.to_string(),
        })?;
        documents.push(to_document(row, line)?);
    }

    let non_iso = documents.iter().filter(|d| !d.has_iso_date()).count();
    if non_iso > 0 {
        warn!(
            "{} of {} rows have a Connected On value that is not YYYY-MM-DD; date range filters will not match them reliably",
            non_iso,
            documents.len()
        );
    }

    Ok(documents)
}

fn to_document(row: ExportRow, line: u64) -> IngestResult<ConnectionDocument> {
    let first = row.first_name.trim();
    let last = row.last_name.trim();
    if first.is_empty() && last.is_empty() {
        return Err(IngestError::MalformedRow {
            line,
            reason: "both First Name and Last Name are blank".to_string(),
        });
    }

    let name = format!("{} {}", first, last).trim().to_string();
    let company = row.company.trim().to_string();
    let linkedin_url = row.url.trim().to_string();
    let connected_on = row.connected_on.trim().to_string();
    let email = non_empty(row.email);
    let title = non_empty(row.position);
    let industry = non_empty(row.industry);

    let text = format!(
        "Name: {}\nCompany: {}\nPosition: {}\nURL: {}\nEmail: {}\nConnected On: {}",
        name,
        company,
        title.as_deref().unwrap_or(""),
        linkedin_url,
        email.as_deref().unwrap_or(""),
        connected_on
    );

    Ok(ConnectionDocument {
        name,
        company,
        linkedin_url,
        email,
        connected_on,
        title,
        industry,
        text,
        line,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = "Notes:\n\"When exporting your connection data, you may notice that some of the email addresses are missing.\"\n\nFirst Name,Last Name,URL,Email Address,Company,Position,Connected On\nAlice,Smith,https://www.linkedin.com/in/alice, alice@example.com ,Acme,Senior Engineer,2023-02-01\nBob,Jones,https://www.linkedin.com/in/bob,,Acme,,01 May 2022\n";

    #[test]
    fn test_skips_preamble_and_trims() {
        let docs = parse_connections(EXPORT).unwrap();
        assert_eq!(docs.len(), 2);

        let alice = &docs[0];
        assert_eq!(alice.name, "Alice Smith");
        assert_eq!(alice.email.as_deref(), Some("alice@example.com"));
        assert_eq!(alice.title.as_deref(), Some("Senior Engineer"));
        assert_eq!(alice.line, 5);
        assert!(alice.text.contains("Position: Senior Engineer"));
        assert!(alice.text.contains("Connected On: 2023-02-01"));

        let bob = &docs[1];
        assert_eq!(bob.email, None);
        assert_eq!(bob.title, None);
        assert_eq!(bob.connected_on, "01 May 2022");
        assert!(!bob.has_iso_date());
    }

    #[test]
    fn test_header_only_on_first_line() {
        let docs = parse_connections("First Name,Last Name,Company,URL,Connected On\nCarol,,Initech,u,2021-01-01\n").unwrap();
        assert_eq!(docs[0].name, "Carol");
        assert_eq!(docs[0].industry, None);
        assert_eq!(docs[0].line, 2);
    }

    #[test]
    fn test_blank_names_are_malformed() {
        let err = parse_connections("First Name,Last Name,Company,URL,Connected On\n  , ,Acme,u,2021-01-01\n").unwrap_err();
        assert!(matches!(err, IngestError::MalformedRow { line: 2, .. }));
    }

    #[test]
    fn test_short_row_is_malformed() {
        let err = parse_connections("First Name,Last Name,Company,URL,Connected On\nDan,Brown\n").unwrap_err();
        assert!(matches!(err, IngestError::MalformedRow { line: 2, .. }));
    }

    #[test]
    fn test_missing_required_column() {
        let err = parse_connections("First Name,Last Name,Company,URL\nA,B,C,D\n").unwrap_err();
        assert!(matches!(err, IngestError::MissingColumn(ref c) if c == "Connected On"));
    }

    #[test]
    fn test_metadata_copy() {
        let docs = parse_connections(EXPORT).unwrap();
        let metadata = docs[0].metadata();
        assert_eq!(metadata.get("name").map(String::as_str), Some("Alice Smith"));
        assert_eq!(metadata.get("company").map(String::as_str), Some("Acme"));
        assert_eq!(metadata.get("title").map(String::as_str), Some("Senior Engineer"));
        assert!(!docs[1].metadata().contains_key("title"));
    }
}

//! JSON, CSV and Markdown renderings of a scrape, and writing them to disk.

use crate::error::Result;
use crate::schema::Listings;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

/// Format of the timestamp prefixed to every output file.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Local time formatted as `YYYYMMDD_HHMMSS`.
pub fn timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Kinds of file a scrape produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    /// Extracted container as JSON.
    Json,
    /// Extracted records as CSV.
    Csv,
    /// Raw page markdown.
    Markdown,
}

impl ExportKind {
    /// File extension.
    pub fn extension(self) -> &'static str {
        match self {
            ExportKind::Json => "json",
            ExportKind::Csv => "csv",
            ExportKind::Markdown => "md",
        }
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data.{}", self.extension())
    }
}

/// File name for an output of `kind` written at `timestamp`.
pub fn file_name(timestamp: &str, kind: ExportKind) -> String {
    format!("{timestamp}_{kind}")
}

/// Pretty JSON with four-space indentation.
pub fn to_json(listings: &Listings) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    listings.serialize(&mut ser)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// CSV of the records: a header of attribute names, one row per record,
/// empty cells for missing values. Empty when the record type has no
/// attributes.
pub fn to_csv(listings: &Listings) -> Result<String> {
    if listings.columns().is_empty() {
        return Ok(String::new());
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(listings.columns())?;
    for record in listings.records() {
        writer.write_record(
            listings
                .columns()
                .iter()
                .map(|c| record.get(c).unwrap_or("")),
        )?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Writes timestamp-prefixed output files into one directory.
#[derive(Debug, Clone)]
pub struct Exporter {
    dir: PathBuf,
}

impl Exporter {
    /// Create an exporter for `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write(&self, timestamp: &str, kind: ExportKind, contents: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name(timestamp, kind));
        std::fs::write(&path, contents)?;
        info!(path = %path.display(), bytes = contents.len(), "Saved {}", kind);
        Ok(path)
    }

    /// Save the raw page markdown.
    pub fn save_markdown(&self, timestamp: &str, markdown: &str) -> Result<PathBuf> {
        self.write(timestamp, ExportKind::Markdown, markdown)
    }

    /// Save the extracted container as JSON.
    pub fn save_json(&self, timestamp: &str, listings: &Listings) -> Result<PathBuf> {
        self.write(timestamp, ExportKind::Json, &to_json(listings)?)
    }

    /// Save the extracted records as CSV.
    pub fn save_csv(&self, timestamp: &str, listings: &Listings) -> Result<PathBuf> {
        self.write(timestamp, ExportKind::Csv, &to_csv(listings)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{build_container_type, build_record_type};
    use serde_json::json;

    fn listings() -> Listings {
        build_container_type(build_record_type(&["Name", "Price"]).unwrap())
            .parse(json!({
                "listings": [
                    {"name": "Loft, downtown", "price": "$1,200"},
                    {"name": "Studio", "price": null},
                ]
            }))
            .unwrap()
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("20240901_120000", ExportKind::Json), "20240901_120000_data.json");
        assert_eq!(file_name("20240901_120000", ExportKind::Csv), "20240901_120000_data.csv");
        assert_eq!(file_name("20240901_120000", ExportKind::Markdown), "20240901_120000_data.md");
    }

    #[test]
    fn test_timestamp_shape() {
        let ts = timestamp();
        assert_eq!(ts.len(), 15);
        assert_eq!(&ts[8..9], "_");
        assert!(ts.chars().filter(|c| *c != '_').all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_to_json() {
        let text = to_json(&listings()).unwrap();
        assert!(text.starts_with("{\n    \"listings\": [\n"));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["listings"][1]["price"], serde_json::Value::Null);
    }

    #[test]
    fn test_to_csv() {
        let text = to_csv(&listings()).unwrap();
        assert_eq!(
            text,
            "name,price\n\"Loft, downtown\",\"$1,200\"\nStudio,\n"
        );
    }

    #[test]
    fn test_to_csv_without_records() {
        let empty = build_container_type(build_record_type(&["a", "b"]).unwrap())
            .parse(json!({"listings": []}))
            .unwrap();
        assert_eq!(to_csv(&empty).unwrap(), "a,b\n");

        let no_columns = build_container_type(build_record_type::<&str>(&[]).unwrap())
            .parse(json!({"listings": [{}]}))
            .unwrap();
        assert_eq!(to_csv(&no_columns).unwrap(), "");
    }

    #[test]
    fn test_exporter_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(dir.path().join("output"));

        let md = exporter.save_markdown("20240901_120000", "# Page").unwrap();
        let json = exporter.save_json("20240901_120000", &listings()).unwrap();
        let csv = exporter.save_csv("20240901_120000", &listings()).unwrap();

        assert_eq!(std::fs::read_to_string(&md).unwrap(), "# Page");
        assert_eq!(md.parent(), Some(exporter.dir()));
        assert!(json.ends_with("20240901_120000_data.json"));
        assert!(std::fs::read_to_string(&csv).unwrap().starts_with("name,price\n"));
    }
}

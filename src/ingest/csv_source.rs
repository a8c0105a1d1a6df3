use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::types::{RawRow, RawValue};

/// Parse CSV text into string-keyed rows.
///
/// Headers are trimmed (and a leading UTF-8 BOM removed) so column lookups work
/// on exports from spreadsheet tools. Short rows are allowed; missing cells are
/// simply absent from the row map. Blank cells are dropped as well so they read
/// the same as a missing column.
pub fn parse_csv_text(text: &str) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .filter(|(_, cell)| !cell.trim().is_empty())
            .map(|(h, cell)| (h.clone(), RawValue::Text(cell.to_string())))
            .collect();
        if !row.is_empty() {
            rows.push(row);
        }
    }

    debug!(columns = headers.len(), rows = rows.len(), "parsed CSV");
    Ok(rows)
}

/// Read and parse a CSV file from disk.
pub async fn read_csv_file(path: &Path) -> Result<Vec<RawRow>> {
    let text = tokio::fs::read_to_string(path).await?;
    parse_csv_text(&text)
}

/// Derive a keyword from an export's file name: `wall-art_export.csv` → `wall art export`.
pub fn keyword_from_file_name(file_name: &str) -> String {
    let base = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    base.replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

//! Row parser: delimited text → candidate rows.
//!
//! Pure transformation. Numbers are not validated here.

use std::io::Read;

use serde::Serialize;

use super::ImportError;
use crate::config::ImportConfig;

/// One accepted source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    /// 1-based line number in the source.
    pub line: u64,
    pub fields: Vec<String>,
}

impl Row {
    pub fn field(&self, index: usize) -> &str {
        self.fields.get(index).map(String::as_str).unwrap_or("")
    }
}

/// Parse delimited text into rows.
///
/// The first line is dropped when its lowercased text contains one of the
/// configured header sentinels. Lines with fewer than `min_fields` fields
/// are dropped silently and never counted. Quotes carry no meaning: every
/// physical line is split on the delimiter as-is.
pub fn parse_rows<R: Read>(reader: R, config: &ImportConfig) -> Result<Vec<Row>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .delimiter(config.delimiter)
        .from_reader(reader);

    let mut rows = Vec::new();
    let mut dropped = 0usize;

    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if line == 1 && looks_like_header(&record, config) {
            tracing::debug!("Skipping header line");
            continue;
        }

        if record.len() < config.min_fields {
            dropped += 1;
            continue;
        }

        rows.push(Row {
            line,
            fields: record.iter().map(str::to_string).collect(),
        });
    }

    if dropped > 0 {
        tracing::debug!(dropped, "Dropped short lines");
    }

    Ok(rows)
}

/// Parse rows from an in-memory string.
pub fn parse_text(text: &str, config: &ImportConfig) -> Result<Vec<Row>, ImportError> {
    parse_rows(text.as_bytes(), config)
}

fn looks_like_header(record: &csv::StringRecord, config: &ImportConfig) -> bool {
    let text = record
        .iter()
        .collect::<Vec<_>>()
        .join(&char::from(config.delimiter).to_string())
        .to_lowercase();
    config
        .header_sentinels
        .iter()
        .any(|sentinel| text.contains(sentinel.as_str()))
}

// src/table/mod.rs
use crate::error::{Error, Result};
use csv::ReaderBuilder;
use std::io::Cursor;
use tracing::{debug, trace};

mod columns;

pub use columns::{build_column_index, ColumnIndex, FieldSpec};

/// Rows exactly as the sheet export delivered them. Not rectangular:
/// a row may be shorter (or longer) than the header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub rows: Vec<Vec<String>>,
}

/// Where the header sits inside a [`RawTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLocation {
    pub header_index: usize,
    pub headers: Vec<String>,
}

/// A table split at its header row: `rows` holds only what follows the header.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub source_id: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Comma if the first non-empty line has one, else tab if it has one, else comma.
pub fn detect_delimiter(text: &str) -> u8 {
    let first = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    if first.contains(',') {
        b','
    } else if first.contains('\t') {
        b'\t'
    } else {
        b','
    }
}

/// Decode exported CSV (or TSV) text into a [`RawTable`].
///
/// Quoted cells may contain delimiters and newlines. Rows of differing
/// length are kept as-is; rows whose cells are all blank are skipped.
#[tracing::instrument(level = "debug", skip(text), fields(bytes = text.len()))]
pub fn parse_csv_text(text: &str) -> Result<RawTable> {
    let text = text.trim();
    let delimiter = detect_delimiter(text);

    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(Cursor::new(text.as_bytes()));

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result?;
        if record.iter().all(|c| c.trim().is_empty()) {
            trace!(line = idx, "skipping blank line");
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    debug!(rows = rows.len(), delimiter = ?(delimiter as char),"decoded table");
    Ok(RawTable { rows })
}

/// Scan top-down for the first row with a cell containing any marker
/// (case-sensitive). With no markers the first row is the header.
pub fn locate_header(rows: &[Vec<String>], markers: &[&str]) -> Option<HeaderLocation> {
    let header_index = if markers.is_empty() {
        if rows.is_empty() {
            return None;
        }
        0
    } else {
        rows.iter().position(|row| {
            row.iter()
                .any(|cell| markers.iter().any(|m| cell.contains(m)))
        })?
    };

    Some(HeaderLocation {
        header_index,
        headers: rows[header_index]
            .iter()
            .map(|h| h.trim().to_string())
            .collect(),
    })
}

impl RawTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Split at the header row. Fails with `HeaderNotFound` when no row
    /// carries a marker, so the caller can switch to sample data.
    pub fn into_sheet(mut self, markers: &[&str], source_id: &str) -> Result<Sheet> {
        let location = locate_header(&self.rows, markers).ok_or_else(|| Error::HeaderNotFound {
            source_id: source_id.to_string(),
        })?;
        let rows = self.rows.split_off(location.header_index + 1);
        debug!(
            source = source_id,
            header_row = location.header_index,
            data_rows = rows.len(),
            "header located"
        );
        Ok(Sheet {
            source_id: source_id.to_string(),
            headers: location.headers,
            rows,
        })
    }
}

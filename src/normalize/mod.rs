// src/normalize/mod.rs
//! Sheet rows → typed records.
//!
//! Each record type declares its header markers and field candidates; the
//! generic driver here resolves columns once per sheet and hands every data
//! row to the type's `normalize`. A row the type rejects is dropped and
//! counted, never kept half-filled.

use crate::config::StaffMember;
use crate::dates::DateOrder;
use crate::error::Result;
use crate::table::{build_column_index, parse_csv_text, ColumnIndex, FieldSpec, Sheet};
use chrono::NaiveDate;
use tracing::{debug, info};

pub mod call;
pub mod contact;
pub mod deal;
pub mod lead;
pub mod visit;

pub use call::{classify_call, CallRecord, CallStatus, CallType};
pub use contact::ContactRecord;
pub use deal::{DealRecord, TargetRecord};
pub use lead::{LeadRecord, VisitStage};
pub use visit::{VisitRecord, VisitStatus};

/// What a normalizer knows about the sheet it is reading.
#[derive(Debug, Clone, Copy)]
pub struct SourceContext<'a> {
    pub source_id: &'a str,
    pub date_order: DateOrder,
    /// Owner of a per-staff call log.
    pub staff: Option<&'a StaffMember>,
    /// Reference day for defaults such as an undated deal.
    pub today: NaiveDate,
}

impl<'a> SourceContext<'a> {
    pub fn new(source_id: &'a str, date_order: DateOrder, today: NaiveDate) -> Self {
        Self {
            source_id,
            date_order,
            staff: None,
            today,
        }
    }

    pub fn with_staff(mut self, staff: &'a StaffMember) -> Self {
        self.staff = Some(staff);
        self
    }
}

pub trait Normalize: Sized {
    const KIND: &'static str;
    /// Substrings that identify the header row.
    const MARKERS: &'static [&'static str];
    const FIELDS: &'static [FieldSpec];
    /// Rows with fewer cells are dropped before `normalize` sees them.
    const MIN_CELLS: usize = 1;
    /// Match field candidates against upper-cased headers.
    const UPPERCASE_HEADERS: bool = false;

    /// `index` is the row's position among data rows (0-based).
    fn normalize(
        row: &[String],
        index: usize,
        cols: &ColumnIndex,
        ctx: &SourceContext<'_>,
    ) -> Option<Self>;
}

#[derive(Debug, Clone)]
pub struct Normalized<R> {
    pub records: Vec<R>,
    pub dropped: usize,
}

impl<R> Default for Normalized<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            dropped: 0,
        }
    }
}

pub fn column_index_for<R: Normalize>(headers: &[String]) -> ColumnIndex {
    if R::UPPERCASE_HEADERS {
        let upper: Vec<String> = headers.iter().map(|h| h.to_uppercase()).collect();
        build_column_index(&upper, R::FIELDS)
    } else {
        build_column_index(headers, R::FIELDS)
    }
}

#[tracing::instrument(level = "debug", skip(sheet, ctx), fields(source = %sheet.source_id, kind = R::KIND))]
pub fn normalize_sheet<R: Normalize>(sheet: &Sheet, ctx: &SourceContext<'_>) -> Normalized<R> {
    let cols = column_index_for::<R>(&sheet.headers);
    debug!(columns = ?cols.resolved().collect::<Vec<_>>(), "resolved columns");

    let mut out = Normalized::default();
    for (idx, row) in sheet.rows.iter().enumerate() {
        if row.len() < R::MIN_CELLS {
            debug!(row = idx, cells = row.len(), "record dropped: short row");
            out.dropped += 1;
            continue;
        }
        match R::normalize(row, idx, &cols, ctx) {
            Some(rec) => out.records.push(rec),
            None => {
                debug!(row = idx, "record dropped: required field missing or unparseable");
                out.dropped += 1;
            }
        }
    }

    info!(
        records = out.records.len(),
        dropped = out.dropped,
        "normalized sheet"
    );
    out
}

/// Decode, locate the header and normalize in one go.
pub fn normalize_text<R: Normalize>(text: &str, ctx: &SourceContext<'_>) -> Result<Normalized<R>> {
    let sheet = parse_csv_text(text)?.into_sheet(R::MARKERS, ctx.source_id)?;
    Ok(normalize_sheet(&sheet, ctx))
}

/// Digits only, last ten kept: `+91 98765-43210` and `9876543210` compare equal.
pub fn phone_key(raw: &str) -> String {
    let digits: Vec<char> = raw.chars().filter(char::is_ascii_digit).collect();
    let start = digits.len().saturating_sub(10);
    digits[start..].iter().collect()
}

/// Strip everything but digits, `.` and `-` and read a number, 0 if nothing is left.
pub fn parse_amount(raw: &str) -> f64 {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    kept.parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[derive(Debug)]
    struct Pair {
        day: NaiveDate,
        name: String,
    }

    const PAIR_FIELDS: &[FieldSpec] = &[
        FieldSpec::new("date", &["Date"]),
        FieldSpec::new("name", &["Name"]),
    ];

    impl Normalize for Pair {
        const KIND: &'static str = "pair";
        const MARKERS: &'static [&'static str] = &["Date"];
        const FIELDS: &'static [FieldSpec] = PAIR_FIELDS;
        const MIN_CELLS: usize = 2;

        fn normalize(row: &[String], _: usize, cols: &ColumnIndex, ctx: &SourceContext<'_>) -> Option<Self> {
            Some(Pair {
                day: crate::dates::parse_date(cols.cell(row, "date")?, ctx.date_order)?,
                name: cols.text(row, "name"),
            })
        }
    }

    fn ctx() -> SourceContext<'static> {
        SourceContext::new("test", DateOrder::DayFirst, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap())
    }

    #[test]
    fn drops_short_and_undated_rows() -> Result<()> {
        let out: Normalized<Pair> = normalize_text(
            "Report\nDate,Name\n05/01/2024,Asha\n06/01/2024\nnot a date,Ravi\n,Meera\n07/01/2024,Ikram",
            &ctx(),
        )?;
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.dropped, 3);
        assert_eq!(out.records[0].day, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(out.records[1].name, "Ikram");
        Ok(())
    }

    #[test]
    fn missing_header_is_an_error() {
        let err = normalize_text::<Pair>("a,b\n1,2", &ctx()).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn phone_keys_ignore_formatting() {
        assert_eq!(phone_key("+91 98765-43210"), "9876543210");
        assert_eq!(phone_key("9876543210"), "9876543210");
        assert_eq!(phone_key("12345"), "12345");
        assert_eq!(phone_key("n/a"), "");
    }

    #[test]
    fn amounts_strip_currency() {
        assert_eq!(parse_amount("₹95,00,000"), 9_500_000.0);
        assert_eq!(parse_amount("1,250.50"), 1250.5);
        assert_eq!(parse_amount("-300"), -300.0);
        assert_eq!(parse_amount("TBD"), 0.0);
        assert_eq!(parse_amount("1-2"), 0.0);
    }
}

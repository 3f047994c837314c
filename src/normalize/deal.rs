// src/normalize/deal.rs
use super::{parse_amount, Normalize, SourceContext};
use crate::dates::parse_date;
use crate::table::{ColumnIndex, FieldSpec};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DealRecord {
    pub id: String,
    pub customer_name: String,
    pub project: String,
    pub unit: String,
    /// Lower-cased: `new`, `in-progress`, `negotiation`, `completed`, `lost`, ...
    pub status: String,
    pub value: f64,
    pub date: NaiveDate,
    pub phone: String,
}

impl DealRecord {
    pub fn is_completed(&self) -> bool {
        matches!(self.status.as_str(), "completed" | "done")
    }

    pub fn is_pending(&self) -> bool {
        !self.is_completed() && self.status != "lost"
    }
}

/// A salesman's monthly target row from the achievements tab.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetRecord {
    pub salesman: String,
    pub target: f64,
    pub achievement: f64,
    pub month: String,
    pub project: String,
}

const DEAL_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("customer", &["Customer"]),
    FieldSpec::new("project", &["Project"]),
    FieldSpec::new("unit", &["Unit"]),
    FieldSpec::new("status", &["Status"]),
    FieldSpec::new("value", &["Value", "Amount"]),
    FieldSpec::new("date", &["Date"]),
    FieldSpec::new("phone", &["Phone", "Contact"]),
];

const TARGET_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("salesman", &["Salesman"]),
    FieldSpec::new("target", &["Target"]),
    FieldSpec::new("achievement", &["Achievement"]),
    FieldSpec::new("month", &["Month"]).excluding(&["Target"]),
    FieldSpec::new("project", &["Project"]),
];

/// Rows must reach every resolved column.
fn reaches_all_columns(row: &[String], cols: &ColumnIndex) -> bool {
    cols.max_position().map_or(true, |max| row.len() > max)
}

impl Normalize for DealRecord {
    const KIND: &'static str = "deal";
    const MARKERS: &'static [&'static str] = &["Customer", "Project", "Date"];
    const FIELDS: &'static [FieldSpec] = DEAL_FIELDS;

    fn normalize(
        row: &[String],
        index: usize,
        cols: &ColumnIndex,
        ctx: &SourceContext<'_>,
    ) -> Option<Self> {
        if !reaches_all_columns(row, cols) {
            return None;
        }
        // an undated deal is booked today; a garbled date is rejected
        let date = match cols.cell(row, "date") {
            Some(text) => parse_date(text, ctx.date_order)?,
            None => ctx.today,
        };

        Some(DealRecord {
            id: format!("deal-{}", index + 1),
            customer_name: cols
                .cell(row, "customer")
                .map(str::to_string)
                .unwrap_or_else(|| format!("Customer {}", index + 1)),
            project: cols.cell(row, "project").unwrap_or("Unknown").to_string(),
            unit: cols.cell(row, "unit").unwrap_or("-").to_string(),
            status: cols
                .cell(row, "status")
                .map(str::to_lowercase)
                .unwrap_or_else(|| "new".to_string()),
            value: cols.cell(row, "value").map_or(0.0, parse_amount),
            date,
            phone: cols.cell(row, "phone").unwrap_or("-").to_string(),
        })
    }
}

impl Normalize for TargetRecord {
    const KIND: &'static str = "target";
    const MARKERS: &'static [&'static str] = &["Salesman", "Target", "Achievement"];
    const FIELDS: &'static [FieldSpec] = TARGET_FIELDS;

    fn normalize(
        row: &[String],
        _index: usize,
        cols: &ColumnIndex,
        _ctx: &SourceContext<'_>,
    ) -> Option<Self> {
        if !reaches_all_columns(row, cols) {
            return None;
        }
        Some(TargetRecord {
            salesman: cols.cell(row, "salesman").unwrap_or("Unknown").to_string(),
            target: cols.cell(row, "target").map_or(0.0, parse_amount),
            achievement: cols.cell(row, "achievement").map_or(0.0, parse_amount),
            month: cols.cell(row, "month").unwrap_or("Current").to_string(),
            project: cols.cell(row, "project").unwrap_or("All Projects").to_string(),
        })
    }
}

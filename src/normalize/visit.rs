// src/normalize/visit.rs
use super::{Normalize, SourceContext};
use crate::dates::{parse_date, parse_time};
use crate::table::{ColumnIndex, FieldSpec};
use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VisitStatus {
    Scheduled,
    Completed,
    Cancelled,
    Pending,
    Transferred,
    Other,
}

impl VisitStatus {
    pub const ALL: [VisitStatus; 6] = [
        VisitStatus::Scheduled,
        VisitStatus::Completed,
        VisitStatus::Cancelled,
        VisitStatus::Pending,
        VisitStatus::Transferred,
        VisitStatus::Other,
    ];

    pub fn parse(text: &str) -> VisitStatus {
        let t = text.trim().to_lowercase();
        if t.contains("schedul") || t.contains("upcoming") {
            VisitStatus::Scheduled
        } else if t.contains("complet") || t == "done" || t == "visited" {
            VisitStatus::Completed
        } else if t.contains("cancel") {
            VisitStatus::Cancelled
        } else if t.contains("pending") {
            VisitStatus::Pending
        } else if t.contains("transfer") {
            VisitStatus::Transferred
        } else {
            VisitStatus::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VisitStatus::Scheduled => "scheduled",
            VisitStatus::Completed => "completed",
            VisitStatus::Cancelled => "cancelled",
            VisitStatus::Pending => "pending",
            VisitStatus::Transferred => "transferred",
            VisitStatus::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitRecord {
    pub id: String,
    pub customer_name: String,
    pub project: String,
    pub status: VisitStatus,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub phone: String,
    pub address: String,
    pub notes: String,
}

const VISIT_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("customer", &["Customer", "Name"]),
    FieldSpec::new("project", &["Project"]),
    FieldSpec::new("status", &["Status"]),
    FieldSpec::new("date", &["Visit Date", "Date"]).excluding(&["Follow"]),
    FieldSpec::new("time", &["Time"]),
    FieldSpec::new("phone", &["Phone", "Contact", "Number"]),
    FieldSpec::new("address", &["Address", "Location"]),
    FieldSpec::new("notes", &["Notes", "Remarks", "Comment"]),
];

impl Normalize for VisitRecord {
    const KIND: &'static str = "visit";
    const MARKERS: &'static [&'static str] = &["Customer", "Project", "Date"];
    const FIELDS: &'static [FieldSpec] = VISIT_FIELDS;

    fn normalize(
        row: &[String],
        index: usize,
        cols: &ColumnIndex,
        ctx: &SourceContext<'_>,
    ) -> Option<Self> {
        let date = parse_date(cols.cell(row, "date")?, ctx.date_order)?;
        Some(VisitRecord {
            id: format!("visit-{}", index + 1),
            customer_name: cols
                .cell(row, "customer")
                .map(str::to_string)
                .unwrap_or_else(|| format!("Customer {}", index + 1)),
            project: cols.cell(row, "project").unwrap_or("Unknown").to_string(),
            status: VisitStatus::parse(cols.cell(row, "status").unwrap_or("pending")),
            date,
            time: cols.cell(row, "time").and_then(parse_time),
            phone: cols.text(row, "phone"),
            address: cols.text(row, "address"),
            notes: cols.text(row, "notes"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::DateOrder;
    use crate::normalize::{normalize_text, Normalized};
    use anyhow::Result;

    #[test]
    fn status_text_is_bucketed() {
        assert_eq!(VisitStatus::parse("Scheduled"), VisitStatus::Scheduled);
        assert_eq!(VisitStatus::parse(" COMPLETED "), VisitStatus::Completed);
        assert_eq!(VisitStatus::parse("done"), VisitStatus::Completed);
        assert_eq!(VisitStatus::parse("Cancelled by customer"), VisitStatus::Cancelled);
        assert_eq!(VisitStatus::parse("transferred"), VisitStatus::Transferred);
        assert_eq!(VisitStatus::parse("maybe"), VisitStatus::Other);
    }

    #[test]
    fn normalizes_visit_sheet() -> Result<()> {
        let text = "\
Customer Name,Project,Status,Visit Date,Time,Phone,Address,Notes
Rahul Sharma,Virat Greens,scheduled,15/11/2023,10:00 AM,9876543210,\"Sector 42, Gurugram\",Interested in 3BHK
,,,,,,,
Priya Singh,,completed,10/11/2023,,8765432109,,
";
        let ctx = SourceContext::new(
            "visits",
            DateOrder::DayFirst,
            NaiveDate::from_ymd_opt(2023, 11, 12).unwrap(),
        );
        let out: Normalized<VisitRecord> = normalize_text(text, &ctx)?;
        assert_eq!(out.records.len(), 2);
        let first = &out.records[0];
        assert_eq!(first.customer_name, "Rahul Sharma");
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2023, 11, 15).unwrap());
        assert_eq!(first.time, NaiveTime::from_hms_opt(10, 0, 0));
        assert_eq!(first.address, "Sector 42, Gurugram");
        assert_eq!(out.records[1].project, "Unknown");
        assert_eq!(out.records[1].status, VisitStatus::Completed);
        assert_eq!(out.records[1].id, "visit-2");
        Ok(())
    }
}

// src/normalize/contact.rs
use super::{Normalize, SourceContext};
use crate::dates::parse_date;
use crate::table::{ColumnIndex, FieldSpec};
use chrono::NaiveDate;
use serde::Serialize;

/// A row from any of the lead, visit or deal sheets, reduced to what the
/// home overview needs. Identified by phone number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactRecord {
    pub id: String,
    pub source_id: String,
    pub phone: String,
    pub name: String,
    pub status: String,
    pub visit_date: String,
    pub visit_status: String,
    pub channel: String,
    pub project: String,
    pub date: Option<NaiveDate>,
}

const CONTACT_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("phone", &["NUMBER", "PHONE", "MOBILE"]).excluding(&["PROPERTY"]),
    FieldSpec::new("status", &["STATUS"]).excluding(&["VISIT"]),
    FieldSpec::new("visit_date", &["VISIT DATE"]).excluding(&["2ND", "3RD"]),
    FieldSpec::new("visit_status", &["VISIT STATUS", "VISIT DONE"]).excluding(&["2ND", "3RD"]),
    FieldSpec::new("channel", &["SOURCE", "GOOGLE", "FACEBOOK", "INSTAGRAM"]),
    FieldSpec::new("project", &["PROJECT", "VIRAT GREENS", "VIRAT CROWN"]).excluding(&["PROJECT MAP"]),
    FieldSpec::new("date", &["DATE/TIME", "DATE"]).excluding(&["VISIT", "FOLLOW"]),
    FieldSpec::new("name", &["NAME"]),
];

const CONVERTED: [&str; 3] = ["DEAL DONE", "CONVERTED", "CLOSED"];
const VISIT_COMPLETE: [&str; 4] = ["done", "visited", "yes", "completed"];

impl ContactRecord {
    pub fn is_converted(&self) -> bool {
        CONVERTED.contains(&self.status.to_uppercase().as_str())
    }

    pub fn has_visit_scheduled(&self) -> bool {
        !self.visit_date.is_empty()
    }

    pub fn visit_completed(&self) -> bool {
        self.has_visit_scheduled()
            && VISIT_COMPLETE.contains(&self.visit_status.to_lowercase().as_str())
    }
}

impl Normalize for ContactRecord {
    const KIND: &'static str = "contact";
    const MARKERS: &'static [&'static str] = &[
        "DATE/TIME", "DATE", "NAME", "NUMBER", "Date", "Name", "Customer", "Phone",
    ];
    const FIELDS: &'static [FieldSpec] = CONTACT_FIELDS;
    const UPPERCASE_HEADERS: bool = true;

    fn normalize(
        row: &[String],
        _index: usize,
        cols: &ColumnIndex,
        ctx: &SourceContext<'_>,
    ) -> Option<Self> {
        let phone = cols.cell(row, "phone")?;
        if phone.chars().count() < 10 {
            return None;
        }
        // A blank date cell is allowed; a garbled one drops the row.
        let date = match cols.cell(row, "date") {
            Some(d) => Some(parse_date(d, ctx.date_order)?),
            None => None,
        };
        let t = |field: &str| cols.text(row, field);
        Some(ContactRecord {
            id: phone.to_string(),
            source_id: ctx.source_id.to_string(),
            phone: phone.to_string(),
            name: t("name"),
            status: t("status"),
            visit_date: t("visit_date"),
            visit_status: t("visit_status"),
            channel: t("channel"),
            project: t("project"),
            date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::DateOrder;
    use crate::normalize::{normalize_text, Normalized};
    use anyhow::Result;

    fn ctx() -> SourceContext<'static> {
        SourceContext::new(
            "leads",
            DateOrder::DayFirst,
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        )
    }

    #[test]
    fn reads_lead_sheet_headers() -> Result<()> {
        let text = "\
DATE/TIME,NAME,NUMBER,Google add / facebook/ Instagram/ Flex,Status,PROJECT MAP/ PAYMENT PLAN SENT ?,Visit Date,Visit done,Virat Greens/ Virat Crown/ Both Projects,PROPERTY NUMBER
08/01/2024,Asha,9876500001,Facebook,Deal Done,Yes,09/01/2024,Done,Virat Greens,VG-1
09/01/2024,Ravi,12345,Google,,No,,,Virat Crown,
";
        let out: Normalized<ContactRecord> = normalize_text(text, &ctx())?;
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.dropped, 1);
        let c = &out.records[0];
        assert_eq!(c.phone, "9876500001");
        assert_eq!(c.channel, "Facebook");
        assert_eq!(c.project, "Virat Greens");
        assert_eq!(c.date, NaiveDate::from_ymd_opt(2024, 1, 8));
        assert!(c.is_converted());
        assert!(c.visit_completed());
        Ok(())
    }

    #[test]
    fn reads_mixed_case_sheets() -> Result<()> {
        let text = "Customer Name,Project,Status,Date,Phone\nRahul,Virat Greens,scheduled,15/11/2023,9876543210\n";
        let out: Normalized<ContactRecord> = normalize_text(text, &ctx())?;
        let c = &out.records[0];
        assert_eq!(c.name, "Rahul");
        assert_eq!(c.status, "scheduled");
        assert!(!c.is_converted());
        assert!(!c.has_visit_scheduled());
        assert_eq!(c.date, NaiveDate::from_ymd_opt(2023, 11, 15));
        Ok(())
    }

    #[test]
    fn garbled_dates_drop_the_row_but_blank_ones_do_not() -> Result<()> {
        let text = "DATE/TIME,NAME,NUMBER\ngarbage,Asha,9876500001\n,Ravi,9876500002\n08/01/2024,Meena,9876500003\n";
        let out: Normalized<ContactRecord> = normalize_text(text, &ctx())?;
        assert_eq!(out.dropped, 1);
        let names: Vec<&str> = out.records.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Ravi", "Meena"]);
        assert_eq!(out.records[0].date, None);
        Ok(())
    }
}

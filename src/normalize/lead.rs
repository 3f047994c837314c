// src/normalize/lead.rs
use super::{Normalize, SourceContext};
use crate::dates::parse_date;
use crate::table::{ColumnIndex, FieldSpec};
use chrono::NaiveDate;
use serde::Serialize;

/// One of the three follow-up visits tracked per lead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VisitStage {
    pub status: String,
    pub date: String,
}

impl VisitStage {
    pub fn is_done(&self) -> bool {
        self.status.eq_ignore_ascii_case("done")
    }

    pub fn is_scheduled(&self) -> bool {
        !self.date.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadRecord {
    pub id: String,
    pub date: NaiveDate,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub city: String,
    pub occupation: String,
    /// Dealer, investor or end user.
    pub category: String,
    /// Where the lead came from (Google ad, Facebook, ...).
    pub channel: String,
    pub telecaller: String,
    pub planning_visit: String,
    pub comment: String,
    pub status: String,
    pub project_map_sent: String,
    pub photo_video: String,
    pub property_need: String,
    pub project_interest: String,
    pub plot_size: String,
    pub property_number: String,
    pub visit_date: String,
    pub visit_done: String,
    pub post_visit_feedback: String,
    pub visit_stages: [VisitStage; 3],
}

pub const LEAD_TYPES: [&str; 5] = [
    "Good Lead",
    "Hot Lead",
    "Transferred to Sales Coordinator",
    "Junk Lead",
    "Transferred to Salesman",
];

const CONVERTED_STATUSES: [&str; 3] = [
    "Hot Lead",
    "Transferred to Sales Coordinator",
    "Transferred to Salesman",
];

const STAGES: &[&str] = &["1st", "2nd", "3rd"];

const LEAD_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("date_time", &["DATE/TIME"]),
    FieldSpec::new("name", &["NAME"]),
    FieldSpec::new("number", &["NUMBER"]).excluding(&["PROPERTY NUMBER"]),
    FieldSpec::new("email", &["EMAIL"]),
    FieldSpec::new("city", &["CITY"]),
    FieldSpec::new("occupation", &["OCCUPATION"]),
    FieldSpec::new("category", &["Dealer / Invester/ Enduser", "Dealer"]),
    FieldSpec::new("channel", &["Google add / facebook/ Instagram/ Flex", "Google add"]),
    FieldSpec::new("telecaller", &["REACHED BY WHICH TELECALLER", "TELECALLER"]),
    FieldSpec::new("planning_visit", &["PLANNING FOR VISIT"]),
    FieldSpec::new("comment", &["Comment/feedback"]),
    FieldSpec::new("status", &["Status"]).excluding(STAGES),
    FieldSpec::new("project_map", &["PROJECT MAP/ PAYMENT PLAN SENT ?", "PROJECT MAP"]),
    FieldSpec::new("photo_video", &["PHOTO/ VIDEO"]),
    FieldSpec::new("visit_date", &["Visit Date"]).excluding(STAGES),
    FieldSpec::new("visit_done", &["Visit done"]),
    FieldSpec::new("post_visit_feedback", &["POST-VISIT FEEDBACK"]),
    FieldSpec::new(
        "property_need",
        &["NewPlot/ Villa / Resale plots /Booth/ Flat/ kothi", "NewPlot"],
    ),
    FieldSpec::new(
        "project_interest",
        &["Virat Greens/ Virat Crown/ Both Projects", "Both Projects"],
    ),
    FieldSpec::new("plot_size", &["Plot Size Requirement", "Plot Size"]),
    FieldSpec::new("property_number", &["PROPERTY NUMBER"]),
    FieldSpec::new("stage1_status", &["1st Visit Status"]),
    FieldSpec::new("stage2_status", &["2nd Visit Status"]),
    FieldSpec::new("stage3_status", &["3rd Visit Status"]),
    FieldSpec::new("stage1_date", &["1st Visit Date"]),
    FieldSpec::new("stage2_date", &["2nd Visit Date"]),
    FieldSpec::new("stage3_date", &["3rd Visit Date"]),
];

impl LeadRecord {
    pub fn is_converted(&self) -> bool {
        CONVERTED_STATUSES.contains(&self.status.as_str())
    }

    pub fn first_visit_done(&self) -> bool {
        self.visit_stages[0].is_done()
    }

    pub fn any_visit_done(&self) -> bool {
        self.visit_stages.iter().any(VisitStage::is_done)
    }

    pub fn any_visit_scheduled(&self) -> bool {
        self.visit_stages.iter().any(VisitStage::is_scheduled)
    }

    pub fn visit_marked_done(&self) -> bool {
        self.visit_done.eq_ignore_ascii_case("done")
    }
}

impl Normalize for LeadRecord {
    const KIND: &'static str = "lead";
    const MARKERS: &'static [&'static str] = &["DATE/TIME"];
    const FIELDS: &'static [FieldSpec] = LEAD_FIELDS;

    fn normalize(
        row: &[String],
        index: usize,
        cols: &ColumnIndex,
        ctx: &SourceContext<'_>,
    ) -> Option<Self> {
        let date = parse_date(cols.cell(row, "date_time")?, ctx.date_order)?;
        let t = |field: &str| cols.text(row, field);
        let stage = |n: usize| VisitStage {
            status: t(&format!("stage{}_status", n)),
            date: t(&format!("stage{}_date", n)),
        };

        Some(LeadRecord {
            id: format!("lead-{}", index + 1),
            date,
            name: t("name"),
            phone: t("number"),
            email: t("email"),
            city: t("city"),
            occupation: t("occupation"),
            category: t("category"),
            channel: t("channel"),
            telecaller: t("telecaller"),
            planning_visit: t("planning_visit"),
            comment: t("comment"),
            status: t("status"),
            project_map_sent: t("project_map"),
            photo_video: t("photo_video"),
            property_need: t("property_need"),
            project_interest: t("project_interest"),
            plot_size: t("plot_size"),
            property_number: t("property_number"),
            visit_date: t("visit_date"),
            visit_done: t("visit_done"),
            post_visit_feedback: t("post_visit_feedback"),
            visit_stages: [stage(1), stage(2), stage(3)],
        })
    }
}

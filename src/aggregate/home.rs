// src/aggregate/home.rs
use super::{percent, tally, AggregateContext, Summarize, Tally, NO_SEED};
use crate::dates::Dated;
use crate::normalize::ContactRecord;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentLead {
    pub date: NaiveDate,
    pub name: String,
    pub contact: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HomeSummary {
    /// Distinct phone numbers across every sheet.
    pub total_leads: u64,
    /// Distinct phone numbers with a converted status.
    pub converted_deals: u64,
    pub conversion_percent: u64,
    pub scheduled_visits: u64,
    pub completed_visits: u64,
    pub completion_percent: u64,
    pub leads_by_source: Tally,
    pub leads_by_project: Tally,
    pub recent_leads: Vec<RecentLead>,
}

impl Dated for ContactRecord {
    fn record_date(&self) -> Option<NaiveDate> {
        self.date
    }
}

impl Summarize for ContactRecord {
    type Snapshot = HomeSummary;

    fn summarize(records: &[&Self], ctx: &AggregateContext<'_>) -> HomeSummary {
        let phones: HashSet<&str> = records.iter().map(|c| c.phone.as_str()).collect();
        let total_leads = phones.len() as u64;
        // counted per phone like the total, so the rate stays within 100
        let converted: HashSet<&str> = records
            .iter()
            .filter(|c| c.is_converted())
            .map(|c| c.phone.as_str())
            .collect();
        let converted_deals = converted.len() as u64;
        let scheduled_visits = records.iter().filter(|c| c.has_visit_scheduled()).count() as u64;
        let completed_visits = records.iter().filter(|c| c.visit_completed()).count() as u64;

        // dated within the last `recent_days`, future dates included
        let mut recent: Vec<RecentLead> = records
            .iter()
            .filter_map(|c| {
                let date = c.date?;
                ((ctx.today - date).num_days() < i64::from(ctx.recent_days)).then(|| RecentLead {
                    date,
                    name: non_empty_or(&c.name, "Unknown"),
                    contact: c.phone.clone(),
                    status: non_empty_or(&c.status, "New"),
                })
            })
            .collect();
        recent.sort_by(|a, b| b.date.cmp(&a.date));
        recent.truncate(ctx.recent_limit);

        HomeSummary {
            total_leads,
            converted_deals,
            conversion_percent: percent(converted_deals, total_leads),
            scheduled_visits,
            completed_visits,
            completion_percent: percent(completed_visits, scheduled_visits),
            leads_by_source: tally(records.iter().copied(), NO_SEED, |c| Some(&c.channel)),
            leads_by_project: tally(records.iter().copied(), NO_SEED, |c| Some(&c.project)),
            recent_leads: recent,
        }
    }
}

fn non_empty_or(text: &str, fallback: &str) -> String {
    if text.trim().is_empty() {
        fallback.to_string()
    } else {
        text.to_string()
    }
}

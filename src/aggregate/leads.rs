// src/aggregate/leads.rs
use super::{percent, rate, tally, AggregateContext, Summarize, Tally, NO_SEED};
use crate::dates::Dated;
use crate::normalize::lead::LEAD_TYPES;
use crate::normalize::LeadRecord;
use chrono::NaiveDate;
use serde::Serialize;

/// Post-visit feedback, matched case-insensitively on the whole cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeedbackCounts {
    pub positive: u64,
    pub negative: u64,
    pub satisfied: u64,
    pub pending: u64,
}

impl FeedbackCounts {
    fn record(&mut self, feedback: &str) {
        match feedback.trim().to_lowercase().as_str() {
            "positive" => self.positive += 1,
            "negative" => self.negative += 1,
            "satisfied" => self.satisfied += 1,
            "pending" => self.pending += 1,
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelecallerConversion {
    pub telecaller: String,
    pub leads: u64,
    pub converted: u64,
    pub conversion_percent: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadMetrics {
    pub total_leads: u64,
    pub by_telecaller: Tally,
    pub by_channel: Tally,
    pub by_status: Tally,
    /// Only the five known lead types, zero when absent.
    pub lead_types: Tally,
    pub by_property_need: Tally,
    pub by_project_interest: Tally,
    pub feedback: FeedbackCounts,
    pub first_visit_done: u64,
    /// Leads with any of the three visits marked done.
    pub visits_done: u64,
    /// Leads with any of the three visits dated.
    pub visits_planned: u64,
    pub visit_done_rate: f64,
    pub done_scheduled_rate: f64,
    /// Leads with no status yet.
    pub awaiting_qualification: u64,
    /// Busiest telecaller first.
    pub conversions: Vec<TelecallerConversion>,
}

impl Dated for LeadRecord {
    fn record_date(&self) -> Option<NaiveDate> {
        Some(self.date)
    }
}

impl Summarize for LeadRecord {
    type Snapshot = LeadMetrics;

    fn summarize(records: &[&Self], _ctx: &AggregateContext<'_>) -> LeadMetrics {
        let leads = records.iter().copied();
        let total_leads = records.len() as u64;

        let by_telecaller = tally(leads.clone(), NO_SEED, |l| Some(&l.telecaller));
        let by_status = tally(leads.clone(), NO_SEED, |l| Some(&l.status));
        let lead_types = tally(leads.clone(), LEAD_TYPES, |l| {
            let s = l.status.trim();
            LEAD_TYPES.contains(&s).then_some(s)
        });

        let mut feedback = FeedbackCounts::default();
        for l in records {
            feedback.record(&l.post_visit_feedback);
        }

        let first_visit_done = records.iter().filter(|l| l.first_visit_done()).count() as u64;
        let visits_done = records.iter().filter(|l| l.any_visit_done()).count() as u64;
        let visits_planned = records.iter().filter(|l| l.any_visit_scheduled()).count() as u64;

        let conversions = by_telecaller
            .ranked()
            .into_iter()
            .map(|(name, n)| {
                let converted = records
                    .iter()
                    .filter(|l| l.telecaller.trim() == name && l.is_converted())
                    .count() as u64;
                TelecallerConversion {
                    telecaller: name.to_string(),
                    leads: n,
                    converted,
                    conversion_percent: percent(converted, n),
                }
            })
            .collect();

        LeadMetrics {
            total_leads,
            by_channel: tally(leads.clone(), NO_SEED, |l| Some(&l.channel)),
            by_property_need: tally(leads.clone(), NO_SEED, |l| Some(&l.property_need)),
            by_project_interest: tally(leads.clone(), NO_SEED, |l| {
                Some(&l.project_interest)
            }),
            by_telecaller,
            by_status,
            lead_types,
            feedback,
            first_visit_done,
            visits_done,
            visits_planned,
            visit_done_rate: rate(first_visit_done, total_leads),
            done_scheduled_rate: rate(visits_done, visits_planned),
            awaiting_qualification: records.iter().filter(|l| l.status.trim().is_empty()).count()
                as u64,
            conversions,
        }
    }
}

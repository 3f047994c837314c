// src/aggregate/visits.rs
use super::{tally, AggregateContext, Summarize, Tally, NO_SEED};
use crate::dates::Dated;
use crate::normalize::{VisitRecord, VisitStatus};
use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisitsOnDay {
    pub date: NaiveDate,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitMetrics {
    pub total_visits: u64,
    pub by_status: Tally,
    pub by_project: Tally,
    /// Calendar entries from today on, earliest first.
    pub upcoming_by_day: Vec<VisitsOnDay>,
    /// Visits in the seven days starting today.
    pub this_week: u64,
    pub next_week: u64,
    pub upcoming: Vec<VisitRecord>,
}

impl Dated for VisitRecord {
    fn record_date(&self) -> Option<NaiveDate> {
        Some(self.date)
    }
}

impl Summarize for VisitRecord {
    type Snapshot = VisitMetrics;

    fn summarize(records: &[&Self], ctx: &AggregateContext<'_>) -> VisitMetrics {
        let today = ctx.today;
        let week = |n: u64| {
            let from = today.checked_add_days(Days::new(7 * n)).unwrap_or(NaiveDate::MAX);
            let to = from.checked_add_days(Days::new(7)).unwrap_or(NaiveDate::MAX);
            records.iter().filter(|v| v.date >= from && v.date < to).count() as u64
        };

        let mut upcoming: Vec<VisitRecord> = records
            .iter()
            .filter(|v| v.date >= today)
            .map(|v| (*v).clone())
            .collect();
        upcoming.sort_by_key(|v| (v.date, v.time));

        let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
        for v in &upcoming {
            *per_day.entry(v.date).or_default() += 1;
        }

        let statuses: Vec<&str> = VisitStatus::ALL.iter().map(VisitStatus::as_str).collect();
        VisitMetrics {
            total_visits: records.len() as u64,
            by_status: tally(records.iter().copied(), statuses, |v| Some(v.status.as_str())),
            by_project: tally(records.iter().copied(), NO_SEED, |v| Some(&v.project)),
            upcoming_by_day: per_day
                .into_iter()
                .map(|(date, count)| VisitsOnDay { date, count })
                .collect(),
            this_week: week(0),
            next_week: week(1),
            upcoming,
        }
    }
}

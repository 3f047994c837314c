// src/aggregate/calls.rs
use super::{rate, tally, AggregateContext, Keyed, Summarize, Tally};
use crate::dates::Dated;
use crate::duration::{format_duration, format_total_duration};
use crate::normalize::{CallRecord, CallType};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentCallStats {
    pub total_calls: u64,
    pub incoming: u64,
    pub outgoing: u64,
    pub missed: u64,
    pub did_not_connect: u64,
    /// Talk time over incoming and outgoing calls.
    pub total_duration_secs: u64,
    pub average_duration_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub calls: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallMetrics {
    pub total_calls: u64,
    pub by_type: Tally,
    /// Calls that fit none of the four types.
    pub unclassified: u64,
    pub type_rates: Keyed<f64>,
    pub total_duration_secs: u64,
    pub total_duration: String,
    pub average_duration_secs: f64,
    pub average_duration: String,
    pub by_agent: Keyed<AgentCallStats>,
    pub daily: Vec<DailyCount>,
}

/// Mean over the calls that recorded any talk time.
fn average_talk_time<'a>(calls: impl Iterator<Item = &'a CallRecord>) -> f64 {
    let (sum, n) = calls
        .filter(|c| c.duration_seconds > 0)
        .fold((0u64, 0u64), |(s, n), c| (s + c.duration_seconds, n + 1));
    if n == 0 {
        0.0
    } else {
        sum as f64 / n as f64
    }
}

impl Dated for CallRecord {
    fn record_date(&self) -> Option<NaiveDate> {
        Some(self.date)
    }
}

impl Summarize for CallRecord {
    type Snapshot = CallMetrics;

    fn summarize(records: &[&Self], ctx: &AggregateContext<'_>) -> CallMetrics {
        let total_calls = records.len() as u64;

        let seed: Vec<&str> = CallType::CLASSIFIED.iter().map(CallType::as_str).collect();
        let by_type = tally(records.iter().copied(), seed, |c: &CallRecord| {
            (c.call_type != CallType::Unknown).then_some(c.call_type.as_str())
        });
        let classified = by_type.total();

        let mut type_rates = Keyed::<f64>::new();
        for (k, v) in by_type.iter() {
            *type_rates.entry_or_default(k) = rate(*v, total_calls);
        }

        let total_duration_secs: u64 = records
            .iter()
            .filter(|c| c.call_type.is_connected())
            .map(|c| c.duration_seconds)
            .sum();
        let average_duration_secs = average_talk_time(records.iter().copied());

        let mut by_agent = Keyed::<AgentCallStats>::seeded(ctx.known_agents);
        for c in records {
            let stats = by_agent.entry_or_default(&c.telecaller);
            stats.total_calls += 1;
            match c.call_type {
                CallType::Incoming => stats.incoming += 1,
                CallType::Outgoing => stats.outgoing += 1,
                CallType::Missed => stats.missed += 1,
                CallType::DidNotConnect => stats.did_not_connect += 1,
                CallType::Unknown => {}
            }
            if c.call_type.is_connected() {
                stats.total_duration_secs += c.duration_seconds;
            }
        }
        let names: Vec<String> = by_agent.keys().map(str::to_string).collect();
        for name in names {
            let avg = average_talk_time(records.iter().copied().filter(|c| c.telecaller == name));
            by_agent.entry_or_default(&name).average_duration_secs = avg;
        }

        let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
        for c in records {
            *per_day.entry(c.date).or_default() += 1;
        }
        let daily = per_day
            .into_iter()
            .map(|(date, calls)| DailyCount { date, calls })
            .collect();

        CallMetrics {
            total_calls,
            unclassified: total_calls - classified,
            by_type,
            type_rates,
            total_duration_secs,
            total_duration: format_total_duration(total_duration_secs as f64),
            average_duration_secs,
            average_duration: format_duration(average_duration_secs),
            by_agent,
            daily,
        }
    }
}

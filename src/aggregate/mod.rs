// src/aggregate/mod.rs
use crate::config::Settings;
use crate::dates::{DateWindow, Dated};
use crate::normalize::TargetRecord;
use chrono::NaiveDate;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt::Debug;

pub mod calls;
pub mod deals;
pub mod home;
pub mod leads;
pub mod visits;

pub use calls::{AgentCallStats, CallMetrics, DailyCount};
pub use deals::DealMetrics;
pub use home::{HomeSummary, RecentLead};
pub use leads::{FeedbackCounts, LeadMetrics};
pub use visits::{VisitMetrics, VisitsOnDay};

/// String-keyed map that remembers insertion order. Seeded keys keep their
/// place (and a zero value) even when no record mentions them.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyed<T> {
    entries: Vec<(String, T)>,
}

pub type Tally = Keyed<u64>;

impl<T> Default for Keyed<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: Default> Keyed<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = Self::new();
        for k in keys {
            out.entry_or_default(k.as_ref());
        }
        out
    }

    pub fn entry_or_default(&mut self, key: &str) -> &mut T {
        let pos = match self.entries.iter().position(|(k, _)| k == key) {
            Some(p) => p,
            None => {
                self.entries.push((key.to_string(), T::default()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[pos].1
    }
}

impl<T> Keyed<T> {
    pub fn get(&self, key: &str) -> Option<&T> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Tally {
    pub fn bump(&mut self, key: &str) {
        *self.entry_or_default(key) += 1;
    }

    pub fn count(&self, key: &str) -> u64 {
        self.get(key).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, v)| v).sum()
    }

    /// Largest first; equal counts keep insertion order.
    pub fn ranked(&self) -> Vec<(&str, u64)> {
        let mut out: Vec<(&str, u64)> = self.iter().map(|(k, v)| (k, *v)).collect();
        out.sort_by(|a, b| b.1.cmp(&a.1));
        out
    }
}

impl<T: Serialize> Serialize for Keyed<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// `count / total`, 0 when `total` is 0.
pub fn rate(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

/// [`rate`] as a whole-number percentage.
pub fn percent(count: u64, total: u64) -> u64 {
    (rate(count, total) * 100.0).round() as u64
}

pub const NO_SEED: [&str; 0] = [];

/// Count records per class. Records the classifier returns `None` for
/// (blank category) are left out; `seed` keys are present even at zero.
pub fn tally<'r, R, I, S, K, F>(records: I, seed: S, mut classify: F) -> Tally
where
    R: 'r + ?Sized,
    I: IntoIterator<Item = &'r R>,
    S: IntoIterator,
    S::Item: AsRef<str>,
    K: AsRef<str>,
    F: FnMut(&'r R) -> Option<K>,
{
    let mut out = Tally::seeded(seed);
    for r in records {
        if let Some(k) = classify(r) {
            let k = k.as_ref().trim();
            if !k.is_empty() {
                out.bump(k);
            }
        }
    }
    out
}

/// Everything a summary needs besides the records themselves.
#[derive(Debug, Clone)]
pub struct AggregateContext<'a> {
    pub today: NaiveDate,
    pub known_agents: &'a [String],
    pub targets: &'a [TargetRecord],
    pub revenue_target: f64,
    pub recent_days: u32,
    pub recent_limit: usize,
}

impl<'a> AggregateContext<'a> {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            known_agents: &[],
            targets: &[],
            revenue_target: 120_000_000.0,
            recent_days: 7,
            recent_limit: 5,
        }
    }

    pub fn from_settings(settings: &Settings, known_agents: &'a [String], today: NaiveDate) -> Self {
        Self {
            today,
            known_agents,
            targets: &[],
            revenue_target: settings.revenue_target,
            recent_days: settings.recent_lead_days,
            recent_limit: settings.recent_lead_limit,
        }
    }

    pub fn with_targets(mut self, targets: &'a [TargetRecord]) -> Self {
        self.targets = targets;
        self
    }
}

/// A record type with a metrics snapshot. The snapshot is rebuilt from
/// scratch on every call.
pub trait Summarize: Dated + Sized {
    type Snapshot: Serialize + Clone + Debug;

    fn summarize(records: &[&Self], ctx: &AggregateContext<'_>) -> Self::Snapshot;
}

/// Keep the records inside `window` and summarize them.
pub fn aggregate<R: Summarize>(
    records: &[R],
    window: &DateWindow,
    ctx: &AggregateContext<'_>,
) -> R::Snapshot {
    let inside: Vec<&R> = records.iter().filter(|r| window.admits(*r)).collect();
    R::summarize(&inside, ctx)
}

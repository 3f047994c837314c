// src/view.rs
//! Filtering, searching, sorting and paging of normalized records for the
//! tables. Pure functions over borrowed records; nothing here mutates.

use crate::config::Role;
use crate::dates::{DateWindow, Dated};
use crate::normalize::{CallRecord, CallType, ContactRecord, DealRecord, LeadRecord, VisitRecord};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Categorical fields a filter can pin to one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facet {
    Role,
    Agent,
    CallType,
    Status,
    Project,
    Channel,
    PropertyNeed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisitProgress {
    Done,
    Pending,
    Scheduled,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

/// The user's current table settings. Every criterion is optional; set
/// criteria are AND-ed. A criterion on a field the record type does not
/// carry is ignored for that type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    pub window: Option<DateWindow>,
    pub role: Option<Role>,
    pub agent: Option<String>,
    pub call_type: Option<CallType>,
    pub status: Option<String>,
    pub project: Option<String>,
    pub channel: Option<String>,
    pub property_need: Option<String>,
    pub visit_progress: Option<VisitProgress>,
    pub search: String,
    pub sort: Option<SortSpec>,
    pub page: Option<Page>,
}

impl FilterState {
    /// The same criteria over the whole matching set.
    pub fn unpaged(&self) -> FilterState {
        FilterState {
            page: None,
            ..self.clone()
        }
    }

    fn pinned(&self) -> Vec<(Facet, Cow<'_, str>)> {
        let mut out: Vec<(Facet, Cow<'_, str>)> = Vec::new();
        if let Some(r) = self.role {
            out.push((Facet::Role, Cow::Owned(r.to_string())));
        }
        if let Some(t) = self.call_type {
            out.push((Facet::CallType, Cow::Borrowed(t.as_str())));
        }
        let texts = [
            (Facet::Agent, &self.agent),
            (Facet::Status, &self.status),
            (Facet::Project, &self.project),
            (Facet::Channel, &self.channel),
            (Facet::PropertyNeed, &self.property_need),
        ];
        for (facet, value) in texts {
            if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                out.push((facet, Cow::Borrowed(v)));
            }
        }
        out
    }
}

/// A record the table views can filter and sort.
pub trait Selectable: Dated {
    /// `None` when this record type has no such field.
    fn facet(&self, facet: Facet) -> Option<Cow<'_, str>>;

    /// Text fields the search box looks through.
    fn search_fields(&self) -> Vec<&str>;

    /// String projection of a sortable field; `None` for unknown fields.
    fn sort_key(&self, field: &str) -> Option<String>;

    fn matches_progress(&self, _progress: VisitProgress) -> bool {
        true
    }
}

/// Zero-padded so that string order equals numeric order. Negatives sort
/// below every non-negative value, with their digits complemented so a
/// larger magnitude sorts lower.
fn numeric_key(n: f64) -> String {
    let padded = format!("{:024.4}", n.abs());
    if n < 0.0 {
        let flipped: String = padded
            .chars()
            .map(|c| match c.to_digit(10) {
                Some(d) => char::from_digit(9 - d, 10).unwrap_or(c),
                None => c,
            })
            .collect();
        format!("0{}", flipped)
    } else {
        format!("1{}", padded)
    }
}

fn matches<R: Selectable>(
    record: &R,
    filter: &FilterState,
    pinned: &[(Facet, Cow<'_, str>)],
    needle: &str,
) -> bool {
    if let Some(window) = &filter.window {
        if !window.admits(record) {
            return false;
        }
    }
    for (facet, wanted) in pinned {
        if let Some(have) = record.facet(*facet) {
            if have.trim() != wanted.as_ref() {
                return false;
            }
        }
    }
    if let Some(p) = filter.visit_progress {
        if !record.matches_progress(p) {
            return false;
        }
    }
    needle.is_empty()
        || record
            .search_fields()
            .iter()
            .any(|f| f.to_lowercase().contains(needle))
}

/// Apply `filter` to `records`: keep the matches, sort them (stable, so
/// equal keys keep input order) and cut the requested page.
pub fn select<'r, R: Selectable>(records: &'r [R], filter: &FilterState) -> Vec<&'r R> {
    select_indices(records, filter)
        .into_iter()
        .map(|i| &records[i])
        .collect()
}

/// Same as [`select`], as positions into `records`.
pub fn select_indices<R: Selectable>(records: &[R], filter: &FilterState) -> Vec<usize> {
    let pinned = filter.pinned();
    let needle = filter.search.trim().to_lowercase();
    let mut out: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| matches(*r, filter, &pinned, &needle))
        .map(|(i, _)| i)
        .collect();

    if let Some(sort) = &filter.sort {
        let mut keyed: Vec<(String, usize)> = out
            .into_iter()
            .map(|i| (records[i].sort_key(&sort.field).unwrap_or_default(), i))
            .collect();
        keyed.sort_by(|a, b| {
            let ord: Ordering = a.0.cmp(&b.0);
            match sort.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
        out = keyed.into_iter().map(|(_, i)| i).collect();
    }

    match filter.page {
        Some(page) => out.into_iter().skip(page.offset).take(page.limit).collect(),
        None => out,
    }
}

/// Sorted, de-duplicated non-empty values of `facet`, for dropdowns.
pub fn distinct_values<R: Selectable>(records: &[R], facet: Facet) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r.facet(facet))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn distinct_agents<R: Selectable>(records: &[R]) -> Vec<String> {
    distinct_values(records, Facet::Agent)
}

impl Selectable for CallRecord {
    fn facet(&self, facet: Facet) -> Option<Cow<'_, str>> {
        match facet {
            Facet::Role => self.role.map(|r| Cow::Owned(r.to_string())),
            Facet::Agent => Some(Cow::Borrowed(self.telecaller.as_str())),
            Facet::CallType => Some(Cow::Borrowed(self.call_type.as_str())),
            Facet::Status => Some(Cow::Borrowed(self.status.as_str())),
            _ => None,
        }
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![
            self.customer_name.as_str(),
            self.from_number.as_str(),
            self.to_number.as_str(),
            self.notes.as_str(),
        ];
        fields.extend(self.recording.filenames.iter().map(String::as_str));
        fields
    }

    fn sort_key(&self, field: &str) -> Option<String> {
        Some(match field {
            "date" => format!(
                "{}T{}",
                self.date,
                self.time.map(|t| t.to_string()).unwrap_or_default()
            ),
            "customer" | "name" => self.customer_name.to_lowercase(),
            "agent" | "telecaller" => self.telecaller.to_lowercase(),
            "type" => self.call_type.as_str().to_lowercase(),
            "duration" => numeric_key(self.duration_seconds as f64),
            "status" => self.status.as_str().to_lowercase(),
            _ => return None,
        })
    }
}

impl Selectable for LeadRecord {
    fn facet(&self, facet: Facet) -> Option<Cow<'_, str>> {
        let v: &str = match facet {
            Facet::Agent => &self.telecaller,
            Facet::Status => &self.status,
            Facet::Project => &self.project_interest,
            Facet::Channel => &self.channel,
            Facet::PropertyNeed => &self.property_need,
            Facet::Role | Facet::CallType => return None,
        };
        Some(Cow::Borrowed(v))
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.name.as_str(),
            self.phone.as_str(),
            self.property_number.as_str(),
        ]
    }

    fn sort_key(&self, field: &str) -> Option<String> {
        Some(match field {
            "date" => self.date.to_string(),
            "name" => self.name.to_lowercase(),
            "number" | "phone" => self.phone.clone(),
            "status" => self.status.to_lowercase(),
            "propertyNeed" | "property_need" => self.property_need.to_lowercase(),
            "telecaller" | "agent" => self.telecaller.to_lowercase(),
            _ => return None,
        })
    }

    fn matches_progress(&self, progress: VisitProgress) -> bool {
        match progress {
            VisitProgress::Done => self.visit_marked_done(),
            VisitProgress::Pending => self.visit_done.trim().is_empty(),
            VisitProgress::Scheduled => !self.visit_date.trim().is_empty(),
        }
    }
}

impl Selectable for VisitRecord {
    fn facet(&self, facet: Facet) -> Option<Cow<'_, str>> {
        match facet {
            Facet::Status => Some(Cow::Borrowed(self.status.as_str())),
            Facet::Project => Some(Cow::Borrowed(self.project.as_str())),
            _ => None,
        }
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.customer_name.as_str(),
            self.project.as_str(),
            self.phone.as_str(),
        ]
    }

    fn sort_key(&self, field: &str) -> Option<String> {
        Some(match field {
            "date" => format!(
                "{}T{}",
                self.date,
                self.time.map(|t| t.to_string()).unwrap_or_default()
            ),
            "customer" | "name" => self.customer_name.to_lowercase(),
            "project" => self.project.to_lowercase(),
            "status" => self.status.as_str().to_string(),
            _ => return None,
        })
    }
}

impl Selectable for DealRecord {
    fn facet(&self, facet: Facet) -> Option<Cow<'_, str>> {
        match facet {
            Facet::Status => Some(Cow::Borrowed(self.status.as_str())),
            Facet::Project => Some(Cow::Borrowed(self.project.as_str())),
            _ => None,
        }
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.customer_name.as_str(),
            self.project.as_str(),
            self.phone.as_str(),
        ]
    }

    fn sort_key(&self, field: &str) -> Option<String> {
        Some(match field {
            "date" => self.date.to_string(),
            "customer" | "name" => self.customer_name.to_lowercase(),
            "project" => self.project.to_lowercase(),
            "status" => self.status.clone(),
            "value" => numeric_key(self.value),
            _ => return None,
        })
    }
}

impl Selectable for ContactRecord {
    fn facet(&self, facet: Facet) -> Option<Cow<'_, str>> {
        match facet {
            Facet::Status => Some(Cow::Borrowed(self.status.as_str())),
            Facet::Project => Some(Cow::Borrowed(self.project.as_str())),
            Facet::Channel => Some(Cow::Borrowed(self.channel.as_str())),
            _ => None,
        }
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.phone.as_str()]
    }

    fn sort_key(&self, field: &str) -> Option<String> {
        Some(match field {
            "date" => self.date.map(|d| d.to_string()).unwrap_or_default(),
            "name" => self.name.to_lowercase(),
            "phone" => self.phone.clone(),
            "status" => self.status.to_lowercase(),
            _ => return None,
        })
    }

    fn matches_progress(&self, progress: VisitProgress) -> bool {
        match progress {
            VisitProgress::Done => self.visit_completed(),
            VisitProgress::Pending => self.has_visit_scheduled() && !self.visit_completed(),
            VisitProgress::Scheduled => self.has_visit_scheduled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{CallStatus, VisitStatus};
    use crate::recording::RecordingRef;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn call(id: &str, agent: &str, d: u32, from: &str, to: &str, name: &str) -> CallRecord {
        CallRecord {
            id: id.into(),
            sr_no: 1,
            customer_name: name.into(),
            from_number: from.into(),
            to_number: to.into(),
            date: day(d),
            time: None,
            duration: String::new(),
            duration_seconds: d as u64 * 10,
            call_type: CallType::Incoming,
            telecaller: agent.into(),
            role: Some(Role::Telecaller),
            status: CallStatus::PendingReview,
            notes: format!("Call with {}", name),
            recording: RecordingRef::default(),
        }
    }

    fn calls() -> Vec<CallRecord> {
        vec![
            call("a", "Simran", 3, "8556896739", "9990001111", "John"),
            call("b", "Raman", 1, "7000000000", "8556896739", "Meera"),
            call("c", "Simran", 2, "9990002222", "8556896739", "asha"),
            call("d", "Rupali", 3, "1234599900", "5550000000", "Zed"),
            call("e", "Raman", 3, "4440000000", "5550000000", "Bob"),
        ]
    }

    fn ids<R>(rows: &[&R], id: impl Fn(&R) -> &str) -> Vec<String> {
        rows.iter().map(|r| id(r).to_string()).collect()
    }

    #[test]
    fn empty_filter_keeps_input_order() {
        let rows = calls();
        let out = select(&rows, &FilterState::default());
        assert_eq!(ids(&out, |c| &c.id), vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn search_matches_phone_case_insensitively() {
        let rows = calls();
        let filter = FilterState {
            search: "999".into(),
            ..Default::default()
        };
        let out = select(&rows, &filter);
        assert_eq!(ids(&out, |c| &c.id), vec!["a", "c", "d"]);

        let by_name = FilterState {
            search: "ASHA".into(),
            ..Default::default()
        };
        assert_eq!(ids(&select(&rows, &by_name), |c| &c.id), vec!["c"]);
    }

    #[test]
    fn criteria_are_and_ed() {
        let rows = calls();
        let filter = FilterState {
            agent: Some("Simran".into()),
            window: Some(DateWindow::new(day(2), day(3))),
            role: Some(Role::Telecaller),
            ..Default::default()
        };
        assert_eq!(ids(&select(&rows, &filter), |c| &c.id), vec!["a", "c"]);

        let none = FilterState {
            call_type: Some(CallType::Missed),
            ..Default::default()
        };
        assert!(select(&rows, &none).is_empty());
    }

    #[test]
    fn sort_is_stable_and_idempotent() {
        let rows = calls();
        let filter = FilterState {
            sort: Some(SortSpec::desc("date")),
            ..Default::default()
        };
        let once = select(&rows, &filter);
        assert_eq!(ids(&once, |c| &c.id), vec!["a", "d", "e", "c", "b"]);
        let twice = select(&rows, &filter);
        assert_eq!(once, twice);

        let by_agent = FilterState {
            sort: Some(SortSpec::asc("agent")),
            ..Default::default()
        };
        assert_eq!(
            ids(&select(&rows, &by_agent), |c| &c.id),
            vec!["b", "e", "d", "a", "c"]
        );
    }

    #[test]
    fn numeric_fields_sort_numerically() {
        let mut rows = calls();
        rows[0].duration_seconds = 100;
        rows[1].duration_seconds = 9;
        let filter = FilterState {
            sort: Some(SortSpec::asc("duration")),
            ..Default::default()
        };
        let out = select(&rows, &filter);
        assert_eq!(out[0].id, "b");
        assert_eq!(out[4].id, "a");
    }

    #[test]
    fn negative_values_sort_below_zero() {
        let deal = |id: &str, value: f64| DealRecord {
            id: id.into(),
            customer_name: id.into(),
            project: "Virat Greens".into(),
            unit: String::new(),
            status: "lost".into(),
            value,
            date: day(4),
            phone: String::new(),
        };
        let rows = vec![
            deal("zero", 0.0),
            deal("small-refund", -50.0),
            deal("sale", 250_000.0),
            deal("big-refund", -12_000.5),
        ];
        let filter = FilterState {
            sort: Some(SortSpec::asc("value")),
            ..Default::default()
        };
        assert_eq!(
            ids(&select(&rows, &filter), |d| &d.id),
            vec!["big-refund", "small-refund", "zero", "sale"]
        );
    }

    #[test]
    fn call_type_pin_survives_serialization() -> anyhow::Result<()> {
        let filter = FilterState {
            call_type: Some(CallType::DidNotConnect),
            search: "999".into(),
            ..Default::default()
        };
        let json = serde_json::to_string(&filter)?;
        assert!(json.contains("Did Not Connect"));
        let back: FilterState = serde_json::from_str(&json)?;
        assert_eq!(back, filter);
        Ok(())
    }

    #[test]
    fn unknown_sort_field_keeps_order() {
        let rows = calls();
        let filter = FilterState {
            sort: Some(SortSpec::desc("nope")),
            ..Default::default()
        };
        assert_eq!(ids(&select(&rows, &filter), |c| &c.id), vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn pages_after_sorting() {
        let rows = calls();
        let filter = FilterState {
            sort: Some(SortSpec::asc("name")),
            page: Some(Page { offset: 1, limit: 2 }),
            ..Default::default()
        };
        assert_eq!(ids(&select(&rows, &filter), |c| &c.id), vec!["e", "a"]);
    }

    #[test]
    fn unsupported_facets_are_ignored() {
        let visits = vec![VisitRecord {
            id: "visit-1".into(),
            customer_name: "Rahul".into(),
            project: "Virat Greens".into(),
            status: VisitStatus::Scheduled,
            date: day(5),
            time: None,
            phone: "9876543210".into(),
            address: String::new(),
            notes: String::new(),
        }];
        let filter = FilterState {
            agent: Some("Simran".into()),
            status: Some("scheduled".into()),
            ..Default::default()
        };
        assert_eq!(select(&visits, &filter).len(), 1);
    }

    #[test]
    fn agent_dropdown() {
        assert_eq!(distinct_agents(&calls()), vec!["Raman", "Rupali", "Simran"]);
        assert!(distinct_agents::<CallRecord>(&[]).is_empty());
    }
}

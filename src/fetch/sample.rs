// src/fetch/sample.rs
//! Built-in sample sheets, shaped exactly like the published exports so
//! they go through the same header detection and normalization. Dates are
//! laid out around a reference day and every value is deterministic.

use super::{Fetched, Source, SourceId};
use crate::config::{Role, Settings, StaffMember};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

pub const CALLS_PER_STAFF: usize = 12;

/// Serves sample datasets by key, and configured sheet URLs by routing
/// them to the matching dataset. Nothing goes over the network.
#[derive(Debug, Clone)]
pub struct StaticSource {
    datasets: BTreeMap<String, String>,
    routes: HashMap<String, String>,
}

impl StaticSource {
    /// Every sample dataset: `calls/<staff key>` for each staff member,
    /// then `leads`, `visits`, `deals` and `targets`.
    pub fn new(settings: &Settings, today: NaiveDate) -> Result<Self> {
        let mut datasets = BTreeMap::new();
        for (n, member) in settings.staff.iter().enumerate() {
            datasets.insert(format!("calls/{}", member.key), call_log(member, n, today)?);
        }
        datasets.insert("leads".to_string(), lead_sheet(settings, today)?);
        datasets.insert("visits".to_string(), visit_sheet(today)?);
        datasets.insert("deals".to_string(), deal_sheet(today)?);
        datasets.insert("targets".to_string(), target_sheet(today)?);
        Ok(Self {
            datasets,
            routes: settings.fallback_routes(),
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }

    pub fn dataset(&self, key: &str) -> Option<&str> {
        self.datasets.get(key).map(String::as_str)
    }
}

#[async_trait]
impl Source for StaticSource {
    async fn fetch(&self, id: &SourceId) -> Result<Fetched> {
        let key = match id {
            SourceId::Static(key) => key,
            SourceId::Url(u) => self
                .routes
                .get(u)
                .ok_or_else(|| Error::unavailable(id, "offline: no sample for this sheet"))?,
        };
        let text = self
            .dataset(key)
            .ok_or_else(|| Error::unavailable(id, "no sample dataset"))?;
        debug!(key = %key, bytes = text.len(), "serving sample data");
        Ok(Fetched::sample(text))
    }
}

fn to_csv(header: &[&str], rows: &[Vec<String>]) -> Result<String> {
    let mut w = csv::Writer::from_writer(Vec::new());
    w.write_record(header)?;
    for row in rows {
        w.write_record(row)?;
    }
    let bytes = w.into_inner().map_err(|e| Error::Io(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

fn shift(today: NaiveDate, offset: i64) -> NaiveDate {
    let days = Days::new(offset.unsigned_abs());
    let moved = if offset < 0 {
        today.checked_sub_days(days)
    } else {
        today.checked_add_days(days)
    };
    moved.unwrap_or(today)
}

const CALL_TYPES: [&str; 5] = ["Incoming", "Outgoing", "Missed", "Did Not Connect", "Outgoing"];

fn call_log(member: &StaffMember, staff_index: usize, today: NaiveDate) -> Result<String> {
    let mut rows = Vec::with_capacity(CALLS_PER_STAFF);
    for i in 0..CALLS_PER_STAFF {
        let k = staff_index * CALLS_PER_STAFF + i;
        let date = shift(today, -(((k * 7) % 30) as i64));
        let (hour, minute, second) = (9 + (k * 5) % 10, (k * 13) % 60, (k * 29) % 60);
        let kind = CALL_TYPES[k % CALL_TYPES.len()];
        let outgoing = kind == "Outgoing" || kind == "Did Not Connect";
        let connected = kind == "Incoming" || kind == "Outgoing";
        let duration = if connected {
            format!("00h {:02}m {:02}s", (k * 3) % 15, 5 + (k * 17) % 55)
        } else {
            "00h 00m 00s".to_string()
        };
        let customer_number = format!("98{:08}", 10_000_000 + k * 7919);
        let (from, to) = if outgoing {
            (member.phone_number.clone(), customer_number)
        } else {
            (customer_number, member.phone_number.clone())
        };
        rows.push(vec![
            (i + 1).to_string(),
            format!("{} {:02}:{:02}:{:02}", date.format("%Y-%m-%d"), hour, minute, second),
            from,
            to,
            duration,
            kind.to_string(),
            format!("Customer {}", k + 1),
        ]);
    }
    to_csv(
        &["Sr.No", "Date Time", "From Number", "To Number", "Duration", "Type", "Name"],
        &rows,
    )
}

const LEAD_HEADER: &[&str] = &[
    "DATE/TIME",
    "NAME",
    "NUMBER",
    "EMAIL",
    "CITY",
    "OCCUPATION",
    "Dealer / Invester/ Enduser",
    "Google add / facebook/ Instagram/ Flex",
    "REACHED BY WHICH TELECALLER",
    "PLANNING FOR VISIT",
    "Comment/feedback",
    "Status",
    "PROJECT MAP/ PAYMENT PLAN SENT ?",
    "PHOTO/ VIDEO",
    "Visit Date",
    "Visit done",
    "POST-VISIT FEEDBACK",
    "NewPlot/ Villa / Resale plots /Booth/ Flat/ kothi",
    "Virat Greens/ Virat Crown/ Both Projects",
    "Plot Size Requirement",
    "PROPERTY NUMBER",
    "1st Visit Status",
    "2nd Visit Status",
    "3rd Visit Status",
    "1st Visit Date",
    "2nd Visit Date",
    "3rd Visit Date",
];

// name, phone, channel, status, need, project, days ago, visit in days, visit done, feedback
type LeadSeed = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    i64,
    Option<i64>,
    bool,
    &'static str,
);

const LEADS: &[LeadSeed] = &[
    ("Vikram Mehta", "9876543210", "Google", "Hot Lead", "Villa", "Virat Greens", 4, Some(-1), true, "Positive"),
    ("Neha Gupta", "8765432109", "Facebook", "Good Lead", "Flat", "Virat Crown", 2, Some(3), false, ""),
    ("Karan Singh", "7654321098", "Flex", "Junk Lead", "NewPlot", "Virat Greens", 3, None, false, ""),
    ("Ananya Reddy", "6543210987", "Instagram", "Transferred to Sales Coordinator", "Kothi", "Virat Crown", 1, Some(-2), true, "Satisfied"),
    ("Suresh Iyer", "5432109876", "Google", "Good Lead", "Resale plots", "Both Projects", 0, Some(5), false, "Pending"),
    ("Meera Kapoor", "9123456780", "Facebook", "Transferred to Salesman", "Villa", "Virat Greens", 6, Some(-4), true, "Positive"),
    ("Rohit Bansal", "9988776655", "Instagram", "", "Flat", "Virat Crown", 1, None, false, ""),
    ("Pooja Arora", "9812345670", "Google", "Hot Lead", "Booth", "Virat Greens", 9, Some(-6), true, "Negative"),
];

fn lead_sheet(settings: &Settings, today: NaiveDate) -> Result<String> {
    let telecallers: Vec<&str> = settings
        .staff
        .iter()
        .filter(|s| s.role == Role::Telecaller)
        .map(|s| s.name.as_str())
        .collect();
    let day = |d: NaiveDate| d.format("%d/%m/%Y").to_string();

    let rows: Vec<Vec<String>> = LEADS
        .iter()
        .enumerate()
        .map(|(i, &(name, phone, channel, status, need, project, ago, visit_in, done, feedback))| {
            let telecaller = if telecallers.is_empty() {
                String::new()
            } else {
                telecallers[i % telecallers.len()].to_string()
            };
            let visit_date = visit_in.map(|v| day(shift(today, v))).unwrap_or_default();
            let done_text = if done { "Done" } else { "" }.to_string();
            let mut row = vec![
                format!("{} {:02}:30", day(shift(today, -ago)), 10 + i),
                name.to_string(),
                phone.to_string(),
                format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
                "Mohali".to_string(),
                "Business".to_string(),
                "Enduser".to_string(),
                channel.to_string(),
                telecaller,
                if visit_in.is_some() { "Yes" } else { "No" }.to_string(),
                format!("Follow up with {}", name),
                status.to_string(),
                "Yes".to_string(),
                "No".to_string(),
                visit_date.clone(),
                done_text.clone(),
                feedback.to_string(),
                need.to_string(),
                project.to_string(),
                "200 gaj".to_string(),
                if done { format!("VG-{}", 100 + i) } else { String::new() },
            ];
            row.extend([done_text, String::new(), String::new(), visit_date, String::new(), String::new()]);
            row
        })
        .collect();
    to_csv(LEAD_HEADER, &rows)
}

// customer, project, status, days from today, time, phone, address, notes
type VisitSeed = (
    &'static str,
    &'static str,
    &'static str,
    i64,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
);

const VISITS: &[VisitSeed] = &[
    ("Rahul Sharma", "Virat Greens", "scheduled", 3, "10:00 AM", "9876543210", "Sector 42, Gurugram", "Interested in 3BHK"),
    ("Priya Singh", "Virat Crown", "completed", -2, "11:30 AM", "8765432109", "DLF Phase 3, Gurugram", "Liked the floor plan, discussing payment options"),
    ("Amit Verma", "Virat Greens", "cancelled", 6, "3:00 PM", "7654321098", "Sector 57, Gurugram", "Rescheduling due to personal reasons"),
    ("Deepika Patel", "Virat Crown", "pending", 8, "2:00 PM", "6543210987", "Sushant Lok, Gurugram", "Confirmation pending"),
    ("Raj Malhotra", "Virat Greens", "transferred", 0, "4:30 PM", "5432109876", "Golf Course Road, Gurugram", "Transferred to salesman for closing"),
];

fn visit_sheet(today: NaiveDate) -> Result<String> {
    let rows: Vec<Vec<String>> = VISITS
        .iter()
        .map(|&(customer, project, status, offset, time, phone, address, notes)| {
            vec![
                customer.to_string(),
                project.to_string(),
                status.to_string(),
                shift(today, offset).format("%d/%m/%Y").to_string(),
                time.to_string(),
                phone.to_string(),
                address.to_string(),
                notes.to_string(),
            ]
        })
        .collect();
    to_csv(
        &["Customer Name", "Project", "Status", "Visit Date", "Time", "Phone", "Address", "Notes"],
        &rows,
    )
}

// customer, project, unit, status, value, days from today, phone
type DealSeed = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    u64,
    i64,
    &'static str,
);

const DEALS: &[DealSeed] = &[
    ("Rahul Sharma", "Virat Greens", "3BHK-A-1204", "new", 9_500_000, -4, "9876543210"),
    ("Priya Singh", "Virat Crown", "4BHK-B-1803", "in-progress", 15_000_000, -2, "8765432109"),
    ("Amit Verma", "Virat Greens", "2BHK-C-805", "completed", 6_500_000, -8, "7654321098"),
    ("Deepika Patel", "Virat Crown", "3BHK-D-1505", "negotiation", 12_000_000, 0, "6543210987"),
    ("Raj Malhotra", "Virat Greens", "3BHK-A-902", "lost", 9_800_000, -6, "5432109876"),
];

fn deal_sheet(today: NaiveDate) -> Result<String> {
    let rows: Vec<Vec<String>> = DEALS
        .iter()
        .map(|&(customer, project, unit, status, value, offset, phone)| {
            vec![
                customer.to_string(),
                project.to_string(),
                unit.to_string(),
                status.to_string(),
                value.to_string(),
                shift(today, offset).format("%Y-%m-%d").to_string(),
                phone.to_string(),
            ]
        })
        .collect();
    to_csv(
        &["Customer", "Project", "Unit", "Status", "Deal Value", "Date", "Phone"],
        &rows,
    )
}

fn target_sheet(today: NaiveDate) -> Result<String> {
    let month = today.format("%B %Y").to_string();
    let rows = vec![
        vec![
            "Arun".to_string(),
            "60000000".to_string(),
            "21500000".to_string(),
            month.clone(),
            "Virat Greens".to_string(),
        ],
        vec![
            "Jaskaran".to_string(),
            "60000000".to_string(),
            "12000000".to_string(),
            month,
            "Virat Crown".to_string(),
        ],
    ];
    to_csv(
        &["Salesman", "Monthly Target", "Achievement", "Month", "Project"],
        &rows,
    )
}

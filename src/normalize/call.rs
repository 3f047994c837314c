// src/normalize/call.rs
use super::{phone_key, Normalize, SourceContext};
use crate::config::Role;
use crate::dates::{parse_date, parse_time};
use crate::duration::parse_duration;
use crate::recording::RecordingRef;
use crate::table::{ColumnIndex, FieldSpec};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallType {
    Incoming,
    Outgoing,
    Missed,
    #[serde(rename = "Did Not Connect")]
    DidNotConnect,
    /// No label and no phone match; counted in totals only.
    Unknown,
}

impl CallType {
    pub const CLASSIFIED: [CallType; 4] = [
        CallType::Incoming,
        CallType::Outgoing,
        CallType::Missed,
        CallType::DidNotConnect,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CallType::Incoming => "Incoming",
            CallType::Outgoing => "Outgoing",
            CallType::Missed => "Missed",
            CallType::DidNotConnect => "Did Not Connect",
            CallType::Unknown => "Unknown",
        }
    }

    /// Substring match on a free-text type label.
    pub fn from_label(label: &str) -> Option<CallType> {
        let l = label.to_lowercase();
        if l.contains("incoming") {
            Some(CallType::Incoming)
        } else if l.contains("outgoing") {
            Some(CallType::Outgoing)
        } else if l.contains("missed") {
            Some(CallType::Missed)
        } else if l.contains("not connect") || l.contains("didnotconnect") {
            Some(CallType::DidNotConnect)
        } else {
            None
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, CallType::Incoming | CallType::Outgoing)
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CallStatus {
    #[serde(rename = "Not Reached")]
    NotReached,
    #[serde(rename = "Pending Review")]
    PendingReview,
}

impl CallStatus {
    pub fn for_type(t: CallType) -> Self {
        match t {
            CallType::Missed | CallType::DidNotConnect => CallStatus::NotReached,
            _ => CallStatus::PendingReview,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::NotReached => "Not Reached",
            CallStatus::PendingReview => "Pending Review",
        }
    }
}

/// Decide a call's type.
///
/// An explicit label wins when it names a known type. Otherwise the
/// direction comes from which side of the call carries the staff number.
/// An outgoing (or still undirected) call that lasted zero seconds never
/// connected.
pub fn classify_call(
    explicit: Option<&str>,
    from: &str,
    to: &str,
    staff_phone: Option<&str>,
    duration_secs: u64,
) -> CallType {
    let inferred = explicit.and_then(CallType::from_label).or_else(|| {
        let staff = phone_key(staff_phone?);
        if staff.is_empty() {
            None
        } else if phone_key(to) == staff {
            Some(CallType::Incoming)
        } else if phone_key(from) == staff {
            Some(CallType::Outgoing)
        } else {
            None
        }
    });

    match inferred {
        Some(CallType::Outgoing) | None if duration_secs == 0 => CallType::DidNotConnect,
        Some(t) => t,
        None => CallType::Unknown,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallRecord {
    pub id: String,
    pub sr_no: usize,
    pub customer_name: String,
    pub from_number: String,
    pub to_number: String,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub duration: String,
    pub duration_seconds: u64,
    pub call_type: CallType,
    pub telecaller: String,
    pub role: Option<Role>,
    pub status: CallStatus,
    pub notes: String,
    pub recording: RecordingRef,
}

pub const ZERO_DURATION: &str = "00h 00m 00s";

const CALL_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("sr_no", &["Sr.No", "Sr. No", "S.No"]),
    FieldSpec::new("date", &["Date"]).excluding(&["Date Time"]),
    FieldSpec::new("time", &["Time"]).excluding(&["Date Time"]),
    FieldSpec::new("date_time", &["Date Time"]),
    FieldSpec::new("from", &["From Number", "From", "Source"]),
    FieldSpec::new("to", &["To Number", "To", "Destination"]),
    FieldSpec::new("duration", &["Duration"]),
    FieldSpec::new("type", &["Type", "Call Type"]),
    FieldSpec::new("name", &["Name", "Customer", "Contact"]),
];

impl Normalize for CallRecord {
    const KIND: &'static str = "call";
    const MARKERS: &'static [&'static str] = &["Date", "Sr.No", "From Number"];
    const FIELDS: &'static [FieldSpec] = CALL_FIELDS;
    const MIN_CELLS: usize = 3;

    fn normalize(
        row: &[String],
        index: usize,
        cols: &ColumnIndex,
        ctx: &SourceContext<'_>,
    ) -> Option<Self> {
        let date_time = cols.cell(row, "date_time").unwrap_or_default();
        let mut dt_parts = date_time.split_whitespace();
        let dt_date = dt_parts.next();
        let dt_time = dt_parts.next().unwrap_or_default();

        let date_text = cols.cell(row, "date").or(dt_date)?;
        let date = parse_date(date_text, ctx.date_order)?;

        let time_text = cols.cell(row, "time").unwrap_or(dt_time);
        let from_number = cols.text(row, "from");
        let to_number = cols.text(row, "to");
        let duration = cols
            .cell(row, "duration")
            .unwrap_or(ZERO_DURATION)
            .to_string();
        let duration_seconds = parse_duration(&duration);

        let call_type = classify_call(
            cols.cell(row, "type"),
            &from_number,
            &to_number,
            ctx.staff.map(|s| s.phone_number.as_str()),
            duration_seconds,
        );

        let customer_name = cols
            .cell(row, "name")
            .map(str::to_string)
            .unwrap_or_else(|| format!("Customer {}", index + 1));
        let sr_no = cols
            .cell(row, "sr_no")
            .and_then(|s| s.parse().ok())
            .unwrap_or(index + 1);

        let (owner, folder, role) = match ctx.staff {
            Some(s) => (s.name.as_str(), s.recordings_folder.as_str(), Some(s.role)),
            None => ("Unknown", "", None),
        };
        let recording = RecordingRef::for_call(
            owner,
            folder,
            &from_number,
            &to_number,
            date,
            time_text,
            &customer_name,
        );

        Some(CallRecord {
            id: format!("{}_{}", owner, index),
            sr_no,
            notes: format!("Call with {}", customer_name),
            customer_name,
            from_number,
            to_number,
            date,
            time: parse_time(time_text),
            duration,
            duration_seconds,
            call_type,
            telecaller: owner.to_string(),
            role,
            status: CallStatus::for_type(call_type),
            recording,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::dates::DateOrder;
    use crate::normalize::{normalize_text, Normalized};
    use anyhow::Result;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    #[test]
    fn explicit_labels_win() {
        assert_eq!(classify_call(Some("INCOMING call"), "", "", None, 0), CallType::Incoming);
        assert_eq!(classify_call(Some("Missed"), "", "", None, 0), CallType::Missed);
        assert_eq!(classify_call(Some("Not Connected"), "", "", None, 40), CallType::DidNotConnect);
        assert_eq!(classify_call(Some("outgoing"), "", "", None, 12), CallType::Outgoing);
    }

    #[test]
    fn direction_from_staff_number() {
        let staff = Some("8556896739");
        assert_eq!(classify_call(None, "9990001111", "+91 8556896739", staff, 30), CallType::Incoming);
        assert_eq!(classify_call(None, "8556896739", "9990001111", staff, 30), CallType::Outgoing);
        assert_eq!(classify_call(Some("voice"), "1", "2", staff, 30), CallType::Unknown);
    }

    #[test]
    fn zero_duration_outgoing_did_not_connect() {
        let staff = Some("8556896739");
        assert_eq!(classify_call(None, "8556896739", "9990001111", staff, 0), CallType::DidNotConnect);
        assert_eq!(classify_call(Some("Outgoing"), "", "", None, 0), CallType::DidNotConnect);
        assert_eq!(classify_call(None, "", "", None, 0), CallType::DidNotConnect);
        // incoming with no talk time keeps its direction
        assert_eq!(classify_call(None, "9990001111", "8556896739", staff, 0), CallType::Incoming);
    }

    #[test]
    fn statuses_are_deterministic() {
        assert_eq!(CallStatus::for_type(CallType::Missed), CallStatus::NotReached);
        assert_eq!(CallStatus::for_type(CallType::DidNotConnect), CallStatus::NotReached);
        assert_eq!(CallStatus::for_type(CallType::Incoming), CallStatus::PendingReview);
        assert_eq!(CallStatus::for_type(CallType::Unknown), CallStatus::PendingReview);
    }

    #[test]
    fn normalizes_a_call_log() -> Result<()> {
        let settings = Settings::default();
        let simran = &settings.staff[0];
        let ctx = SourceContext::new("calls/simran", DateOrder::MonthFirst, today()).with_staff(simran);
        let text = "\
Sr.No,Date Time,From Number,To Number,Duration,Name
1,01/05/2024 10:15:30,8556896739,9990001111,00h 02m 30s,John Doe
2,01/06/2024 11:00:00,9990002222,8556896739,00h 00m 45s,
3,,8556896739,9990003333,00h 00m 10s,Nobody
4,01/07/2024 09:00:00,8556896739,9990004444,,Asha
";
        let out: Normalized<CallRecord> = normalize_text(text, &ctx)?;
        assert_eq!(out.records.len(), 3);
        assert_eq!(out.dropped, 1);

        let first = &out.records[0];
        assert_eq!(first.id, "Simran_0");
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(first.time, NaiveTime::from_hms_opt(10, 15, 30));
        assert_eq!(first.call_type, CallType::Outgoing);
        assert_eq!(first.duration_seconds, 150);
        assert_eq!(first.telecaller, "Simran");
        assert_eq!(first.role, Some(Role::Telecaller));
        assert_eq!(first.recording.filenames[0], "call_20240105_101530.mp3");

        let second = &out.records[1];
        assert_eq!(second.call_type, CallType::Incoming);
        assert_eq!(second.customer_name, "Customer 2");
        assert_eq!(second.sr_no, 2);

        let fourth = &out.records[2];
        assert_eq!(fourth.duration, ZERO_DURATION);
        assert_eq!(fourth.call_type, CallType::DidNotConnect);
        assert_eq!(fourth.status, CallStatus::NotReached);
        Ok(())
    }

    #[test]
    fn separate_date_and_time_columns() -> Result<()> {
        let ctx = SourceContext::new("calls/x", DateOrder::MonthFirst, today());
        let text = "Date,Time,From,To,Duration,Call Type\n2024-01-05,10:15,1,2,05:30,Missed\n";
        let out: Normalized<CallRecord> = normalize_text(text, &ctx)?;
        let rec = &out.records[0];
        assert_eq!(rec.time, NaiveTime::from_hms_opt(10, 15, 0));
        assert_eq!(rec.duration_seconds, 330);
        assert_eq!(rec.call_type, CallType::Missed);
        assert_eq!(rec.telecaller, "Unknown");
        assert!(rec.recording.search_urls.is_empty());
        Ok(())
    }
}

use chrono::{Datelike, Days, Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// How a slash-delimited date like `05/01/2024` is read for a given source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DateOrder {
    /// `MM/DD/YYYY`, as the call-log exports write it.
    #[default]
    MonthFirst,
    /// `DD/MM/YYYY`, as the lead sheets write it.
    DayFirst,
}

/// Trim whitespace + strip outer quotes if present.
pub fn clean_cell(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].trim()
    } else {
        trimmed
    }
}

const FREE_TEXT_FORMATS: &[&str] = &[
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%d-%b-%Y",
    "%d-%b-%y",
    "%A, %B %d, %Y",
];

fn expand_year(y: &str) -> Option<i32> {
    match y.len() {
        2 => format!("20{}", y).parse().ok(),
        4 => y.parse().ok(),
        _ => None,
    }
}

/// Three non-empty all-digit parts separated by `sep`.
fn date_parts(token: &str, sep: char) -> Option<[&str; 3]> {
    let mut it = token.split(sep);
    let parts = [it.next()?, it.next()?, it.next()?];
    let digits = |p: &&str| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit());
    (it.next().is_none() && parts.iter().all(digits)).then_some(parts)
}

fn year_first([y, m, d]: [&str; 3]) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
}

fn parse_slashed(token: &str, order: DateOrder) -> Option<NaiveDate> {
    let parts = date_parts(token, '/')?;
    if parts[0].len() == 4 {
        return year_first(parts);
    }

    let a: u32 = parts[0].parse().ok()?;
    let b: u32 = parts[1].parse().ok()?;
    let y = expand_year(parts[2])?;
    let (month, day) = match order {
        DateOrder::MonthFirst if a > 12 && b <= 12 => (b, a),
        DateOrder::MonthFirst => (a, b),
        DateOrder::DayFirst if b > 12 && a <= 12 => (a, b),
        DateOrder::DayFirst => (b, a),
    };
    NaiveDate::from_ymd_opt(y, month, day)
}

/// `-` or `.` separated: year first only with a four-digit leading year,
/// otherwise `DD-MM-YY(YY)`.
fn parse_dashed(token: &str, sep: char) -> Option<NaiveDate> {
    let parts = date_parts(token, sep)?;
    if parts[0].len() == 4 {
        return year_first(parts);
    }
    let [d, m, y] = parts;
    NaiveDate::from_ymd_opt(expand_year(y)?, m.parse().ok()?, d.parse().ok()?)
}

fn parse_token(token: &str, order: DateOrder) -> Option<NaiveDate> {
    let token = token.split('T').next().unwrap_or(token);
    if token.contains('/') {
        return parse_slashed(token, order);
    }
    parse_dashed(token, '-').or_else(|| parse_dashed(token, '.'))
}

/// Parse a spreadsheet date cell into a calendar date.
///
/// Accepts ISO (`2024-01-05`, also with a `T...` or ` HH:MM` suffix),
/// slash-delimited dates read per `order` (two-digit years get a `20`
/// prefix), and a handful of free-text forms such as `15 Nov 2023` or
/// `Nov 15, 2023`. Returns `None` rather than guessing further.
pub fn parse_date(text: &str, order: DateOrder) -> Option<NaiveDate> {
    let s = clean_cell(text);
    if s.is_empty() {
        return None;
    }

    if let Some(first) = s.split_whitespace().next() {
        if let Some(d) = parse_token(first, order) {
            return Some(d);
        }
    }

    FREE_TEXT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Parse `HH:MM`, `HH:MM:SS` or `h:MM AM/PM`.
pub fn parse_time(text: &str) -> Option<NaiveTime> {
    let s = clean_cell(text);
    if s.is_empty() {
        return None;
    }
    ["%H:%M:%S", "%H:%M", "%I:%M %p", "%I:%M:%S %p", "%I:%M%p"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Records that can be placed on the calendar.
pub trait Dated {
    /// `None` for records that carry no usable date; such records are never
    /// excluded by a date window.
    fn record_date(&self) -> Option<NaiveDate>;
}

/// Inclusive day range; a record dated `end` is inside the window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowPreset {
    Today,
    Yesterday,
    ThisWeek,
    ThisMonth,
    LastDays(u32),
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    pub fn unbounded() -> Self {
        Self {
            start: NaiveDate::MIN,
            end: NaiveDate::MAX,
        }
    }

    pub fn last_days(today: NaiveDate, days: u32) -> Self {
        let start = today
            .checked_sub_days(Days::new(days as u64))
            .unwrap_or(NaiveDate::MIN);
        Self::new(start, today)
    }

    pub fn preset(preset: WindowPreset, today: NaiveDate) -> Self {
        let start = match preset {
            WindowPreset::Today => today,
            WindowPreset::Yesterday => today.pred_opt().unwrap_or(today),
            WindowPreset::ThisWeek => today
                .checked_sub_days(Days::new(today.weekday().num_days_from_sunday() as u64))
                .unwrap_or(today),
            WindowPreset::ThisMonth => today.with_day(1).unwrap_or(today),
            WindowPreset::LastDays(n) => return Self::last_days(today, n),
        };
        Self::new(start, today)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn admits<R: Dated + ?Sized>(&self, record: &R) -> bool {
        record.record_date().map_or(true, |d| self.contains(d))
    }

    /// Number of calendar days covered, at least 1.
    pub fn span_days(&self) -> i64 {
        ((self.end - self.start).num_days() + 1).max(1)
    }
}

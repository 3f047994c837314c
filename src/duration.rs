use once_cell::sync::Lazy;
use regex::Regex;

static HMS_UNITS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)\s*h\s*(\d+)\s*m\s*(\d+)\s*s$").expect("duration regex should compile")
});

/// Parse `"00h 05m 30s"`, `"MM:SS"` or `"HH:MM:SS"` into seconds.
/// Anything else is "no duration" and yields 0.
pub fn parse_duration(text: &str) -> u64 {
    let s = text.trim().trim_matches('"').trim();
    if s.is_empty() {
        return 0;
    }

    if let Some(caps) = HMS_UNITS.captures(s) {
        let part = |i: usize| caps[i].parse::<u64>().ok();
        return match (part(1), part(2), part(3)) {
            (Some(h), Some(m), Some(sec)) => h * 3600 + m * 60 + sec,
            _ => 0,
        };
    }

    let parts: Vec<&str> = s.split(':').collect();
    if !(2..=3).contains(&parts.len())
        || parts
            .iter()
            .any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit()))
    {
        return 0;
    }
    let nums: Option<Vec<u64>> = parts.iter().map(|p| p.parse().ok()).collect();
    match nums.as_deref() {
        Some([m, sec]) => m * 60 + sec,
        Some([h, m, sec]) => h * 3600 + m * 60 + sec,
        _ => 0,
    }
}

fn split_hms(seconds: f64) -> Option<(u64, u64, u64)> {
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    let total = seconds.floor() as u64;
    Some((total / 3600, (total % 3600) / 60, total % 60))
}

/// `"MM:SS"` under an hour, `"HH:MM:SS"` otherwise. Negative or NaN → `"00:00"`.
pub fn format_duration(seconds: f64) -> String {
    match split_hms(seconds) {
        Some((0, m, s)) => format!("{:02}:{:02}", m, s),
        Some((h, m, s)) => format!("{:02}:{:02}:{:02}", h, m, s),
        None => "00:00".to_string(),
    }
}

/// Always `"HH:MM:SS"`. Negative or NaN → `"00:00:00"`.
pub fn format_total_duration(seconds: f64) -> String {
    let (h, m, s) = split_hms(seconds).unwrap_or((0, 0, 0));
    format!("{:02}:{:02}:{:02}", h, m, s)
}

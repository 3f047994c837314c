// src/recording.rs
use crate::error::{Error, Result};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

const DRIVE_FOLDERS: &str = "https://drive.google.com/drive/folders";
const DRIVE_DOWNLOAD: &str = "https://drive.google.com/uc";

static DRIVE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-\w]{25,}").expect("drive id regex should compile"));
static FILE_PATH_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/file/d/([-\w]+)").expect("file path regex should compile"));
static QUERY_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[?&]id=([-\w]+)").expect("query id regex should compile"));
static BARE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-\w]{25,}$").expect("bare id regex should compile"));

/// Where a call's audio might live. Nothing here is verified: the
/// filenames follow the naming schemes seen in the recordings folders,
/// and the URLs are folder searches for them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecordingRef {
    pub filenames: Vec<String>,
    pub search_urls: Vec<String>,
    pub folder_url: String,
}

impl RecordingRef {
    pub fn for_call(
        staff_name: &str,
        folder_url: &str,
        from: &str,
        to: &str,
        date: NaiveDate,
        time_text: &str,
        customer: &str,
    ) -> Self {
        let filenames = candidate_filenames(staff_name, from, to, date, time_text, customer);
        let search_urls = filenames
            .iter()
            .filter_map(|f| folder_search_url(folder_url, f))
            .collect();
        Self {
            filenames,
            search_urls,
            folder_url: folder_url.to_string(),
        }
    }

    pub fn primary_url(&self) -> Option<&str> {
        self.search_urls.first().map(String::as_str)
    }
}

/// The four naming schemes, most specific first.
pub fn candidate_filenames(
    staff_name: &str,
    from: &str,
    to: &str,
    date: NaiveDate,
    time_text: &str,
    customer: &str,
) -> Vec<String> {
    let day = date.format("%Y%m%d").to_string();
    let time: String = time_text.chars().filter(|c| *c != ':').collect();
    let customer_snake = customer
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");

    vec![
        format!("call_{}_{}.mp3", day, time),
        format!("{}_{}_{}_{}.mp3", from, to, day, time),
        format!("{}_{}_{}.mp3", staff_name.to_lowercase(), customer_snake, day),
        format!("{}_{}.mp3", day, time),
    ]
}

/// First run of 25+ id characters in a Drive folder link.
pub fn folder_id(folder_url: &str) -> Option<&str> {
    DRIVE_ID.find(folder_url).map(|m| m.as_str())
}

/// Folder view filtered to `filename`; `None` when the link carries no id.
pub fn folder_search_url(folder_url: &str, filename: &str) -> Option<String> {
    let id = folder_id(folder_url)?;
    Url::parse_with_params(&format!("{}/{}", DRIVE_FOLDERS, id), &[("q", filename)])
        .ok()
        .map(String::from)
}

/// Direct-download form of a Drive file link (`file/d/<id>`, `open?id=<id>`
/// or a bare id). Other links are returned unchanged.
pub fn playable_url(link: &str) -> Option<String> {
    let link = link.trim();
    if link.is_empty() {
        return None;
    }
    let id = FILE_PATH_ID
        .captures(link)
        .or_else(|| QUERY_ID.captures(link))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .or_else(|| BARE_ID.is_match(link).then_some(link));

    match id {
        Some(id) => Url::parse_with_params(DRIVE_DOWNLOAD, &[("export", "download"), ("id", id)])
            .ok()
            .map(String::from),
        None => Some(link.to_string()),
    }
}

/// HEAD each candidate URL in order and return the first that answers 2xx.
/// When none does, the error carries the folder link to open instead.
#[tracing::instrument(level = "debug", skip(client, recording), fields(candidates = recording.search_urls.len()))]
pub async fn probe_recording(client: &Client, recording: &RecordingRef) -> Result<String> {
    for url in &recording.search_urls {
        match client.head(url).send().await {
            Ok(resp) if resp.status().is_success() => {
                debug!(url = %url, "recording found");
                return Ok(url.clone());
            }
            Ok(resp) => debug!(url = %url, status = %resp.status(), "recording candidate missing"),
            Err(e) => warn!(url = %url, error = %e, "recording probe failed"),
        }
    }

    let fallback = (!recording.folder_url.is_empty()).then(|| recording.folder_url.clone());
    Err(Error::ResourceMissing {
        url: recording
            .filenames
            .first()
            .cloned()
            .unwrap_or_default(),
        fallback,
    })
}

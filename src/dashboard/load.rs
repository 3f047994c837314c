// src/dashboard/load.rs
//! Fetch and normalize everything one dashboard shows.
//!
//! Failures stop at the sheet they happen in: a sheet that cannot be
//! fetched or read is counted and skipped, and the dashboard renders from
//! whatever did arrive. Only when nothing arrived does a loader return an
//! error.

use super::DashboardKey;
use crate::config::{Settings, SheetSource, StaffMember};
use crate::dates::DateOrder;
use crate::error::{Error, Result};
use crate::fetch::{fetch_all_settled, Fetched, Source, SourceId, StaticSource};
use crate::normalize::{
    normalize_text, CallRecord, ContactRecord, DealRecord, LeadRecord, Normalize, SourceContext,
    TargetRecord, VisitRecord,
};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, error, info, warn};

pub const SAMPLE_NOTICE: &str = "Showing sample data: live sources could not be loaded.";

/// How a load went, for logs and for the sample-data banner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub sources_ok: usize,
    pub sources_failed: usize,
    /// Sheets served from sample data instead of their live source.
    pub sample_sources: usize,
    /// Rows the normalizers rejected.
    pub dropped: usize,
    pub used_sample: bool,
    /// Set only when no live source contributed anything.
    pub notice: Option<String>,
}

impl LoadReport {
    fn finish(&mut self) {
        self.used_sample = self.sample_sources > 0;
        if self.sources_ok > 0 && self.sample_sources == self.sources_ok {
            self.notice = Some(SAMPLE_NOTICE.to_string());
        }
    }
}

#[derive(Debug, Clone)]
pub struct Loaded<R> {
    pub records: Vec<R>,
    /// Monthly targets; only the salesman dashboard reads any.
    pub targets: Vec<TargetRecord>,
    pub report: LoadReport,
}

impl<R> Loaded<R> {
    fn new(records: Vec<R>, report: LoadReport) -> Self {
        Self {
            records,
            targets: Vec::new(),
            report,
        }
    }
}

/// One sheet's normalized rows.
struct Sheet<R> {
    records: Vec<R>,
    dropped: usize,
    /// Served from sample data instead of the live sheet.
    sample: bool,
}

impl LoadReport {
    fn accept<R>(&mut self, sheet: Sheet<R>) -> Vec<R> {
        self.sources_ok += 1;
        self.dropped += sheet.dropped;
        if sheet.sample {
            self.sample_sources += 1;
        }
        sheet.records
    }
}

/// Merge the sheets of a multi-source dashboard. Sample stand-ins only
/// count when no sheet arrived live; otherwise they are dropped and the
/// sheet is reported as failed.
fn merge_sheets<R>(sheets: Vec<Option<Sheet<R>>>, report: &mut LoadReport) -> Vec<R> {
    let any_live = sheets.iter().flatten().any(|s| !s.sample);
    let mut out = Vec::new();
    for sheet in sheets.into_iter().flatten() {
        if any_live && sheet.sample {
            debug!(records = sheet.records.len(), "live data present; sample stand-in discarded");
            report.sources_failed += 1;
            continue;
        }
        out.extend(report.accept(sheet));
    }
    out
}

/// Normalize one fetched sheet into `R`, asking the source for a
/// substitute when the sheet has no recognizable header. `None` (counted
/// as a failed source) when the sheet contributes nothing.
async fn read_sheet<R, S>(
    source: &S,
    id: &SourceId,
    fetched: Result<Fetched>,
    ctx: &SourceContext<'_>,
    report: &mut LoadReport,
) -> Option<Sheet<R>>
where
    R: Normalize,
    S: Source + ?Sized,
{
    let outcome = match fetched {
        Ok(f) => match normalize_text::<R>(&f.text, ctx) {
            Err(e) if matches!(e, Error::HeaderNotFound { .. }) => {
                warn!(source = %id, "no header row; trying substitute");
                match source.substitute(id).await {
                    Some(Ok(sub)) => normalize_text::<R>(&sub.text, ctx).map(|n| (n, sub.sample)),
                    Some(Err(sub_err)) => Err(sub_err),
                    None => Err(e),
                }
            }
            other => other.map(|n| (n, f.sample)),
        },
        Err(e) => Err(e),
    };

    match outcome {
        Ok((normalized, sample)) => {
            info!(
                source = %id,
                kind = R::KIND,
                records = normalized.records.len(),
                dropped = normalized.dropped,
                sample,
                "source loaded"
            );
            Some(Sheet {
                records: normalized.records,
                dropped: normalized.dropped,
                sample,
            })
        }
        Err(e) => {
            warn!(source = %id, kind = R::KIND, error = %e, "source failed");
            report.sources_failed += 1;
            None
        }
    }
}

fn nothing_usable(dashboard: DashboardKey, report: &LoadReport) -> Error {
    error!(%dashboard, failed = report.sources_failed, "all sources failed");
    Error::NoUsableData {
        dashboard: dashboard.to_string(),
    }
}

async fn load_one<R, S>(
    source: &S,
    sheet: &SheetSource,
    today: NaiveDate,
    dashboard: DashboardKey,
) -> Result<Loaded<R>>
where
    R: Normalize,
    S: Source + ?Sized,
{
    let id = SourceId::url(sheet.url.as_str());
    let ctx = SourceContext::new(id.as_str(), sheet.date_order, today);
    let mut report = LoadReport::default();
    let fetched = source.fetch(&id).await;
    let sheet = read_sheet::<R, S>(source, &id, fetched, &ctx, &mut report)
        .await
        .ok_or_else(|| nothing_usable(dashboard, &report))?;
    let records = report.accept(sheet);
    report.finish();
    Ok(Loaded::new(records, report))
}

/// Newest first by date and time; a missing time counts as midnight.
pub fn sort_newest_first(calls: &mut [CallRecord]) {
    calls.sort_by(|a, b| {
        (b.date, b.time.unwrap_or_default())
            .cmp(&(a.date, a.time.unwrap_or_default()))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Built-in call logs for every staff member.
fn sample_calls(settings: &Settings, today: NaiveDate, report: &mut LoadReport) -> Result<Vec<CallRecord>> {
    let samples = StaticSource::new(settings, today)?;
    let mut out = Vec::new();
    for member in &settings.staff {
        let key = format!("calls/{}", member.key);
        let Some(text) = samples.dataset(&key) else {
            continue;
        };
        let ctx = SourceContext::new(&key, DateOrder::MonthFirst, today).with_staff(member);
        let normalized = normalize_text::<CallRecord>(text, &ctx)?;
        report.dropped += normalized.dropped;
        report.sources_ok += 1;
        report.sample_sources += 1;
        out.extend(normalized.records);
    }
    Ok(out)
}

/// Every staff member's call log, fetched concurrently and merged.
///
/// Logs that arrived live are never mixed with sample stand-ins. When no
/// log yields a single call, the built-in sample logs are shown
/// instead (if `sample_fallback` allows it) and the report carries the
/// sample-data notice.
#[tracing::instrument(level = "info", skip(source, settings), fields(staff = settings.staff.len()))]
pub async fn load_calls<S: Source + ?Sized>(
    source: &S,
    settings: &Settings,
    today: NaiveDate,
) -> Result<Loaded<CallRecord>> {
    let members: Vec<&StaffMember> = settings
        .staff
        .iter()
        .filter(|m| !m.call_log_sheet.trim().is_empty())
        .collect();
    let ids: Vec<SourceId> = members
        .iter()
        .map(|m| SourceId::url(m.call_log_sheet.as_str()))
        .collect();

    let results = fetch_all_settled(source, &ids).await;

    let mut report = LoadReport::default();
    let mut sheets = Vec::with_capacity(members.len());
    for ((member, id), fetched) in members.iter().zip(&ids).zip(results) {
        let ctx = SourceContext::new(id.as_str(), settings.call_log_date_order, today)
            .with_staff(member);
        let sheet = read_sheet::<CallRecord, S>(source, id, fetched, &ctx, &mut report).await;
        if let Some(s) = &sheet {
            debug!(staff = %member.name, calls = s.records.len(), sample = s.sample, "read call log");
        }
        sheets.push(sheet);
    }
    let mut calls = merge_sheets(sheets, &mut report);

    if calls.is_empty() {
        if !settings.sample_fallback {
            return Err(nothing_usable(DashboardKey::CallAnalytics, &report));
        }
        warn!(
            failed = report.sources_failed,
            "no live call data; using sample call logs"
        );
        calls = sample_calls(settings, today, &mut report)?;
        report.notice = Some(SAMPLE_NOTICE.to_string());
    }

    sort_newest_first(&mut calls);
    report.finish();
    info!(calls = calls.len(), ok = report.sources_ok, failed = report.sources_failed, "calls loaded");
    Ok(Loaded::new(calls, report))
}

#[tracing::instrument(level = "info", skip(source, settings))]
pub async fn load_leads<S: Source + ?Sized>(
    source: &S,
    settings: &Settings,
    today: NaiveDate,
) -> Result<Loaded<LeadRecord>> {
    load_one(source, &settings.sources.leads, today, DashboardKey::Telecaller).await
}

#[tracing::instrument(level = "info", skip(source, settings))]
pub async fn load_visits<S: Source + ?Sized>(
    source: &S,
    settings: &Settings,
    today: NaiveDate,
) -> Result<Loaded<VisitRecord>> {
    load_one(source, &settings.sources.visits, today, DashboardKey::SalesCoordinator).await
}

/// Deals plus monthly targets. A missing target sheet only means the
/// configured revenue target is used; sample targets are not paired with
/// live deals.
#[tracing::instrument(level = "info", skip(source, settings))]
pub async fn load_deals<S: Source + ?Sized>(
    source: &S,
    settings: &Settings,
    today: NaiveDate,
) -> Result<Loaded<DealRecord>> {
    let deals_sheet = &settings.sources.deals;
    let targets_sheet = &settings.sources.targets;
    let ids = [
        SourceId::url(deals_sheet.url.as_str()),
        SourceId::url(targets_sheet.url.as_str()),
    ];
    let mut results = fetch_all_settled(source, &ids).await.into_iter();
    let (Some(deals_fetched), Some(targets_fetched)) = (results.next(), results.next()) else {
        return Err(Error::NoUsableData {
            dashboard: DashboardKey::Salesman.to_string(),
        });
    };

    let mut report = LoadReport::default();
    let deals_ctx = SourceContext::new(ids[0].as_str(), deals_sheet.date_order, today);
    let deals = read_sheet::<DealRecord, S>(source, &ids[0], deals_fetched, &deals_ctx, &mut report)
        .await
        .ok_or_else(|| nothing_usable(DashboardKey::Salesman, &report))?;
    let live_deals = !deals.sample;
    let deals = report.accept(deals);

    let targets_ctx = SourceContext::new(ids[1].as_str(), targets_sheet.date_order, today);
    let targets_read =
        read_sheet::<TargetRecord, S>(source, &ids[1], targets_fetched, &targets_ctx, &mut report).await;
    let targets = match targets_read {
        Some(t) if live_deals && t.sample => {
            debug!("live deals present; sample targets discarded");
            report.sources_failed += 1;
            Vec::new()
        }
        Some(t) => report.accept(t),
        None => Vec::new(),
    };

    report.finish();
    Ok(Loaded {
        records: deals,
        targets,
        report,
    })
}

/// The home overview reads the lead, visit and deal sheets as contacts.
#[tracing::instrument(level = "info", skip(source, settings))]
pub async fn load_home<S: Source + ?Sized>(
    source: &S,
    settings: &Settings,
    today: NaiveDate,
) -> Result<Loaded<ContactRecord>> {
    let sheets = [
        &settings.sources.leads,
        &settings.sources.visits,
        &settings.sources.deals,
    ];
    let ids: Vec<SourceId> = sheets.iter().map(|s| SourceId::url(s.url.as_str())).collect();
    let results = fetch_all_settled(source, &ids).await;

    let mut report = LoadReport::default();
    let mut read = Vec::with_capacity(sheets.len());
    for ((sheet, id), fetched) in sheets.iter().zip(&ids).zip(results) {
        let ctx = SourceContext::new(id.as_str(), sheet.date_order, today);
        read.push(read_sheet::<ContactRecord, S>(source, id, fetched, &ctx, &mut report).await);
    }
    let contacts = merge_sheets(read, &mut report);

    if report.sources_ok == 0 {
        return Err(nothing_usable(DashboardKey::Home, &report));
    }
    report.finish();
    Ok(Loaded::new(contacts, report))
}

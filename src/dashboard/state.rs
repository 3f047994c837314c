// src/dashboard/state.rs
use super::load::{LoadReport, Loaded};
use super::DashboardKey;
use crate::aggregate::{AggregateContext, Summarize};
use crate::config::Settings;
use crate::error::Result;
use crate::normalize::TargetRecord;
use crate::view::{select_indices, FilterState, Selectable};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Owned inputs for summaries besides the records.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewParams {
    pub today: NaiveDate,
    pub known_agents: Vec<String>,
    pub revenue_target: f64,
    pub recent_days: u32,
    pub recent_limit: usize,
}

impl ViewParams {
    pub fn from_settings(settings: &Settings, today: NaiveDate) -> Self {
        Self {
            today,
            known_agents: settings.known_agents(),
            revenue_target: settings.revenue_target,
            recent_days: settings.recent_lead_days,
            recent_limit: settings.recent_lead_limit,
        }
    }

    pub fn context<'a>(&'a self, targets: &'a [TargetRecord]) -> AggregateContext<'a> {
        AggregateContext {
            today: self.today,
            known_agents: &self.known_agents,
            targets,
            revenue_target: self.revenue_target,
            recent_days: self.recent_days,
            recent_limit: self.recent_limit,
        }
    }
}

/// Hands out with each load; only the newest one may complete it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug, Clone)]
pub struct Ready<R: Summarize> {
    pub loaded: Loaded<R>,
    pub snapshot: R::Snapshot,
    /// Positions into `loaded.records`, filtered, sorted and paged.
    pub selection: Vec<usize>,
    /// Matches before paging.
    pub matched: usize,
}

#[derive(Debug, Clone)]
pub enum ViewState<R: Summarize> {
    Idle,
    Loading(Ticket),
    Ready(Ready<R>),
    /// Shown with a retry action.
    Error(String),
}

impl<R: Summarize> ViewState<R> {
    pub fn name(&self) -> &'static str {
        match self {
            ViewState::Idle => "idle",
            ViewState::Loading(_) => "loading",
            ViewState::Ready(_) => "ready",
            ViewState::Error(_) => "error",
        }
    }
}

/// One mounted dashboard: its filter, its data and the load lifecycle
/// `Idle -> Loading -> {Ready, Error}`. Filter changes in `Ready`
/// recompute synchronously. A load completing after a newer one started,
/// or after teardown, changes nothing.
#[derive(Debug)]
pub struct DashboardView<R: Summarize> {
    key: DashboardKey,
    params: ViewParams,
    filter: FilterState,
    state: ViewState<R>,
    generation: u64,
    torn_down: bool,
}

impl<R: Summarize + Selectable> DashboardView<R> {
    pub fn new(key: DashboardKey, params: ViewParams, filter: FilterState) -> Self {
        Self {
            key,
            params,
            filter,
            state: ViewState::Idle,
            generation: 0,
            torn_down: false,
        }
    }

    pub fn key(&self) -> DashboardKey {
        self.key
    }

    pub fn state(&self) -> &ViewState<R> {
        &self.state
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    /// Enter `Loading` (on mount or refresh). `None` once torn down.
    pub fn begin_load(&mut self) -> Option<Ticket> {
        if self.torn_down {
            return None;
        }
        self.generation += 1;
        let ticket = Ticket(self.generation);
        debug!(dashboard = %self.key, generation = self.generation, "loading");
        self.state = ViewState::Loading(ticket);
        Some(ticket)
    }

    /// Only valid from `Error`.
    pub fn retry(&mut self) -> Option<Ticket> {
        match self.state {
            ViewState::Error(_) => self.begin_load(),
            _ => None,
        }
    }

    /// Land a finished load. Returns whether it was applied.
    pub fn complete(&mut self, ticket: Ticket, outcome: Result<Loaded<R>>) -> bool {
        if self.torn_down || ticket != Ticket(self.generation) {
            debug!(dashboard = %self.key, ?ticket, "stale load ignored");
            return false;
        }
        self.state = match outcome {
            Ok(loaded) => {
                info!(
                    dashboard = %self.key,
                    records = loaded.records.len(),
                    sample = loaded.report.used_sample,
                    "dashboard ready"
                );
                ViewState::Ready(self.compute(loaded))
            }
            Err(e) => {
                warn!(dashboard = %self.key, error = %e, "dashboard failed to load");
                ViewState::Error(e.to_string())
            }
        };
        true
    }

    pub fn teardown(&mut self) {
        self.torn_down = true;
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Replace the filter. The latest filter is what a pending load will
    /// be shown with.
    pub fn set_filter(&mut self, filter: FilterState) {
        self.filter = filter;
        self.refresh_selection();
    }

    /// Edit the filter in place.
    pub fn apply_filter(&mut self, edit: impl FnOnce(&mut FilterState)) {
        edit(&mut self.filter);
        self.refresh_selection();
    }

    fn refresh_selection(&mut self) {
        if self.torn_down {
            return;
        }
        let state = std::mem::replace(&mut self.state, ViewState::Idle);
        self.state = match state {
            ViewState::Ready(ready) => ViewState::Ready(self.compute(ready.loaded)),
            other => other,
        };
    }

    fn compute(&self, loaded: Loaded<R>) -> Ready<R> {
        let ctx = self.params.context(&loaded.targets);
        let matching = select_indices(&loaded.records, &self.filter.unpaged());
        let refs: Vec<&R> = matching.iter().map(|&i| &loaded.records[i]).collect();
        let snapshot = R::summarize(&refs, &ctx);
        let matched = matching.len();
        let selection = match self.filter.page {
            Some(page) => matching.into_iter().skip(page.offset).take(page.limit).collect(),
            None => matching,
        };
        Ready {
            loaded,
            snapshot,
            selection,
            matched,
        }
    }

    pub fn snapshot(&self) -> Option<&R::Snapshot> {
        match &self.state {
            ViewState::Ready(r) => Some(&r.snapshot),
            _ => None,
        }
    }

    pub fn rows(&self) -> Vec<&R> {
        match &self.state {
            ViewState::Ready(r) => r.selection.iter().map(|&i| &r.loaded.records[i]).collect(),
            _ => Vec::new(),
        }
    }

    pub fn report(&self) -> Option<&LoadReport> {
        match &self.state {
            ViewState::Ready(r) => Some(&r.loaded.report),
            _ => None,
        }
    }

    /// Banner text: the sample-data notice when ready, the error when failed.
    pub fn banner(&self) -> Option<&str> {
        match &self.state {
            ViewState::Ready(r) => r.loaded.report.notice.as_deref(),
            ViewState::Error(msg) => Some(msg),
            _ => None,
        }
    }

    /// Everything a renderer needs for one frame.
    pub fn render(&self) -> Rendered<'_, R>
    where
        R: Serialize,
    {
        let (matched, report) = match &self.state {
            ViewState::Ready(r) => (r.matched, Some(&r.loaded.report)),
            _ => (0, None),
        };
        Rendered {
            dashboard: self.key,
            title: self.key.page_title(),
            state: self.state.name(),
            banner: self.banner(),
            retry: matches!(self.state, ViewState::Error(_)),
            report,
            snapshot: self.snapshot(),
            matched,
            rows: self.rows(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Rendered<'a, R: Summarize + Serialize> {
    pub dashboard: DashboardKey,
    pub title: String,
    pub state: &'static str,
    pub banner: Option<&'a str>,
    pub retry: bool,
    pub report: Option<&'a LoadReport>,
    pub snapshot: Option<&'a R::Snapshot>,
    pub matched: usize,
    pub rows: Vec<&'a R>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::normalize::VisitRecord;
    use crate::normalize::VisitStatus;
    use crate::view::{Page, SortSpec};
    use anyhow::Result;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap_or_default()
    }

    fn visit(id: &str, customer: &str, project: &str, day: u32) -> VisitRecord {
        VisitRecord {
            id: id.into(),
            customer_name: customer.into(),
            project: project.into(),
            status: VisitStatus::Scheduled,
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap_or_default(),
            time: None,
            phone: String::new(),
            address: String::new(),
            notes: String::new(),
        }
    }

    fn loaded(visits: Vec<VisitRecord>) -> Loaded<VisitRecord> {
        Loaded {
            records: visits,
            targets: Vec::new(),
            report: LoadReport::default(),
        }
    }

    fn view() -> DashboardView<VisitRecord> {
        let params = ViewParams::from_settings(&Settings::default(), today());
        DashboardView::new(DashboardKey::SalesCoordinator, params, FilterState::default())
    }

    fn sample() -> Vec<VisitRecord> {
        vec![
            visit("1", "Asha", "Virat Greens", 12),
            visit("2", "Bilal", "Virat Crown", 11),
            visit("3", "Chitra", "Virat Greens", 14),
        ]
    }

    #[test]
    fn load_lifecycle() -> Result<()> {
        let mut v = view();
        assert_eq!(v.state().name(), "idle");
        let t = v.begin_load().ok_or_else(|| anyhow::anyhow!("no ticket"))?;
        assert_eq!(v.state().name(), "loading");
        assert!(v.complete(t, Ok(loaded(sample()))));
        assert_eq!(v.state().name(), "ready");
        assert_eq!(v.rows().len(), 3);
        assert_eq!(v.snapshot().map(|s| s.total_visits), Some(3));
        Ok(())
    }

    #[test]
    fn stale_and_torn_down_loads_are_ignored() -> Result<()> {
        let mut v = view();
        let first = v.begin_load().ok_or_else(|| anyhow::anyhow!("no ticket"))?;
        let second = v.begin_load().ok_or_else(|| anyhow::anyhow!("no ticket"))?;
        assert!(!v.complete(first, Ok(loaded(sample()))));
        assert_eq!(v.state().name(), "loading");
        assert!(v.complete(second, Ok(loaded(sample()[..1].to_vec()))));
        assert_eq!(v.rows().len(), 1);

        let third = v.begin_load().ok_or_else(|| anyhow::anyhow!("no ticket"))?;
        v.teardown();
        assert!(!v.complete(third, Ok(loaded(sample()))));
        assert_eq!(v.state().name(), "loading");
        assert!(v.begin_load().is_none());
        Ok(())
    }

    #[test]
    fn errors_offer_retry() -> Result<()> {
        let mut v = view();
        assert!(v.retry().is_none());
        let t = v.begin_load().ok_or_else(|| anyhow::anyhow!("no ticket"))?;
        v.complete(
            t,
            Err(Error::NoUsableData {
                dashboard: "salesCoordinator".into(),
            }),
        );
        assert_eq!(v.state().name(), "error");
        assert!(v.banner().is_some_and(|b| b.contains("salesCoordinator")));
        assert!(v.render().retry);

        let again = v.retry().ok_or_else(|| anyhow::anyhow!("no retry"))?;
        assert_eq!(v.state().name(), "loading");
        assert!(v.complete(again, Ok(loaded(sample()))));
        assert_eq!(v.banner(), None);
        Ok(())
    }

    #[test]
    fn filters_recompute_in_ready() -> Result<()> {
        let mut v = view();
        let t = v.begin_load().ok_or_else(|| anyhow::anyhow!("no ticket"))?;
        v.complete(t, Ok(loaded(sample())));

        v.apply_filter(|f| f.project = Some("Virat Greens".into()));
        assert_eq!(v.snapshot().map(|s| s.total_visits), Some(2));
        v.apply_filter(|f| {
            f.sort = Some(SortSpec::desc("customer"));
            f.page = Some(Page { offset: 0, limit: 1 });
        });
        let names: Vec<_> = v.rows().iter().map(|r| r.customer_name.clone()).collect();
        assert_eq!(names, vec!["Chitra"]);
        assert_eq!(v.render().matched, 2);
        assert_eq!(v.snapshot().map(|s| s.total_visits), Some(2));
        Ok(())
    }

    #[test]
    fn filter_set_while_loading_applies_on_arrival() -> Result<()> {
        let mut v = view();
        let t = v.begin_load().ok_or_else(|| anyhow::anyhow!("no ticket"))?;
        v.set_filter(FilterState {
            search: "bilal".into(),
            ..FilterState::default()
        });
        v.complete(t, Ok(loaded(sample())));
        assert_eq!(v.rows().len(), 1);
        assert_eq!(v.rows()[0].id, "2");
        Ok(())
    }
}

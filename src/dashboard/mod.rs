// src/dashboard/mod.rs
//! The five dashboards, switching between them, and the per-view state.

use crate::config::Settings;
use crate::dates::DateWindow;
use crate::view::FilterState;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

pub mod load;
pub mod state;

pub use load::{load_calls, load_deals, load_home, load_leads, load_visits, LoadReport, Loaded};
pub use state::{DashboardView, Ready, Rendered, Ticket, ViewParams, ViewState};

pub const TITLE_PREFIX: &str = "CRM Dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DashboardKey {
    #[default]
    Home,
    Telecaller,
    SalesCoordinator,
    Salesman,
    CallAnalytics,
}

impl DashboardKey {
    pub const ALL: [DashboardKey; 5] = [
        DashboardKey::Home,
        DashboardKey::Telecaller,
        DashboardKey::SalesCoordinator,
        DashboardKey::Salesman,
        DashboardKey::CallAnalytics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DashboardKey::Home => "home",
            DashboardKey::Telecaller => "telecaller",
            DashboardKey::SalesCoordinator => "salesCoordinator",
            DashboardKey::Salesman => "salesman",
            DashboardKey::CallAnalytics => "callAnalytics",
        }
    }

    /// Sidebar label.
    pub fn label(&self) -> &'static str {
        match self {
            DashboardKey::Home => "Home",
            DashboardKey::Telecaller => "Telecaller",
            DashboardKey::SalesCoordinator => "Sales Coordinator",
            DashboardKey::Salesman => "Salesman",
            DashboardKey::CallAnalytics => "Call Analytics",
        }
    }

    /// Document title: the key with its first letter upper-cased.
    pub fn page_title(&self) -> String {
        let key = self.as_str();
        let mut chars = key.chars();
        let head: String = chars.next().map(|c| c.to_uppercase().collect()).unwrap_or_default();
        format!("{} | {}{}", TITLE_PREFIX, head, chars.as_str())
    }

    /// Filter a freshly mounted view starts with. Call analytics opens on
    /// the last `default_window_days`; the others show everything.
    pub fn initial_filter(&self, settings: &Settings, today: NaiveDate) -> FilterState {
        let window = match self {
            DashboardKey::CallAnalytics => {
                Some(DateWindow::last_days(today, settings.default_window_days))
            }
            _ => None,
        };
        FilterState {
            window,
            ..FilterState::default()
        }
    }
}

impl fmt::Display for DashboardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown keys land on the home page.
impl FromStr for DashboardKey {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(DashboardKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .unwrap_or_default())
    }
}

/// Which dashboard is showing. `navigate` is the only way to switch; the
/// embedding router reads `current` and `query` to update its location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigator {
    current: DashboardKey,
    history: Vec<DashboardKey>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(DashboardKey::Home)
    }
}

impl Navigator {
    pub fn new(start: DashboardKey) -> Self {
        Self {
            current: start,
            history: vec![start],
        }
    }

    /// Start from a location query such as `?page=salesman`.
    pub fn from_query(query: &str) -> Self {
        let query = query.trim_start_matches('?');
        let key = url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == "page")
            .map(|(_, v)| v.parse().unwrap_or_default())
            .unwrap_or_default();
        Self::new(key)
    }

    pub fn navigate(&mut self, to: DashboardKey) -> DashboardKey {
        if to != self.current {
            debug!(from = %self.current, to = %to, "navigate");
            self.current = to;
            self.history.push(to);
        }
        self.current
    }

    /// Step back to the previous dashboard; stays put at the first entry.
    pub fn back(&mut self) -> DashboardKey {
        if self.history.len() > 1 {
            self.history.pop();
        }
        if let Some(prev) = self.history.last() {
            self.current = *prev;
        }
        self.current
    }

    pub fn current(&self) -> DashboardKey {
        self.current
    }

    pub fn history(&self) -> &[DashboardKey] {
        &self.history
    }

    pub fn page_title(&self) -> String {
        self.current.page_title()
    }

    /// `page=<key>` for the address bar.
    pub fn query(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("page", self.current.as_str())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip_and_unknown_goes_home() {
        for key in DashboardKey::ALL {
            assert_eq!(key.as_str().parse::<DashboardKey>(), Ok(key));
        }
        assert_eq!("reports".parse::<DashboardKey>(), Ok(DashboardKey::Home));
        assert_eq!("".parse::<DashboardKey>(), Ok(DashboardKey::Home));
    }

    #[test]
    fn titles_follow_the_key() {
        assert_eq!(DashboardKey::Home.page_title(), "CRM Dashboard | Home");
        assert_eq!(
            DashboardKey::SalesCoordinator.page_title(),
            "CRM Dashboard | SalesCoordinator"
        );
    }

    #[test]
    fn navigation_records_history() {
        let mut nav = Navigator::default();
        assert_eq!(nav.navigate(DashboardKey::Salesman), DashboardKey::Salesman);
        nav.navigate(DashboardKey::Salesman);
        nav.navigate(DashboardKey::CallAnalytics);
        assert_eq!(
            nav.history(),
            &[DashboardKey::Home, DashboardKey::Salesman, DashboardKey::CallAnalytics]
        );
        assert_eq!(nav.query(), "page=callAnalytics");
        assert_eq!(nav.back(), DashboardKey::Salesman);
        assert_eq!(nav.back(), DashboardKey::Home);
        assert_eq!(nav.back(), DashboardKey::Home);
        assert_eq!(nav.page_title(), "CRM Dashboard | Home");
    }

    #[test]
    fn starts_from_location_query() {
        assert_eq!(
            Navigator::from_query("?page=telecaller&x=1").current(),
            DashboardKey::Telecaller
        );
        assert_eq!(Navigator::from_query("?page=nope").current(), DashboardKey::Home);
        assert_eq!(Navigator::from_query("").current(), DashboardKey::Home);
    }

    #[test]
    fn call_analytics_opens_on_recent_window() {
        let settings = Settings::default();
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap_or_default();
        let f = DashboardKey::CallAnalytics.initial_filter(&settings, today);
        assert_eq!(f.window, Some(DateWindow::last_days(today, 7)));
        assert_eq!(DashboardKey::Home.initial_filter(&settings, today).window, None);
    }
}

// src/main.rs
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crmdash::{
    aggregate::Summarize,
    config::Settings,
    dashboard::{
        load_calls, load_deals, load_home, load_leads, load_visits, DashboardKey, DashboardView,
        Loaded, ViewParams, ViewState,
    },
    dates::{self, parse_date, DateOrder, DateWindow},
    fetch::{Fallback, HttpSource, Source, StaticSource},
    view::{FilterState, Selectable, SortSpec},
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Load one CRM dashboard and print what it would show as JSON.
#[derive(Parser, Debug)]
#[command(name = "crmdash")]
#[command(version)]
struct Cli {
    /// YAML settings file (falls back to $CRMDASH_CONFIG, then defaults)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// home, telecaller, salesCoordinator, salesman or callAnalytics
    #[arg(short, long, default_value = "home")]
    dashboard: String,

    /// First day to include (YYYY-MM-DD)
    #[arg(long)]
    from: Option<String>,

    /// Last day to include (YYYY-MM-DD), defaults to today
    #[arg(long)]
    to: Option<String>,

    /// Case-insensitive text search over the table rows
    #[arg(short, long, default_value = "")]
    search: String,

    /// Only rows for this agent
    #[arg(short, long)]
    agent: Option<String>,

    /// Sort the table by this field
    #[arg(long)]
    sort: Option<String>,

    /// Sort descending
    #[arg(long, requires = "sort")]
    desc: bool,

    /// Use the built-in sample data only; no network
    #[arg(long)]
    offline: bool,
}

fn parse_day(text: &str) -> Result<chrono::NaiveDate> {
    parse_date(text, DateOrder::MonthFirst).ok_or_else(|| anyhow!("unrecognised date `{}`", text))
}

fn build_filter(cli: &Cli, key: DashboardKey, settings: &Settings, today: chrono::NaiveDate) -> Result<FilterState> {
    let mut filter = key.initial_filter(settings, today);
    if cli.from.is_some() || cli.to.is_some() {
        let end = match &cli.to {
            Some(t) => parse_day(t).context("parsing --to")?,
            None => today,
        };
        let start = match &cli.from {
            Some(f) => parse_day(f).context("parsing --from")?,
            None => chrono::NaiveDate::MIN,
        };
        filter.window = Some(DateWindow::new(start, end));
    }
    filter.search = cli.search.clone();
    filter.agent = cli.agent.clone();
    filter.sort = cli.sort.as_ref().map(|field| {
        if cli.desc {
            SortSpec::desc(field.as_str())
        } else {
            SortSpec::asc(field.as_str())
        }
    });
    Ok(filter)
}

/// Run one load through the view state machine and serialize the frame.
fn render<R>(
    key: DashboardKey,
    params: ViewParams,
    filter: FilterState,
    outcome: crmdash::Result<Loaded<R>>,
) -> Result<String>
where
    R: Summarize + Selectable + Serialize,
{
    let mut view = DashboardView::new(key, params, filter);
    let ticket = view
        .begin_load()
        .ok_or_else(|| anyhow!("view was torn down before loading"))?;
    view.complete(ticket, outcome);

    let json = serde_json::to_string_pretty(&view.render()).context("serializing dashboard")?;
    if let ViewState::Error(msg) = view.state() {
        println!("{}", json);
        return Err(anyhow!("{} failed to load: {}", key, msg));
    }
    Ok(json)
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,crmdash=info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    let cli = Cli::parse();

    // ─── 2) settings & sources ───────────────────────────────────────
    let settings = Settings::load(cli.config.as_deref()).context("loading settings")?;
    let today = dates::today();
    let key: DashboardKey = cli.dashboard.parse().unwrap_or_default();
    info!(dashboard = %key, offline = cli.offline, "startup");

    let samples = StaticSource::new(&settings, today).context("building sample data")?;
    let source: Box<dyn Source> = if cli.offline {
        Box::new(samples)
    } else {
        let http = HttpSource::from_settings(&settings).context("building HTTP client")?;
        if settings.sample_fallback {
            Box::new(Fallback::new(http, samples, settings.fallback_routes()))
        } else {
            Box::new(http)
        }
    };
    let source = source.as_ref();

    // ─── 3) load, aggregate, select ──────────────────────────────────
    let filter = build_filter(&cli, key, &settings, today)?;
    let params = ViewParams::from_settings(&settings, today);
    let json = match key {
        DashboardKey::Home => render(key, params, filter, load_home(source, &settings, today).await)?,
        DashboardKey::Telecaller => {
            render(key, params, filter, load_leads(source, &settings, today).await)?
        }
        DashboardKey::SalesCoordinator => {
            render(key, params, filter, load_visits(source, &settings, today).await)?
        }
        DashboardKey::Salesman => {
            render(key, params, filter, load_deals(source, &settings, today).await)?
        }
        DashboardKey::CallAnalytics => {
            render(key, params, filter, load_calls(source, &settings, today).await)?
        }
    };

    println!("{}", json);
    Ok(())
}

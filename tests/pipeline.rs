// tests/pipeline.rs
use anyhow::Result;
use chrono::NaiveDate;
use crmdash::{
    aggregate::{aggregate, AggregateContext},
    config::Settings,
    dashboard::{
        load_calls, load_deals, load_home, load_leads, load_visits, DashboardKey, DashboardView,
        ViewParams,
    },
    dates::{DateOrder, DateWindow},
    fetch::{Fallback, HttpSource, StaticSource},
    normalize::{normalize_text, CallRecord, CallType, SourceContext},
    view::{select, FilterState},
};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn init_test_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,crmdash=debug")),
        )
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 10).unwrap_or_default()
}

/// Serves every request with `status` and `body`; returns the sheet URL.
async fn serve(status: &'static str, body: &'static str) -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        while let Ok((mut sock, _)) = listener.accept().await {
            let mut buf = [0u8; 2048];
            let _ = sock.read(&mut buf).await;
            let reply = format!(
                "HTTP/1.1 {}\r\ncontent-type: text/csv\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = sock.write_all(reply.as_bytes()).await;
        }
    });
    Ok(format!("http://{}/pub?output=csv", addr))
}

fn two_agents(first_sheet: &str, second_sheet: &str) -> Result<Settings> {
    let yaml = format!(
        r#"
staff:
  - key: neha
    name: Neha
    phone_number: "9000000001"
    call_log_sheet: {}
    role: telecaller
  - key: vikram
    name: Vikram
    phone_number: "9000000002"
    call_log_sheet: {}
    role: salesman
sample_fallback: false
"#,
        first_sheet, second_sheet
    );
    Ok(Settings::from_yaml_str(&yaml)?)
}

#[test]
fn scenario_header_and_single_row() -> Result<()> {
    init_test_logging();
    let text = "Date,Name,Number,Duration,Type\n2024-01-05,John,9990001111,00h 02m 30s,Incoming\n";
    let ctx = SourceContext::new("inline", DateOrder::MonthFirst, today());
    let calls = normalize_text::<CallRecord>(text, &ctx)?;

    assert_eq!(calls.records.len(), 1);
    assert_eq!(calls.dropped, 0);
    let call = &calls.records[0];
    assert_eq!(call.duration_seconds, 150);
    assert_eq!(call.call_type, CallType::Incoming);
    assert_eq!(call.call_type.as_str(), "Incoming");
    assert_eq!(call.customer_name, "John");
    Ok(())
}

#[test]
fn scenario_zero_duration_outgoing_did_not_connect() -> Result<()> {
    init_test_logging();
    let settings = Settings::default();
    let staff = &settings.staff[0];
    let text = format!(
        "Date,From Number,To Number,Duration\n2024-01-05,{},9990001111,00h 00m 00s\n",
        staff.phone_number
    );
    let ctx = SourceContext::new("inline", DateOrder::MonthFirst, today()).with_staff(staff);
    let calls = normalize_text::<CallRecord>(&text, &ctx)?;

    assert_eq!(calls.records.len(), 1);
    assert_eq!(calls.records[0].call_type, CallType::DidNotConnect);
    assert_ne!(calls.records[0].call_type, CallType::Missed);
    Ok(())
}

#[test]
fn scenario_empty_set_aggregates_to_zero() -> Result<()> {
    init_test_logging();
    let calls: Vec<CallRecord> = Vec::new();
    let metrics = aggregate(&calls, &DateWindow::unbounded(), &AggregateContext::new(today()));

    assert_eq!(metrics.total_calls, 0);
    assert_eq!(metrics.total_duration_secs, 0);
    assert_eq!(metrics.average_duration_secs, 0.0);
    assert!(metrics.by_type.iter().all(|(_, n)| *n == 0));
    assert!(metrics.type_rates.iter().all(|(_, r)| *r == 0.0));
    assert!(metrics.daily.is_empty());
    Ok(())
}

#[tokio::test]
async fn scenario_one_source_down_one_up() -> Result<()> {
    init_test_logging();
    let down = serve("500 Internal Server Error", "boom").await?;
    let up = serve(
        "200 OK",
        "Sr.No,Date,Time,From Number,To Number,Duration,Type,Name\n\
         1,01/09/2024,10:15:00,9000000002,9876500001,00h 03m 00s,Outgoing,Ravi\n\
         2,01/08/2024,16:40:00,9876500002,9000000002,00h 01m 10s,Incoming,Meena\n",
    )
    .await?;
    let settings = two_agents(&down, &up)?;
    let source = HttpSource::new(Duration::from_secs(5))?;

    let loaded = load_calls(&source, &settings, today()).await;
    let mut view: DashboardView<CallRecord> = DashboardView::new(
        DashboardKey::CallAnalytics,
        ViewParams::from_settings(&settings, today()),
        FilterState::default(),
    );
    let ticket = view.begin_load().ok_or_else(|| anyhow::anyhow!("no ticket"))?;
    assert!(view.complete(ticket, loaded));

    assert_eq!(view.state().name(), "ready");
    assert_eq!(view.banner(), None);
    let rows = view.rows();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|c| c.telecaller == "Vikram"));
    assert_eq!(rows[0].customer_name, "Ravi");
    let report = view.report().ok_or_else(|| anyhow::anyhow!("no report"))?;
    assert_eq!((report.sources_ok, report.sources_failed), (1, 1));
    assert!(!report.used_sample);
    Ok(())
}

#[tokio::test]
async fn one_source_down_with_sample_fallback_keeps_only_live_rows() -> Result<()> {
    init_test_logging();
    let down = serve("500 Internal Server Error", "boom").await?;
    let up = serve(
        "200 OK",
        "Sr.No,Date,Time,From Number,To Number,Duration,Type,Name\n\
         1,01/09/2024,10:15:00,9000000002,9876500001,00h 03m 00s,Outgoing,Ravi\n\
         2,01/08/2024,16:40:00,9876500002,9000000002,00h 01m 10s,Incoming,Meena\n",
    )
    .await?;
    let mut settings = two_agents(&down, &up)?;
    settings.sample_fallback = true;
    let http = HttpSource::new(Duration::from_secs(5))?;
    let samples = StaticSource::new(&settings, today())?;
    let stack = Fallback::new(http, samples, settings.fallback_routes());

    let loaded = load_calls(&stack, &settings, today()).await?;
    assert_eq!(loaded.records.len(), 2);
    assert!(loaded.records.iter().all(|c| c.telecaller == "Vikram"));
    assert_eq!((loaded.report.sources_ok, loaded.report.sources_failed), (1, 1));
    assert_eq!(loaded.report.sample_sources, 0);
    assert!(!loaded.report.used_sample);
    assert_eq!(loaded.report.notice, None);
    Ok(())
}

#[tokio::test]
async fn every_source_down_without_samples_shows_retry() -> Result<()> {
    init_test_logging();
    let a = serve("500 Internal Server Error", "boom").await?;
    let b = serve("200 OK", " ").await?;
    let settings = two_agents(&a, &b)?;
    let source = HttpSource::new(Duration::from_secs(5))?;

    let mut view: DashboardView<CallRecord> = DashboardView::new(
        DashboardKey::CallAnalytics,
        ViewParams::from_settings(&settings, today()),
        FilterState::default(),
    );
    let ticket = view.begin_load().ok_or_else(|| anyhow::anyhow!("no ticket"))?;
    view.complete(ticket, load_calls(&source, &settings, today()).await);

    assert_eq!(view.state().name(), "error");
    assert!(view.render().retry);
    assert!(view.rows().is_empty());
    Ok(())
}

#[test]
fn scenario_search_matches_phone_digits() -> Result<()> {
    init_test_logging();
    let text = "Date,Name,From Number,To Number,Duration,Type\n\
        2024-01-05,Anil,9990001111,8556896739,00h 01m 00s,Incoming\n\
        2024-01-05,Bina,8556896739,7000099900,00h 01m 00s,Outgoing\n\
        2024-01-06,Chetan,8556896739,7000012345,00h 01m 00s,Outgoing\n\
        2024-01-06,Deepa 999,8556896739,7000054321,00h 01m 00s,Outgoing\n";
    let ctx = SourceContext::new("inline", DateOrder::MonthFirst, today());
    let calls = normalize_text::<CallRecord>(text, &ctx)?.records;

    let filter = FilterState {
        search: "999".into(),
        ..FilterState::default()
    };
    let hits: Vec<&str> = select(&calls, &filter)
        .iter()
        .map(|c| c.customer_name.as_str())
        .collect();
    assert_eq!(hits, vec!["Anil", "Bina", "Deepa 999"]);
    assert_eq!(select(&calls, &filter), select(&calls, &filter));
    Ok(())
}

#[tokio::test]
async fn offline_samples_fill_every_dashboard() -> Result<()> {
    init_test_logging();
    let settings = Settings::default();
    let samples = StaticSource::new(&settings, today())?;

    let calls = load_calls(&samples, &settings, today()).await?;
    assert!(!calls.records.is_empty());
    assert!(calls.report.notice.is_some());

    let leads = load_leads(&samples, &settings, today()).await?;
    assert!(!leads.records.is_empty());
    let visits = load_visits(&samples, &settings, today()).await?;
    assert_eq!(visits.records.len(), 5);
    let deals = load_deals(&samples, &settings, today()).await?;
    assert_eq!(deals.records.len(), 5);
    assert!(!deals.targets.is_empty());
    let home = load_home(&samples, &settings, today()).await?;
    assert!(!home.records.is_empty());
    assert!(home.report.used_sample);
    Ok(())
}

#[tokio::test]
async fn dead_sheets_fall_back_to_samples() -> Result<()> {
    init_test_logging();
    let dead = serve("404 Not Found", "gone").await?;
    let mut settings = Settings::default();
    settings.sources.visits.url = dead;
    let http = HttpSource::new(Duration::from_secs(5))?;
    let samples = StaticSource::new(&settings, today())?;
    let stack = Fallback::new(http, samples, settings.fallback_routes());

    let visits = load_visits(&stack, &settings, today()).await?;
    assert_eq!(visits.records.len(), 5);
    assert!(visits.report.used_sample);
    assert!(visits.report.notice.is_some());
    Ok(())
}

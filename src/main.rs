use analytics::{AnalysisResult, AnalyticsEngine, KpiCalculator, KpiSnapshot};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::Table;
use configuration::Settings;
use core_types::{AnalysisType, ExtractEntry, FilterParams};
use database::DbError;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// The main entry point for the fund cash-ledger dashboard.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the real environment still applies.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let settings = configuration::load_config(cli.config.as_deref())?;
    let _log_guard = init_tracing(&settings.server.log_dir)?;

    match cli.command {
        Commands::Serve(args) => handle_serve(args, settings).await,
        Commands::Report(args) => handle_report(args, settings).await,
    }
}

/// Console output plus a daily rolling file under `log_dir`.
///
/// The returned guard flushes the file writer when dropped, so it must live
/// until the program exits.
fn init_tracing(log_dir: &str) -> anyhow::Result<WorkerGuard> {
    let file_appender = tracing_appender::rolling::daily(log_dir, "painel.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()?;

    Ok(guard)
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Cash-ledger dashboard for investment funds.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file (defaults to ./painel.toml if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the dashboard API.
    Serve(ServeArgs),
    /// Run one analysis against the ledger and print it.
    Report(ReportArgs),
}

#[derive(Parser)]
struct ServeArgs {
    /// Overrides `server.bind_addr` (e.g. "127.0.0.1:8080").
    #[arg(long)]
    addr: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ReportKind {
    Liquidity,
    Concentration,
    BalanceEvolution,
    Kpis,
}

#[derive(Parser)]
struct ReportArgs {
    #[arg(value_enum)]
    kind: ReportKind,

    /// First day of the period (format: YYYY-MM-DD).
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last day of the period (format: YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Restrict to a fund. Repeatable.
    #[arg(long)]
    fund: Vec<String>,

    /// Restrict to a custodian. Repeatable.
    #[arg(long)]
    custodian: Vec<String>,
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_serve(args: ServeArgs, mut settings: Settings) -> anyhow::Result<()> {
    if let Some(addr) = args.addr {
        settings.server.bind_addr = addr;
    }
    tracing::info!(addr = %settings.server.bind_addr, "Starting dashboard server.");
    web_server::run_server(settings).await
}

async fn handle_report(args: ReportArgs, settings: Settings) -> anyhow::Result<()> {
    let end = args.to.unwrap_or_else(|| Local::now().date_naive());
    let start = args.from.unwrap_or_else(|| {
        FilterParams::last_days(end, settings.analytics.default_period_days).start_date
    });
    let filters = FilterParams::new(start, end)
        .with_funds(args.fund)
        .with_custodians(args.custodian);
    filters.validate()?;

    tracing::info!(report = ?args.kind, %start, %end, "Running report.");
    let repo = database::connect_or_offline(&settings.database).await?;
    println!("Period: {} to {} ({} days)", start, end, filters.period_days());

    let analysis_type = match args.kind {
        ReportKind::Liquidity => Some(AnalysisType::Liquidity),
        ReportKind::Concentration => Some(AnalysisType::Concentration),
        ReportKind::BalanceEvolution => Some(AnalysisType::BalanceEvolution),
        ReportKind::Kpis => None,
    };

    match analysis_type {
        Some(kind) => {
            let engine = AnalyticsEngine::new(settings.analytics.clone());
            let result = engine.analyze(kind, &repo, &filters).await;
            print_analysis(&result);
        }
        None => {
            let entries = entries_or_empty(repo.get_extract_data(&filters).await);
            let calculator = KpiCalculator::new();
            let snapshot = calculator.calculate(&entries, &filters, Local::now().naive_local());
            print_kpis(&snapshot);
            for alert in calculator.alerts(&snapshot) {
                println!("[{:?}] {}: {}", alert.severity, alert.title, alert.detail);
            }
        }
    }

    repo.close().await;
    Ok(())
}

/// An unreadable ledger reports as an empty period, like the dashboard does.
fn entries_or_empty(result: Result<Vec<ExtractEntry>, DbError>) -> Vec<ExtractEntry> {
    match result {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(error = %e, "Extract data unavailable; reporting empty KPIs.");
            println!("Extract data unavailable: {e}");
            Vec::new()
        }
    }
}

fn print_analysis(result: &AnalysisResult) {
    if !result.success {
        println!(
            "{}: {}",
            result.analysis_type,
            result.message.as_deref().unwrap_or("no result")
        );
        return;
    }

    let mut metrics = Table::new();
    metrics.set_header(vec!["Metric", "Value", "Status", "Severity"]);
    for metric in result.metrics.values() {
        metrics.add_row(vec![
            metric.name.clone(),
            metric.formatted_value(2),
            metric.status.clone(),
            format!("{:?}", metric.severity),
        ]);
    }
    println!("{metrics}");

    if !result.alerts.is_empty() {
        let mut alerts = Table::new();
        alerts.set_header(vec!["Severity", "Fund", "Message"]);
        for alert in &result.alerts {
            alerts.add_row(vec![
                format!("{:?}", alert.severity),
                alert.fund.clone(),
                alert.message.clone(),
            ]);
        }
        println!("{alerts}");
    }

    if let Some(summary) = &result.summary {
        println!("{summary}");
    }
}

fn print_kpis(snapshot: &KpiSnapshot) {
    let mut table = Table::new();
    table.set_header(vec!["KPI", "Value"]);
    let rows: Vec<(&str, String)> = vec![
        ("Total volume", snapshot.total_volume.round_dp(2).to_string()),
        ("Net flow", snapshot.net_flow.round_dp(2).to_string()),
        ("Operations", snapshot.operation_count.to_string()),
        ("Active funds", snapshot.active_funds.to_string()),
        ("Liquidity ratio", snapshot.liquidity.ratio.round_dp(2).to_string()),
        ("Liquidity risk", snapshot.liquidity.risk_level.label().to_string()),
        (
            "Herfindahl index",
            snapshot.concentration.herfindahl_index.round_dp(2).to_string(),
        ),
        (
            "Concentration risk",
            snapshot.concentration.risk_level.label().to_string(),
        ),
        (
            "Operational efficiency",
            snapshot.performance.operational_efficiency.round_dp(1).to_string(),
        ),
        ("Health", snapshot.performance.health.label().to_string()),
        ("Data quality", snapshot.data_quality_score.round_dp(1).to_string()),
    ];
    for (name, value) in rows {
        table.add_row(vec![name.to_string(), value]);
    }
    println!("{table}");
}

use anyhow::Context;
use clap::Parser;
use std::collections::BTreeMap;
use stockgauge_core::dashboard::Dashboard;
use stockgauge_core::domain::level::Scale;
use stockgauge_core::history::MetricsHistory;
use stockgauge_core::ingest::quotes::{self, HttpChartQuoteSource, QuoteSource};
use stockgauge_core::scoring::Evaluation;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod report;

#[derive(Debug, Parser)]
#[command(name = "stockgauge_worker")]
struct Args {
    /// Dashboard to evaluate: risk or investment.
    #[arg(long, default_value = "investment")]
    scale: Scale,

    /// Comma-separated stock symbols. Defaults to every symbol in the table.
    #[arg(long, value_delimiter = ',')]
    symbols: Vec<String>,

    /// CSV table path. Overrides STOCK_TABLE_PATH / METRICS_TABLE_PATH.
    #[arg(long)]
    table: Option<String>,

    /// JSON category definitions. Overrides the built-in thresholds.
    #[arg(long)]
    categories: Option<String>,

    /// Overlay live price and volume from the quote source.
    #[arg(long)]
    live_quotes: bool,

    /// Print the evaluation as JSON instead of a text table.
    #[arg(long)]
    json: bool,

    /// Re-evaluate on every refresh interval until interrupted.
    #[arg(long)]
    watch: bool,

    /// Stop watching after this many evaluations.
    #[arg(long, requires = "watch")]
    ticks: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = stockgauge_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let res = run(args, &settings).await;
    if let Err(err) = &res {
        sentry_anyhow::capture_anyhow(err);
    }
    res
}

async fn run(args: Args, settings: &stockgauge_core::config::Settings) -> anyhow::Result<()> {
    let scale = args.scale;
    let table_path = match args.table.as_deref() {
        Some(p) => p,
        None => settings.require_table_path(scale)?,
    };
    let categories_path = args
        .categories
        .as_deref()
        .or_else(|| settings.categories_path(scale));

    let dashboard = Dashboard::load_from(table_path, categories_path, scale)?;

    let symbols = resolve_symbols(&args.symbols, &dashboard);
    anyhow::ensure!(!symbols.is_empty(), "no stock symbols to evaluate");

    let quote_source: Option<Box<dyn QuoteSource>> = if args.live_quotes || settings.live_quotes {
        Some(Box::new(HttpChartQuoteSource::from_settings(settings)?))
    } else {
        None
    };

    if !args.watch {
        let evaluation = evaluate_once(&dashboard, &symbols, quote_source.as_deref()).await;
        return print_evaluation(&evaluation, args.json);
    }

    let mut history = MetricsHistory::from_env();
    let mut previous: Option<BTreeMap<String, i32>> = None;
    let mut interval = tokio::time::interval(settings.refresh_interval());
    let mut tick: u32 = 0;

    tracing::info!(
        %scale,
        symbols = symbols.len(),
        every_secs = settings.refresh_interval_secs,
        "watching dashboard"
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!(tick, "interrupted; stopping");
                break;
            }
        }

        tick += 1;
        let evaluation = evaluate_once(&dashboard, &symbols, quote_source.as_deref()).await;
        history.record(&evaluation);

        let scores = evaluation.stock_scores();
        if let Some(prev) = &previous {
            for (symbol, score) in &scores {
                let before = prev.get(symbol).copied().unwrap_or(*score);
                if before != *score {
                    tracing::info!(symbol = %symbol, before, after = *score, "stock score changed");
                }
            }
        }
        previous = Some(scores);

        tracing::info!(
            tick,
            portfolio_score = evaluation.portfolio_score,
            recorded = symbols.iter().map(|s| history.len(s)).sum::<usize>(),
            "dashboard tick"
        );
        print_evaluation(&evaluation, args.json)?;

        if args.ticks.is_some_and(|max| tick >= max) {
            break;
        }
    }

    Ok(())
}

async fn evaluate_once(
    dashboard: &Dashboard,
    symbols: &[String],
    quote_source: Option<&dyn QuoteSource>,
) -> Evaluation {
    let live = match quote_source {
        Some(source) => Some(quotes::fetch_quotes(source, symbols).await),
        None => None,
    };
    dashboard.evaluate(symbols, live.as_ref(), chrono::Utc::now())
}

fn resolve_symbols(requested: &[String], dashboard: &Dashboard) -> Vec<String> {
    let requested: Vec<String> = requested
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if requested.is_empty() {
        dashboard.table.symbols().to_vec()
    } else {
        requested
    }
}

fn print_evaluation(evaluation: &Evaluation, json: bool) -> anyhow::Result<()> {
    if json {
        let text = serde_json::to_string_pretty(evaluation).context("failed to encode evaluation")?;
        println!("{text}");
    } else {
        print!("{}", report::render(evaluation));
    }
    Ok(())
}

fn init_sentry(settings: &stockgauge_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

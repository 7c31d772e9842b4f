use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stockgauge_core::dashboard::Dashboard;
use stockgauge_core::domain::category::CategorySet;
use stockgauge_core::domain::level::Scale;
use stockgauge_core::history::{MetricsHistory, Series};
use stockgauge_core::ingest::quotes::{self, HttpChartQuoteSource, QuoteSource};
use stockgauge_core::scoring::Evaluation;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = stockgauge_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let mut dashboards = BTreeMap::new();
    for scale in Scale::ALL {
        match Dashboard::load(&settings, scale) {
            Ok(dashboard) => {
                tracing::info!(
                    %scale,
                    stocks = dashboard.table.len(),
                    parameters = dashboard.categories.parameter_count(),
                    "dashboard ready"
                );
                dashboards.insert(scale, dashboard);
            }
            Err(e) => {
                sentry_anyhow::capture_anyhow(&e);
                tracing::error!(%scale, error = ?e, "dashboard load failed; serving it in degraded mode");
            }
        }
    }

    let quote_source: Option<Arc<dyn QuoteSource>> = if settings.live_quotes {
        match HttpChartQuoteSource::from_settings(&settings) {
            Ok(source) => Some(Arc::new(source)),
            Err(e) => {
                sentry_anyhow::capture_anyhow(&e);
                tracing::error!(error = %e, "quote source init failed; live quotes disabled");
                None
            }
        }
    } else {
        None
    };

    let state = AppState {
        dashboards: Arc::new(dashboards),
        quote_source,
        history: Arc::new(Mutex::new(BTreeMap::new())),
    };

    let app = router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/dashboards/:scale/stocks", get(list_stocks))
        .route("/dashboards/:scale/categories", get(get_categories))
        .route("/dashboards/:scale/evaluate", get(evaluate_selection))
        .route("/dashboards/:scale/history", get(get_history))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    dashboards: Arc<BTreeMap<Scale, Dashboard>>,
    quote_source: Option<Arc<dyn QuoteSource>>,
    history: Arc<Mutex<BTreeMap<Scale, MetricsHistory>>>,
}

impl AppState {
    fn dashboard(&self, scale: &str) -> Result<(Scale, &Dashboard), StatusCode> {
        let scale: Scale = scale.parse().map_err(|_| StatusCode::NOT_FOUND)?;
        let dashboard = self
            .dashboards
            .get(&scale)
            .ok_or(StatusCode::SERVICE_UNAVAILABLE)?;
        Ok((scale, dashboard))
    }
}

#[derive(Debug, Serialize)]
struct StockList {
    scale: Scale,
    symbols: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SelectionQuery {
    symbols: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    symbols: Option<String>,
    parameter: Option<String>,
}

async fn list_stocks(
    State(state): State<AppState>,
    Path(scale): Path<String>,
) -> Result<Json<StockList>, StatusCode> {
    let (scale, dashboard) = state.dashboard(&scale)?;
    Ok(Json(StockList {
        scale,
        symbols: dashboard.table.symbols().to_vec(),
    }))
}

async fn get_categories(
    State(state): State<AppState>,
    Path(scale): Path<String>,
) -> Result<Json<CategorySet>, StatusCode> {
    let (_, dashboard) = state.dashboard(&scale)?;
    Ok(Json(dashboard.categories.clone()))
}

async fn evaluate_selection(
    State(state): State<AppState>,
    Path(scale): Path<String>,
    Query(query): Query<SelectionQuery>,
) -> Result<Json<Evaluation>, StatusCode> {
    let (scale, dashboard) = state.dashboard(&scale)?;
    let symbols = parse_symbols(query.symbols.as_deref());
    if symbols.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let live = match &state.quote_source {
        Some(source) => Some(quotes::fetch_quotes(source.as_ref(), &symbols).await),
        None => None,
    };

    let evaluation = dashboard.evaluate(&symbols, live.as_ref(), chrono::Utc::now());

    state
        .history
        .lock()
        .await
        .entry(scale)
        .or_insert_with(MetricsHistory::from_env)
        .record(&evaluation);

    tracing::debug!(
        %scale,
        stocks = evaluation.stocks.len(),
        skipped = evaluation.skipped.len(),
        portfolio_score = evaluation.portfolio_score,
        "evaluated selection"
    );

    Ok(Json(evaluation))
}

async fn get_history(
    State(state): State<AppState>,
    Path(scale): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<Series>>, StatusCode> {
    let (scale, _) = state.dashboard(&scale)?;
    let symbols = parse_symbols(query.symbols.as_deref());
    if symbols.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let history = state.history.lock().await;
    let Some(history) = history.get(&scale) else {
        return Ok(Json(Vec::new()));
    };

    let series = match query.parameter.as_deref().map(str::trim) {
        Some(parameter) if !parameter.is_empty() => symbols
            .iter()
            .map(|s| history.series(s, parameter))
            .collect(),
        _ => history.all_series(&symbols),
    };

    Ok(Json(series))
}

/// Comma-separated selection, trimmed, blanks dropped.
fn parse_symbols(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
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

#[cfg(test)]
mod tests {
    use super::*;
    use stockgauge_core::domain::stock::{StockRow, StockTable};

    fn state_with_investment() -> AppState {
        let table: StockTable = vec![StockRow::new("AAPL").with("Sharpe Ratio", 2.5)]
            .into_iter()
            .collect();
        let mut dashboards = BTreeMap::new();
        dashboards.insert(
            Scale::Investment,
            Dashboard::new(CategorySet::defaults(Scale::Investment), table),
        );
        AppState {
            dashboards: Arc::new(dashboards),
            quote_source: None,
            history: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    #[test]
    fn parses_symbol_selection() {
        assert_eq!(
            parse_symbols(Some(" AAPL, ,MSFT,")),
            vec!["AAPL".to_string(), "MSFT".to_string()]
        );
        assert!(parse_symbols(None).is_empty());
    }

    #[test]
    fn resolves_dashboards_by_scale() {
        let state = state_with_investment();
        assert!(state.dashboard("investment").is_ok());
        assert_eq!(
            state.dashboard("risk").err(),
            Some(StatusCode::SERVICE_UNAVAILABLE)
        );
        assert_eq!(state.dashboard("bonds").err(), Some(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn evaluation_is_appended_to_history() {
        let state = state_with_investment();
        let query = SelectionQuery {
            symbols: Some("AAPL,ZZZ".to_string()),
        };

        let Json(eval) = evaluate_selection(
            State(state.clone()),
            Path("investment".to_string()),
            Query(query),
        )
        .await
        .unwrap();
        assert_eq!(eval.portfolio_score, 2);
        assert_eq!(eval.skipped, vec!["ZZZ".to_string()]);

        let Json(series) = get_history(
            State(state),
            Path("investment".to_string()),
            Query(HistoryQuery {
                symbols: Some("AAPL".to_string()),
                parameter: Some("Sharpe Ratio".to_string()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].points.len(), 1);
        assert_eq!(series[0].points[0].value, Some(2.5));
    }

    #[tokio::test]
    async fn empty_selection_is_rejected() {
        let res = evaluate_selection(
            State(state_with_investment()),
            Path("investment".to_string()),
            Query(SelectionQuery { symbols: None }),
        )
        .await;
        assert_eq!(res.err(), Some(StatusCode::BAD_REQUEST));
    }
}

use crate::config::Settings;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RETRIES: u32 = 3;
const CHART_RANGE: &str = "1d";
const CHART_INTERVAL: &str = "1m";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub close: f64,
    pub volume: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

pub type QuoteMap = BTreeMap<String, Quote>;

#[derive(Debug, Clone)]
pub struct QuoteError {
    pub symbol: String,
    pub stage: &'static str,
    pub status: Option<u16>,
    pub detail: String,
}

impl QuoteError {
    fn new(symbol: &str, stage: &'static str, detail: impl Into<String>) -> Self {
        Self {
            symbol: symbol.to_string(),
            stage,
            status: None,
            detail: detail.into(),
        }
    }

    /// Unknown symbols, bad URLs and empty charts will not improve on retry.
    /// Client errors are final except request timeouts and rate limiting.
    pub fn is_retryable(&self) -> bool {
        match self.stage {
            "no_data" | "url" => false,
            "http" => match self.status {
                Some(408 | 429) => true,
                Some(400..=499) => false,
                _ => true,
            },
            _ => true,
        }
    }
}

impl fmt::Display for QuoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "quote error (symbol={}, stage={}): {}",
            self.symbol, self.stage, self.detail
        )
    }
}

impl std::error::Error for QuoteError {}

#[async_trait::async_trait]
pub trait QuoteSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    async fn latest_quote(&self, symbol: &str) -> Result<Quote>;
}

/// Fetch quotes for each symbol. Failures are logged and left out of the map.
pub async fn fetch_quotes(source: &dyn QuoteSource, symbols: &[String]) -> QuoteMap {
    let mut out = QuoteMap::new();
    for symbol in symbols {
        let symbol = symbol.trim();
        if symbol.is_empty() || out.contains_key(symbol) {
            continue;
        }
        match source.latest_quote(symbol).await {
            Ok(quote) => {
                out.insert(symbol.to_string(), quote);
            }
            Err(err) => {
                tracing::warn!(
                    symbol,
                    source = source.source_name(),
                    error = %err,
                    "live quote unavailable"
                );
            }
        }
    }
    out
}

#[derive(Debug, Clone)]
pub struct HttpChartQuoteSource {
    http: reqwest::Client,
    base_url: String,
    retries: u32,
}

impl HttpChartQuoteSource {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings
            .quote_base_url
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout_secs = std::env::var("QUOTE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retries = std::env::var("QUOTE_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRIES)
            .max(1);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("stockgauge/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build quote http client")?;

        Ok(Self {
            http,
            base_url,
            retries,
        })
    }

    async fn fetch_once(&self, symbol: &str) -> std::result::Result<Quote, QuoteError> {
        let url = chart_url(&self.base_url, symbol)?;
        let res = self
            .http
            .get(url)
            .query(&[("range", CHART_RANGE), ("interval", CHART_INTERVAL)])
            .send()
            .await
            .map_err(|e| QuoteError::new(symbol, "request", e.to_string()))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| QuoteError::new(symbol, "body", e.to_string()))?;

        if !status.is_success() {
            return Err(QuoteError {
                status: Some(status.as_u16()),
                ..QuoteError::new(symbol, "http", format!("HTTP {status}: {text}"))
            });
        }

        let parsed = serde_json::from_str::<ChartResponse>(&text).map_err(|e| {
            QuoteError::new(symbol, "parse", format!("unexpected chart payload: {e}"))
        })?;
        parse_chart(symbol, parsed)
    }
}

#[async_trait::async_trait]
impl QuoteSource for HttpChartQuoteSource {
    fn source_name(&self) -> &'static str {
        "http_chart"
    }

    async fn latest_quote(&self, symbol: &str) -> Result<Quote> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.fetch_once(symbol).await {
                Ok(quote) => return Ok(quote),
                Err(err) => {
                    if attempt >= self.retries || !err.is_retryable() {
                        return Err(err.into());
                    }
                    let backoff = Duration::from_secs(1 << (attempt - 1));
                    tracing::warn!(symbol, attempt, ?backoff, error = %err, "quote fetch failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

/// `{base}/v8/finance/chart/{symbol}` with the symbol escaped as one path segment.
fn chart_url(base_url: &str, symbol: &str) -> std::result::Result<reqwest::Url, QuoteError> {
    let mut url = reqwest::Url::parse(base_url)
        .map_err(|e| QuoteError::new(symbol, "url", format!("invalid base url {base_url}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| QuoteError::new(symbol, "url", format!("base url {base_url} cannot hold a path")))?
        .pop_if_empty()
        .extend(["v8", "finance", "chart", symbol]);
    Ok(url)
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Take the last bar with a close; intraday charts end with empty bars.
fn parse_chart(symbol: &str, resp: ChartResponse) -> std::result::Result<Quote, QuoteError> {
    if let Some(err) = resp.chart.error {
        let detail = format!(
            "{}: {}",
            err.code.unwrap_or_default(),
            err.description.unwrap_or_default()
        );
        return Err(QuoteError::new(symbol, "no_data", detail));
    }

    let result = resp
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| QuoteError::new(symbol, "no_data", "chart has no result"))?;

    let series = result.indicators.quote.into_iter().next().unwrap_or_default();

    let (idx, close) = series
        .close
        .iter()
        .enumerate()
        .rev()
        .find_map(|(i, c)| c.filter(|v| v.is_finite()).map(|v| (i, v)))
        .ok_or_else(|| QuoteError::new(symbol, "no_data", "chart has no closing price"))?;

    let volume = series.volume.get(idx).copied().flatten();
    let timestamp = result
        .timestamp
        .get(idx)
        .and_then(|secs| DateTime::<Utc>::from_timestamp(*secs, 0));

    Ok(Quote {
        symbol: symbol.to_string(),
        close,
        volume,
        timestamp,
    })
}

pub mod dashboard;
pub mod domain;
pub mod history;
pub mod ingest;
pub mod scoring;

pub mod config {
    use crate::domain::level::Scale;
    use anyhow::Context;
    use std::time::Duration;

    const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 60;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub sentry_dsn: Option<String>,
        pub stock_table_path: Option<String>,
        pub metrics_table_path: Option<String>,
        pub risk_categories_path: Option<String>,
        pub investment_categories_path: Option<String>,
        pub quote_base_url: Option<String>,
        pub live_quotes: bool,
        pub refresh_interval_secs: u64,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let refresh_interval_secs = match std::env::var("REFRESH_INTERVAL_SECS") {
                Ok(s) => s
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("REFRESH_INTERVAL_SECS must be an integer (got {s:?})"))?,
                Err(_) => DEFAULT_REFRESH_INTERVAL_SECS,
            };
            anyhow::ensure!(
                refresh_interval_secs >= 1,
                "REFRESH_INTERVAL_SECS must be >= 1"
            );

            Ok(Self {
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                stock_table_path: std::env::var("STOCK_TABLE_PATH").ok(),
                metrics_table_path: std::env::var("METRICS_TABLE_PATH").ok(),
                risk_categories_path: std::env::var("RISK_CATEGORIES_PATH").ok(),
                investment_categories_path: std::env::var("INVESTMENT_CATEGORIES_PATH").ok(),
                quote_base_url: std::env::var("QUOTE_BASE_URL").ok(),
                live_quotes: std::env::var("LIVE_QUOTES")
                    .map(|v| parse_flag(&v))
                    .unwrap_or(false),
                refresh_interval_secs,
            })
        }

        /// Attribute table for the risk dashboard, metrics table for the investment one.
        pub fn require_table_path(&self, scale: Scale) -> anyhow::Result<&str> {
            match scale {
                Scale::Risk => self
                    .stock_table_path
                    .as_deref()
                    .context("STOCK_TABLE_PATH is required"),
                Scale::Investment => self
                    .metrics_table_path
                    .as_deref()
                    .context("METRICS_TABLE_PATH is required"),
            }
        }

        pub fn categories_path(&self, scale: Scale) -> Option<&str> {
            match scale {
                Scale::Risk => self.risk_categories_path.as_deref(),
                Scale::Investment => self.investment_categories_path.as_deref(),
            }
        }

        pub fn refresh_interval(&self) -> Duration {
            Duration::from_secs(self.refresh_interval_secs)
        }
    }

    fn parse_flag(v: &str) -> bool {
        matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    }

}

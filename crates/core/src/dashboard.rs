use crate::config::Settings;
use crate::domain::category::CategorySet;
use crate::domain::level::Scale;
use crate::domain::stock::StockTable;
use crate::ingest::quotes::QuoteMap;
use crate::ingest::table;
use crate::scoring::aggregate::{evaluate, Evaluation};
use anyhow::Context;
use chrono::{DateTime, Utc};

/// A loaded table plus the categories it is scored against.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub categories: CategorySet,
    pub table: StockTable,
}

impl Dashboard {
    pub fn new(categories: CategorySet, table: StockTable) -> Self {
        Self { categories, table }
    }

    pub fn load(settings: &Settings, scale: Scale) -> anyhow::Result<Self> {
        Self::load_from(
            settings.require_table_path(scale)?,
            settings.categories_path(scale),
            scale,
        )
    }

    pub fn load_from(
        table_path: &str,
        categories_path: Option<&str>,
        scale: Scale,
    ) -> anyhow::Result<Self> {
        let categories = CategorySet::load_or_default(categories_path, scale)
            .with_context(|| format!("failed to load {scale} categories"))?;
        let table = table::load_csv(table_path)
            .with_context(|| format!("failed to load {scale} table"))?;

        let declared: Vec<&str> = categories
            .categories
            .iter()
            .flat_map(|c| c.parameters.iter().map(|p| p.name.as_str()))
            .collect();
        if let Some(first) = table.symbols().first().and_then(|s| table.get(s)) {
            let missing: Vec<&str> = declared
                .iter()
                .copied()
                .filter(|p| first.get(p).is_none())
                .collect();
            if !missing.is_empty() {
                tracing::warn!(%scale, ?missing, "table has no column for some parameters");
            }
        }

        Ok(Self::new(categories, table))
    }

    pub fn scale(&self) -> Scale {
        self.categories.scale
    }

    pub fn evaluate(
        &self,
        symbols: &[String],
        quotes: Option<&QuoteMap>,
        as_of: DateTime<Utc>,
    ) -> Evaluation {
        evaluate(&self.table, &self.categories, symbols, quotes, as_of)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_table_with_default_categories() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Stock Symbol,Volatility,Beta,P/E Ratio").unwrap();
        writeln!(file, "AAPL,0.10,1.0,30").unwrap();

        let dashboard = Dashboard::load_from(file.path().to_str().unwrap(), None, Scale::Risk).unwrap();
        assert_eq!(dashboard.scale(), Scale::Risk);

        let eval = dashboard.evaluate(&["AAPL".to_string()], None, Utc::now());
        // Volatility Good +1, Beta Neutral 0, P/E Bad -1, the rest unavailable.
        assert_eq!(eval.portfolio_score, 0);
        assert_eq!(eval.results.len(), 9);
    }
}

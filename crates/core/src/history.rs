//! Rolling per-symbol store of classification results, the data behind the
//! live metrics graph.

use crate::scoring::aggregate::{ClassificationResult, Evaluation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

// One day of one-minute ticks for a ten-parameter dashboard.
const DEFAULT_LIMIT: usize = 14_400;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    /// `None` where the value was not numeric at that tick.
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub symbol: String,
    pub parameter: String,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone)]
pub struct MetricsHistory {
    limit_per_symbol: usize,
    by_symbol: BTreeMap<String, VecDeque<ClassificationResult>>,
}

impl Default for MetricsHistory {
    fn default() -> Self {
        Self::with_limit(DEFAULT_LIMIT)
    }
}

impl MetricsHistory {
    pub fn with_limit(limit_per_symbol: usize) -> Self {
        Self {
            limit_per_symbol: limit_per_symbol.max(1),
            by_symbol: BTreeMap::new(),
        }
    }

    pub fn from_env() -> Self {
        std::env::var("HISTORY_LIMIT")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .map(Self::with_limit)
            .unwrap_or_default()
    }

    /// Append an evaluation's results, evicting the oldest entries past the limit.
    pub fn record(&mut self, evaluation: &Evaluation) {
        for result in &evaluation.results {
            let entries = self.by_symbol.entry(result.symbol.clone()).or_default();
            entries.push_back(result.clone());
            while entries.len() > self.limit_per_symbol {
                entries.pop_front();
            }
        }
    }

    pub fn len(&self, symbol: &str) -> usize {
        self.by_symbol.get(symbol).map_or(0, VecDeque::len)
    }

    pub fn entries(&self, symbol: &str) -> impl Iterator<Item = &ClassificationResult> {
        self.by_symbol.get(symbol).into_iter().flatten()
    }

    pub fn series(&self, symbol: &str, parameter: &str) -> Series {
        let points = self
            .entries(symbol)
            .filter(|r| r.parameter == parameter)
            .map(|r| SeriesPoint {
                timestamp: r.timestamp,
                value: r.value.as_number(),
            })
            .collect();

        Series {
            symbol: symbol.to_string(),
            parameter: parameter.to_string(),
            points,
        }
    }

    /// Every recorded parameter of each symbol, in first-seen order.
    pub fn all_series(&self, symbols: &[String]) -> Vec<Series> {
        let mut out = Vec::new();
        for symbol in symbols {
            let mut parameters: Vec<&str> = Vec::new();
            for r in self.entries(symbol) {
                if !parameters.contains(&r.parameter.as_str()) {
                    parameters.push(&r.parameter);
                }
            }
            out.extend(parameters.into_iter().map(|p| self.series(symbol, p)));
        }
        out
    }

    pub fn clear(&mut self) {
        self.by_symbol.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::category::CategorySet;
    use crate::domain::level::Scale;
    use crate::domain::stock::{CellValue, StockRow, StockTable};
    use crate::scoring::aggregate::evaluate;
    use chrono::{Duration, TimeZone};

    fn tick(table: &StockTable, minute: i64) -> Evaluation {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 2, 14, 0, 0).unwrap();
        evaluate(
            table,
            &CategorySet::defaults(Scale::Investment),
            &["AAA".to_string()],
            None,
            t0 + Duration::minutes(minute),
        )
    }

    #[test]
    fn records_series_per_parameter() {
        let mut history = MetricsHistory::default();
        let table: StockTable = vec![StockRow::new("AAA").with("Sharpe Ratio", 1.2)]
            .into_iter()
            .collect();

        history.record(&tick(&table, 0));
        history.record(&tick(&table, 1));

        let series = history.series("AAA", "Sharpe Ratio");
        assert_eq!(series.points.len(), 2);
        assert_eq!(series.points[0].value, Some(1.2));
        assert!(series.points[0].timestamp < series.points[1].timestamp);

        // Parameters missing from the table show up as gaps.
        let gaps = history.series("AAA", "Tracking Error");
        assert!(gaps.points.iter().all(|p| p.value.is_none()));

        let all = history.all_series(&["AAA".to_string(), "ZZZ".to_string()]);
        assert_eq!(all.len(), 10);
        assert_eq!(all[0].parameter, "Annualized Alpha");
    }

    #[test]
    fn evicts_oldest_entries_past_limit() {
        let mut history = MetricsHistory::with_limit(15);
        let table: StockTable = vec![StockRow::new("AAA").with(
            "Sharpe Ratio",
            CellValue::Number(1.0),
        )]
        .into_iter()
        .collect();

        for minute in 0..3 {
            history.record(&tick(&table, minute));
        }

        assert_eq!(history.len("AAA"), 15);
        let first = history.entries("AAA").next().unwrap();
        assert_eq!(first.timestamp.format("%H:%M").to_string(), "14:01");
        assert_eq!(first.parameter, "Max Drawdown");

        history.clear();
        assert_eq!(history.len("AAA"), 0);
    }
}

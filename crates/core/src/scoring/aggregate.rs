use crate::domain::category::CategorySet;
use crate::domain::level::{Color, Level, Scale};
use crate::domain::stock::{CellValue, StockRow, StockTable};
use crate::ingest::quotes::QuoteMap;
use crate::scoring::classify::classify;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const PRICE_ATTRIBUTE: &str = "Price";
pub const VOLUME_ATTRIBUTE: &str = "Volume";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub symbol: String,
    pub category: String,
    pub parameter: String,
    pub value: CellValue,
    pub level: Level,
    pub color: Color,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelCount {
    pub level: Level,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: String,
    pub score: i32,
    pub counts: Vec<LevelCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockScore {
    pub symbol: String,
    pub score: i32,
    pub min_score: i32,
    pub max_score: i32,
    pub categories: Vec<CategoryScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub scale: Scale,
    pub as_of: DateTime<Utc>,
    pub results: Vec<ClassificationResult>,
    pub stocks: Vec<StockScore>,
    pub portfolio_score: i32,
    pub portfolio_min_score: i32,
    pub portfolio_max_score: i32,
    /// Selected symbols with no row in the table.
    pub skipped: Vec<String>,
}

impl Evaluation {
    pub fn stock_scores(&self) -> BTreeMap<String, i32> {
        self.stocks
            .iter()
            .map(|s| (s.symbol.clone(), s.score))
            .collect()
    }

    pub fn stock(&self, symbol: &str) -> Option<&StockScore> {
        self.stocks.iter().find(|s| s.symbol == symbol)
    }
}

/// Classify every declared parameter of every selected stock and sum the scores.
///
/// Duplicate selections are evaluated once. When `quotes` is given, the latest
/// close and volume replace the table's `Price` and `Volume`; a symbol with no
/// quote gets the unavailable marker in both.
pub fn evaluate(
    table: &StockTable,
    categories: &CategorySet,
    symbols: &[String],
    quotes: Option<&QuoteMap>,
    as_of: DateTime<Utc>,
) -> Evaluation {
    let scale = categories.scale;
    let (min_per_stock, max_per_stock) = categories.stock_score_bounds();

    let mut results = Vec::new();
    let mut stocks = Vec::new();
    let mut skipped = Vec::new();
    let mut portfolio_score: i32 = 0;
    let mut seen = BTreeSet::<&str>::new();

    for symbol in symbols {
        let symbol = symbol.trim();
        if symbol.is_empty() || !seen.insert(symbol) {
            continue;
        }

        let Some(row) = table.get(symbol) else {
            tracing::warn!(symbol, %scale, "no data found for stock symbol; skipping");
            skipped.push(symbol.to_string());
            continue;
        };

        let row = match quotes {
            Some(quotes) => with_live_quote(row, quotes),
            None => row.clone(),
        };

        let mut stock_score: i32 = 0;
        let mut category_scores = Vec::with_capacity(categories.categories.len());

        for category in &categories.categories {
            let mut category_score: i32 = 0;
            let mut counts: Vec<LevelCount> = scale
                .levels()
                .into_iter()
                .map(|level| LevelCount { level, count: 0 })
                .collect();

            for param in &category.parameters {
                let value = row.get(&param.name);
                let level = classify(value, param.thresholds, param.polarity, scale);

                if let Some(c) = counts.iter_mut().find(|c| c.level == level) {
                    c.count += 1;
                }
                category_score += level.contribution();

                results.push(ClassificationResult {
                    symbol: symbol.to_string(),
                    category: category.name.clone(),
                    parameter: param.name.clone(),
                    value: value.cloned().unwrap_or(CellValue::Empty),
                    level,
                    color: scale.color(level),
                    timestamp: as_of,
                });
            }

            stock_score += category_score;
            category_scores.push(CategoryScore {
                category: category.name.clone(),
                score: category_score,
                counts,
            });
        }

        portfolio_score += stock_score;
        stocks.push(StockScore {
            symbol: symbol.to_string(),
            score: stock_score,
            min_score: min_per_stock,
            max_score: max_per_stock,
            categories: category_scores,
        });
    }

    let n = stocks.len() as i32;
    Evaluation {
        scale,
        as_of,
        results,
        stocks,
        portfolio_score,
        portfolio_min_score: min_per_stock * n,
        portfolio_max_score: max_per_stock * n,
        skipped,
    }
}

fn with_live_quote(row: &StockRow, quotes: &QuoteMap) -> StockRow {
    let mut row = row.clone();
    match quotes.get(&row.symbol) {
        Some(quote) => {
            row.set(PRICE_ATTRIBUTE, CellValue::Number(quote.close));
            let volume = quote
                .volume
                .map(CellValue::Number)
                .unwrap_or_else(CellValue::not_available);
            row.set(VOLUME_ATTRIBUTE, volume);
        }
        None => {
            row.set(PRICE_ATTRIBUTE, CellValue::not_available());
            row.set(VOLUME_ATTRIBUTE, CellValue::not_available());
        }
    }
    row
}

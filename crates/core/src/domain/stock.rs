use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const NOT_AVAILABLE: &str = "Data not available";

/// One spreadsheet cell as read from a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Empty,
}

impl CellValue {
    /// Interpret raw cell text: blank is `Empty`, finite floats are numbers.
    /// `inf`/`nan` spellings stay as text so the raw value survives serialization.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => CellValue::Number(n),
            _ => CellValue::Text(trimmed.to_string()),
        }
    }

    /// Numeric view of the cell. NaN and infinities count as missing.
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            CellValue::Number(n) => *n,
            CellValue::Text(s) => s.trim().parse::<f64>().ok()?,
            CellValue::Empty => return None,
        };
        n.is_finite().then_some(n)
    }

    pub fn not_available() -> Self {
        CellValue::Text(NOT_AVAILABLE.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRow {
    pub symbol: String,
    pub attributes: BTreeMap<String, CellValue>,
}

impl StockRow {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&CellValue> {
        self.attributes.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: CellValue) {
        self.attributes.insert(name.into(), value);
    }
}

/// In-memory table keyed by symbol. Symbol order follows the source file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StockTable {
    rows: BTreeMap<String, StockRow>,
    order: Vec<String>,
}

impl StockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row unless its symbol is already present; the first row wins.
    pub fn insert(&mut self, row: StockRow) -> bool {
        if self.rows.contains_key(&row.symbol) {
            return false;
        }
        self.order.push(row.symbol.clone());
        self.rows.insert(row.symbol.clone(), row);
        true
    }

    pub fn get(&self, symbol: &str) -> Option<&StockRow> {
        self.rows.get(symbol)
    }

    pub fn symbols(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl FromIterator<StockRow> for StockTable {
    fn from_iter<T: IntoIterator<Item = StockRow>>(iter: T) -> Self {
        let mut table = StockTable::new();
        for row in iter {
            table.insert(row);
        }
        table
    }
}

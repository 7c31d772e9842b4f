use crate::domain::stock::{CellValue, StockRow, StockTable};
use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

pub const SYMBOL_COLUMN: &str = "Stock Symbol";

/// Read a whole CSV sheet into memory. Header names become attribute names.
pub fn load_csv(path: impl AsRef<Path>) -> Result<StockTable> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open stock table {}", path.display()))?;
    let table = read_csv(file).with_context(|| format!("invalid stock table {}", path.display()))?;

    tracing::info!(path = %path.display(), rows = table.len(), "loaded stock table");
    Ok(table)
}

pub fn read_csv<R: Read>(reader: R) -> Result<StockTable> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers().context("failed to read header row")?.clone();
    let symbol_idx = headers
        .iter()
        .position(|h| h == SYMBOL_COLUMN)
        .with_context(|| format!("missing required column {SYMBOL_COLUMN:?}"))?;

    let mut table = StockTable::new();
    let mut duplicates: usize = 0;

    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("failed to read data row {}", line + 1))?;

        let symbol = record.get(symbol_idx).unwrap_or_default().trim();
        if symbol.is_empty() {
            continue;
        }

        let mut row = StockRow::new(symbol);
        for (idx, name) in headers.iter().enumerate() {
            if idx == symbol_idx || name.is_empty() {
                continue;
            }
            let cell = record.get(idx).map(CellValue::parse).unwrap_or(CellValue::Empty);
            row.set(name, cell);
        }

        if !table.insert(row) {
            duplicates += 1;
        }
    }

    if duplicates > 0 {
        tracing::debug!(duplicates, "ignored repeated rows for already-seen symbols");
    }

    Ok(table)
}

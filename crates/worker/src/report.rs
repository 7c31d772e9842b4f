use stockgauge_core::domain::stock::CellValue;
use stockgauge_core::scoring::Evaluation;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Debug, Clone, Tabled)]
struct ResultRow {
    #[tabled(rename = "Stock Symbol")]
    symbol: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Parameter")]
    parameter: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Level")]
    level: String,
}

pub fn format_value(value: &CellValue) -> String {
    match value {
        CellValue::Number(n) => format!("{n}"),
        CellValue::Text(s) => s.clone(),
        CellValue::Empty => "-".to_string(),
    }
}

/// Plain-text rendering of an evaluation: the result table, then the scores.
pub fn render(evaluation: &Evaluation) -> String {
    let rows: Vec<ResultRow> = evaluation
        .results
        .iter()
        .map(|r| ResultRow {
            symbol: r.symbol.clone(),
            category: r.category.clone(),
            parameter: r.parameter.clone(),
            value: format_value(&r.value),
            level: r.level.to_string(),
        })
        .collect();

    let mut out = String::new();
    if rows.is_empty() {
        out.push_str("No results.\n");
    } else {
        let table = Table::new(rows)
            .with(Style::psql())
            .with(Modify::new(Columns::first()).with(Alignment::left()))
            .to_string();
        out.push_str(&table);
        out.push('\n');
    }

    out.push('\n');
    for stock in &evaluation.stocks {
        out.push_str(&format!(
            "{:<8} score {:>4}  (range {} to {})\n",
            stock.symbol, stock.score, stock.min_score, stock.max_score
        ));
    }
    for symbol in &evaluation.skipped {
        out.push_str(&format!("{symbol:<8} no data found\n"));
    }
    out.push_str(&format!(
        "{} portfolio score {} (range {} to {})\n",
        evaluation.scale,
        evaluation.portfolio_score,
        evaluation.portfolio_min_score,
        evaluation.portfolio_max_score
    ));

    out
}

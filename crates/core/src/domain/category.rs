use crate::domain::level::Scale;
use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    HigherIsBetter,
    LowerIsBetter,
}

/// Lower and upper bound of the middle band. Serialized as `[lo, hi]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Thresholds {
    pub lo: f64,
    pub hi: f64,
}

impl Thresholds {
    pub const fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }
}

impl From<[f64; 2]> for Thresholds {
    fn from([lo, hi]: [f64; 2]) -> Self {
        Self { lo, hi }
    }
}

impl From<Thresholds> for [f64; 2] {
    fn from(t: Thresholds) -> Self {
        [t.lo, t.hi]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub polarity: Polarity,
    pub thresholds: Thresholds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub parameters: Vec<Parameter>,
}

/// Ordered categories for one dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySet {
    pub scale: Scale,
    pub categories: Vec<Category>,
}

impl CategorySet {
    pub fn parameter_count(&self) -> usize {
        self.categories.iter().map(|c| c.parameters.len()).sum()
    }

    /// Min/max score a single stock can reach under this set.
    pub fn stock_score_bounds(&self) -> (i32, i32) {
        let (lo, hi) = self.scale.contribution_bounds();
        let n = self.parameter_count() as i32;
        (lo * n, hi * n)
    }

    pub fn defaults(scale: Scale) -> Self {
        match scale {
            Scale::Risk => default_risk_categories(),
            Scale::Investment => default_investment_categories(),
        }
    }

    /// Load a definition file, or fall back to the built-in set for `scale`.
    pub fn load_or_default(path: Option<&str>, scale: Scale) -> anyhow::Result<Self> {
        match path {
            Some(p) => {
                let set = Self::from_json_file(p)?;
                ensure!(
                    set.scale == scale,
                    "category file {p} declares scale {}, expected {scale}",
                    set.scale
                );
                Ok(set)
            }
            None => Ok(Self::defaults(scale)),
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read category file {}", path.display()))?;
        Self::from_json_str(&text)
            .with_context(|| format!("invalid category file {}", path.display()))
    }

    pub fn from_json_str(text: &str) -> anyhow::Result<Self> {
        let parsed = serde_json::from_str::<CategorySet>(text)
            .context("category definition is not valid JSON for the category schema")?;
        parsed.validated()
    }

    pub fn validated(self) -> anyhow::Result<Self> {
        ensure!(!self.categories.is_empty(), "at least one category is required");

        let mut seen_categories = BTreeSet::<String>::new();
        let mut categories = Vec::with_capacity(self.categories.len());
        for category in self.categories {
            let name = category.name.trim().to_string();
            ensure!(!name.is_empty(), "category name must be non-empty");
            ensure!(
                seen_categories.insert(name.clone()),
                "duplicate category: {name}"
            );
            ensure!(
                !category.parameters.is_empty(),
                "category {name} has no parameters"
            );

            let mut seen_params = BTreeSet::<String>::new();
            let mut parameters = Vec::with_capacity(category.parameters.len());
            for param in category.parameters {
                let pname = param.name.trim().to_string();
                ensure!(!pname.is_empty(), "parameter name in {name} must be non-empty");
                ensure!(
                    seen_params.insert(pname.clone()),
                    "duplicate parameter {pname} in {name}"
                );
                let Thresholds { lo, hi } = param.thresholds;
                ensure!(
                    lo.is_finite() && hi.is_finite(),
                    "thresholds for {pname} must be finite (got [{lo}, {hi}])"
                );
                ensure!(
                    lo <= hi,
                    "thresholds for {pname} must satisfy lower <= upper (got [{lo}, {hi}])"
                );
                parameters.push(Parameter {
                    name: pname,
                    ..param
                });
            }

            categories.push(Category { name, parameters });
        }

        Ok(Self {
            scale: self.scale,
            categories,
        })
    }
}

fn param(name: &str, polarity: Polarity, lo: f64, hi: f64) -> Parameter {
    Parameter {
        name: name.to_string(),
        polarity,
        thresholds: Thresholds::new(lo, hi),
    }
}

fn category(name: &str, parameters: Vec<Parameter>) -> Category {
    Category {
        name: name.to_string(),
        parameters,
    }
}

fn default_risk_categories() -> CategorySet {
    use Polarity::{HigherIsBetter as Higher, LowerIsBetter as Lower};

    CategorySet {
        scale: Scale::Risk,
        categories: vec![
            category(
                "Market Risk",
                vec![
                    param("Volatility", Lower, 0.15, 0.30),
                    param("Beta", Lower, 0.8, 1.2),
                ],
            ),
            category(
                "Liquidity Risk",
                vec![
                    param("Volume", Higher, 100_000.0, 1_000_000.0),
                    param("Current Ratio", Higher, 1.0, 2.0),
                ],
            ),
            category(
                "Credit Risk",
                vec![
                    param("Debt to Equity", Lower, 0.5, 1.5),
                    param("Interest Coverage", Higher, 1.5, 5.0),
                ],
            ),
            category(
                "Profitability",
                vec![
                    param("ROE", Higher, 0.08, 0.15),
                    param("Net Profit Margin", Higher, 0.05, 0.15),
                ],
            ),
            category("Valuation Risk", vec![param("P/E Ratio", Lower, 15.0, 25.0)]),
        ],
    }
}

fn default_investment_categories() -> CategorySet {
    use Polarity::{HigherIsBetter as Higher, LowerIsBetter as Lower};

    CategorySet {
        scale: Scale::Investment,
        categories: vec![
            category(
                "Return Quality",
                vec![
                    param("Annualized Alpha", Higher, 0.0, 0.05),
                    param("Sharpe Ratio", Higher, 1.0, 2.0),
                    param("Treynor Ratio", Higher, 0.05, 0.15),
                    param("Sortino Ratio", Higher, 1.0, 2.0),
                ],
            ),
            category(
                "Downside Risk",
                vec![
                    param("Annualized Volatility", Lower, 0.15, 0.30),
                    param("Max Drawdown", Lower, 0.10, 0.25),
                    param("Downside Deviation", Lower, 0.05, 0.15),
                    param("VaR (95%)", Lower, 0.02, 0.05),
                ],
            ),
            category(
                "Benchmark Fit",
                vec![
                    param("R-Squared", Higher, 0.5, 0.8),
                    param("Tracking Error", Lower, 0.02, 0.06),
                ],
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_are_valid() {
        for scale in Scale::ALL {
            let set = CategorySet::defaults(scale);
            assert_eq!(set.scale, scale);
            assert!(set.clone().validated().is_ok());
        }
        assert_eq!(CategorySet::defaults(Scale::Investment).parameter_count(), 10);
        assert_eq!(CategorySet::defaults(Scale::Risk).parameter_count(), 9);
    }

    #[test]
    fn score_bounds_scale_with_parameter_count() {
        let set = CategorySet::defaults(Scale::Investment);
        assert_eq!(set.stock_score_bounds(), (-10, 20));
    }

    #[test]
    fn parses_definition_file_shape() {
        let text = json!({
            "scale": "risk",
            "categories": [
                {
                    "name": " Market Risk ",
                    "parameters": [
                        {"name": "Beta", "polarity": "lower_is_better", "thresholds": [0.8, 1.2]}
                    ]
                }
            ]
        })
        .to_string();

        let set = CategorySet::from_json_str(&text).unwrap();
        assert_eq!(set.categories[0].name, "Market Risk");
        let p = &set.categories[0].parameters[0];
        assert_eq!(p.polarity, Polarity::LowerIsBetter);
        assert_eq!(p.thresholds, Thresholds::new(0.8, 1.2));
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let text = json!({
            "scale": "investment",
            "categories": [
                {
                    "name": "Return Quality",
                    "parameters": [
                        {"name": "Sharpe Ratio", "polarity": "higher_is_better", "thresholds": [2.0, 1.0]}
                    ]
                }
            ]
        })
        .to_string();

        let err = CategorySet::from_json_str(&text).unwrap_err();
        assert!(format!("{err:#}").contains("lower <= upper"));
    }

    #[test]
    fn rejects_duplicate_parameters() {
        let text = json!({
            "scale": "risk",
            "categories": [
                {
                    "name": "Market Risk",
                    "parameters": [
                        {"name": "Beta", "polarity": "lower_is_better", "thresholds": [0.8, 1.2]},
                        {"name": "Beta ", "polarity": "lower_is_better", "thresholds": [0.8, 1.2]}
                    ]
                }
            ]
        })
        .to_string();

        assert!(CategorySet::from_json_str(&text).is_err());
    }

    #[test]
    fn rejects_empty_category_list() {
        let text = json!({"scale": "risk", "categories": []}).to_string();
        assert!(CategorySet::from_json_str(&text).is_err());
    }

    #[test]
    fn load_or_default_checks_declared_scale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("risk.json");
        let body = serde_json::to_string(&CategorySet::defaults(Scale::Risk)).unwrap();
        std::fs::write(&path, body).unwrap();
        let p = path.to_str().unwrap();

        assert!(CategorySet::load_or_default(Some(p), Scale::Risk).is_ok());
        assert!(CategorySet::load_or_default(Some(p), Scale::Investment).is_err());
        assert_eq!(
            CategorySet::load_or_default(None, Scale::Investment).unwrap(),
            CategorySet::defaults(Scale::Investment)
        );
    }
}

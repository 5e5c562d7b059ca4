//! Per-model prices and token cost accounting.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Prices are quoted per this many units.
pub const UNITS_PER_PRICE: f64 = 1_000_000.0;

/// Model used when none is chosen.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// USD price per one million input and output units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceEntry {
    /// Price per million input (prompt) units.
    pub input_per_million: f64,
    /// Price per million output (completion) units.
    pub output_per_million: f64,
}

/// Read-only model → price mapping.
///
/// Build it once at start-up and pass it by reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceTable {
    entries: BTreeMap<String, PriceEntry>,
}

impl Default for PriceTable {
    fn default() -> Self {
        Self::from_entries([
            (
                "gpt-4o-mini",
                PriceEntry {
                    input_per_million: 0.150,
                    output_per_million: 0.600,
                },
            ),
            (
                "gpt-4o-2024-08-06",
                PriceEntry {
                    input_per_million: 2.50,
                    output_per_million: 10.00,
                },
            ),
        ])
    }
}

impl PriceTable {
    /// Build a table from `(model, entry)` pairs.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, PriceEntry)>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Parse a JSON object of `model -> {input_per_million, output_per_million}`.
    pub fn from_json(text: &str) -> Result<Self> {
        let table: Self = serde_json::from_str(text)?;
        table.validate()?;
        Ok(table)
    }

    /// Load a price table from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read price table {}: {e}", path.display()))
        })?;
        Self::from_json(&text)
    }

    fn validate(&self) -> Result<()> {
        if self.entries.is_empty() {
            return Err(Error::Config("price table is empty".into()));
        }
        for (model, entry) in &self.entries {
            let prices = [entry.input_per_million, entry.output_per_million];
            if prices.iter().any(|p| !p.is_finite() || *p < 0.0) {
                return Err(Error::Config(format!(
                    "price for {model} must be a non-negative number"
                )));
            }
        }
        Ok(())
    }

    /// Price entry for a model.
    pub fn get(&self, model: &str) -> Option<&PriceEntry> {
        self.entries.get(model)
    }

    /// Price entry for a model, or [`Error::UnknownModel`].
    pub fn require(&self, model: &str) -> Result<&PriceEntry> {
        self.get(model)
            .ok_or_else(|| Error::UnknownModel(model.to_string()))
    }

    /// Known model identifiers, sorted.
    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// Units consumed by one extraction and what they cost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Usage {
    /// Units spent on the input (prompt).
    pub input_tokens: u64,
    /// Units spent on the output (completion).
    pub output_tokens: u64,
    /// Total USD cost.
    pub total_cost: f64,
}

/// Compute the cost of an extraction.
///
/// Fails with [`Error::UnknownModel`] when the model has no price entry.
pub fn calculate_cost(
    prices: &PriceTable,
    input_units: u64,
    output_units: u64,
    model: &str,
) -> Result<Usage> {
    let entry = prices.require(model)?;
    let total_cost = input_units as f64 / UNITS_PER_PRICE * entry.input_per_million
        + output_units as f64 / UNITS_PER_PRICE * entry.output_per_million;

    Ok(Usage {
        input_tokens: input_units,
        output_tokens: output_units,
        total_cost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_million_each_costs_both_prices() {
        let prices = PriceTable::default();
        let entry = *prices.get("gpt-4o-mini").unwrap();

        let usage = calculate_cost(&prices, 1_000_000, 1_000_000, "gpt-4o-mini").unwrap();
        assert_eq!(usage.input_tokens, 1_000_000);
        assert_eq!(usage.output_tokens, 1_000_000);
        assert_eq!(
            usage.total_cost,
            entry.input_per_million + entry.output_per_million
        );
        assert!((usage.total_cost - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_zero_units_cost_nothing() {
        let prices = PriceTable::default();
        for model in prices.models() {
            let usage = calculate_cost(&prices, 0, 0, model).unwrap();
            assert_eq!(usage.total_cost, 0.0);
        }
    }

    #[test]
    fn test_unknown_model_fails() {
        let prices = PriceTable::default();
        let err = calculate_cost(&prices, 10, 20, "unknown-model").unwrap_err();
        assert!(matches!(err, Error::UnknownModel(m) if m == "unknown-model"));
    }

    #[test]
    fn test_mixed_usage() {
        let prices = PriceTable::default();
        let usage = calculate_cost(&prices, 12_000, 800, "gpt-4o-2024-08-06").unwrap();
        // 12k * 2.50/M + 800 * 10/M
        assert!((usage.total_cost - 0.038).abs() < 1e-12);
    }

    #[test]
    fn test_from_json() {
        let table = PriceTable::from_json(
            r#"{"local-model": {"input_per_million": 0.0, "output_per_million": 0.0},
                "big-model": {"input_per_million": 5.0, "output_per_million": 15.0}}"#,
        )
        .unwrap();
        assert_eq!(table.models().collect::<Vec<_>>(), vec!["big-model", "local-model"]);
        assert!(table.get("gpt-4o-mini").is_none());

        assert!(matches!(PriceTable::from_json("{}"), Err(Error::Config(_))));
        assert!(matches!(
            PriceTable::from_json(r#"{"m": {"input_per_million": -1.0, "output_per_million": 1.0}}"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            PriceTable::from_json(r#"{"m": {"input_per_million": 1.0}}"#),
            Err(Error::Json(_))
        ));
    }
}

//! Loosely-typed numeric inputs.
//!
//! Spreadsheets and hand-edited data files hand us numbers, numeric strings,
//! formulas and nulls for the same field. Persisted entities are strictly
//! numeric, so this module provides the lenient deserializer used on their
//! numeric fields and the raw [`FieldValue`] shape kept on the ingestion side.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Parses a numeric string, returning `None` for anything that is not a finite number.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',' && *c != '_').collect();
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Deserializes a number, numeric string or null into an `f64`.
///
/// Anything that cannot be read as a finite number becomes `0.0`. Pair with
/// `#[serde(default)]` so that missing fields are zero too.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64().filter(|n| n.is_finite()).unwrap_or(0.0),
        Some(Value::String(s)) => parse_number(&s).unwrap_or(0.0),
        _ => 0.0,
    })
}

/// Optional variant of [`lenient_f64`]: null or absent stays `None`, any
/// other value is read leniently.
pub fn lenient_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => Some(n.as_f64().filter(|n| n.is_finite()).unwrap_or(0.0)),
        Some(Value::String(s)) => Some(parse_number(&s).unwrap_or(0.0)),
        Some(_) => Some(0.0),
    })
}

/// A raw field value as it arrives from a request or an import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    /// A numeric string, a formula (starting with `=`) or garbage
    Text(String),
    Null,
    /// Booleans, arrays, objects: never meaningful, coerced to zero
    Other(Value),
}

impl FieldValue {
    /// Returns the formula body including the leading `=`, if this is a formula.
    pub fn as_formula(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) if s.trim_start().starts_with('=') => Some(s.trim_start()),
            _ => None,
        }
    }

    /// Reads the value as a plain number without evaluating formulas.
    pub fn as_plain_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) if n.is_finite() => Some(*n),
            FieldValue::Text(s) if self.as_formula().is_none() => parse_number(s),
            _ => None,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

/// Raw financial fields keyed by field name, possibly partial.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FinancialInput(BTreeMap<String, FieldValue>);

impl FinancialInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter, handy in tests and imports.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: FieldValue) {
        self.0.insert(field.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Field names present in this input, in sorted order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Overlays `patch` on top of `self`, field by field (last write wins).
    pub fn merge(&mut self, patch: &FinancialInput) {
        for (field, value) in &patch.0 {
            self.0.insert(field.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "lenient_f64")]
        value: f64,
    }

    fn probe(json: &str) -> f64 {
        serde_json::from_str::<Probe>(json).unwrap().value
    }

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "lenient_opt_f64")]
        amount: Option<f64>,
    }

    fn patch(json: &str) -> Option<f64> {
        serde_json::from_str::<Patch>(json).unwrap().amount
    }

    #[test]
    fn test_lenient_f64_accepts_numbers_and_strings() {
        assert_eq!(probe(r#"{"value": 12.5}"#), 12.5);
        assert_eq!(probe(r#"{"value": "600000"}"#), 600000.0);
        assert_eq!(probe(r#"{"value": " 1,250 "}"#), 1250.0);
    }

    #[test]
    fn test_lenient_f64_degrades_to_zero() {
        assert_eq!(probe(r#"{"value": null}"#), 0.0);
        assert_eq!(probe(r#"{}"#), 0.0);
        assert_eq!(probe(r#"{"value": "abc"}"#), 0.0);
        assert_eq!(probe(r#"{"value": "=D3/3"}"#), 0.0);
        assert_eq!(probe(r#"{"value": true}"#), 0.0);
    }

    #[test]
    fn test_lenient_opt_f64_keeps_absence() {
        assert_eq!(patch(r#"{}"#), None);
        assert_eq!(patch(r#"{"amount": null}"#), None);
        assert_eq!(patch(r#"{"amount": "25.5"}"#), Some(25.5));
        assert_eq!(patch(r#"{"amount": 40}"#), Some(40.0));
        assert_eq!(patch(r#"{"amount": "n/a"}"#), Some(0.0));
    }

    #[test]
    fn test_field_value_untagged_shapes() {
        let input: FinancialInput = serde_json::from_str(
            r#"{"food": 100, "termly_school_fees": "=D3/3", "average_medical": null, "admin_utilities": "12", "odd": [1]}"#,
        )
        .unwrap();

        assert_eq!(input.get("food"), Some(&FieldValue::Number(100.0)));
        assert_eq!(input.get("termly_school_fees").unwrap().as_formula(), Some("=D3/3"));
        assert_eq!(input.get("average_medical"), Some(&FieldValue::Null));
        assert_eq!(input.get("admin_utilities").unwrap().as_plain_number(), Some(12.0));
        assert!(matches!(input.get("odd"), Some(FieldValue::Other(_))));
    }

    #[test]
    fn test_merge_is_last_write_wins() {
        let mut base = FinancialInput::new().with("food", 1.0).with("admin_utilities", 2.0);
        let patch = FinancialInput::new().with("food", "=5*2");
        base.merge(&patch);

        assert_eq!(base.get("food").unwrap().as_formula(), Some("=5*2"));
        assert_eq!(base.get("admin_utilities"), Some(&FieldValue::Number(2.0)));
    }
}

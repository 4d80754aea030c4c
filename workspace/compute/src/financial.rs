//! Per-student financial normalization.
//!
//! Turns a raw [`FinancialInput`] (numbers, numeric strings, formulas, nulls)
//! into a fully numeric [`FinancialData`] and derives the monthly cost, euro
//! equivalents and surplus/deficit. Malformed values never fail the
//! calculation: they become zero and are reported as warnings.

use common::ExchangeRate;
use model::entities::FinancialData;
use model::numeric::{FieldValue, FinancialInput, parse_number};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::formula::{self, FieldSource};

/// Terms per school year divided into months: a termly fee covers three months.
const MONTHS_PER_TERM: f64 = 3.0;

/// A value that could not be read and was replaced by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationWarning {
    pub field: String,
    /// The raw value as received, rendered as text
    pub raw: String,
    pub reason: String,
}

/// Result of normalizing one raw financial record.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub data: FinancialData,
    pub warnings: Vec<NormalizationWarning>,
}

/// Field values visible to a formula while a record is being normalized.
///
/// Fields coerced earlier in the canonical order read their coerced value;
/// fields not reached yet read their raw value when it is a plain number.
struct NormalizationScope<'a> {
    resolved: BTreeMap<&'static str, f64>,
    raw: &'a FinancialInput,
}

impl FieldSource for NormalizationScope<'_> {
    fn field(&self, name: &str) -> Option<f64> {
        self.resolved
            .get(name)
            .copied()
            .or_else(|| self.raw.get(name).and_then(FieldValue::as_plain_number))
    }
}

/// Normalizes a raw record and computes its derived fields.
pub fn normalize(input: &FinancialInput, rate: ExchangeRate) -> Normalized {
    let mut data = FinancialData::default();
    let mut warnings = Vec::new();
    let mut scope = NormalizationScope {
        resolved: BTreeMap::new(),
        raw: input,
    };

    for field in FinancialData::INPUT_FIELDS {
        let value = match input.get(field) {
            None | Some(FieldValue::Null) => 0.0,
            Some(FieldValue::Number(n)) if n.is_finite() => *n,
            Some(raw) => coerce(field, raw, &scope, &mut warnings),
        };
        scope.resolved.insert(field, value);
        data.set_input(field, value);
    }

    for field in input.fields() {
        if FinancialData::INPUT_FIELDS.contains(&field) {
            continue;
        }
        debug!(field, "Ignoring non-input financial field");
    }

    Normalized {
        data: calculate(&data, rate),
        warnings,
    }
}

/// Reads a formula, numeric string or odd value, recording a warning when it degrades to zero.
fn coerce(
    field: &str,
    raw: &FieldValue,
    scope: &NormalizationScope<'_>,
    warnings: &mut Vec<NormalizationWarning>,
) -> f64 {
    let (rendered, outcome) = match raw {
        FieldValue::Text(text) => {
            let outcome = match raw.as_formula() {
                Some(formula) => formula::try_evaluate(formula, scope).map_err(|e| e.to_string()),
                None => parse_number(text).ok_or_else(|| "not a number".to_string()),
            };
            (text.clone(), outcome)
        }
        FieldValue::Number(n) => (n.to_string(), Err("not a finite number".to_string())),
        FieldValue::Other(value) => (value.to_string(), Err("unsupported value type".to_string())),
        FieldValue::Null => (String::new(), Ok(0.0)),
    };

    match outcome {
        Ok(value) => value,
        Err(reason) => {
            warn!(field, raw = %rendered, %reason, "Financial field degraded to 0");
            warnings.push(NormalizationWarning {
                field: field.to_string(),
                raw: rendered,
                reason,
            });
            0.0
        }
    }
}

/// Recomputes the derived fields of an already numeric record.
pub fn calculate(data: &FinancialData, rate: ExchangeRate) -> FinancialData {
    let monthly_output_ugx = finite_or_zero(
        "monthly_output_ugx",
        data.termly_school_fees / MONTHS_PER_TERM
            + data.direct_spending_school_fees_ugx_monthly
            + data.food
            + data.average_medical
            + data.school_personal_requirements_transport
            + data.admin_utilities,
    );
    let cash_received_ugx = finite_or_zero("cash_received_ugx", rate.to_ugx(data.cash_received_euro));
    let plus_minus_diff_ugx = finite_or_zero("plus_minus_diff_ugx", cash_received_ugx - monthly_output_ugx);

    FinancialData {
        monthly_output_ugx,
        monthly_output_euro: finite_or_zero("monthly_output_euro", rate.to_euro(monthly_output_ugx)),
        cash_received_ugx,
        plus_minus_diff_ugx,
        plus_minus_diff_euro: finite_or_zero("plus_minus_diff_euro", rate.to_euro(plus_minus_diff_ugx)),
        ..data.clone()
    }
}

/// Replaces an overflowed derived figure with 0. Stored figures are always finite.
pub(crate) fn finite_or_zero(field: &str, value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        warn!(field, value, "Derived figure is not finite, stored as 0");
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate() -> ExchangeRate {
        ExchangeRate::new(4100.0)
    }

    fn scenario_input() -> FinancialInput {
        FinancialInput::new()
            .with("termly_school_fees", 600000.0)
            .with("food", 90000.0)
            .with("average_medical", 10000.0)
            .with("school_personal_requirements_transport", 5000.0)
            .with("admin_utilities", 5000.0)
            .with("cash_received_euro", 70.0)
    }

    #[test]
    fn test_monthly_output_and_balance() {
        let normalized = normalize(&scenario_input(), rate());
        let data = normalized.data;

        assert!(normalized.warnings.is_empty());
        assert_eq!(data.monthly_output_ugx, 310000.0);
        assert_eq!(data.cash_received_ugx, 287000.0);
        assert_eq!(data.plus_minus_diff_ugx, -23000.0);
        assert_eq!(data.monthly_output_euro, 310000.0 / 4100.0);
        assert_eq!(data.plus_minus_diff_euro, -23000.0 / 4100.0);
        assert_eq!(data.direct_spending_school_fees_ugx_monthly, 0.0);
    }

    #[test]
    fn test_empty_input_is_all_zero() {
        let normalized = normalize(&FinancialInput::new(), rate());
        assert_eq!(normalized.data, FinancialData::default());
        assert!(normalized.warnings.is_empty());
    }

    #[test]
    fn test_numeric_strings_and_nulls() {
        let input = FinancialInput::new()
            .with("food", "90000")
            .with("average_medical", FieldValue::Null)
            .with("admin_utilities", "lots");
        let normalized = normalize(&input, rate());

        assert_eq!(normalized.data.food, 90000.0);
        assert_eq!(normalized.data.average_medical, 0.0);
        assert_eq!(normalized.data.admin_utilities, 0.0);
        assert_eq!(normalized.warnings.len(), 1);
        assert_eq!(normalized.warnings[0].field, "admin_utilities");
        assert_eq!(normalized.warnings[0].raw, "lots");
    }

    #[test]
    fn test_formula_reads_earlier_fields() {
        let input = FinancialInput::new()
            .with("termly_school_fees", "=300000*2")
            .with("direct_spending_school_fees_ugx_monthly", "=D3/3");
        let normalized = normalize(&input, rate());

        assert_eq!(normalized.data.termly_school_fees, 600000.0);
        assert_eq!(normalized.data.direct_spending_school_fees_ugx_monthly, 200000.0);
    }

    #[test]
    fn test_formula_reads_later_plain_fields_but_not_later_formulas() {
        let input = FinancialInput::new()
            .with("food", "=J3*2")
            .with("admin_utilities", 500.0)
            .with("average_medical", "=L3")
            .with("cash_received_euro", "=1+1");
        let normalized = normalize(&input, rate());

        assert_eq!(normalized.data.food, 1000.0);
        // cash_received_euro is still an unevaluated formula when average_medical runs
        assert_eq!(normalized.data.average_medical, 0.0);
        assert_eq!(normalized.data.cash_received_euro, 2.0);
    }

    #[test]
    fn test_failing_formula_warns_and_zeroes() {
        let input = FinancialInput::new().with("food", "=1/0");
        let normalized = normalize(&input, rate());

        assert_eq!(normalized.data.food, 0.0);
        assert_eq!(normalized.warnings.len(), 1);
        assert_eq!(normalized.warnings[0].reason, "Division by zero");
    }

    #[test]
    fn test_calculate_is_idempotent() {
        let once = normalize(&scenario_input(), rate()).data;
        let twice = calculate(&once, rate());
        let thrice = normalize(&twice.to_input(), rate()).data;

        assert_eq!(once, twice);
        assert_eq!(twice, thrice);
    }

    #[test]
    fn test_overflowing_inputs_give_finite_figures() {
        let data = FinancialData {
            food: f64::MAX,
            admin_utilities: f64::MAX,
            cash_received_euro: 1e305,
            ..Default::default()
        };
        let derived = calculate(&data, rate());

        assert_eq!(derived.monthly_output_ugx, 0.0);
        assert_eq!(derived.cash_received_ugx, 0.0);
        assert_eq!(derived.plus_minus_diff_ugx, 0.0);
        assert_eq!(derived.plus_minus_diff_euro, 0.0);
        assert_eq!(derived.food, f64::MAX);
    }
}

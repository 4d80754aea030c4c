use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Numbered;
use crate::numeric::{FieldValue, FinancialInput, lenient_f64};

/// A sponsored student enrolled in a program.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Student {
    /// 1-based position within the program; reassigned on deletion
    #[serde(default)]
    pub serial_number: u32,
    pub full_name: String,
    /// Sponsorship package label (e.g. "Full", "School fees only")
    #[serde(default)]
    pub sponsorship_package: String,
    #[serde(default)]
    pub financial_data: FinancialData,
    #[serde(default)]
    pub notes: String,
}

impl Numbered for Student {
    fn number(&self) -> u32 {
        self.serial_number
    }

    fn set_number(&mut self, number: u32) {
        self.serial_number = number;
    }
}

/// Normalized financial record of a student.
///
/// Input fields are costs in UGX, except `cash_received_euro`. The remaining
/// fields are derived by the recalculation and are overwritten on every pass.
/// All fields deserialize leniently: numeric strings are parsed and anything
/// else reads as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FinancialData {
    /// School fees for a whole term (three months)
    #[serde(default, deserialize_with = "lenient_f64")]
    pub termly_school_fees: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub direct_spending_school_fees_ugx_monthly: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub food: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub average_medical: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub school_personal_requirements_transport: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub admin_utilities: f64,
    /// Monthly cash received from sponsors, in EUR
    #[serde(default, deserialize_with = "lenient_f64")]
    pub cash_received_euro: f64,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub monthly_output_ugx: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub monthly_output_euro: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub cash_received_ugx: f64,
    /// Cash received minus monthly output; negative means underfunded
    #[serde(default, deserialize_with = "lenient_f64")]
    pub plus_minus_diff_ugx: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub plus_minus_diff_euro: f64,
}

impl FinancialData {
    /// Input fields in canonical order. Formulas are resolved in this order.
    pub const INPUT_FIELDS: [&'static str; 7] = [
        "termly_school_fees",
        "direct_spending_school_fees_ugx_monthly",
        "food",
        "average_medical",
        "school_personal_requirements_transport",
        "admin_utilities",
        "cash_received_euro",
    ];

    /// Gets an input field by name.
    pub fn input(&self, field: &str) -> Option<f64> {
        let value = match field {
            "termly_school_fees" => self.termly_school_fees,
            "direct_spending_school_fees_ugx_monthly" => self.direct_spending_school_fees_ugx_monthly,
            "food" => self.food,
            "average_medical" => self.average_medical,
            "school_personal_requirements_transport" => self.school_personal_requirements_transport,
            "admin_utilities" => self.admin_utilities,
            "cash_received_euro" => self.cash_received_euro,
            _ => return None,
        };
        Some(value)
    }

    /// Sets an input field by name. Returns false for unknown or derived fields.
    pub fn set_input(&mut self, field: &str, value: f64) -> bool {
        let slot = match field {
            "termly_school_fees" => &mut self.termly_school_fees,
            "direct_spending_school_fees_ugx_monthly" => {
                &mut self.direct_spending_school_fees_ugx_monthly
            }
            "food" => &mut self.food,
            "average_medical" => &mut self.average_medical,
            "school_personal_requirements_transport" => {
                &mut self.school_personal_requirements_transport
            }
            "admin_utilities" => &mut self.admin_utilities,
            "cash_received_euro" => &mut self.cash_received_euro,
            _ => return false,
        };
        *slot = value;
        true
    }

    /// Raw view of the input fields, used to re-run normalization.
    pub fn to_input(&self) -> FinancialInput {
        let mut input = FinancialInput::new();
        for field in Self::INPUT_FIELDS {
            if let Some(value) = self.input(field) {
                input.set(field, FieldValue::Number(value));
            }
        }
        input
    }
}

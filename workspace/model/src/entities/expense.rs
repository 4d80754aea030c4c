use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::numeric::lenient_f64;

/// A recorded expense, optionally attributed to a student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Expense {
    /// Stable identifier, never renumbered
    #[serde(default)]
    pub id: u32,
    pub date: NaiveDate,
    #[serde(default)]
    pub student_name: Option<String>,
    pub description: String,
    #[serde(default)]
    pub category: String,
    /// Amount in UGX
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: f64,
    #[serde(default)]
    pub notes: String,
}

impl Expense {
    /// Natural key used when merging imports: (date, student, description).
    pub fn natural_key(&self) -> (NaiveDate, Option<&str>, &str) {
        (self.date, self.student_name.as_deref(), self.description.as_str())
    }
}

//! Currency conversion between euros and Ugandan shillings.
//!
//! Every derived figure in the system is converted with one process-wide rate.
//! The rate is expressed as "how many UGX one EUR buys".

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Default EUR→UGX rate used when nothing else is configured.
pub const DEFAULT_EXCHANGE_RATE: f64 = 4100.0;

/// Currencies the organization keeps its books in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    /// Euro, the currency sponsors pay in
    Eur,
    /// Ugandan shilling, the currency costs are incurred in
    Ugx,
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eur" | "euro" | "euros" => Ok(Currency::Eur),
            "ugx" | "shilling" | "shillings" => Ok(Currency::Ugx),
            other => Err(format!("Unknown currency: {}", other)),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Eur => write!(f, "EUR"),
            Currency::Ugx => write!(f, "UGX"),
        }
    }
}

/// A fixed EUR→UGX exchange rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ExchangeRate(f64);

impl ExchangeRate {
    /// Creates a rate, falling back to the default for zero, negative or non-finite input.
    pub fn new(ugx_per_euro: f64) -> Self {
        if ugx_per_euro.is_finite() && ugx_per_euro > 0.0 {
            Self(ugx_per_euro)
        } else {
            tracing::warn!(
                "Ignoring invalid exchange rate {}, using default {}",
                ugx_per_euro,
                DEFAULT_EXCHANGE_RATE
            );
            Self(DEFAULT_EXCHANGE_RATE)
        }
    }

    /// Gets the number of UGX one EUR buys.
    pub fn ugx_per_euro(&self) -> f64 {
        self.0
    }

    /// Converts a euro amount to UGX.
    pub fn to_ugx(&self, euros: f64) -> f64 {
        euros * self.0
    }

    /// Converts a UGX amount to euros.
    pub fn to_euro(&self, ugx: f64) -> f64 {
        ugx / self.0
    }

    /// Converts `amount` from `from` into the other currency.
    pub fn convert(&self, amount: f64, from: Currency) -> (f64, Currency) {
        match from {
            Currency::Eur => (self.to_ugx(amount), Currency::Ugx),
            Currency::Ugx => (self.to_euro(amount), Currency::Eur),
        }
    }
}

impl Default for ExchangeRate {
    fn default() -> Self {
        Self(DEFAULT_EXCHANGE_RATE)
    }
}

//! Common transport-layer types shared by the model, compute and server crates.
//! Report payloads live here so handlers and the compute crate agree on one
//! shape without the compute crate depending on axum or the server.

mod converters;
mod reports;

pub use converters::{Currency, ExchangeRate, DEFAULT_EXCHANGE_RATE};
pub use reports::{
    Analytics, FinancialSummary, FundingGapReport, ProgramDistribution, ProgramFundingGap,
    ProgramSponsorStatistics, SponsorStatistics,
};

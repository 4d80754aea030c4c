use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Organization-wide income versus costs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FinancialSummary {
    /// Students across all programs
    pub total_students: usize,
    /// Monthly income from active sponsorships, in EUR
    pub total_income_eur: f64,
    /// Monthly income from active sponsorships, in UGX
    pub total_income_ugx: f64,
    /// Monthly costs of all programs, in EUR
    pub total_costs_eur: f64,
    /// Monthly costs of all programs, in UGX
    pub total_costs_ugx: f64,
    /// Income minus costs, in EUR (negative means a shortfall)
    pub deficit_eur: f64,
    /// Income minus costs, in UGX (negative means a shortfall)
    pub deficit_ugx: f64,
}

/// Funding gap of a single program.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProgramFundingGap {
    /// Program code (e.g. "CH")
    pub program: String,
    pub program_name: String,
    pub student_count: usize,
    pub income_eur: f64,
    pub income_ugx: f64,
    pub cost_eur: f64,
    pub cost_ugx: f64,
    pub deficit_eur: f64,
    pub deficit_ugx: f64,
}

/// Funding gap per program plus the grand total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FundingGapReport {
    pub programs: Vec<ProgramFundingGap>,
    pub total_deficit_eur: f64,
    pub total_deficit_ugx: f64,
}

/// Sponsor counts and funding for a program, or for the whole organization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProgramSponsorStatistics {
    /// Program code, or "ALL" for the global row
    pub program: String,
    pub sponsor_count: usize,
    pub active_sponsor_count: usize,
    /// Monthly funding of active sponsors, in EUR
    pub active_monthly_funding_eur: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SponsorStatistics {
    pub programs: Vec<ProgramSponsorStatistics>,
    pub total: ProgramSponsorStatistics,
}

/// How students and costs are spread over a program.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProgramDistribution {
    pub program: String,
    pub program_name: String,
    pub student_count: usize,
    pub monthly_cost_ugx: f64,
    pub monthly_cost_eur: f64,
    /// Students per sponsorship package
    pub sponsorship_types: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Analytics {
    pub program_distribution: Vec<ProgramDistribution>,
    /// Summed expense amounts (UGX) per expense category
    pub expense_categories: BTreeMap<String, f64>,
    /// Number of sponsorships per sponsor category
    pub sponsor_categories: BTreeMap<String, usize>,
}

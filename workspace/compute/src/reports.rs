//! Read-only report projections over a recalculated [`Dataset`].
//!
//! None of these mutate the dataset. They read the metadata written by
//! [`crate::recalc::recalculate`], so callers must recalculate first; the
//! repository always hands out recalculated snapshots.

use common::{
    Analytics, ExchangeRate, FinancialSummary, FundingGapReport, ProgramDistribution,
    ProgramFundingGap, ProgramSponsorStatistics, SponsorStatistics,
};
use model::entities::{Dataset, ProgramCode, Registry};
use std::collections::BTreeMap;
use tracing::{instrument, trace};

/// Label used for sponsors and expenses without a category.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Program label of the global sponsor statistics row.
pub const ALL_PROGRAMS: &str = "ALL";

fn rate_of(dataset: &Dataset) -> ExchangeRate {
    ExchangeRate::new(dataset.metadata.exchange_rate)
}

fn category_label(category: &str) -> String {
    let trimmed = category.trim();
    if trimmed.is_empty() {
        UNCATEGORIZED.to_string()
    } else {
        trimmed.to_string()
    }
}

fn registry_funding(dataset: &Dataset, code: ProgramCode) -> f64 {
    dataset
        .registry(code)
        .map(|r| r.metadata.total_monthly_funding)
        .unwrap_or(0.0)
}

/// Every program code that has a program or a registry, in code order.
fn known_programs(dataset: &Dataset) -> Vec<ProgramCode> {
    let mut codes: Vec<ProgramCode> = dataset
        .programs
        .keys()
        .chain(dataset.registries.keys())
        .copied()
        .collect();
    codes.sort();
    codes.dedup();
    codes
}

/// Total income against total costs, in both currencies.
#[instrument(skip(dataset))]
pub fn financial_summary(dataset: &Dataset) -> FinancialSummary {
    let rate = rate_of(dataset);
    let global = &dataset.metadata.program_summary;

    let total_income_eur = global.total_monthly_funding_euros;
    let total_income_ugx = global.total_monthly_funding_ugx;
    let total_costs_ugx: f64 = dataset
        .programs
        .values()
        .map(|p| p.metadata.monthly_costs_ugx)
        .sum();
    let total_costs_eur = rate.to_euro(total_costs_ugx);

    FinancialSummary {
        total_students: global.total_students_across_all_programs,
        total_income_eur,
        total_income_ugx,
        total_costs_eur,
        total_costs_ugx,
        deficit_eur: total_income_eur - total_costs_eur,
        deficit_ugx: total_income_ugx - total_costs_ugx,
    }
}

/// Income, cost and deficit of each program plus the grand total deficit.
#[instrument(skip(dataset))]
pub fn funding_gap(dataset: &Dataset) -> FundingGapReport {
    let rate = rate_of(dataset);

    let programs: Vec<ProgramFundingGap> = known_programs(dataset)
        .into_iter()
        .map(|code| {
            let program = dataset.program(code);
            let income_eur = registry_funding(dataset, code);
            let income_ugx = rate.to_ugx(income_eur);
            let cost_ugx = program.map(|p| p.metadata.monthly_costs_ugx).unwrap_or(0.0);
            let cost_eur = rate.to_euro(cost_ugx);

            ProgramFundingGap {
                program: code.to_string(),
                program_name: program
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| code.display_name().to_string()),
                student_count: program.map(|p| p.metadata.total_students).unwrap_or(0),
                income_eur,
                income_ugx,
                cost_eur,
                cost_ugx,
                deficit_eur: income_eur - cost_eur,
                deficit_ugx: income_ugx - cost_ugx,
            }
        })
        .collect();

    let total_deficit_eur = programs.iter().map(|p| p.deficit_eur).sum();
    let total_deficit_ugx = programs.iter().map(|p| p.deficit_ugx).sum();
    trace!(programs = programs.len(), total_deficit_eur, "Built funding gap report");

    FundingGapReport {
        programs,
        total_deficit_eur,
        total_deficit_ugx,
    }
}

fn registry_statistics(program: String, registry: Option<&Registry>) -> ProgramSponsorStatistics {
    match registry {
        Some(registry) => ProgramSponsorStatistics {
            program,
            sponsor_count: registry.metadata.total_sponsorships,
            active_sponsor_count: registry.metadata.active_sponsors,
            active_monthly_funding_eur: registry.metadata.total_monthly_funding,
        },
        None => ProgramSponsorStatistics {
            program,
            ..Default::default()
        },
    }
}

/// Sponsor counts and active funding per program and overall.
#[instrument(skip(dataset))]
pub fn sponsor_statistics(dataset: &Dataset) -> SponsorStatistics {
    let programs: Vec<ProgramSponsorStatistics> = known_programs(dataset)
        .into_iter()
        .map(|code| registry_statistics(code.to_string(), dataset.registry(code)))
        .collect();

    let total = programs.iter().fold(
        ProgramSponsorStatistics {
            program: ALL_PROGRAMS.to_string(),
            ..Default::default()
        },
        |mut acc, row| {
            acc.sponsor_count += row.sponsor_count;
            acc.active_sponsor_count += row.active_sponsor_count;
            acc.active_monthly_funding_eur += row.active_monthly_funding_eur;
            acc
        },
    );

    SponsorStatistics { programs, total }
}

/// Program distribution, expense spending per category and sponsor categories.
#[instrument(skip(dataset))]
pub fn analytics(dataset: &Dataset) -> Analytics {
    let program_distribution = dataset
        .programs
        .values()
        .map(|program| ProgramDistribution {
            program: program.code.to_string(),
            program_name: program.name.clone(),
            student_count: program.metadata.total_students,
            monthly_cost_ugx: program.metadata.monthly_costs_ugx,
            monthly_cost_eur: program.metadata.monthly_costs_eur,
            sponsorship_types: program.metadata.sponsorship_types.clone(),
        })
        .collect();

    let mut expense_categories: BTreeMap<String, f64> = BTreeMap::new();
    for expense in &dataset.expenses {
        *expense_categories
            .entry(category_label(&expense.category))
            .or_insert(0.0) += expense.amount;
    }

    let mut sponsor_categories: BTreeMap<String, usize> = BTreeMap::new();
    for sponsor in dataset.registries.values().flat_map(|r| r.sponsors.iter()) {
        *sponsor_categories
            .entry(category_label(&sponsor.category))
            .or_insert(0) += 1;
    }

    Analytics {
        program_distribution,
        expense_categories,
        sponsor_categories,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recalc::recalculate;
    use chrono::NaiveDate;
    use model::entities::{Expense, FinancialData, Sponsor, SponsorStatus, Student};

    fn student(name: &str, food: f64) -> Student {
        Student {
            full_name: name.to_string(),
            sponsorship_package: "Full".to_string(),
            financial_data: FinancialData {
                food,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn sponsor(student: &str, amount: f64, category: &str, status: Option<SponsorStatus>) -> Sponsor {
        Sponsor {
            student_name: student.to_string(),
            sponsor_name: "Someone".to_string(),
            amount,
            category: category.to_string(),
            status,
            ..Default::default()
        }
    }

    fn expense(category: &str, amount: f64) -> Expense {
        Expense {
            id: 0,
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            student_name: None,
            description: "x".to_string(),
            category: category.to_string(),
            amount,
            notes: String::new(),
        }
    }

    fn recalculated() -> Dataset {
        let mut dataset = Dataset::empty(4100.0);
        dataset.program_mut(ProgramCode::Ch).push_student(student("A", 410000.0));
        dataset.program_mut(ProgramCode::Ch).push_student(student("B", 0.0));
        dataset.program_mut(ProgramCode::Ysp).push_student(student("C", 82000.0));

        let ch = dataset.registry_mut(ProgramCode::Ch);
        ch.push_sponsor(sponsor("A", 50.0, "Church", None));
        ch.push_sponsor(sponsor("B", 25.0, "", Some(SponsorStatus::Inactive)));
        dataset
            .registry_mut(ProgramCode::Ysp)
            .push_sponsor(sponsor("C", 30.0, "Church", Some(SponsorStatus::Active)));

        dataset.push_expense(expense("Food", 1000.0));
        dataset.push_expense(expense("Food", 500.0));
        dataset.push_expense(expense("  ", 200.0));

        recalculate(&mut dataset, ExchangeRate::default());
        dataset
    }

    #[test]
    fn test_financial_summary() {
        let summary = financial_summary(&recalculated());

        assert_eq!(summary.total_students, 3);
        assert_eq!(summary.total_income_eur, 80.0);
        assert_eq!(summary.total_income_ugx, 328000.0);
        assert_eq!(summary.total_costs_ugx, 492000.0);
        assert_eq!(summary.total_costs_eur, 120.0);
        assert_eq!(summary.deficit_eur, -40.0);
        assert_eq!(summary.deficit_ugx, -164000.0);
    }

    #[test]
    fn test_funding_gap_per_program() {
        let report = funding_gap(&recalculated());

        assert_eq!(report.programs.len(), 2);
        let ch = &report.programs[0];
        assert_eq!(ch.program, "CH");
        assert_eq!(ch.student_count, 2);
        assert_eq!(ch.income_eur, 50.0);
        assert_eq!(ch.cost_eur, 100.0);
        assert_eq!(ch.deficit_eur, -50.0);

        let ysp = &report.programs[1];
        assert_eq!(ysp.program, "YSP");
        assert_eq!(ysp.deficit_eur, 10.0);
        assert_eq!(ysp.deficit_ugx, 41000.0);

        assert_eq!(report.total_deficit_eur, -40.0);
        assert_eq!(report.total_deficit_ugx, -164000.0);
    }

    #[test]
    fn test_sponsor_statistics() {
        let stats = sponsor_statistics(&recalculated());

        assert_eq!(stats.programs[0].sponsor_count, 2);
        assert_eq!(stats.programs[0].active_sponsor_count, 1);
        assert_eq!(stats.total.program, ALL_PROGRAMS);
        assert_eq!(stats.total.sponsor_count, 3);
        assert_eq!(stats.total.active_sponsor_count, 2);
        assert_eq!(stats.total.active_monthly_funding_eur, 80.0);
    }

    #[test]
    fn test_analytics_groups_missing_categories() {
        let analytics = analytics(&recalculated());

        assert_eq!(analytics.expense_categories.get("Food"), Some(&1500.0));
        assert_eq!(analytics.expense_categories.get(UNCATEGORIZED), Some(&200.0));
        assert_eq!(analytics.sponsor_categories.get("Church"), Some(&2));
        assert_eq!(analytics.sponsor_categories.get(UNCATEGORIZED), Some(&1));

        let ch = &analytics.program_distribution[0];
        assert_eq!(ch.student_count, 2);
        assert_eq!(ch.sponsorship_types.get("Full"), Some(&2));
        assert_eq!(ch.monthly_cost_ugx, 410000.0);
    }

    #[test]
    fn test_reports_on_empty_dataset_are_zero() {
        let mut dataset = Dataset::empty(4100.0);
        recalculate(&mut dataset, ExchangeRate::default());

        assert_eq!(financial_summary(&dataset), FinancialSummary::default());
        let gap = funding_gap(&dataset);
        assert!(gap.programs.iter().all(|p| p.deficit_eur == 0.0 && p.student_count == 0));
        assert_eq!(gap.total_deficit_ugx, 0.0);
        assert_eq!(sponsor_statistics(&dataset).total.sponsor_count, 0);
        let analytics = analytics(&dataset);
        assert!(analytics.expense_categories.is_empty());
        assert!(analytics.sponsor_categories.is_empty());
    }

    #[test]
    fn test_reports_tolerate_missing_collections() {
        let dataset: Dataset = serde_json::from_str(r#"{"metadata": {"exchange_rate": 4100}}"#).unwrap();

        assert_eq!(financial_summary(&dataset).total_students, 0);
        assert!(funding_gap(&dataset).programs.is_empty());
        assert!(sponsor_statistics(&dataset).programs.is_empty());
        assert!(analytics(&dataset).program_distribution.is_empty());
    }
}

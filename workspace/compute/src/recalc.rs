//! Aggregate metadata recalculation.
//!
//! Rebuilds every derived figure of a [`Dataset`] from its raw inputs in one
//! pass: per-student financials, per-program costs, per-registry funding and
//! the organization-wide summary. Only derived fields are written, so running
//! it twice yields identical output.

use common::ExchangeRate;
use model::entities::{Dataset, Program, ProgramSummary, Registry};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

use crate::financial::{self, finite_or_zero};

/// Histogram label for students without a sponsorship package.
pub const UNSPECIFIED_PACKAGE: &str = "Unspecified";

/// What a recalculation pass touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecalculationSummary {
    pub programs: usize,
    pub students: usize,
    pub registries: usize,
    pub sponsors: usize,
}

/// Recomputes all derived metadata of `dataset` in place.
#[instrument(skip(dataset), fields(rate = rate.ugx_per_euro()))]
pub fn recalculate(dataset: &mut Dataset, rate: ExchangeRate) -> RecalculationSummary {
    let mut summary = RecalculationSummary::default();

    for program in dataset.programs.values_mut() {
        recalculate_program(program, rate);
        summary.programs += 1;
        summary.students += program.students.len();
    }

    for registry in dataset.registries.values_mut() {
        recalculate_registry(registry);
        summary.registries += 1;
        summary.sponsors += registry.sponsors.len();
    }

    let total_monthly_funding_euros = finite_or_zero(
        "total_monthly_funding_euros",
        dataset.registries.values().map(|r| r.metadata.total_monthly_funding).sum(),
    );

    dataset.metadata.program_summary = ProgramSummary {
        total_students_across_all_programs: dataset
            .programs
            .values()
            .map(|p| p.metadata.total_students)
            .sum(),
        total_active_sponsorships: dataset
            .registries
            .values()
            .map(|r| r.metadata.active_sponsors)
            .sum(),
        total_monthly_funding_euros,
        total_monthly_funding_ugx: finite_or_zero(
            "total_monthly_funding_ugx",
            rate.to_ugx(total_monthly_funding_euros),
        ),
    };
    dataset.metadata.exchange_rate = rate.ugx_per_euro();

    debug!(?summary, "Recalculated dataset metadata");
    summary
}

fn recalculate_program(program: &mut Program, rate: ExchangeRate) {
    let mut sponsorship_types: BTreeMap<String, usize> = BTreeMap::new();
    let mut monthly_costs_ugx = 0.0;

    for student in &mut program.students {
        let package = student.sponsorship_package.trim();
        let label = if package.is_empty() { UNSPECIFIED_PACKAGE } else { package };
        *sponsorship_types.entry(label.to_string()).or_insert(0) += 1;

        student.financial_data = financial::calculate(&student.financial_data, rate);
        monthly_costs_ugx += student.financial_data.monthly_output_ugx;
    }

    program.metadata.total_students = program.students.len();
    program.metadata.sponsorship_types = sponsorship_types;
    let monthly_costs_ugx = finite_or_zero("monthly_costs_ugx", monthly_costs_ugx);
    program.metadata.monthly_costs_ugx = monthly_costs_ugx;
    program.metadata.monthly_costs_eur = finite_or_zero("monthly_costs_eur", rate.to_euro(monthly_costs_ugx));
}

fn recalculate_registry(registry: &mut Registry) {
    let (active, inactive): (Vec<_>, Vec<_>) =
        registry.sponsors.iter().partition(|s| s.is_active());

    registry.metadata.total_sponsorships = registry.sponsors.len();
    registry.metadata.active_sponsors = active.len();
    registry.metadata.inactive_sponsors = inactive.len();
    registry.metadata.total_monthly_funding =
        finite_or_zero("total_monthly_funding", active.iter().map(|s| s.amount).sum());
}

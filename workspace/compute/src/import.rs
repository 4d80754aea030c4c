//! Bulk import of already-parsed spreadsheet data.
//!
//! The payload carries students and sponsors grouped by program plus a flat
//! list of expenses. Students are applied first so that sponsors in the same
//! payload can reference them. Rows that cannot be used are skipped and
//! counted; an import never fails as a whole.

use chrono::{DateTime, Utc};
use common::ExchangeRate;
use model::entities::{Dataset, ImportKind, MergeStrategy, ProgramCode, SourceFileRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

use crate::edits::{
    EntityRef, NewExpense, NewSponsor, NewStudent, build_expense, build_sponsor, build_student,
};
use crate::financial::NormalizationWarning;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ImportPayload {
    #[serde(default)]
    pub students: BTreeMap<ProgramCode, Vec<NewStudent>>,
    #[serde(default)]
    pub sponsors: BTreeMap<ProgramCode, Vec<NewSponsor>>,
    #[serde(default)]
    pub expenses: Vec<NewExpense>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportOptions {
    pub kind: ImportKind,
    pub strategy: MergeStrategy,
    /// Name recorded in the import history
    pub file_name: String,
    pub imported_at: DateTime<Utc>,
}

impl ImportOptions {
    /// The reference published for this import.
    pub fn entity(&self) -> EntityRef {
        EntityRef::Import {
            file_name: self.file_name.clone(),
        }
    }
}

/// Counts of what an import did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub students: usize,
    pub sponsors: usize,
    pub expenses: usize,
    /// Sponsors naming a student the program does not have
    pub rejected_sponsors: usize,
    /// Rows missing a required field
    pub skipped: usize,
    pub warnings: Vec<NormalizationWarning>,
}

impl ImportOutcome {
    pub fn applied(&self) -> usize {
        self.students + self.sponsors + self.expenses
    }
}

/// Applies `payload` to `dataset` and records it in the import history.
///
/// `replace` clears the students or sponsors of each program present in the
/// payload, and the whole expense list. `merge` replaces a record with the
/// same natural key, keeping its identifier. `append` always adds.
#[instrument(skip(dataset, payload, options), fields(kind = %options.kind, strategy = %options.strategy, file = %options.file_name))]
pub fn apply_import(
    dataset: &mut Dataset,
    payload: ImportPayload,
    options: &ImportOptions,
    rate: ExchangeRate,
) -> ImportOutcome {
    let mut outcome = ImportOutcome::default();
    let strategy = options.strategy;

    if options.kind.includes_students() {
        for (code, rows) in payload.students {
            import_students(dataset, code, rows, strategy, rate, &mut outcome);
        }
    } else if !payload.students.is_empty() {
        debug!("Ignoring students not selected by the import kind");
    }

    if options.kind.includes_sponsors() {
        for (code, rows) in payload.sponsors {
            import_sponsors(dataset, code, rows, strategy, &mut outcome);
        }
    } else if !payload.sponsors.is_empty() {
        debug!("Ignoring sponsors not selected by the import kind");
    }

    if options.kind.includes_expenses() {
        import_expenses(dataset, payload.expenses, strategy, &mut outcome);
    } else if !payload.expenses.is_empty() {
        debug!("Ignoring expenses not selected by the import kind");
    }

    dataset.metadata.source_files.push(SourceFileRecord {
        file_name: options.file_name.clone(),
        kind: options.kind,
        strategy,
        imported_at: options.imported_at,
        students: outcome.students,
        sponsors: outcome.sponsors,
        expenses: outcome.expenses,
    });

    info!(
        applied = outcome.applied(),
        rejected_sponsors = outcome.rejected_sponsors,
        skipped = outcome.skipped,
        warnings = outcome.warnings.len(),
        "Import applied"
    );
    outcome
}

fn import_students(
    dataset: &mut Dataset,
    code: ProgramCode,
    rows: Vec<NewStudent>,
    strategy: MergeStrategy,
    rate: ExchangeRate,
    outcome: &mut ImportOutcome,
) {
    let program = dataset.program_mut(code);
    if strategy == MergeStrategy::Replace {
        program.students.clear();
    }

    for row in rows {
        let (student, warnings) = match build_student(row, rate) {
            Ok(built) => built,
            Err(e) => {
                warn!(program = %code, error = %e, "Skipping student row");
                outcome.skipped += 1;
                continue;
            }
        };
        outcome.warnings.extend(warnings);

        let existing = match strategy {
            MergeStrategy::Merge => program
                .students
                .iter()
                .position(|s| s.full_name == student.full_name),
            _ => None,
        };
        match existing {
            Some(index) => {
                let slot = &mut program.students[index];
                let serial_number = slot.serial_number;
                *slot = student;
                slot.serial_number = serial_number;
            }
            None => {
                program.push_student(student);
            }
        }
        outcome.students += 1;
    }
}

fn import_sponsors(
    dataset: &mut Dataset,
    code: ProgramCode,
    rows: Vec<NewSponsor>,
    strategy: MergeStrategy,
    outcome: &mut ImportOutcome,
) {
    if strategy == MergeStrategy::Replace {
        dataset.registry_mut(code).sponsors.clear();
    }

    for row in rows {
        let sponsor = match build_sponsor(row) {
            Ok(sponsor) => sponsor,
            Err(e) => {
                warn!(program = %code, error = %e, "Skipping sponsor row");
                outcome.skipped += 1;
                continue;
            }
        };
        if let Err(e) = dataset.check_student_reference(code, &sponsor.student_name) {
            warn!(program = %code, error = %e, "Rejecting sponsor row");
            outcome.rejected_sponsors += 1;
            continue;
        }

        let registry = dataset.registry_mut(code);
        let existing = match strategy {
            MergeStrategy::Merge => registry.sponsors.iter().position(|s| {
                s.student_name == sponsor.student_name && s.sponsor_name == sponsor.sponsor_name
            }),
            _ => None,
        };
        match existing {
            Some(index) => {
                let slot = &mut registry.sponsors[index];
                let cid = slot.cid;
                *slot = sponsor;
                slot.cid = cid;
            }
            None => {
                registry.push_sponsor(sponsor);
            }
        }
        outcome.sponsors += 1;
    }
}

fn import_expenses(
    dataset: &mut Dataset,
    rows: Vec<NewExpense>,
    strategy: MergeStrategy,
    outcome: &mut ImportOutcome,
) {
    if strategy == MergeStrategy::Replace {
        dataset.expenses.clear();
    }

    for row in rows {
        let expense = match build_expense(row) {
            Ok(expense) => expense,
            Err(e) => {
                warn!(error = %e, "Skipping expense row");
                outcome.skipped += 1;
                continue;
            }
        };

        let existing = match strategy {
            MergeStrategy::Merge => dataset
                .expenses
                .iter()
                .position(|e| e.natural_key() == expense.natural_key()),
            _ => None,
        };
        match existing {
            Some(index) => {
                let slot = &mut dataset.expenses[index];
                let id = slot.id;
                *slot = expense;
                slot.id = id;
            }
            None => {
                dataset.push_expense(expense);
            }
        }
        outcome.expenses += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use model::entities::SponsorStatus;
    use model::numeric::FinancialInput;

    fn options(kind: ImportKind, strategy: MergeStrategy) -> ImportOptions {
        ImportOptions {
            kind,
            strategy,
            file_name: "sponsors-2024.xlsx".to_string(),
            imported_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        }
    }

    fn student(name: &str, food: f64) -> NewStudent {
        NewStudent {
            full_name: name.to_string(),
            financial_data: FinancialInput::new().with("food", food),
            ..Default::default()
        }
    }

    fn sponsor(student: &str, sponsor: &str, amount: f64) -> NewSponsor {
        NewSponsor {
            student_name: student.to_string(),
            sponsor_name: sponsor.to_string(),
            amount,
            ..Default::default()
        }
    }

    fn expense(day: u32, description: &str, amount: f64) -> NewExpense {
        NewExpense {
            date: NaiveDate::from_ymd_opt(2024, 2, day).unwrap(),
            student_name: None,
            description: description.to_string(),
            category: "Food".to_string(),
            amount,
            notes: String::new(),
        }
    }

    fn seeded() -> Dataset {
        let mut dataset = Dataset::empty(4100.0);
        let payload = ImportPayload {
            students: BTreeMap::from([(ProgramCode::Ch, vec![student("A", 1.0), student("B", 2.0)])]),
            sponsors: BTreeMap::from([(ProgramCode::Ch, vec![sponsor("A", "S1", 10.0)])]),
            expenses: vec![expense(1, "Rice", 100.0)],
        };
        apply_import(&mut dataset, payload, &options(ImportKind::All, MergeStrategy::Append), ExchangeRate::default());
        dataset
    }

    fn names(dataset: &Dataset) -> Vec<(u32, String, f64)> {
        dataset
            .program(ProgramCode::Ch)
            .unwrap()
            .students
            .iter()
            .map(|s| (s.serial_number, s.full_name.clone(), s.financial_data.food))
            .collect()
    }

    #[test]
    fn test_merge_replaces_matches_and_appends_misses() {
        let mut dataset = seeded();
        let payload = ImportPayload {
            students: BTreeMap::from([(ProgramCode::Ch, vec![student("B", 20.0), student("C", 3.0)])]),
            ..Default::default()
        };
        let outcome = apply_import(&mut dataset, payload, &options(ImportKind::Students, MergeStrategy::Merge), ExchangeRate::default());

        assert_eq!(outcome.students, 2);
        assert_eq!(
            names(&dataset),
            vec![
                (1, "A".to_string(), 1.0),
                (2, "B".to_string(), 20.0),
                (3, "C".to_string(), 3.0)
            ]
        );
    }

    #[test]
    fn test_replace_discards_existing_students() {
        let mut dataset = seeded();
        let payload = ImportPayload {
            students: BTreeMap::from([(ProgramCode::Ch, vec![student("Z", 9.0)])]),
            ..Default::default()
        };
        apply_import(&mut dataset, payload, &options(ImportKind::Students, MergeStrategy::Replace), ExchangeRate::default());

        assert_eq!(names(&dataset), vec![(1, "Z".to_string(), 9.0)]);
    }

    #[test]
    fn test_append_always_adds() {
        let mut dataset = seeded();
        let payload = ImportPayload {
            students: BTreeMap::from([(ProgramCode::Ch, vec![student("A", 5.0)])]),
            expenses: vec![expense(1, "Rice", 100.0)],
            ..Default::default()
        };
        apply_import(&mut dataset, payload, &options(ImportKind::All, MergeStrategy::Append), ExchangeRate::default());

        assert_eq!(names(&dataset).len(), 3);
        assert_eq!(names(&dataset)[2], (3, "A".to_string(), 5.0));
        let ids: Vec<u32> = dataset.expenses.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_sponsor_merge_keeps_cid_and_rejects_unknown_students() {
        let mut dataset = seeded();
        let mut inactive = sponsor("A", "S1", 15.0);
        inactive.status = Some(SponsorStatus::Inactive);
        let payload = ImportPayload {
            sponsors: BTreeMap::from([(
                ProgramCode::Ch,
                vec![sponsor("B", "S2", 20.0), inactive, sponsor("Ghost", "S3", 5.0)],
            )]),
            ..Default::default()
        };
        let outcome = apply_import(&mut dataset, payload, &options(ImportKind::Sponsors, MergeStrategy::Merge), ExchangeRate::default());

        assert_eq!(outcome.sponsors, 2);
        assert_eq!(outcome.rejected_sponsors, 1);
        let registry = dataset.registry(ProgramCode::Ch).unwrap();
        assert_eq!(registry.sponsors.len(), 2);
        let s1 = registry.sponsor(1).unwrap();
        assert_eq!((s1.sponsor_name.as_str(), s1.amount), ("S1", 15.0));
        assert!(!s1.is_active());
        assert_eq!(registry.sponsor(2).unwrap().sponsor_name, "S2");
    }

    #[test]
    fn test_sponsors_may_reference_students_from_same_payload() {
        let mut dataset = Dataset::empty(4100.0);
        let payload = ImportPayload {
            students: BTreeMap::from([(ProgramCode::Ysp, vec![student("New", 0.0)])]),
            sponsors: BTreeMap::from([(ProgramCode::Ysp, vec![sponsor("New", "S", 10.0)])]),
            ..Default::default()
        };
        let outcome = apply_import(&mut dataset, payload, &options(ImportKind::All, MergeStrategy::Merge), ExchangeRate::default());

        assert_eq!(outcome.rejected_sponsors, 0);
        assert_eq!(dataset.registry(ProgramCode::Ysp).unwrap().sponsors.len(), 1);
    }

    #[test]
    fn test_expense_merge_on_natural_key() {
        let mut dataset = seeded();
        let payload = ImportPayload {
            expenses: vec![expense(1, "Rice", 250.0), expense(2, "Rice", 80.0)],
            ..Default::default()
        };
        apply_import(&mut dataset, payload, &options(ImportKind::Expenses, MergeStrategy::Merge), ExchangeRate::default());

        let rows: Vec<(u32, f64)> = dataset.expenses.iter().map(|e| (e.id, e.amount)).collect();
        assert_eq!(rows, vec![(1, 250.0), (2, 80.0)]);
    }

    #[test]
    fn test_kind_limits_collections_and_history_is_recorded() {
        let mut dataset = seeded();
        let payload = ImportPayload {
            students: BTreeMap::from([(ProgramCode::Ch, vec![student("Q", 0.0)])]),
            expenses: vec![expense(3, "Beans", 10.0), expense(4, " ", 10.0)],
            ..Default::default()
        };
        let outcome = apply_import(&mut dataset, payload, &options(ImportKind::Expenses, MergeStrategy::Append), ExchangeRate::default());

        assert_eq!(outcome.students, 0);
        assert_eq!(outcome.expenses, 1);
        assert_eq!(outcome.skipped, 1);
        assert!(!dataset.has_student(ProgramCode::Ch, "Q"));

        let history = &dataset.metadata.source_files;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].kind, ImportKind::Expenses);
        assert_eq!(history[1].expenses, 1);
        assert_eq!(history[1].file_name, "sponsors-2024.xlsx");
    }

    #[test]
    fn test_formula_warnings_are_collected() {
        let mut dataset = Dataset::empty(4100.0);
        let mut row = student("F", 0.0);
        row.financial_data = FinancialInput::new().with("termly_school_fees", "=SUM(").with("food", "=D3+1");
        let payload = ImportPayload {
            students: BTreeMap::from([(ProgramCode::Ch, vec![row])]),
            ..Default::default()
        };
        let outcome = apply_import(&mut dataset, payload, &options(ImportKind::Students, MergeStrategy::Merge), ExchangeRate::default());

        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].field, "termly_school_fees");
        let student = dataset.program(ProgramCode::Ch).unwrap().student(1).unwrap();
        assert_eq!(student.financial_data.food, 1.0);
    }

    #[test]
    fn test_payload_deserializes_from_json() {
        let payload: ImportPayload = serde_json::from_str(
            r#"{
                "students": {"CH": [{"full_name": "A", "financial_data": {"food": "=1000*2"}}]},
                "sponsors": {"YSP": [{"student_name": "B", "sponsor_name": "S", "amount": "30"}]}
            }"#,
        )
        .unwrap();

        assert_eq!(payload.students[&ProgramCode::Ch].len(), 1);
        assert_eq!(payload.sponsors[&ProgramCode::Ysp][0].amount, 30.0);
        assert!(payload.expenses.is_empty());
    }
}

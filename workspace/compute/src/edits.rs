//! Targeted edits of the dataset.
//!
//! Every function validates before it mutates, so a rejected edit leaves the
//! dataset exactly as it was. Derived metadata is not touched here; the
//! caller recalculates after a successful edit.

use chrono::NaiveDate;
use common::ExchangeRate;
use model::entities::{Dataset, Event, Expense, ProgramCode, Sponsor, SponsorStatus, Student};
use model::numeric::{FinancialInput, lenient_f64, lenient_opt_f64};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{ComputeError, Result};
use crate::financial::{self, NormalizationWarning};

/// The entity an edit or import touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EntityRef {
    Student { program: ProgramCode, serial_number: u32 },
    Sponsor { program: ProgramCode, cid: u32 },
    Expense { id: u32 },
    Event { id: u32 },
    Import { file_name: String },
}

/// Result of a successful edit.
#[derive(Debug, Clone, PartialEq)]
pub struct EditOutcome {
    pub entity: EntityRef,
    /// Financial values that could not be read and were stored as 0
    pub warnings: Vec<NormalizationWarning>,
}

impl EditOutcome {
    pub fn new(entity: EntityRef) -> Self {
        Self {
            entity,
            warnings: Vec::new(),
        }
    }

    fn with_warnings(mut self, warnings: Vec<NormalizationWarning>) -> Self {
        self.warnings = warnings;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NewStudent {
    pub full_name: String,
    #[serde(default)]
    pub sponsorship_package: String,
    #[serde(default)]
    pub financial_data: FinancialInput,
    #[serde(default)]
    pub notes: String,
}

/// Fields left as `None` keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StudentPatch {
    pub full_name: Option<String>,
    pub sponsorship_package: Option<String>,
    /// Merged over the current financial inputs field by field
    pub financial_data: Option<FinancialInput>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NewSponsor {
    pub student_name: String,
    pub sponsor_name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: f64,
    #[serde(default)]
    pub status: Option<SponsorStatus>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SponsorPatch {
    pub student_name: Option<String>,
    pub sponsor_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub amount: Option<f64>,
    pub status: Option<SponsorStatus>,
    pub category: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewExpense {
    pub date: NaiveDate,
    #[serde(default)]
    pub student_name: Option<String>,
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: f64,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExpensePatch {
    pub date: Option<NaiveDate>,
    pub student_name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub amount: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub program: Option<ProgramCode>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EventPatch {
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub program: Option<ProgramCode>,
}

fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ComputeError::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(trimmed.to_string())
}

/// Builds a student (serial unassigned) from raw input, normalizing its financials.
pub(crate) fn build_student(
    new: NewStudent,
    rate: ExchangeRate,
) -> Result<(Student, Vec<NormalizationWarning>)> {
    let full_name = required("full_name", &new.full_name)?;
    let normalized = financial::normalize(&new.financial_data, rate);
    let student = Student {
        serial_number: 0,
        full_name,
        sponsorship_package: new.sponsorship_package.trim().to_string(),
        financial_data: normalized.data,
        notes: new.notes,
    };
    Ok((student, normalized.warnings))
}

pub(crate) fn build_sponsor(new: NewSponsor) -> Result<Sponsor> {
    Ok(Sponsor {
        cid: 0,
        student_name: required("student_name", &new.student_name)?,
        sponsor_name: required("sponsor_name", &new.sponsor_name)?,
        amount: new.amount,
        status: Some(new.status.unwrap_or(SponsorStatus::Active)),
        category: new.category.trim().to_string(),
        start_date: new.start_date,
        notes: new.notes,
    })
}

pub(crate) fn build_expense(new: NewExpense) -> Result<Expense> {
    Ok(Expense {
        id: 0,
        date: new.date,
        student_name: new
            .student_name
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        description: required("description", &new.description)?,
        category: new.category.trim().to_string(),
        amount: new.amount,
        notes: new.notes,
    })
}

/// Enrolls a student at the end of the program's list.
#[instrument(skip(dataset, new), fields(program = %code))]
pub fn add_student(
    dataset: &mut Dataset,
    code: ProgramCode,
    new: NewStudent,
    rate: ExchangeRate,
) -> Result<EditOutcome> {
    let (student, warnings) = build_student(new, rate)?;

    let serial_number = dataset.program_mut(code).push_student(student);
    info!(serial_number, warnings = warnings.len(), "Added student");
    Ok(EditOutcome::new(EntityRef::Student { program: code, serial_number }).with_warnings(warnings))
}

/// Applies a shallow patch to a student. A rename is carried over to the
/// program's sponsors that referenced the old name, unless another student
/// still answers to it.
#[instrument(skip(dataset, patch), fields(program = %code))]
pub fn update_student(
    dataset: &mut Dataset,
    code: ProgramCode,
    serial_number: u32,
    patch: StudentPatch,
    rate: ExchangeRate,
) -> Result<EditOutcome> {
    let current = dataset
        .program(code)
        .ok_or(model::ModelError::StudentNotFound { program: code, serial: serial_number })?
        .student(serial_number)?;
    let mut updated = current.clone();
    let mut warnings = Vec::new();

    if let Some(name) = patch.full_name {
        updated.full_name = required("full_name", &name)?;
    }
    if let Some(package) = patch.sponsorship_package {
        updated.sponsorship_package = package.trim().to_string();
    }
    if let Some(notes) = patch.notes {
        updated.notes = notes;
    }
    if let Some(financial_patch) = patch.financial_data {
        let mut input = current.financial_data.to_input();
        input.merge(&financial_patch);
        let normalized = financial::normalize(&input, rate);
        updated.financial_data = normalized.data;
        warnings = normalized.warnings;
    }

    let old_name = current.full_name.clone();
    let new_name = updated.full_name.clone();
    *dataset.program_mut(code).student_mut(serial_number)? = updated;

    if old_name != new_name && !dataset.has_student(code, &old_name) {
        let mut cascaded = 0;
        for sponsor in dataset.registry_mut(code).sponsors.iter_mut() {
            if sponsor.student_name == old_name {
                sponsor.student_name = new_name.clone();
                cascaded += 1;
            }
        }
        debug!(%old_name, %new_name, cascaded, "Renamed student");
    }

    info!(serial_number, "Updated student");
    Ok(EditOutcome::new(EntityRef::Student { program: code, serial_number }).with_warnings(warnings))
}

/// Removes a student and renumbers the rest of the program.
#[instrument(skip(dataset), fields(program = %code))]
pub fn delete_student(dataset: &mut Dataset, code: ProgramCode, serial_number: u32) -> Result<EditOutcome> {
    let removed = dataset.program_mut(code).remove_student(serial_number)?;
    info!(serial_number, full_name = %removed.full_name, "Deleted student");
    Ok(EditOutcome::new(EntityRef::Student { program: code, serial_number }))
}

/// Registers a sponsor for an existing student of the same program.
#[instrument(skip(dataset, new), fields(program = %code))]
pub fn add_sponsor(dataset: &mut Dataset, code: ProgramCode, new: NewSponsor) -> Result<EditOutcome> {
    let sponsor = build_sponsor(new)?;
    dataset.check_student_reference(code, &sponsor.student_name)?;

    let cid = dataset.registry_mut(code).push_sponsor(sponsor);
    info!(cid, "Added sponsor");
    Ok(EditOutcome::new(EntityRef::Sponsor { program: code, cid }))
}

#[instrument(skip(dataset, patch), fields(program = %code))]
pub fn update_sponsor(
    dataset: &mut Dataset,
    code: ProgramCode,
    cid: u32,
    patch: SponsorPatch,
) -> Result<EditOutcome> {
    let current = dataset
        .registry(code)
        .ok_or(model::ModelError::SponsorNotFound { program: code, cid })?
        .sponsor(cid)?;
    let mut updated = current.clone();

    if let Some(student_name) = patch.student_name {
        let student_name = required("student_name", &student_name)?;
        if student_name != current.student_name {
            dataset.check_student_reference(code, &student_name)?;
        }
        updated.student_name = student_name;
    }
    if let Some(sponsor_name) = patch.sponsor_name {
        updated.sponsor_name = required("sponsor_name", &sponsor_name)?;
    }
    if let Some(amount) = patch.amount {
        updated.amount = amount;
    }
    if let Some(status) = patch.status {
        updated.status = Some(status);
    }
    if let Some(category) = patch.category {
        updated.category = category.trim().to_string();
    }
    if let Some(start_date) = patch.start_date {
        updated.start_date = Some(start_date);
    }
    if let Some(notes) = patch.notes {
        updated.notes = notes;
    }

    *dataset.registry_mut(code).sponsor_mut(cid)? = updated;
    info!(cid, "Updated sponsor");
    Ok(EditOutcome::new(EntityRef::Sponsor { program: code, cid }))
}

/// Removes a sponsor and renumbers the remaining CIDs.
#[instrument(skip(dataset), fields(program = %code))]
pub fn delete_sponsor(dataset: &mut Dataset, code: ProgramCode, cid: u32) -> Result<EditOutcome> {
    let removed = dataset.registry_mut(code).remove_sponsor(cid)?;
    info!(cid, sponsor_name = %removed.sponsor_name, "Deleted sponsor");
    Ok(EditOutcome::new(EntityRef::Sponsor { program: code, cid }))
}

#[instrument(skip(dataset, new))]
pub fn add_expense(dataset: &mut Dataset, new: NewExpense) -> Result<EditOutcome> {
    let expense = build_expense(new)?;
    let id = dataset.push_expense(expense);
    info!(id, "Added expense");
    Ok(EditOutcome::new(EntityRef::Expense { id }))
}

#[instrument(skip(dataset, patch))]
pub fn update_expense(dataset: &mut Dataset, id: u32, patch: ExpensePatch) -> Result<EditOutcome> {
    let description = patch
        .description
        .map(|d| required("description", &d))
        .transpose()?;

    let expense = dataset.expense_mut(id)?;
    if let Some(date) = patch.date {
        expense.date = date;
    }
    if let Some(student_name) = patch.student_name {
        let trimmed = student_name.trim();
        expense.student_name = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }
    if let Some(description) = description {
        expense.description = description;
    }
    if let Some(category) = patch.category {
        expense.category = category.trim().to_string();
    }
    if let Some(amount) = patch.amount {
        expense.amount = amount;
    }
    if let Some(notes) = patch.notes {
        expense.notes = notes;
    }

    info!(id, "Updated expense");
    Ok(EditOutcome::new(EntityRef::Expense { id }))
}

#[instrument(skip(dataset))]
pub fn delete_expense(dataset: &mut Dataset, id: u32) -> Result<EditOutcome> {
    dataset.remove_expense(id)?;
    info!(id, "Deleted expense");
    Ok(EditOutcome::new(EntityRef::Expense { id }))
}

#[instrument(skip(dataset, new))]
pub fn add_event(dataset: &mut Dataset, new: NewEvent) -> Result<EditOutcome> {
    let event = Event {
        id: 0,
        title: required("title", &new.title)?,
        date: new.date,
        description: new.description,
        location: new.location.filter(|l| !l.trim().is_empty()),
        program: new.program,
    };
    let id = dataset.push_event(event);
    info!(id, "Added event");
    Ok(EditOutcome::new(EntityRef::Event { id }))
}

#[instrument(skip(dataset, patch))]
pub fn update_event(dataset: &mut Dataset, id: u32, patch: EventPatch) -> Result<EditOutcome> {
    let title = patch.title.map(|t| required("title", &t)).transpose()?;

    let event = dataset.event_mut(id)?;
    if let Some(title) = title {
        event.title = title;
    }
    if let Some(date) = patch.date {
        event.date = date;
    }
    if let Some(description) = patch.description {
        event.description = description;
    }
    if let Some(location) = patch.location {
        event.location = (!location.trim().is_empty()).then_some(location);
    }
    if let Some(program) = patch.program {
        event.program = Some(program);
    }

    info!(id, "Updated event");
    Ok(EditOutcome::new(EntityRef::Event { id }))
}

#[instrument(skip(dataset))]
pub fn delete_event(dataset: &mut Dataset, id: u32) -> Result<EditOutcome> {
    dataset.remove_event(id)?;
    info!(id, "Deleted event");
    Ok(EditOutcome::new(EntityRef::Event { id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::ModelError;

    fn rate() -> ExchangeRate {
        ExchangeRate::default()
    }

    fn new_student(name: &str) -> NewStudent {
        NewStudent {
            full_name: name.to_string(),
            sponsorship_package: "Full".to_string(),
            financial_data: FinancialInput::new()
                .with("termly_school_fees", 600000.0)
                .with("food", "=G3+90000"),
            notes: String::new(),
        }
    }

    fn new_sponsor(student: &str, sponsor: &str) -> NewSponsor {
        NewSponsor {
            student_name: student.to_string(),
            sponsor_name: sponsor.to_string(),
            amount: 30.0,
            ..Default::default()
        }
    }

    fn with_students(names: &[&str]) -> Dataset {
        let mut dataset = Dataset::empty(4100.0);
        for name in names {
            add_student(&mut dataset, ProgramCode::Ch, new_student(name), rate()).unwrap();
        }
        dataset
    }

    #[test]
    fn test_add_student_normalizes_financials() {
        let mut dataset = Dataset::empty(4100.0);
        let outcome = add_student(&mut dataset, ProgramCode::Ch, new_student("Amina"), rate()).unwrap();

        assert_eq!(
            outcome.entity,
            EntityRef::Student { program: ProgramCode::Ch, serial_number: 1 }
        );
        let student = dataset.program(ProgramCode::Ch).unwrap().student(1).unwrap();
        assert_eq!(student.financial_data.food, 90000.0);
        assert_eq!(student.financial_data.monthly_output_ugx, 290000.0);
    }

    #[test]
    fn test_add_student_rejects_blank_name() {
        let mut dataset = with_students(&["Amina"]);
        let before = dataset.clone();

        assert!(matches!(
            add_student(&mut dataset, ProgramCode::Ch, new_student("  "), rate()),
            Err(ComputeError::InvalidInput(_))
        ));
        assert_eq!(dataset, before);
    }

    #[test]
    fn test_add_student_surfaces_warnings() {
        let mut dataset = Dataset::empty(4100.0);
        let mut new = new_student("Amina");
        new.financial_data = FinancialInput::new().with("food", "=1/0");

        let outcome = add_student(&mut dataset, ProgramCode::Ch, new, rate()).unwrap();
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].field, "food");
    }

    #[test]
    fn test_update_student_merges_financial_patch() {
        let mut dataset = with_students(&["Amina"]);
        let patch = StudentPatch {
            financial_data: Some(FinancialInput::new().with("admin_utilities", "=D3/100")),
            notes: Some("moved school".to_string()),
            ..Default::default()
        };
        update_student(&mut dataset, ProgramCode::Ch, 1, patch, rate()).unwrap();

        let student = dataset.program(ProgramCode::Ch).unwrap().student(1).unwrap();
        assert_eq!(student.financial_data.termly_school_fees, 600000.0);
        assert_eq!(student.financial_data.food, 90000.0);
        assert_eq!(student.financial_data.admin_utilities, 6000.0);
        assert_eq!(student.sponsorship_package, "Full");
        assert_eq!(student.notes, "moved school");
    }

    #[test]
    fn test_rename_cascades_to_sponsors() {
        let mut dataset = with_students(&["Amina", "Brian"]);
        add_sponsor(&mut dataset, ProgramCode::Ch, new_sponsor("Amina", "S1")).unwrap();
        add_sponsor(&mut dataset, ProgramCode::Ch, new_sponsor("Brian", "S2")).unwrap();

        let patch = StudentPatch {
            full_name: Some("Amina N.".to_string()),
            ..Default::default()
        };
        update_student(&mut dataset, ProgramCode::Ch, 1, patch, rate()).unwrap();

        let registry = dataset.registry(ProgramCode::Ch).unwrap();
        assert_eq!(registry.sponsor(1).unwrap().student_name, "Amina N.");
        assert_eq!(registry.sponsor(2).unwrap().student_name, "Brian");
    }

    #[test]
    fn test_rename_keeps_sponsors_of_namesake() {
        let mut dataset = with_students(&["Amina", "Amina"]);
        add_sponsor(&mut dataset, ProgramCode::Ch, new_sponsor("Amina", "S1")).unwrap();

        let patch = StudentPatch {
            full_name: Some("Amina K.".to_string()),
            ..Default::default()
        };
        update_student(&mut dataset, ProgramCode::Ch, 2, patch, rate()).unwrap();

        let registry = dataset.registry(ProgramCode::Ch).unwrap();
        assert_eq!(registry.sponsor(1).unwrap().student_name, "Amina");
    }

    #[test]
    fn test_update_missing_student() {
        let mut dataset = with_students(&["Amina"]);
        let result = update_student(&mut dataset, ProgramCode::Ch, 7, StudentPatch::default(), rate());
        assert_eq!(
            result,
            Err(ComputeError::Model(ModelError::StudentNotFound {
                program: ProgramCode::Ch,
                serial: 7
            }))
        );
    }

    #[test]
    fn test_delete_student_renumbers() {
        let mut dataset = with_students(&["A", "B", "C"]);
        delete_student(&mut dataset, ProgramCode::Ch, 1).unwrap();

        let students = &dataset.program(ProgramCode::Ch).unwrap().students;
        assert_eq!(students[0].serial_number, 1);
        assert_eq!(students[0].full_name, "B");
        assert_eq!(students[1].serial_number, 2);
    }

    #[test]
    fn test_sponsor_for_unknown_student_is_rejected() {
        let mut dataset = with_students(&["Amina"]);
        let before = dataset.clone();

        let err = add_sponsor(&mut dataset, ProgramCode::Ch, new_sponsor("Nobody", "S1")).unwrap_err();
        assert!(err.is_reference_violation());
        assert_eq!(dataset, before);

        // students of another program do not count
        let err = add_sponsor(&mut dataset, ProgramCode::Ysp, new_sponsor("Amina", "S1")).unwrap_err();
        assert!(err.is_reference_violation());
    }

    #[test]
    fn test_add_sponsor_defaults_to_active() {
        let mut dataset = with_students(&["Amina"]);
        add_sponsor(&mut dataset, ProgramCode::Ch, new_sponsor("Amina", "S1")).unwrap();

        let sponsor = dataset.registry(ProgramCode::Ch).unwrap().sponsor(1).unwrap();
        assert_eq!(sponsor.status, Some(SponsorStatus::Active));
    }

    #[test]
    fn test_update_sponsor_rechecks_reference_on_rename() {
        let mut dataset = with_students(&["Amina", "Brian"]);
        add_sponsor(&mut dataset, ProgramCode::Ch, new_sponsor("Amina", "S1")).unwrap();
        let before = dataset.clone();

        let bad = SponsorPatch {
            student_name: Some("Nobody".to_string()),
            amount: Some(99.0),
            ..Default::default()
        };
        assert!(update_sponsor(&mut dataset, ProgramCode::Ch, 1, bad).unwrap_err().is_reference_violation());
        assert_eq!(dataset, before);

        let good = SponsorPatch {
            student_name: Some("Brian".to_string()),
            status: Some(SponsorStatus::Inactive),
            ..Default::default()
        };
        update_sponsor(&mut dataset, ProgramCode::Ch, 1, good).unwrap();
        let sponsor = dataset.registry(ProgramCode::Ch).unwrap().sponsor(1).unwrap();
        assert_eq!(sponsor.student_name, "Brian");
        assert!(!sponsor.is_active());
        assert_eq!(sponsor.amount, 30.0);
    }

    #[test]
    fn test_delete_sponsor_renumbers() {
        let mut dataset = with_students(&["Amina"]);
        for name in ["S1", "S2", "S3"] {
            add_sponsor(&mut dataset, ProgramCode::Ch, new_sponsor("Amina", name)).unwrap();
        }

        delete_sponsor(&mut dataset, ProgramCode::Ch, 2).unwrap();

        let cids: Vec<(u32, &str)> = dataset.registry(ProgramCode::Ch).unwrap()
            .sponsors
            .iter()
            .map(|s| (s.cid, s.sponsor_name.as_str()))
            .collect();
        assert_eq!(cids, vec![(1, "S1"), (2, "S3")]);
    }

    #[test]
    fn test_expense_lifecycle() {
        let mut dataset = Dataset::empty(4100.0);
        let new = NewExpense {
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            student_name: Some(" ".to_string()),
            description: "Uniforms".to_string(),
            category: "Clothing".to_string(),
            amount: 45000.0,
            notes: String::new(),
        };
        let outcome = add_expense(&mut dataset, new).unwrap();
        assert_eq!(outcome.entity, EntityRef::Expense { id: 1 });
        assert_eq!(dataset.expenses[0].student_name, None);

        let patch = ExpensePatch {
            amount: Some(50000.0),
            ..Default::default()
        };
        update_expense(&mut dataset, 1, patch).unwrap();
        assert_eq!(dataset.expenses[0].amount, 50000.0);

        let blank = ExpensePatch {
            description: Some(String::new()),
            ..Default::default()
        };
        assert!(update_expense(&mut dataset, 1, blank).is_err());
        assert_eq!(dataset.expenses[0].description, "Uniforms");

        delete_expense(&mut dataset, 1).unwrap();
        assert!(dataset.expenses.is_empty());
        assert!(delete_expense(&mut dataset, 1).unwrap_err().is_not_found());
    }

    #[test]
    fn test_event_lifecycle() {
        let mut dataset = Dataset::empty(4100.0);
        let new = NewEvent {
            title: "Graduation".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(),
            description: String::new(),
            location: Some("Kampala".to_string()),
            program: Some(ProgramCode::Ysp),
        };
        add_event(&mut dataset, new.clone()).unwrap();
        let outcome = add_event(&mut dataset, new).unwrap();
        assert_eq!(outcome.entity, EntityRef::Event { id: 2 });

        let patch = EventPatch {
            location: Some(String::new()),
            ..Default::default()
        };
        update_event(&mut dataset, 2, patch).unwrap();
        assert_eq!(dataset.events[1].location, None);

        delete_event(&mut dataset, 1).unwrap();
        assert_eq!(dataset.events[0].id, 2);
    }

    #[test]
    fn test_entity_ref_serialization() {
        let json = serde_json::to_value(EntityRef::Sponsor { program: ProgramCode::Ch, cid: 3 }).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "sponsor", "program": "CH", "cid": 3}));
    }
}

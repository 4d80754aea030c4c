use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use utoipa::ToSchema;

use super::{Event, Expense, Program, ProgramCode, Registry, next_id};
use crate::error::{ModelError, Result};
use crate::numeric::lenient_f64;
use common::DEFAULT_EXCHANGE_RATE;

/// Which collections a bulk import touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    Students,
    Sponsors,
    Expenses,
    All,
}

impl ImportKind {
    pub fn includes_students(&self) -> bool {
        matches!(self, ImportKind::Students | ImportKind::All)
    }

    pub fn includes_sponsors(&self) -> bool {
        matches!(self, ImportKind::Sponsors | ImportKind::All)
    }

    pub fn includes_expenses(&self) -> bool {
        matches!(self, ImportKind::Expenses | ImportKind::All)
    }
}

/// How imported records are combined with existing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Discard the existing collection
    Replace,
    /// Match on the natural key: replace on match, append otherwise
    #[default]
    Merge,
    /// Always append with a fresh identifier
    Append,
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImportKind::Students => "students",
            ImportKind::Sponsors => "sponsors",
            ImportKind::Expenses => "expenses",
            ImportKind::All => "all",
        };
        f.write_str(s)
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MergeStrategy::Replace => "replace",
            MergeStrategy::Merge => "merge",
            MergeStrategy::Append => "append",
        };
        f.write_str(s)
    }
}

/// One entry of the import history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SourceFileRecord {
    pub file_name: String,
    pub kind: ImportKind,
    pub strategy: MergeStrategy,
    pub imported_at: DateTime<Utc>,
    #[serde(default)]
    pub students: usize,
    #[serde(default)]
    pub sponsors: usize,
    #[serde(default)]
    pub expenses: usize,
}

/// Organization-wide roll-up, rebuilt by every recalculation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProgramSummary {
    #[serde(default)]
    pub total_students_across_all_programs: usize,
    #[serde(default)]
    pub total_active_sponsorships: usize,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_monthly_funding_euros: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_monthly_funding_ugx: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DatabaseMetadata {
    /// EUR→UGX rate the derived figures were computed with
    #[serde(default = "default_exchange_rate", deserialize_with = "lenient_f64")]
    pub exchange_rate: f64,
    #[serde(default)]
    pub program_summary: ProgramSummary,
    /// Import history, oldest first
    #[serde(default)]
    pub source_files: Vec<SourceFileRecord>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

fn default_exchange_rate() -> f64 {
    DEFAULT_EXCHANGE_RATE
}

impl Default for DatabaseMetadata {
    fn default() -> Self {
        Self {
            exchange_rate: DEFAULT_EXCHANGE_RATE,
            program_summary: ProgramSummary::default(),
            source_files: Vec::new(),
            last_updated: None,
        }
    }
}

/// The whole organization: the single aggregate root that gets loaded,
/// edited, recalculated and persisted as one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Dataset {
    #[serde(default)]
    pub programs: BTreeMap<ProgramCode, Program>,
    #[serde(default)]
    pub registries: BTreeMap<ProgramCode, Registry>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub metadata: DatabaseMetadata,
}

impl Dataset {
    /// A freshly initialized dataset: every program and registry present and empty.
    pub fn empty(exchange_rate: f64) -> Self {
        let mut dataset = Self {
            programs: BTreeMap::new(),
            registries: BTreeMap::new(),
            expenses: Vec::new(),
            events: Vec::new(),
            metadata: DatabaseMetadata {
                exchange_rate,
                ..Default::default()
            },
        };
        dataset.ensure_collections();
        dataset
    }

    /// Adds the empty program and registry of any code that is missing.
    pub fn ensure_collections(&mut self) {
        for code in ProgramCode::ALL {
            self.programs.entry(code).or_insert_with(|| Program::new(code));
            self.registries.entry(code).or_insert_with(|| Registry::new(code));
        }
    }

    pub fn program(&self, code: ProgramCode) -> Option<&Program> {
        self.programs.get(&code)
    }

    pub fn program_mut(&mut self, code: ProgramCode) -> &mut Program {
        self.programs.entry(code).or_insert_with(|| Program::new(code))
    }

    pub fn registry(&self, code: ProgramCode) -> Option<&Registry> {
        self.registries.get(&code)
    }

    pub fn registry_mut(&mut self, code: ProgramCode) -> &mut Registry {
        self.registries.entry(code).or_insert_with(|| Registry::new(code))
    }

    /// Whether `full_name` is enrolled in `code`.
    pub fn has_student(&self, code: ProgramCode, full_name: &str) -> bool {
        self.program(code).is_some_and(|p| p.has_student(full_name))
    }

    /// Fails with [`ModelError::UnknownStudent`] unless the student exists.
    pub fn check_student_reference(&self, code: ProgramCode, full_name: &str) -> Result<()> {
        if self.has_student(code, full_name) {
            Ok(())
        } else {
            Err(ModelError::UnknownStudent {
                program: code,
                name: full_name.to_string(),
            })
        }
    }

    pub fn expense_mut(&mut self, id: u32) -> Result<&mut Expense> {
        self.expenses
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(ModelError::ExpenseNotFound(id))
    }

    /// Appends an expense with a fresh id and returns that id.
    pub fn push_expense(&mut self, mut expense: Expense) -> u32 {
        let id = next_id(self.expenses.iter().map(|e| e.id));
        expense.id = id;
        self.expenses.push(expense);
        id
    }

    pub fn remove_expense(&mut self, id: u32) -> Result<Expense> {
        let index = self
            .expenses
            .iter()
            .position(|e| e.id == id)
            .ok_or(ModelError::ExpenseNotFound(id))?;
        Ok(self.expenses.remove(index))
    }

    pub fn event_mut(&mut self, id: u32) -> Result<&mut Event> {
        self.events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(ModelError::EventNotFound(id))
    }

    /// Appends an event with a fresh id and returns that id.
    pub fn push_event(&mut self, mut event: Event) -> u32 {
        let id = next_id(self.events.iter().map(|e| e.id));
        event.id = id;
        self.events.push(event);
        id
    }

    pub fn remove_event(&mut self, id: u32) -> Result<Event> {
        let index = self
            .events
            .iter()
            .position(|e| e.id == id)
            .ok_or(ModelError::EventNotFound(id))?;
        Ok(self.events.remove(index))
    }

    pub fn total_students(&self) -> usize {
        self.programs.values().map(|p| p.students.len()).sum()
    }
}

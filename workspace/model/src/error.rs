use thiserror::Error;

use crate::entities::ProgramCode;

/// Errors raised when an edit refers to something the dataset does not contain.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Path or payload named a program code outside the fixed set
    #[error("Unknown program: {0}")]
    UnknownProgram(String),

    #[error("Student with serial number {serial} not found in program {program}")]
    StudentNotFound { program: ProgramCode, serial: u32 },

    #[error("Sponsor with CID {cid} not found in registry {program}")]
    SponsorNotFound { program: ProgramCode, cid: u32 },

    #[error("Expense {0} not found")]
    ExpenseNotFound(u32),

    #[error("Event {0} not found")]
    EventNotFound(u32),

    /// A sponsor referenced a student name that is not enrolled in the program
    #[error("Student '{name}' does not exist in program {program}")]
    UnknownStudent { program: ProgramCode, name: String },
}

/// Type alias for Result with ModelError
pub type Result<T> = std::result::Result<T, ModelError>;

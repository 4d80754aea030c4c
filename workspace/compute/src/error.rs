use model::ModelError;
use thiserror::Error;

/// Error types for the compute module
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComputeError {
    /// An edit referred to an entity that does not exist, or broke a reference
    #[error(transparent)]
    Model(#[from] ModelError),

    /// An edit payload was structurally unusable (e.g. an empty student name)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ComputeError {
    /// True for referential violations, which callers report differently from lookups.
    pub fn is_reference_violation(&self) -> bool {
        matches!(self, ComputeError::Model(ModelError::UnknownStudent { .. }))
    }

    /// True when the edit named an entity that does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ComputeError::Model(
                ModelError::StudentNotFound { .. }
                    | ModelError::SponsorNotFound { .. }
                    | ModelError::ExpenseNotFound(_)
                    | ModelError::EventNotFound(_)
            )
        )
    }
}

/// Type alias for Result with ComputeError
pub type Result<T> = std::result::Result<T, ComputeError>;

pub mod convert;
pub mod dataset;
pub mod events;
pub mod expenses;
pub mod health;
pub mod import;
pub mod reports;
pub mod sponsors;
pub mod students;
pub mod ws;

use axum::{http::StatusCode, response::Json};
use compute::ComputeError;
use compute::financial::NormalizationWarning;
use model::ModelError;
use model::entities::ProgramCode;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::repository::RepositoryError;
use crate::schemas::ErrorResponse;

/// Error half of every handler result.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn error_response(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            code: code.to_string(),
            success: false,
        }),
    )
}

pub(crate) fn internal_error(message: impl Into<String>) -> ApiError {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
}

impl From<RepositoryError> for (StatusCode, Json<ErrorResponse>) {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Storage(e) => {
                error!("Storage failure: {:#}", e);
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "The dataset could not be persisted; no change was made",
                )
            }
            RepositoryError::Rejected(e) => {
                warn!("Edit rejected: {}", e);
                compute_error(e)
            }
        }
    }
}

fn compute_error(err: ComputeError) -> ApiError {
    let message = err.to_string();
    if err.is_reference_violation() {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, "UNKNOWN_STUDENT", message);
    }
    if err.is_not_found() {
        return error_response(StatusCode::NOT_FOUND, "NOT_FOUND", message);
    }
    match err {
        ComputeError::Model(ModelError::UnknownProgram(_)) => {
            error_response(StatusCode::NOT_FOUND, "UNKNOWN_PROGRAM", message)
        }
        _ => error_response(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message),
    }
}

/// Parses the `:program` path segment.
pub(crate) fn parse_program(raw: &str) -> Result<ProgramCode, ApiError> {
    raw.parse::<ProgramCode>().map_err(|e| {
        warn!("Rejected program code '{}'", raw);
        error_response(StatusCode::NOT_FOUND, "UNKNOWN_PROGRAM", e.to_string())
    })
}

/// A financial value that could not be read and was stored as 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FieldWarning {
    /// Financial field name
    pub field: String,
    /// The value as received
    pub raw: String,
    /// Why it was rejected
    pub reason: String,
}

impl From<NormalizationWarning> for FieldWarning {
    fn from(warning: NormalizationWarning) -> Self {
        Self {
            field: warning.field,
            raw: warning.raw,
            reason: warning.reason,
        }
    }
}

/// Appends normalization warnings to a success message.
pub(crate) fn with_warnings(message: &str, warnings: &[NormalizationWarning]) -> String {
    if warnings.is_empty() {
        return message.to_string();
    }
    let details: Vec<String> = warnings
        .iter()
        .map(|w| format!("{} '{}' {}", w.field, w.raw, w.reason))
        .collect();
    format!(
        "{} with {} warning(s), stored as 0: {}",
        message,
        warnings.len(),
        details.join("; ")
    )
}

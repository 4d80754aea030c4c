use axum::{extract::State, http::StatusCode, response::Json};
use axum_valid::Valid;
use chrono::Utc;
use compute::{ImportOptions, ImportOutcome, ImportPayload};
use model::entities::{ImportKind, MergeStrategy};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

use super::{ApiError, FieldWarning, with_warnings};
use crate::events::UpdateKind;
use crate::schemas::{ApiResponse, AppState};

/// Request body for a bulk import of already-parsed spreadsheet rows
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ImportRequest {
    /// Which collections the payload is applied to
    pub kind: ImportKind,
    /// How rows are combined with existing records (default: merge)
    #[serde(default)]
    pub strategy: MergeStrategy,
    /// Name recorded in the import history
    #[validate(length(min = 1, max = 255))]
    pub file_name: Option<String>,
    /// `{ students: {CH: [...]}, sponsors: {CH: [...]}, expenses: [...] }`
    #[schema(value_type = Object)]
    pub data: ImportPayload,
}

/// What an import did
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ImportResponse {
    pub students: usize,
    pub sponsors: usize,
    pub expenses: usize,
    /// Sponsors naming a student the program does not have
    pub rejected_sponsors: usize,
    /// Rows missing a required field
    pub skipped: usize,
    /// Financial values stored as 0
    pub warnings: Vec<FieldWarning>,
}

impl From<ImportOutcome> for ImportResponse {
    fn from(outcome: ImportOutcome) -> Self {
        Self {
            students: outcome.students,
            sponsors: outcome.sponsors,
            expenses: outcome.expenses,
            rejected_sponsors: outcome.rejected_sponsors,
            skipped: outcome.skipped,
            warnings: outcome.warnings.into_iter().map(FieldWarning::from).collect(),
        }
    }
}

/// Bulk-import students, sponsors and expenses
#[utoipa::path(
    post,
    path = "/api/v1/import",
    tag = "import",
    request_body = ImportRequest,
    responses(
        (status = 200, description = "Import applied", body = ApiResponse<ImportResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn import_data(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<ImportRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<ImportResponse>>), ApiError> {
    trace!("Entering import_data function");
    let imported_at = Utc::now();
    let options = ImportOptions {
        kind: request.kind,
        strategy: request.strategy,
        file_name: request
            .file_name
            .unwrap_or_else(|| format!("api-import-{}", imported_at.format("%Y%m%dT%H%M%SZ"))),
        imported_at,
    };
    debug!(
        "Importing '{}' as {} with strategy {}",
        options.file_name, options.kind, options.strategy
    );

    let data = request.data;
    let committed = state
        .commit(UpdateKind::DataImported, move |dataset, rate| {
            let outcome = compute::apply_import(dataset, data, &options, rate);
            Ok((options.entity(), outcome))
        })
        .await?;

    let (_, outcome) = committed.output;
    if outcome.rejected_sponsors > 0 || outcome.skipped > 0 {
        warn!(
            "Import dropped {} sponsors with unknown students and skipped {} incomplete rows",
            outcome.rejected_sponsors, outcome.skipped
        );
    }
    info!("Import applied {} records", outcome.applied());

    let message = with_warnings(
        &format!("Imported {} records", outcome.applied()),
        &outcome.warnings,
    );
    let response = ApiResponse {
        data: ImportResponse::from(outcome),
        message,
        success: true,
    };
    Ok((StatusCode::OK, Json(response)))
}

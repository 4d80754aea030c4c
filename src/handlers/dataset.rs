use axum::{extract::State, http::StatusCode, response::Json};
use model::entities::Dataset;
use std::sync::Arc;
use tracing::{debug, instrument, trace};

use crate::schemas::{ApiResponse, AppState};

/// Get the whole dataset as last committed, derived metadata included
#[utoipa::path(
    get,
    path = "/api/v1/dataset",
    tag = "dataset",
    responses(
        (status = 200, description = "Dataset retrieved successfully", body = ApiResponse<Dataset>)
    )
)]
#[instrument]
pub async fn get_dataset(State(state): State<AppState>) -> (StatusCode, Json<ApiResponse<Arc<Dataset>>>) {
    trace!("Entering get_dataset function");
    let (revision, dataset) = state.repository.versioned_snapshot().await;
    debug!("Serving dataset revision {} with {} students", revision, dataset.total_students());

    let response = ApiResponse {
        data: dataset,
        message: "Dataset retrieved successfully".to_string(),
        success: true,
    };
    (StatusCode::OK, Json(response))
}

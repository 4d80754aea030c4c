use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use common::Currency;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{ApiError, error_response};
use crate::schemas::{ApiResponse, AppState};

/// Query parameters for a currency conversion
#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate)]
pub struct ConversionQuery {
    /// Amount to convert
    pub amount: f64,
    /// Source currency: `eur` or `ugx`
    #[validate(length(min = 1, max = 16))]
    pub from: String,
}

/// Result of a conversion at the configured rate
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConversionResponse {
    pub amount: f64,
    pub from: Currency,
    pub converted: f64,
    pub to: Currency,
    /// UGX per EUR used for the conversion
    pub exchange_rate: f64,
}

/// Convert an amount between EUR and UGX
#[utoipa::path(
    get,
    path = "/api/v1/convert",
    tag = "convert",
    params(ConversionQuery),
    responses(
        (status = 200, description = "Amount converted", body = ApiResponse<ConversionResponse>),
        (status = 400, description = "Unknown currency or invalid amount", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn convert_currency(
    Valid(Query(query)): Valid<Query<ConversionQuery>>,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ApiResponse<ConversionResponse>>), ApiError> {
    let from: Currency = query.from.parse().map_err(|e: String| {
        warn!("Rejected conversion request: {}", e);
        error_response(StatusCode::BAD_REQUEST, "INVALID_CURRENCY", e)
    })?;
    if !query.amount.is_finite() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "amount must be a finite number",
        ));
    }

    let rate = state.repository.rate();
    let (converted, to) = rate.convert(query.amount, from);
    debug!("Converted {} {} to {} {}", query.amount, from, converted, to);

    let response = ApiResponse {
        data: ConversionResponse {
            amount: query.amount,
            from,
            converted,
            to,
            exchange_rate: rate.ugx_per_euro(),
        },
        message: format!("Converted {} to {}", from, to),
        success: true,
    };
    Ok((StatusCode::OK, Json(response)))
}

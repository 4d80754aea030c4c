use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::NaiveDate;
use compute::edits::{self, NewSponsor, SponsorPatch};
use compute::EntityRef;
use model::entities::{Dataset, ProgramCode, Registry, Sponsor, SponsorStatus};
use model::numeric::{lenient_f64, lenient_opt_f64};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::ToSchema;
use validator::Validate;

use super::{ApiError, error_response, internal_error, parse_program};
use crate::events::UpdateKind;
use crate::schemas::{ApiResponse, AppState};

/// Request body for registering a sponsor
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateSponsorRequest {
    /// Full name of a student enrolled in the same program
    #[validate(length(min = 1, max = 200))]
    pub student_name: String,
    #[validate(length(min = 1, max = 200))]
    pub sponsor_name: String,
    /// Monthly amount in EUR; numeric strings are accepted
    #[serde(default, deserialize_with = "lenient_f64")]
    #[schema(value_type = f64)]
    pub amount: f64,
    /// Defaults to active
    pub status: Option<SponsorStatus>,
    #[serde(default)]
    pub category: String,
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
}

impl From<CreateSponsorRequest> for NewSponsor {
    fn from(request: CreateSponsorRequest) -> Self {
        Self {
            student_name: request.student_name,
            sponsor_name: request.sponsor_name,
            amount: request.amount,
            status: request.status,
            category: request.category,
            start_date: request.start_date,
            notes: request.notes,
        }
    }
}

/// Request body for updating a sponsor; omitted fields are kept
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateSponsorRequest {
    #[validate(length(min = 1, max = 200))]
    pub student_name: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub sponsor_name: Option<String>,
    /// Numeric strings are accepted
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    #[schema(value_type = Option<f64>)]
    pub amount: Option<f64>,
    pub status: Option<SponsorStatus>,
    pub category: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl From<UpdateSponsorRequest> for SponsorPatch {
    fn from(request: UpdateSponsorRequest) -> Self {
        Self {
            student_name: request.student_name,
            sponsor_name: request.sponsor_name,
            amount: request.amount,
            status: request.status,
            category: request.category,
            start_date: request.start_date,
            notes: request.notes,
        }
    }
}

fn registry_of(dataset: &Dataset, code: ProgramCode) -> Result<Registry, ApiError> {
    dataset.registry(code).cloned().ok_or_else(|| {
        error_response(StatusCode::NOT_FOUND, "UNKNOWN_PROGRAM", format!("Registry {} not found", code))
    })
}

fn committed_sponsor(dataset: &Dataset, code: ProgramCode, cid: u32) -> Result<Sponsor, ApiError> {
    dataset
        .registry(code)
        .and_then(|r| r.sponsor(cid).ok())
        .cloned()
        .ok_or_else(|| internal_error("Committed sponsor is missing from the reloaded dataset"))
}

/// Get a program's sponsor registry
#[utoipa::path(
    get,
    path = "/api/v1/registries/{program}",
    tag = "sponsors",
    params(
        ("program" = String, Path, description = "Program code (CH or YSP)"),
    ),
    responses(
        (status = 200, description = "Registry retrieved successfully", body = ApiResponse<Registry>),
        (status = 404, description = "Unknown program", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn get_registry(
    Path(program): Path<String>,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ApiResponse<Registry>>), ApiError> {
    trace!("Entering get_registry function for program: {}", program);
    let code = parse_program(&program)?;

    let dataset = state.repository.snapshot().await;
    let registry = registry_of(&dataset, code)?;
    debug!("Registry {} has {} sponsors", code, registry.sponsors.len());

    let response = ApiResponse {
        data: registry,
        message: "Registry retrieved successfully".to_string(),
        success: true,
    };
    Ok((StatusCode::OK, Json(response)))
}

/// Register a sponsor for an enrolled student
#[utoipa::path(
    post,
    path = "/api/v1/registries/{program}/sponsors",
    tag = "sponsors",
    params(
        ("program" = String, Path, description = "Program code (CH or YSP)"),
    ),
    request_body = CreateSponsorRequest,
    responses(
        (status = 201, description = "Sponsor created successfully", body = ApiResponse<Sponsor>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Unknown program", body = ErrorResponse),
        (status = 422, description = "Student does not exist in the program", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn create_sponsor(
    Path(program): Path<String>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CreateSponsorRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<Sponsor>>), ApiError> {
    trace!("Entering create_sponsor function");
    let code = parse_program(&program)?;
    debug!("Creating sponsor '{}' for student '{}' in {}", request.sponsor_name, request.student_name, code);

    let committed = state
        .commit(UpdateKind::SponsorAdded, move |dataset, _| {
            edits::add_sponsor(dataset, code, request.into())
        })
        .await?;

    let EntityRef::Sponsor { cid, .. } = committed.output.entity else {
        return Err(internal_error("Sponsor edit reported a different entity"));
    };
    let sponsor = committed_sponsor(&committed.dataset, code, cid)?;
    info!("Sponsor created in {} with CID {}", code, sponsor.cid);

    let response = ApiResponse {
        data: sponsor,
        message: "Sponsor created successfully".to_string(),
        success: true,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Update a sponsor
#[utoipa::path(
    put,
    path = "/api/v1/registries/{program}/sponsors/{cid}",
    tag = "sponsors",
    params(
        ("program" = String, Path, description = "Program code (CH or YSP)"),
        ("cid" = u32, Path, description = "Sponsor CID"),
    ),
    request_body = UpdateSponsorRequest,
    responses(
        (status = 200, description = "Sponsor updated successfully", body = ApiResponse<Sponsor>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Sponsor not found", body = ErrorResponse),
        (status = 422, description = "Student does not exist in the program", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn update_sponsor(
    Path((program, cid)): Path<(String, u32)>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<UpdateSponsorRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<Sponsor>>), ApiError> {
    trace!("Entering update_sponsor function");
    let code = parse_program(&program)?;

    let committed = state
        .commit(UpdateKind::SponsorUpdated, move |dataset, _| {
            edits::update_sponsor(dataset, code, cid, request.into())
        })
        .await?;

    let sponsor = committed_sponsor(&committed.dataset, code, cid)?;
    info!("Sponsor {} in {} updated", cid, code);

    let response = ApiResponse {
        data: sponsor,
        message: "Sponsor updated successfully".to_string(),
        success: true,
    };
    Ok((StatusCode::OK, Json(response)))
}

/// Remove a sponsor; the remaining CIDs are renumbered
#[utoipa::path(
    delete,
    path = "/api/v1/registries/{program}/sponsors/{cid}",
    tag = "sponsors",
    params(
        ("program" = String, Path, description = "Program code (CH or YSP)"),
        ("cid" = u32, Path, description = "Sponsor CID"),
    ),
    responses(
        (status = 200, description = "Sponsor deleted, renumbered registry returned", body = ApiResponse<Registry>),
        (status = 404, description = "Sponsor not found", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn delete_sponsor(
    Path((program, cid)): Path<(String, u32)>,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ApiResponse<Registry>>), ApiError> {
    trace!("Entering delete_sponsor function");
    let code = parse_program(&program)?;

    let committed = state
        .commit(UpdateKind::SponsorDeleted, move |dataset, _| {
            edits::delete_sponsor(dataset, code, cid)
        })
        .await?;

    let registry = registry_of(&committed.dataset, code)?;
    info!("Sponsor {} deleted from {}, {} remain", cid, code, registry.sponsors.len());

    let response = ApiResponse {
        data: registry,
        message: "Sponsor deleted successfully".to_string(),
        success: true,
    };
    Ok((StatusCode::OK, Json(response)))
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use compute::edits::{self, NewStudent, StudentPatch};
use compute::EntityRef;
use model::entities::{Dataset, Program, ProgramCode, Student};
use model::numeric::FinancialInput;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

use super::{ApiError, error_response, internal_error, parse_program, with_warnings};
use crate::events::UpdateKind;
use crate::schemas::{ApiResponse, AppState};

/// Request body for enrolling a student
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateStudentRequest {
    /// Full name, referenced by sponsors of the same program
    #[validate(length(min = 1, max = 200))]
    pub full_name: String,
    /// Sponsorship package label (e.g. "Full", "Partial")
    #[serde(default)]
    pub sponsorship_package: String,
    /// Raw financial inputs: numbers, numeric strings or `=` formulas
    #[serde(default)]
    #[schema(value_type = Object)]
    pub financial_data: FinancialInput,
    #[serde(default)]
    pub notes: String,
}

impl From<CreateStudentRequest> for NewStudent {
    fn from(request: CreateStudentRequest) -> Self {
        Self {
            full_name: request.full_name,
            sponsorship_package: request.sponsorship_package,
            financial_data: request.financial_data,
            notes: request.notes,
        }
    }
}

/// Request body for updating a student; omitted fields are kept
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateStudentRequest {
    #[validate(length(min = 1, max = 200))]
    pub full_name: Option<String>,
    pub sponsorship_package: Option<String>,
    /// Merged over the current financial inputs field by field
    #[schema(value_type = Option<Object>)]
    pub financial_data: Option<FinancialInput>,
    pub notes: Option<String>,
}

impl From<UpdateStudentRequest> for StudentPatch {
    fn from(request: UpdateStudentRequest) -> Self {
        Self {
            full_name: request.full_name,
            sponsorship_package: request.sponsorship_package,
            financial_data: request.financial_data,
            notes: request.notes,
        }
    }
}

fn committed_student(dataset: &Dataset, entity: &EntityRef) -> Result<Student, ApiError> {
    let EntityRef::Student { program, serial_number } = entity else {
        return Err(internal_error(format!("Unexpected entity {:?} for a student edit", entity)));
    };
    dataset
        .program(*program)
        .and_then(|p| p.student(*serial_number).ok())
        .cloned()
        .ok_or_else(|| internal_error("Committed student is missing from the reloaded dataset"))
}

fn program_of(dataset: &Dataset, code: ProgramCode) -> Result<Program, ApiError> {
    dataset
        .program(code)
        .cloned()
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "UNKNOWN_PROGRAM", format!("Program {} not found", code)))
}

/// Get a program with its students and derived metadata
#[utoipa::path(
    get,
    path = "/api/v1/programs/{program}",
    tag = "students",
    params(
        ("program" = String, Path, description = "Program code (CH or YSP)"),
    ),
    responses(
        (status = 200, description = "Program retrieved successfully", body = ApiResponse<Program>),
        (status = 404, description = "Unknown program", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn get_program(
    Path(program): Path<String>,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ApiResponse<Program>>), ApiError> {
    trace!("Entering get_program function for program: {}", program);
    let code = parse_program(&program)?;

    let dataset = state.repository.snapshot().await;
    let program = program_of(&dataset, code)?;
    debug!("Program {} has {} students", code, program.students.len());

    let response = ApiResponse {
        data: program,
        message: "Program retrieved successfully".to_string(),
        success: true,
    };
    Ok((StatusCode::OK, Json(response)))
}

/// Enroll a student at the end of a program
#[utoipa::path(
    post,
    path = "/api/v1/programs/{program}/students",
    tag = "students",
    params(
        ("program" = String, Path, description = "Program code (CH or YSP)"),
    ),
    request_body = CreateStudentRequest,
    responses(
        (status = 201, description = "Student created successfully", body = ApiResponse<Student>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Unknown program", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn create_student(
    Path(program): Path<String>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CreateStudentRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<Student>>), ApiError> {
    trace!("Entering create_student function");
    let code = parse_program(&program)?;
    debug!("Creating student '{}' in program {}", request.full_name, code);

    let committed = state
        .commit(UpdateKind::StudentAdded, move |dataset, rate| {
            edits::add_student(dataset, code, request.into(), rate)
        })
        .await?;

    let outcome = committed.output;
    if !outcome.warnings.is_empty() {
        warn!("Student stored with {} unreadable financial values", outcome.warnings.len());
    }
    let student = committed_student(&committed.dataset, &outcome.entity)?;
    info!("Student created in {} with serial number {}", code, student.serial_number);

    let response = ApiResponse {
        data: student,
        message: with_warnings("Student created successfully", &outcome.warnings),
        success: true,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Update a student
#[utoipa::path(
    put,
    path = "/api/v1/programs/{program}/students/{serial}",
    tag = "students",
    params(
        ("program" = String, Path, description = "Program code (CH or YSP)"),
        ("serial" = u32, Path, description = "Student serial number"),
    ),
    request_body = UpdateStudentRequest,
    responses(
        (status = 200, description = "Student updated successfully", body = ApiResponse<Student>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Student not found", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn update_student(
    Path((program, serial)): Path<(String, u32)>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<UpdateStudentRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<Student>>), ApiError> {
    trace!("Entering update_student function");
    let code = parse_program(&program)?;
    debug!("Updating student {} in program {}", serial, code);

    let committed = state
        .commit(UpdateKind::StudentUpdated, move |dataset, rate| {
            edits::update_student(dataset, code, serial, request.into(), rate)
        })
        .await?;

    let outcome = committed.output;
    let student = committed_student(&committed.dataset, &outcome.entity)?;
    info!("Student {} in {} updated", serial, code);

    let response = ApiResponse {
        data: student,
        message: with_warnings("Student updated successfully", &outcome.warnings),
        success: true,
    };
    Ok((StatusCode::OK, Json(response)))
}

/// Remove a student; the remaining students are renumbered
#[utoipa::path(
    delete,
    path = "/api/v1/programs/{program}/students/{serial}",
    tag = "students",
    params(
        ("program" = String, Path, description = "Program code (CH or YSP)"),
        ("serial" = u32, Path, description = "Student serial number"),
    ),
    responses(
        (status = 200, description = "Student deleted, renumbered program returned", body = ApiResponse<Program>),
        (status = 404, description = "Student not found", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn delete_student(
    Path((program, serial)): Path<(String, u32)>,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ApiResponse<Program>>), ApiError> {
    trace!("Entering delete_student function");
    let code = parse_program(&program)?;

    let committed = state
        .commit(UpdateKind::StudentDeleted, move |dataset, _| {
            edits::delete_student(dataset, code, serial)
        })
        .await?;

    let program = program_of(&committed.dataset, code)?;
    info!("Student {} deleted from {}, {} remain", serial, code, program.students.len());

    let response = ApiResponse {
        data: program,
        message: "Student deleted successfully".to_string(),
        success: true,
    };
    Ok((StatusCode::OK, Json(response)))
}

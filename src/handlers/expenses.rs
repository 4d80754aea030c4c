use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::NaiveDate;
use compute::EntityRef;
use compute::edits::{self, ExpensePatch, NewExpense};
use model::entities::{Dataset, Expense};
use model::numeric::{lenient_f64, lenient_opt_f64};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::ToSchema;
use validator::Validate;

use super::{ApiError, internal_error};
use crate::events::UpdateKind;
use crate::schemas::{ApiResponse, AppState};

/// Request body for recording an expense
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateExpenseRequest {
    pub date: NaiveDate,
    /// Student the expense was spent on, if any
    pub student_name: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub description: String,
    #[serde(default)]
    pub category: String,
    /// Amount in UGX; numeric strings are accepted
    #[serde(default, deserialize_with = "lenient_f64")]
    #[schema(value_type = f64)]
    pub amount: f64,
    #[serde(default)]
    pub notes: String,
}

impl From<CreateExpenseRequest> for NewExpense {
    fn from(request: CreateExpenseRequest) -> Self {
        Self {
            date: request.date,
            student_name: request.student_name,
            description: request.description,
            category: request.category,
            amount: request.amount,
            notes: request.notes,
        }
    }
}

/// Request body for updating an expense; omitted fields are kept
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateExpenseRequest {
    pub date: Option<NaiveDate>,
    /// An empty string detaches the expense from its student
    pub student_name: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub description: Option<String>,
    pub category: Option<String>,
    /// Numeric strings are accepted
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    #[schema(value_type = Option<f64>)]
    pub amount: Option<f64>,
    pub notes: Option<String>,
}

impl From<UpdateExpenseRequest> for ExpensePatch {
    fn from(request: UpdateExpenseRequest) -> Self {
        Self {
            date: request.date,
            student_name: request.student_name,
            description: request.description,
            category: request.category,
            amount: request.amount,
            notes: request.notes,
        }
    }
}

fn committed_expense(dataset: &Dataset, entity: &EntityRef) -> Result<Expense, ApiError> {
    let EntityRef::Expense { id } = entity else {
        return Err(internal_error(format!("Unexpected entity {:?} for an expense edit", entity)));
    };
    dataset
        .expenses
        .iter()
        .find(|e| e.id == *id)
        .cloned()
        .ok_or_else(|| internal_error("Committed expense is missing from the reloaded dataset"))
}

/// List every expense
#[utoipa::path(
    get,
    path = "/api/v1/expenses",
    tag = "expenses",
    responses(
        (status = 200, description = "Expenses retrieved successfully", body = ApiResponse<Vec<Expense>>)
    )
)]
#[instrument]
pub async fn get_expenses(State(state): State<AppState>) -> (StatusCode, Json<ApiResponse<Vec<Expense>>>) {
    trace!("Entering get_expenses function");
    let dataset = state.repository.snapshot().await;
    debug!("Retrieved {} expenses", dataset.expenses.len());

    let response = ApiResponse {
        data: dataset.expenses.clone(),
        message: "Expenses retrieved successfully".to_string(),
        success: true,
    };
    (StatusCode::OK, Json(response))
}

/// Record an expense
#[utoipa::path(
    post,
    path = "/api/v1/expenses",
    tag = "expenses",
    request_body = CreateExpenseRequest,
    responses(
        (status = 201, description = "Expense created successfully", body = ApiResponse<Expense>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn create_expense(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CreateExpenseRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<Expense>>), ApiError> {
    trace!("Entering create_expense function");
    debug!("Creating expense '{}' dated {}", request.description, request.date);

    let committed = state
        .commit(UpdateKind::ExpenseAdded, move |dataset, _| {
            edits::add_expense(dataset, request.into())
        })
        .await?;

    let expense = committed_expense(&committed.dataset, &committed.output.entity)?;
    info!("Expense created with ID: {}", expense.id);

    let response = ApiResponse {
        data: expense,
        message: "Expense created successfully".to_string(),
        success: true,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Update an expense
#[utoipa::path(
    put,
    path = "/api/v1/expenses/{id}",
    tag = "expenses",
    params(
        ("id" = u32, Path, description = "Expense ID"),
    ),
    request_body = UpdateExpenseRequest,
    responses(
        (status = 200, description = "Expense updated successfully", body = ApiResponse<Expense>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Expense not found", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn update_expense(
    Path(id): Path<u32>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<UpdateExpenseRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<Expense>>), ApiError> {
    trace!("Entering update_expense function for id: {}", id);

    let committed = state
        .commit(UpdateKind::ExpenseUpdated, move |dataset, _| {
            edits::update_expense(dataset, id, request.into())
        })
        .await?;

    let expense = committed_expense(&committed.dataset, &committed.output.entity)?;
    info!("Expense {} updated", id);

    let response = ApiResponse {
        data: expense,
        message: "Expense updated successfully".to_string(),
        success: true,
    };
    Ok((StatusCode::OK, Json(response)))
}

/// Delete an expense
#[utoipa::path(
    delete,
    path = "/api/v1/expenses/{id}",
    tag = "expenses",
    params(
        ("id" = u32, Path, description = "Expense ID"),
    ),
    responses(
        (status = 200, description = "Expense deleted, remaining expenses returned", body = ApiResponse<Vec<Expense>>),
        (status = 404, description = "Expense not found", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn delete_expense(
    Path(id): Path<u32>,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<Expense>>>), ApiError> {
    trace!("Entering delete_expense function for id: {}", id);

    let committed = state
        .commit(UpdateKind::ExpenseDeleted, move |dataset, _| edits::delete_expense(dataset, id))
        .await?;
    info!("Expense {} deleted", id);

    let response = ApiResponse {
        data: committed.dataset.expenses.clone(),
        message: "Expense deleted successfully".to_string(),
        success: true,
    };
    Ok((StatusCode::OK, Json(response)))
}

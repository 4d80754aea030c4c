use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::NaiveDate;
use compute::EntityRef;
use compute::edits::{self, EventPatch, NewEvent};
use model::entities::{Dataset, Event, ProgramCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::ToSchema;
use validator::Validate;

use super::{ApiError, internal_error};
use crate::events::UpdateKind;
use crate::schemas::{ApiResponse, AppState};

/// Request body for logging an organization event
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub description: String,
    pub location: Option<String>,
    /// Program the event concerns, if any
    pub program: Option<ProgramCode>,
}

impl From<CreateEventRequest> for NewEvent {
    fn from(request: CreateEventRequest) -> Self {
        Self {
            title: request.title,
            date: request.date,
            description: request.description,
            location: request.location,
            program: request.program,
        }
    }
}

/// Request body for updating an event; omitted fields are kept
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateEventRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub program: Option<ProgramCode>,
}

impl From<UpdateEventRequest> for EventPatch {
    fn from(request: UpdateEventRequest) -> Self {
        Self {
            title: request.title,
            date: request.date,
            description: request.description,
            location: request.location,
            program: request.program,
        }
    }
}

fn committed_event(dataset: &Dataset, entity: &EntityRef) -> Result<Event, ApiError> {
    let EntityRef::Event { id } = entity else {
        return Err(internal_error(format!("Unexpected entity {:?} for an event edit", entity)));
    };
    dataset
        .events
        .iter()
        .find(|e| e.id == *id)
        .cloned()
        .ok_or_else(|| internal_error("Committed event is missing from the reloaded dataset"))
}

/// List the event log
#[utoipa::path(
    get,
    path = "/api/v1/events",
    tag = "events",
    responses(
        (status = 200, description = "Events retrieved successfully", body = ApiResponse<Vec<Event>>)
    )
)]
#[instrument]
pub async fn get_events(State(state): State<AppState>) -> (StatusCode, Json<ApiResponse<Vec<Event>>>) {
    trace!("Entering get_events function");
    let dataset = state.repository.snapshot().await;
    debug!("Retrieved {} events", dataset.events.len());

    let response = ApiResponse {
        data: dataset.events.clone(),
        message: "Events retrieved successfully".to_string(),
        success: true,
    };
    (StatusCode::OK, Json(response))
}

/// Log an event
#[utoipa::path(
    post,
    path = "/api/v1/events",
    tag = "events",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created successfully", body = ApiResponse<Event>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn create_event(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CreateEventRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<Event>>), ApiError> {
    trace!("Entering create_event function");

    let committed = state
        .commit(UpdateKind::EventAdded, move |dataset, _| edits::add_event(dataset, request.into()))
        .await?;

    let event = committed_event(&committed.dataset, &committed.output.entity)?;
    info!("Event '{}' created with ID: {}", event.title, event.id);

    let response = ApiResponse {
        data: event,
        message: "Event created successfully".to_string(),
        success: true,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Update an event
#[utoipa::path(
    put,
    path = "/api/v1/events/{id}",
    tag = "events",
    params(
        ("id" = u32, Path, description = "Event ID"),
    ),
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Event updated successfully", body = ApiResponse<Event>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn update_event(
    Path(id): Path<u32>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<UpdateEventRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<Event>>), ApiError> {
    trace!("Entering update_event function for id: {}", id);

    let committed = state
        .commit(UpdateKind::EventUpdated, move |dataset, _| {
            edits::update_event(dataset, id, request.into())
        })
        .await?;

    let event = committed_event(&committed.dataset, &committed.output.entity)?;
    info!("Event {} updated", id);

    let response = ApiResponse {
        data: event,
        message: "Event updated successfully".to_string(),
        success: true,
    };
    Ok((StatusCode::OK, Json(response)))
}

/// Delete an event
#[utoipa::path(
    delete,
    path = "/api/v1/events/{id}",
    tag = "events",
    params(
        ("id" = u32, Path, description = "Event ID"),
    ),
    responses(
        (status = 200, description = "Event deleted, remaining events returned", body = ApiResponse<Vec<Event>>),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn delete_event(
    Path(id): Path<u32>,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<Event>>>), ApiError> {
    trace!("Entering delete_event function for id: {}", id);

    let committed = state
        .commit(UpdateKind::EventDeleted, move |dataset, _| edits::delete_event(dataset, id))
        .await?;
    info!("Event {} deleted", id);

    let response = ApiResponse {
        data: committed.dataset.events.clone(),
        message: "Event deleted successfully".to_string(),
        success: true,
    };
    Ok((StatusCode::OK, Json(response)))
}

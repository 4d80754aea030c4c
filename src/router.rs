use crate::handlers::{
    convert::convert_currency,
    dataset::get_dataset,
    events::{create_event, delete_event, get_events, update_event},
    expenses::{create_expense, delete_expense, get_expenses, update_expense},
    health::health_check,
    import::import_data,
    reports::{get_analytics, get_financial_summary, get_funding_gap, get_sponsor_statistics},
    sponsors::{create_sponsor, delete_sponsor, get_registry, update_sponsor},
    students::{create_student, delete_student, get_program, update_student},
    ws::ws_handler,
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    routing::{get, post, put},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Whole dataset
        .route("/api/v1/dataset", get(get_dataset))
        // Programs and students
        .route("/api/v1/programs/:program", get(get_program))
        .route("/api/v1/programs/:program/students", post(create_student))
        .route(
            "/api/v1/programs/:program/students/:serial",
            put(update_student).delete(delete_student),
        )
        // Sponsor registries
        .route("/api/v1/registries/:program", get(get_registry))
        .route("/api/v1/registries/:program/sponsors", post(create_sponsor))
        .route(
            "/api/v1/registries/:program/sponsors/:cid",
            put(update_sponsor).delete(delete_sponsor),
        )
        // Expenses
        .route("/api/v1/expenses", get(get_expenses).post(create_expense))
        .route("/api/v1/expenses/:id", put(update_expense).delete(delete_expense))
        // Event log
        .route("/api/v1/events", get(get_events).post(create_event))
        .route("/api/v1/events/:id", put(update_event).delete(delete_event))
        // Bulk import
        .route("/api/v1/import", post(import_data))
        // Reports
        .route("/api/v1/reports/financial-summary", get(get_financial_summary))
        .route("/api/v1/reports/funding-gap", get(get_funding_gap))
        .route("/api/v1/reports/sponsor-statistics", get(get_sponsor_statistics))
        .route("/api/v1/reports/analytics", get(get_analytics))
        // Currency conversion
        .route("/api/v1/convert", get(convert_currency))
        // Live updates
        .route("/ws", get(ws_handler))
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

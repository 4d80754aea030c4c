use common::{
    Analytics, Currency, ExchangeRate, FinancialSummary, FundingGapReport, ProgramDistribution, ProgramFundingGap,
    ProgramSponsorStatistics, SponsorStatistics,
};
use model::entities::{
    DatabaseMetadata, Dataset, Event, Expense, FinancialData, ImportKind, MergeStrategy, Program,
    ProgramCode, ProgramMetadata, ProgramSummary, Registry, RegistryMetadata, SourceFileRecord,
    Sponsor, SponsorStatus, Student,
};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

use crate::handlers::{
    convert::ConversionResponse,
    events::{CreateEventRequest, UpdateEventRequest},
    expenses::{CreateExpenseRequest, UpdateExpenseRequest},
    import::{ImportRequest, ImportResponse},
    sponsors::{CreateSponsorRequest, UpdateSponsorRequest},
    students::{CreateStudentRequest, UpdateStudentRequest},
    FieldWarning,
};
use crate::events::UpdateKind;
use crate::repository::{Committed, Mutation, Repository, RepositoryError};

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Owner of the dataset and the mutation lane
    pub repository: Arc<Repository>,
    /// Cache for report responses, keyed by report name and dataset revision
    pub cache: Cache<String, CachedReport>,
}

impl AppState {
    pub fn new(repository: Arc<Repository>, cache: Cache<String, CachedReport>) -> Self {
        Self { repository, cache }
    }

    /// Commits a mutation through the repository and drops every cached report.
    pub async fn commit<T, F>(&self, kind: UpdateKind, edit: F) -> Result<Committed<T>, RepositoryError>
    where
        T: Mutation,
        F: FnOnce(&mut Dataset, ExchangeRate) -> compute::Result<T>,
    {
        let committed = self.repository.mutate(kind, edit).await?;
        self.cache.invalidate_all();
        Ok(committed)
    }
}

/// Cached report types
#[derive(Clone, Debug)]
pub enum CachedReport {
    FinancialSummary(FinancialSummary),
    FundingGap(FundingGapReport),
    SponsorStatistics(SponsorStatistics),
    Analytics(Analytics),
}

/// API response wrapper
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Where the dataset is stored
    pub storage: String,
    /// Students across all programs
    pub students: usize,
    /// EUR→UGX rate in use
    pub exchange_rate: f64,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::dataset::get_dataset,
        crate::handlers::students::get_program,
        crate::handlers::students::create_student,
        crate::handlers::students::update_student,
        crate::handlers::students::delete_student,
        crate::handlers::sponsors::get_registry,
        crate::handlers::sponsors::create_sponsor,
        crate::handlers::sponsors::update_sponsor,
        crate::handlers::sponsors::delete_sponsor,
        crate::handlers::expenses::get_expenses,
        crate::handlers::expenses::create_expense,
        crate::handlers::expenses::update_expense,
        crate::handlers::expenses::delete_expense,
        crate::handlers::events::get_events,
        crate::handlers::events::create_event,
        crate::handlers::events::update_event,
        crate::handlers::events::delete_event,
        crate::handlers::import::import_data,
        crate::handlers::reports::get_financial_summary,
        crate::handlers::reports::get_funding_gap,
        crate::handlers::reports::get_sponsor_statistics,
        crate::handlers::reports::get_analytics,
        crate::handlers::convert::convert_currency,
    ),
    components(
        schemas(
            ApiResponse<Dataset>,
            ApiResponse<Program>,
            ApiResponse<Student>,
            ApiResponse<Registry>,
            ApiResponse<Sponsor>,
            ApiResponse<Expense>,
            ApiResponse<Vec<Expense>>,
            ApiResponse<Event>,
            ApiResponse<Vec<Event>>,
            ApiResponse<ImportResponse>,
            ApiResponse<FinancialSummary>,
            ApiResponse<FundingGapReport>,
            ApiResponse<SponsorStatistics>,
            ApiResponse<Analytics>,
            ApiResponse<ConversionResponse>,
            ErrorResponse,
            HealthResponse,
            Dataset,
            DatabaseMetadata,
            ProgramSummary,
            SourceFileRecord,
            Program,
            ProgramCode,
            ProgramMetadata,
            Student,
            FinancialData,
            Registry,
            RegistryMetadata,
            Sponsor,
            SponsorStatus,
            Expense,
            Event,
            ImportKind,
            MergeStrategy,
            CreateStudentRequest,
            UpdateStudentRequest,
            CreateSponsorRequest,
            UpdateSponsorRequest,
            CreateExpenseRequest,
            UpdateExpenseRequest,
            CreateEventRequest,
            UpdateEventRequest,
            ImportRequest,
            ImportResponse,
            FieldWarning,
            FinancialSummary,
            FundingGapReport,
            ProgramFundingGap,
            SponsorStatistics,
            ProgramSponsorStatistics,
            Analytics,
            ProgramDistribution,
            Currency,
            ConversionResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "dataset", description = "Whole-dataset access"),
        (name = "students", description = "Program and student management"),
        (name = "sponsors", description = "Sponsor registry management"),
        (name = "expenses", description = "Expense management"),
        (name = "events", description = "Organization event log"),
        (name = "import", description = "Bulk import of spreadsheet data"),
        (name = "reports", description = "Derived financial reports"),
        (name = "convert", description = "Currency conversion"),
    ),
    info(
        title = "SponsorTrack API",
        description = "Child-sponsorship tracking API - students, sponsors, expenses and live financial metadata",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;

use axum::{extract::State, response::Json};
use common::{Analytics, FinancialSummary, FundingGapReport, SponsorStatistics};
use model::entities::Dataset;
use tracing::{debug, instrument, trace};

use crate::schemas::{ApiResponse, AppState, CachedReport};

/// Looks a report up in the cache, building and caching it on a miss.
///
/// Keys carry the dataset revision, so a report is never served for a
/// dataset other than the one it was built from.
async fn cached_report<T>(
    state: &AppState,
    name: &str,
    extract: fn(CachedReport) -> Option<T>,
    build: fn(&Dataset) -> T,
    wrap: fn(T) -> CachedReport,
) -> (T, bool)
where
    T: Clone,
{
    let (revision, dataset) = state.repository.versioned_snapshot().await;
    let cache_key = format!("{}:{}", name, revision);

    if let Some(report) = state.cache.get(&cache_key).await.and_then(extract) {
        trace!("Cache hit for {}", cache_key);
        return (report, true);
    }

    debug!("Building {} report for revision {}", name, revision);
    let report = build(&dataset);
    state.cache.insert(cache_key, wrap(report.clone())).await;
    (report, false)
}

fn respond<T>(data: T, title: &str, from_cache: bool) -> Json<ApiResponse<T>> {
    let message = if from_cache {
        format!("{} retrieved from cache", title)
    } else {
        format!("{} retrieved successfully", title)
    };
    Json(ApiResponse {
        data,
        message,
        success: true,
    })
}

/// Monthly income against monthly costs, in EUR and UGX
#[utoipa::path(
    get,
    path = "/api/v1/reports/financial-summary",
    tag = "reports",
    responses(
        (status = 200, description = "Financial summary retrieved successfully", body = ApiResponse<FinancialSummary>)
    )
)]
#[instrument]
pub async fn get_financial_summary(State(state): State<AppState>) -> Json<ApiResponse<FinancialSummary>> {
    let (report, from_cache) = cached_report(
        &state,
        "financial-summary",
        |cached| match cached {
            CachedReport::FinancialSummary(report) => Some(report),
            _ => None,
        },
        compute::reports::financial_summary,
        CachedReport::FinancialSummary,
    )
    .await;
    respond(report, "Financial summary", from_cache)
}

/// Per-program monthly costs against sponsor funding
#[utoipa::path(
    get,
    path = "/api/v1/reports/funding-gap",
    tag = "reports",
    responses(
        (status = 200, description = "Funding gap retrieved successfully", body = ApiResponse<FundingGapReport>)
    )
)]
#[instrument]
pub async fn get_funding_gap(State(state): State<AppState>) -> Json<ApiResponse<FundingGapReport>> {
    let (report, from_cache) = cached_report(
        &state,
        "funding-gap",
        |cached| match cached {
            CachedReport::FundingGap(report) => Some(report),
            _ => None,
        },
        compute::reports::funding_gap,
        CachedReport::FundingGap,
    )
    .await;
    respond(report, "Funding gap", from_cache)
}

/// Sponsor counts and funding per program and overall
#[utoipa::path(
    get,
    path = "/api/v1/reports/sponsor-statistics",
    tag = "reports",
    responses(
        (status = 200, description = "Sponsor statistics retrieved successfully", body = ApiResponse<SponsorStatistics>)
    )
)]
#[instrument]
pub async fn get_sponsor_statistics(State(state): State<AppState>) -> Json<ApiResponse<SponsorStatistics>> {
    let (report, from_cache) = cached_report(
        &state,
        "sponsor-statistics",
        |cached| match cached {
            CachedReport::SponsorStatistics(report) => Some(report),
            _ => None,
        },
        compute::reports::sponsor_statistics,
        CachedReport::SponsorStatistics,
    )
    .await;
    respond(report, "Sponsor statistics", from_cache)
}

/// Package, category and expense distributions
#[utoipa::path(
    get,
    path = "/api/v1/reports/analytics",
    tag = "reports",
    responses(
        (status = 200, description = "Analytics retrieved successfully", body = ApiResponse<Analytics>)
    )
)]
#[instrument]
pub async fn get_analytics(State(state): State<AppState>) -> Json<ApiResponse<Analytics>> {
    let (report, from_cache) = cached_report(
        &state,
        "analytics",
        |cached| match cached {
            CachedReport::Analytics(report) => Some(report),
            _ => None,
        },
        compute::reports::analytics,
        CachedReport::Analytics,
    )
    .await;
    respond(report, "Analytics", from_cache)
}

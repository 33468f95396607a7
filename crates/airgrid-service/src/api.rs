//! REST API endpoints.
//!
//! Routes are grouped by the role that uses them. Role checks happen in the
//! workflow services, so a wrong role yields 403 regardless of the path.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use tracing::error;

use airgrid_core::{
    AssignRequest, AssignmentResult, FeedbackFilter, FeedbackRequest, InspectorRequest,
    MeasurementRequest, MeasurementResult, NotAssignableReason, Page,
};
use airgrid_store::MeasurementQuery;
use airgrid_types::{
    Availability, City, Feedback, FeedbackState, Inspector, Measurement, PollutantRange, Province,
    Region, wire,
};

use crate::auth::Caller;
use crate::state::AppState;

/// Create the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(health))
        // Read-only lookups
        .route("/api/public/levels", get(list_levels))
        .route("/api/public/measurements", get(list_measurements))
        .route("/api/public/provinces", get(list_provinces))
        .route("/api/public/provinces/{id}/cities", get(list_cities))
        // Supervisors
        .route(
            "/api/supervisor/feedback",
            post(submit_feedback).get(list_own_feedback),
        )
        // Administrators
        .route("/api/admin/feedback", get(list_all_feedback))
        .route("/api/admin/feedback/assign", post(assign_feedback))
        .route(
            "/api/admin/inspectors",
            post(register_inspector).get(list_inspectors),
        )
        .route(
            "/api/admin/inspectors/{id}/availability",
            put(set_inspector_availability),
        )
        // Inspectors
        .route("/api/inspector/tasks", get(inspector_tasks))
        .route("/api/inspector/measurements", post(submit_measurement))
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub uptime_secs: i64,
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let now = OffsetDateTime::now_utc();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: now,
        uptime_secs: (now - state.started_at).whole_seconds(),
    })
}

/// Paginated response wrapper.
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata.
#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    /// Number of items returned.
    pub count: usize,
    /// Offset from the beginning.
    pub offset: u32,
    /// Maximum items requested (if specified).
    pub limit: Option<u32>,
    /// Whether there are more items available.
    pub has_more: bool,
}

/// Common `limit` / `offset` query parameters.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct PageParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Upper bound on `limit`.
pub const MAX_PAGE_SIZE: u32 = 1000;

impl PageParams {
    fn validate(&self) -> Result<(), AppError> {
        if let Some(limit) = self.limit
            && (limit == 0 || limit > MAX_PAGE_SIZE)
        {
            return Err(AppError::BadRequest(format!(
                "limit must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        Ok(())
    }

    /// Page to request from the store: one extra row tells whether more exist.
    fn probe(&self) -> Page {
        Page {
            limit: self.limit.map(|l| l + 1),
            offset: self.offset,
        }
    }

    fn respond<T>(&self, mut data: Vec<T>) -> PaginatedResponse<T> {
        let has_more = self.limit.is_some_and(|l| data.len() > l as usize);
        if let Some(limit) = self.limit {
            data.truncate(limit as usize);
        }
        PaginatedResponse {
            pagination: PaginationMeta {
                count: data.len(),
                offset: self.offset.unwrap_or(0),
                limit: self.limit,
                has_more,
            },
            data,
        }
    }
}

fn parse_state(code: Option<u8>) -> Result<Option<FeedbackState>, AppError> {
    code.map(|c| FeedbackState::try_from(i64::from(c)))
        .transpose()
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

fn parse_date(value: Option<&str>) -> Result<Option<Date>, AppError> {
    value
        .map(wire::parse_date)
        .transpose()
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

/// Every classification level with its bounds and guidance.
async fn list_levels(State(state): State<Arc<AppState>>) -> Json<Vec<PollutantRange>> {
    Json(state.services.directory.levels().to_vec())
}

/// Query parameters for confirmed measurements.
#[derive(Debug, Default, Deserialize)]
pub struct MeasurementsParams {
    pub province_id: Option<i64>,
    pub city_id: Option<i64>,
    /// `YYYY-MM-DD`, inclusive.
    pub since: Option<String>,
    /// `YYYY-MM-DD`, inclusive.
    pub until: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl MeasurementsParams {
    fn page(&self) -> PageParams {
        PageParams {
            limit: self.limit,
            offset: self.offset,
        }
    }
}

/// Confirmed measurements, newest first.
///
/// # Errors
///
/// - Returns [`AppError::BadRequest`] for malformed dates, `since > until`
///   or an out-of-range `limit`
async fn list_measurements(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MeasurementsParams>,
) -> Result<Json<PaginatedResponse<Measurement>>, AppError> {
    let page = params.page();
    page.validate()?;
    let since = parse_date(params.since.as_deref())?;
    let until = parse_date(params.until.as_deref())?;
    if let (Some(since), Some(until)) = (since, until)
        && since > until
    {
        return Err(AppError::BadRequest(format!(
            "since ({since}) must not be after until ({until})"
        )));
    }

    let probe = page.probe();
    let mut query = MeasurementQuery::new();
    query.province_id = params.province_id;
    query.city_id = params.city_id;
    query.since = since;
    query.until = until;
    query.limit = probe.limit;
    query.offset = probe.offset;

    let measurements = state.services.directory.measurements(query).await?;
    Ok(Json(page.respond(measurements)))
}

async fn list_provinces(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Province>>, AppError> {
    Ok(Json(state.services.directory.provinces().await?))
}

async fn list_cities(
    State(state): State<Arc<AppState>>,
    Path(province_id): Path<i64>,
) -> Result<Json<Vec<City>>, AppError> {
    Ok(Json(state.services.directory.cities(province_id).await?))
}

/// File a new report. Supervisors only.
async fn submit_feedback(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    Json(request): Json<FeedbackRequest>,
) -> Result<(StatusCode, Json<Feedback>), AppError> {
    let feedback = state.services.feedback.submit(&caller, request).await?;
    Ok((StatusCode::CREATED, Json(feedback)))
}

async fn list_own_feedback(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    Query(params): Query<PageParams>,
) -> Result<Json<PaginatedResponse<Feedback>>, AppError> {
    params.validate()?;
    let feedback = state
        .services
        .feedback
        .list_own(&caller, params.probe())
        .await?;
    Ok(Json(params.respond(feedback)))
}

/// Query parameters for the administrator feedback listing.
#[derive(Debug, Default, Deserialize)]
pub struct FeedbackParams {
    pub province_id: Option<i64>,
    pub city_id: Option<i64>,
    /// State code: 0 unassigned, 1 assigned, 2 confirmed.
    pub state: Option<u8>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl FeedbackParams {
    fn page(&self) -> PageParams {
        PageParams {
            limit: self.limit,
            offset: self.offset,
        }
    }
}

async fn list_all_feedback(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    Query(params): Query<FeedbackParams>,
) -> Result<Json<PaginatedResponse<Feedback>>, AppError> {
    let page = params.page();
    page.validate()?;
    let filter = FeedbackFilter {
        province_id: params.province_id,
        city_id: params.city_id,
        state: parse_state(params.state)?,
    };
    let feedback = state
        .services
        .feedback
        .list_all(&caller, filter, page.probe())
        .await?;
    Ok(Json(page.respond(feedback)))
}

/// Bind a report to an inspector. Administrators only.
async fn assign_feedback(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    Json(request): Json<AssignRequest>,
) -> Result<Json<AssignmentResult>, AppError> {
    Ok(Json(state.services.assignment.assign(&caller, request).await?))
}

async fn register_inspector(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    Json(request): Json<InspectorRequest>,
) -> Result<(StatusCode, Json<Inspector>), AppError> {
    let inspector = state.services.roster.register(&caller, request).await?;
    Ok((StatusCode::CREATED, Json(inspector)))
}

/// Optional region filter for the roster. Both ids are required together.
#[derive(Debug, Default, Deserialize)]
pub struct RegionParams {
    pub province_id: Option<i64>,
    pub city_id: Option<i64>,
}

async fn list_inspectors(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    Query(params): Query<RegionParams>,
) -> Result<Json<Vec<Inspector>>, AppError> {
    let region = match (params.province_id, params.city_id) {
        (Some(p), Some(c)) => Some(Region::new(p, c)),
        (None, None) => None,
        _ => {
            return Err(AppError::BadRequest(
                "province_id and city_id must be given together".to_string(),
            ));
        }
    };
    Ok(Json(state.services.roster.list(&caller, region).await?))
}

/// Request body for availability changes.
#[derive(Debug, Deserialize)]
pub struct AvailabilityRequest {
    pub availability: Availability,
}

async fn set_inspector_availability(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    Path(inspector_id): Path<i64>,
    Json(request): Json<AvailabilityRequest>,
) -> Result<Json<Inspector>, AppError> {
    let inspector = state
        .services
        .roster
        .set_availability(&caller, inspector_id, request.availability)
        .await?;
    Ok(Json(inspector))
}

/// Query parameters for an inspector's task list.
#[derive(Debug, Default, Deserialize)]
pub struct TaskParams {
    /// 1 assigned, 2 confirmed.
    pub state: Option<u8>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl TaskParams {
    fn page(&self) -> PageParams {
        PageParams {
            limit: self.limit,
            offset: self.offset,
        }
    }
}

async fn inspector_tasks(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    Query(params): Query<TaskParams>,
) -> Result<Json<PaginatedResponse<Feedback>>, AppError> {
    let page = params.page();
    page.validate()?;
    let tasks = state
        .services
        .feedback
        .inspector_tasks(&caller, parse_state(params.state)?, page.probe())
        .await?;
    Ok(Json(page.respond(tasks)))
}

/// Record a reading. Inspectors only.
async fn submit_measurement(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    Json(request): Json<MeasurementRequest>,
) -> Result<(StatusCode, Json<MeasurementResult>), AppError> {
    let result = state.services.measurement.submit(&caller, request).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// No caller identity on a request that needs one.
    Unauthorized(String),
    BadRequest(String),
    Core(airgrid_core::Error),
}

impl From<airgrid_core::Error> for AppError {
    fn from(e: airgrid_core::Error) -> Self {
        AppError::Core(e)
    }
}

/// Status and stable error code for a workflow failure.
fn classify_error(e: &airgrid_core::Error) -> (StatusCode, &'static str) {
    use airgrid_core::Error;

    match e {
        Error::InvalidMeasurementInput(_) => (StatusCode::BAD_REQUEST, "InvalidMeasurementInput"),
        Error::InvalidFeedbackInput(_) => (StatusCode::BAD_REQUEST, "InvalidFeedbackInput"),
        Error::InvalidInspectorInput(_) => (StatusCode::BAD_REQUEST, "InvalidInspectorInput"),
        Error::Forbidden { .. } => (StatusCode::FORBIDDEN, "Forbidden"),
        Error::FeedbackNotFound(_) => (StatusCode::NOT_FOUND, "FeedbackNotFound"),
        Error::InspectorNotFound(_) => (StatusCode::NOT_FOUND, "InspectorNotFound"),
        Error::FeedbackNotAssignable {
            reason: NotAssignableReason::NotFound,
            ..
        } => (StatusCode::NOT_FOUND, "FeedbackNotAssignable"),
        Error::FeedbackNotAssignable { .. } => (StatusCode::CONFLICT, "FeedbackNotAssignable"),
        Error::InvalidStateTransition { .. } => (StatusCode::CONFLICT, "InvalidStateTransition"),
        Error::Conflict(_) => (StatusCode::CONFLICT, "Conflict"),
        Error::InspectorUnavailable(_) => (StatusCode::UNPROCESSABLE_ENTITY, "InspectorUnavailable"),
        Error::InspectorMismatch { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "InspectorMismatch"),
        Error::RegionMismatch { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "RegionMismatch"),
        Error::ClassificationFailed(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "ClassificationFailed")
        }
        Error::StoreUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "StoreUnavailable"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal"),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = match self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "Unauthorized", msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BadRequest", msg),
            AppError::Core(e) => {
                let (status, code) = classify_error(&e);
                if status.is_server_error() {
                    error!(code, "Request failed: {}", e);
                }
                (status, code, e.to_string())
            }
        };

        let body = serde_json::json!({
            "error": message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}

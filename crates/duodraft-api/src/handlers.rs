//! HTTP request handlers for the pairing history API.
//!
//! Paths live under `/api/pairHistory`; `/health` sits at the root.

use crate::dto::{
    ErrorResponse, HealthResponse, ListQuery, RebuildResponse, RoundListResponse, RoundResponse,
    RoundWithHistoryResponse, SaveRoundRequest, ViewQuery,
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router as AxumRouter,
};
use duodraft_domain::traits::RoundPage;
use duodraft_domain::{IdError, NewRound, RoundId, TeacherId};
use duodraft_history::{HistoryError, PairHistoryService};
use duodraft_store::SqliteStore;
use thiserror::Error;
use tracing::debug;

/// Base path for pairing history routes
pub const BASE_PATH: &str = "/api/pairHistory";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Pairing history service over the SQLite store
    pub service: PairHistoryService<SqliteStore>,
}

impl AppState {
    /// Wrap a service
    pub fn new(service: PairHistoryService<SqliteStore>) -> Self {
        Self { service }
    }
}

/// Application error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Service error
    #[error(transparent)]
    History(#[from] HistoryError),

    /// Malformed identifier in the request path
    #[error("Invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// Request body is not valid JSON or does not match the expected shape
    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::InvalidId(e) => (StatusCode::BAD_REQUEST, format!("Invalid identifier: {}", e)),
            ApiError::InvalidBody(e) => (StatusCode::BAD_REQUEST, e.body_text()),
            ApiError::History(e) => match e {
                HistoryError::Validation(v) => (StatusCode::BAD_REQUEST, v.to_string()),
                HistoryError::NoHistory { .. } | HistoryError::RoundNotFound { .. } => {
                    (StatusCode::NOT_FOUND, "No pair history found".to_string())
                }
                HistoryError::StorageTimeout { .. } => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Pair history storage is not responding".to_string(),
                ),
                HistoryError::Storage { .. } | HistoryError::IndexInconsistency { .. } => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to process pair history".to_string(),
                ),
            },
        };

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

/// POST /api/pairHistory - Save a round
async fn save_round(
    State(state): State<AppState>,
    payload: Result<Json<SaveRoundRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RoundResponse>), ApiError> {
    let Json(request) = payload?;
    let new_round = NewRound::try_from(request).map_err(HistoryError::from)?;
    let round = state.service.save_round(new_round).await?;
    Ok((StatusCode::CREATED, Json(RoundResponse::from(&round))))
}

/// GET /api/pairHistory/:teacherId - Latest round with history
async fn latest_with_history(
    State(state): State<AppState>,
    Path(teacher_id): Path<String>,
) -> Result<Json<RoundWithHistoryResponse>, ApiError> {
    let teacher = TeacherId::parse(&teacher_id)?;
    let found = state.service.latest_with_history(&teacher).await?;
    Ok(Json(RoundWithHistoryResponse::from(&found)))
}

/// GET /api/pairHistory/list/:teacherId - Paged round summaries
async fn list_rounds(
    State(state): State<AppState>,
    Path(teacher_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<RoundListResponse>, ApiError> {
    let teacher = TeacherId::parse(&teacher_id)?;
    let page = RoundPage {
        offset: query.offset.unwrap_or(0),
        limit: query.limit,
    };
    let listing = state.service.list_rounds(&teacher, page).await?;
    debug!(total = listing.total, returned = listing.rounds.len(), "rounds listed");
    Ok(Json(RoundListResponse::from(&listing)))
}

/// GET /api/pairHistory/:teacherId/:historyId - One round with history
async fn round_with_history(
    State(state): State<AppState>,
    Path((teacher_id, history_id)): Path<(String, String)>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<RoundWithHistoryResponse>, ApiError> {
    let teacher = TeacherId::parse(&teacher_id)?;
    let round_id = RoundId::parse(&history_id)?;
    let found = state
        .service
        .round_with_history(&teacher, round_id, query.view.into())
        .await?;
    Ok(Json(RoundWithHistoryResponse::from(&found)))
}

/// POST /api/pairHistory/:teacherId/rebuild - Replay a teacher's ledger
async fn rebuild_index(
    State(state): State<AppState>,
    Path(teacher_id): Path<String>,
) -> Result<Json<RebuildResponse>, ApiError> {
    let teacher = TeacherId::parse(&teacher_id)?;
    let report = state.service.rebuild_index(&teacher).await?;
    Ok(Json(RebuildResponse::from(&report)))
}

/// GET /health - Storage reachability and index lag
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.service.pending_index_count().await {
        Ok(0) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy".to_string(),
                unindexed_rounds: Some(0),
            }),
        ),
        Ok(pending) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "degraded".to_string(),
                unindexed_rounds: Some(pending),
            }),
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "unhealthy".to_string(),
                unindexed_rounds: None,
            }),
        ),
    }
}

/// Create the axum router with all routes
pub fn create_router(state: AppState) -> AxumRouter {
    let history = AxumRouter::new()
        .route("/", post(save_round))
        .route("/list/:teacherId", get(list_rounds))
        .route("/:teacherId", get(latest_with_history))
        .route("/:teacherId/rebuild", post(rebuild_index))
        .route("/:teacherId/:historyId", get(round_with_history));

    AxumRouter::new()
        .nest(BASE_PATH, history)
        .route("/health", get(health_check))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use duodraft_history::HistoryConfig;
    use tower::ServiceExt; // for oneshot

    fn create_test_state() -> AppState {
        let store = SqliteStore::new(":memory:").unwrap();
        AppState::new(PairHistoryService::new(store, HistoryConfig::default()))
    }

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_error_status_mapping() {
        let teacher = TeacherId::parse("64b7f0c2a1e4d3b2c1a09f8e").unwrap();

        assert_eq!(
            status_of(HistoryError::NoHistory { teacher_id: teacher.clone() }.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(
                HistoryError::Validation(duodraft_domain::ValidationError::EmptyPairs).into()
            ),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(HistoryError::StorageTimeout { operation: "resolve" }.into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(
                HistoryError::IndexInconsistency {
                    teacher_id: teacher,
                    round_id: RoundId::new(),
                    message: "disk full".to_string(),
                }
                .into()
            ),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(TeacherId::parse("nope").unwrap_err().into()),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_internal_errors_hide_details() {
        let err: ApiError = HistoryError::Storage {
            operation: "merge",
            message: "database disk image is malformed".to_string(),
        }
        .into();
        let response = err.into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let parsed: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.error, "Failed to process pair history");
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = create_router(create_test_state());

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_latest_unknown_teacher() {
        let app = create_router(create_test_state());

        let request = Request::builder()
            .uri("/api/pairHistory/64b7f0c2a1e4d3b2c1a09f8e")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

//! Semantic cache endpoint handlers

use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Router,
};
use tracing::{debug, info};

use crate::api::state::AppState;
use crate::api::types::{
    ApiError, ApiResponse, InsertionData, InsertionRequest, Json, RefreshData, SearchData,
    StatsData, VectorizeData,
};

pub fn create_cache_router() -> Router<AppState> {
    Router::new()
        .route("/vectorize/{text}", get(vectorize))
        .route("/insertion/{text}", post(insert))
        .route("/search/{text}", post(search))
        .route("/refresh/", delete(refresh))
        .route("/stats", get(stats))
}

/// GET /api/vectorize/{text}
pub async fn vectorize(
    State(state): State<AppState>,
    Path(text): Path<String>,
) -> Result<Json<ApiResponse<VectorizeData>>, ApiError> {
    debug!(chars = text.len(), "Vectorizing text");

    let vector = state.cache.vectorize(&text).await?;

    Ok(Json(ApiResponse::new(
        "embeddings created successfully",
        VectorizeData { response: vector },
    )))
}

/// POST /api/insertion/{text}
pub async fn insert(
    State(state): State<AppState>,
    Path(text): Path<String>,
    Json(request): Json<InsertionRequest>,
) -> Result<Json<ApiResponse<InsertionData>>, ApiError> {
    let record = state
        .cache
        .insert(&text, request.embedding, request.metadata)
        .await?;

    Ok(Json(ApiResponse::new(
        "data saved in vector database",
        InsertionData {
            response: format!("embeddings of {} saved", text),
            id: record.id(),
        },
    )))
}

/// POST /api/search/{text}
///
/// The query is stored whether or not it hits.
pub async fn search(
    State(state): State<AppState>,
    Path(text): Path<String>,
) -> Result<Json<ApiResponse<SearchData>>, ApiError> {
    let decision = state.cache.lookup(&text, None).await?;

    debug!(
        verdict = decision.verdict.as_str(),
        distance = ?decision.distance,
        "Search completed"
    );

    Ok(Json(ApiResponse::new(
        "data saved in vector database",
        SearchData::from(&decision),
    )))
}

/// DELETE /api/refresh/
pub async fn refresh(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<RefreshData>>, ApiError> {
    let report = state.refresh.refresh().await?;

    info!(exported = report.exported, "Refresh requested over HTTP");

    Ok(Json(ApiResponse::new(
        "database refreshed",
        RefreshData {
            response: None,
            exported: report.exported,
        },
    )))
}

/// GET /api/stats
pub async fn stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<StatsData>>, ApiError> {
    let stats = state.cache.stats().await?;

    Ok(Json(ApiResponse::new("cache statistics", StatsData::from(stats))))
}

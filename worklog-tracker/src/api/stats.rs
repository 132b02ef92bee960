//! Aggregated time statistics
//!
//! Only closed logs are counted. Store failures surface as HTTP 500.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use super::ApiError;
use crate::aggregate::{self, DailyStat, ProjectStat, UserStat};
use crate::AppState;

/// Total for a single project or user
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalResponse {
    pub id: String,
    pub total_seconds: i64,
}

/// GET /api/workflow/stats
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<Vec<ProjectStat>>, ApiError> {
    Ok(Json(aggregate::project_totals(state.store.pool()).await?))
}

/// GET /api/workflow/leaderboard
pub async fn get_leaderboard(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserStat>>, ApiError> {
    let stats = aggregate::leaderboard(state.store.pool(), state.directory.as_deref()).await?;
    Ok(Json(stats))
}

/// GET /api/workflow/timeline
pub async fn get_timeline(State(state): State<AppState>) -> Result<Json<Vec<DailyStat>>, ApiError> {
    Ok(Json(aggregate::timeline(state.store.pool()).await?))
}

/// GET /api/workflow/projects/:project_id/total
pub async fn get_project_total(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<TotalResponse>, ApiError> {
    let total_seconds = aggregate::project_total(state.store.pool(), &project_id).await?;
    Ok(Json(TotalResponse {
        id: project_id,
        total_seconds,
    }))
}

/// GET /api/workflow/users/:user_id/total
pub async fn get_user_total(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<TotalResponse>, ApiError> {
    let total_seconds = aggregate::user_total(state.store.pool(), &user_id).await?;
    Ok(Json(TotalResponse {
        id: user_id,
        total_seconds,
    }))
}

//! Registered project listing

use axum::{extract::State, Json};
use serde::Serialize;

use super::ApiError;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub id: String,
    pub channel_id: String,
    pub name: String,
}

/// GET /api/workflow/projects
pub async fn list_projects(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProjectResponse>>, ApiError> {
    let projects = state.store.list_projects().await?;

    Ok(Json(
        projects
            .into_iter()
            .map(|p| ProjectResponse {
                id: p.id,
                channel_id: p.channel_id,
                name: p.name,
            })
            .collect(),
    ))
}

//! HTTP API handlers for the work-log tracker

pub mod health;
pub mod projects;
pub mod stats;

pub use health::health_routes;
pub use projects::list_projects;
pub use stats::{get_leaderboard, get_project_total, get_stats, get_timeline, get_user_total};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Error returned by API handlers as `{ "error": message }`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<worklog_common::Error> for ApiError {
    fn from(err: worklog_common::Error) -> Self {
        use worklog_common::Error;

        let status = match &err {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("API request failed: {}", self.message);
        }

        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

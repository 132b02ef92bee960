//! worklog-tracker library
//!
//! Tracks time users spend in project voice channels and serves aggregated
//! statistics over the resulting work logs.

use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod aggregate;
pub mod api;
pub mod directory;
pub mod discord;
pub mod presence;
pub mod store;

use directory::UserDirectory;
use store::SqliteStore;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Project and work-log storage (handlers only read)
    pub store: SqliteStore,
    /// Optional user-name resolver for the leaderboard
    pub directory: Option<Arc<dyn UserDirectory>>,
    /// Whether voice events are being ingested (reported by /health)
    pub tracking: bool,
}

impl AppState {
    pub fn new(store: SqliteStore, directory: Option<Arc<dyn UserDirectory>>) -> Self {
        Self {
            store,
            directory,
            tracking: false,
        }
    }

    pub fn with_tracking(mut self, tracking: bool) -> Self {
        self.tracking = tracking;
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::http::Method;
    use axum::routing::get;

    let workflow = Router::new()
        .route("/stats", get(api::get_stats))
        .route("/leaderboard", get(api::get_leaderboard))
        .route("/timeline", get(api::get_timeline))
        .route("/projects", get(api::list_projects))
        .route("/projects/:project_id/total", get(api::get_project_total))
        .route("/users/:user_id/total", get(api::get_user_total));

    // Dashboards poll these endpoints from other origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET]);

    Router::new()
        .nest("/api/workflow", workflow)
        .merge(api::health_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::{api, events::ProgressNotifier, progress::ProgressService};

#[derive(Clone)]
pub struct AppState {
    pub database: SqlitePool,
    pub service: ProgressService,
    pub notifier: ProgressNotifier,
}

impl AppState {
    pub fn new(database: SqlitePool, notifier: ProgressNotifier) -> Self {
        let service = ProgressService::new(database.clone(), notifier.clone());
        Self {
            database,
            service,
            notifier,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/users/{user_id}/lessons/{lesson_id}/progress",
            post(api::update_lesson_progress),
        )
        .route(
            "/api/users/{user_id}/assessments/{assessment_id}/progress",
            post(api::update_assessment_progress),
        )
        .route("/api/users/{user_id}/progress", get(api::list_user_progress))
        .route(
            "/api/users/{user_id}/progress/{item_type}/{item_id}",
            get(api::get_progress),
        )
        .route("/api/events", get(api::progress_events))
        .route("/api-docs/openapi.json", get(api::openapi_json))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .with_state(state)
}

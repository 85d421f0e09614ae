use crate::handlers;
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/windows", get(handlers::get_windows))
        .route("/api/windows/:id", get(handlers::get_window))
        .route("/api/status", get(handlers::get_status))
        .with_state(state)
}

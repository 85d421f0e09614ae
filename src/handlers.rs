use crate::errors::AppError;
use crate::models::{BoardSnapshot, ChartView, LinkStatus, SubjectId};
use crate::state::AppState;
use crate::ui::render_index;
use axum::{
    extract::{Path, State},
    response::Html,
    Json,
};

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let snapshot = state.board.snapshot();
    Html(render_index(&snapshot))
}

pub async fn get_windows(State(state): State<AppState>) -> Json<BoardSnapshot> {
    Json(state.board.snapshot())
}

pub async fn get_window(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ChartView>, AppError> {
    let id = SubjectId::new(id);
    let board = state.board.lock();
    board
        .chart(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("no chart for sensor {id}")))
}

pub async fn get_status(State(state): State<AppState>) -> Json<LinkStatus> {
    Json(state.board.lock().status().clone())
}

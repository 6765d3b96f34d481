use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    application::{countdowns::CountdownLine, village::local_now},
    domain::{
        repository::{TaskRepository, TimeEntryRepository},
        task::ClockTime,
    },
    http::{state::AppState, types::ApiError},
};

pub fn router<T: TaskRepository, E: TimeEntryRepository>(state: AppState<T, E>) -> Router {
    Router::new()
        .route("/countdowns", get(list_countdowns::<T, E>).post(add_countdown::<T, E>))
        .route("/countdowns/:id", delete(remove_countdown::<T, E>))
        .with_state(state)
}

async fn list_countdowns<T: TaskRepository, E: TimeEntryRepository>(State(state): State<AppState<T, E>>) -> Json<Value> {
    let lines = state.countdowns.lock().await.render(local_now());
    Json(json!({ "items": lines }))
}

#[derive(Deserialize)]
struct NewCountdown {
    title: String,
    #[serde(default)]
    date: Option<NaiveDate>,
    #[serde(default)]
    time: Option<ClockTime>,
}

async fn add_countdown<T: TaskRepository, E: TimeEntryRepository>(
    State(state): State<AppState<T, E>>,
    Json(body): Json<NewCountdown>,
) -> Result<(StatusCode, Json<CountdownLine>), ApiError> {
    let mut board = state.countdowns.lock().await;
    let added = board.add(&body.title, body.date, body.time.map(|t| t.0))?;
    tracing::info!(id = %added.id, "countdown added");
    let line = board
        .render(local_now())
        .into_iter()
        .find(|line| line.countdown.id == added.id)
        .ok_or_else(ApiError::not_found)?;
    Ok((StatusCode::CREATED, Json(line)))
}

async fn remove_countdown<T: TaskRepository, E: TimeEntryRepository>(
    State(state): State<AppState<T, E>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.countdowns.lock().await.remove(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

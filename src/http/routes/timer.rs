use axum::{extract::State, routing::{get, post}, Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    application::timer::{StartOutcome, TimerSnapshot},
    domain::{
        repository::{TaskRepository, TimeEntryRepository},
        task::TaskId,
    },
    http::{state::AppState, types::ApiError},
};

pub fn router<T: TaskRepository, E: TimeEntryRepository>(state: AppState<T, E>) -> Router {
    Router::new()
        .route("/timer", get(timer_status::<T, E>))
        .route("/timer/start", post(start_timer::<T, E>))
        .route("/timer/stop", post(stop_timer::<T, E>))
        .route("/time-entries/today", get(todays_entries::<T, E>))
        .with_state(state)
}

async fn timer_status<T: TaskRepository, E: TimeEntryRepository>(
    State(state): State<AppState<T, E>>,
) -> Result<Json<TimerSnapshot>, ApiError> {
    let now = Utc::now();
    state.timer.refresh_entries_at(now).await?;
    Ok(Json(state.timer.snapshot_at(now).await))
}

#[derive(Deserialize)]
struct StartBody {
    task_id: TaskId,
}

async fn start_timer<T: TaskRepository, E: TimeEntryRepository>(
    State(state): State<AppState<T, E>>,
    Json(body): Json<StartBody>,
) -> Result<Json<Value>, ApiError> {
    state.tasks.require(body.task_id).await?;
    match state.timer.start(body.task_id).await? {
        StartOutcome::Started(entry) => {
            let now = Utc::now();
            state.timer.refresh_entries_at(now).await?;
            Ok(Json(json!({ "entry": entry, "timer": state.timer.snapshot_at(now).await })))
        }
        StartOutcome::AlreadyRunning { active_task } => {
            Err(ApiError::conflict(format!("a timer is already running for task {active_task}")))
        }
    }
}

async fn stop_timer<T: TaskRepository, E: TimeEntryRepository>(
    State(state): State<AppState<T, E>>,
) -> Result<Json<Value>, ApiError> {
    let now = Utc::now();
    let stopped = state.timer.stop_at(now).await?;
    Ok(Json(json!({ "stopped": stopped, "timer": state.timer.snapshot_at(now).await })))
}

async fn todays_entries<T: TaskRepository, E: TimeEntryRepository>(
    State(state): State<AppState<T, E>>,
) -> Result<Json<Value>, ApiError> {
    let entries = state.timer.refresh_entries().await?;
    Ok(Json(json!({ "items": entries, "total_seconds": state.timer.today_total().await })))
}

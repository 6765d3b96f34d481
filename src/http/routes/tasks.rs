use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::parse_task_id;
use crate::{
    domain::{
        repository::{TaskRepository, TimeEntryRepository},
        task::{NewTask, Task, TaskPatch, TaskStatus},
    },
    http::{state::AppState, types::ApiError},
};

pub fn router<T: TaskRepository, E: TimeEntryRepository>(state: AppState<T, E>) -> Router {
    Router::new()
        .route("/tasks", post(create_task::<T, E>).get(list_tasks::<T, E>))
        .route("/tasks/:id", get(get_task::<T, E>).patch(update_task::<T, E>).delete(delete_task::<T, E>))
        .route("/tasks/:id/status", put(set_status::<T, E>))
        .route("/tasks/:id/advance", post(advance_task::<T, E>))
        .with_state(state)
}

async fn create_task<T: TaskRepository, E: TimeEntryRepository>(
    State(state): State<AppState<T, E>>,
    Json(payload): Json<NewTask>,
) -> Result<Json<Task>, ApiError> {
    Ok(Json(state.tasks.create(payload).await?))
}

async fn list_tasks<T: TaskRepository, E: TimeEntryRepository>(
    State(state): State<AppState<T, E>>,
) -> Result<Json<Value>, ApiError> {
    let tasks = state.tasks.list().await?;
    Ok(Json(json!({ "items": tasks, "store_configured": state.tasks.is_configured() })))
}

async fn get_task<T: TaskRepository, E: TimeEntryRepository>(
    State(state): State<AppState<T, E>>,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_task_id(&id)?;
    state.tasks.get(id).await?.map(Json).ok_or_else(ApiError::not_found)
}

async fn update_task<T: TaskRepository, E: TimeEntryRepository>(
    State(state): State<AppState<T, E>>,
    Path(id): Path<String>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_task_id(&id)?;
    if patch.is_empty() {
        return Err(ApiError::bad_request("nothing to update"));
    }
    Ok(Json(state.tasks.update(id, patch).await?))
}

async fn delete_task<T: TaskRepository, E: TimeEntryRepository>(
    State(state): State<AppState<T, E>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_task_id(&id)?;
    state.tasks.delete(id).await?;
    state.timer.release_task(id).await;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct StatusBody {
    status: TaskStatus,
}

async fn set_status<T: TaskRepository, E: TimeEntryRepository>(
    State(state): State<AppState<T, E>>,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_task_id(&id)?;
    Ok(Json(state.tasks.set_status(id, body.status).await?))
}

async fn advance_task<T: TaskRepository, E: TimeEntryRepository>(
    State(state): State<AppState<T, E>>,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_task_id(&id)?;
    Ok(Json(state.tasks.advance(id).await?))
}

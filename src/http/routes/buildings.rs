use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    application::village::{can_track_time, notice_board_schedule, Building, StatusFilter},
    domain::{
        dates,
        repository::{TaskRepository, TimeEntryRepository},
        task::Task,
    },
    http::{state::AppState, types::ApiError},
};

pub fn router<T: TaskRepository, E: TimeEntryRepository>(state: AppState<T, E>) -> Router {
    Router::new().route("/buildings/:building/tasks", get(building_tasks::<T, E>)).with_state(state)
}

#[derive(Deserialize)]
struct FilterQuery {
    #[serde(default)]
    status: StatusFilter,
}

#[derive(Serialize)]
struct BuildingTask {
    #[serde(flatten)]
    task: Task,
    can_track_time: bool,
}

#[derive(Serialize)]
struct BuildingResponse {
    building: Building,
    name: &'static str,
    subtitle: &'static str,
    subcategory_options: &'static [&'static str],
    filter: StatusFilter,
    items: Vec<BuildingTask>,
    /// Notice board only: everything scheduled for today.
    #[serde(skip_serializing_if = "Option::is_none")]
    today: Option<Vec<Task>>,
}

async fn building_tasks<T: TaskRepository, E: TimeEntryRepository>(
    State(state): State<AppState<T, E>>,
    Path(building): Path<String>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<BuildingResponse>, ApiError> {
    let building: Building = building.parse().map_err(ApiError::bad_request)?;
    let tasks = state.tasks.list().await?;
    let items = query
        .status
        .apply(&building.tasks(&tasks))
        .into_iter()
        .map(|task| BuildingTask { can_track_time: can_track_time(&task), task })
        .collect();
    let today = (building == Building::NoticeBoard).then(|| notice_board_schedule(&tasks, dates::today()).today);
    Ok(Json(BuildingResponse {
        building,
        name: building.name(),
        subtitle: building.subtitle(),
        subcategory_options: building.subcategory_options(),
        filter: query.status,
        items,
        today,
    }))
}

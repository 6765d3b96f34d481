use axum::{extract::State, routing::{get, post}, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::{
    application::{
        calendar::NavAction,
        timer::TimerSnapshot,
        village::{local_now, Dashboard},
    },
    domain::{
        dates,
        repository::{TaskRepository, TimeEntryRepository},
        weather::SkyState,
    },
    http::{state::AppState, types::ApiError},
};

pub fn router<T: TaskRepository, E: TimeEntryRepository>(state: AppState<T, E>) -> Router {
    Router::new()
        .route("/dashboard", get(show_dashboard::<T, E>))
        .route("/dashboard/navigate", post(navigate::<T, E>))
        .with_state(state)
}

#[derive(Serialize)]
struct DashboardResponse {
    #[serde(flatten)]
    dashboard: Dashboard,
    timer: TimerSnapshot,
    sky: SkyState,
    store_configured: bool,
}

async fn render<T: TaskRepository, E: TimeEntryRepository>(state: &AppState<T, E>) -> Result<DashboardResponse, ApiError> {
    let tasks = state.tasks.list().await?;
    let view = *state.view.lock().await;
    let countdowns = state.countdowns.lock().await.render(local_now());
    let now = Utc::now();
    state.timer.refresh_entries_at(now).await?;
    Ok(DashboardResponse {
        dashboard: Dashboard::build(&tasks, &view, dates::today(), countdowns),
        timer: state.timer.snapshot_at(now).await,
        sky: state.sky.state().await,
        store_configured: state.tasks.is_configured(),
    })
}

async fn show_dashboard<T: TaskRepository, E: TimeEntryRepository>(
    State(state): State<AppState<T, E>>,
) -> Result<Json<DashboardResponse>, ApiError> {
    Ok(Json(render(&state).await?))
}

async fn navigate<T: TaskRepository, E: TimeEntryRepository>(
    State(state): State<AppState<T, E>>,
    Json(action): Json<NavAction>,
) -> Result<Json<DashboardResponse>, ApiError> {
    state.view.lock().await.apply(action, dates::today());
    tracing::debug!(?action, "calendar navigated");
    Ok(Json(render(&state).await?))
}

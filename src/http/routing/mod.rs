use axum::{routing::get, Router};

use crate::{
    domain::repository::{TaskRepository, TimeEntryRepository},
    http::{
        routes::{buildings, countdowns, dashboard, sky, tasks, timer},
        state::AppState,
    },
};

pub fn app<T: TaskRepository, E: TimeEntryRepository>(state: AppState<T, E>) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(tasks::router(state.clone()))
        .merge(buildings::router(state.clone()))
        .merge(timer::router(state.clone()))
        .merge(dashboard::router(state.clone()))
        .merge(countdowns::router(state.clone()))
        .merge(sky::router(state))
}

use axum::{extract::State, routing::get, Json, Router};

use crate::{
    domain::{
        repository::{TaskRepository, TimeEntryRepository},
        weather::SkyState,
    },
    http::state::AppState,
};

pub fn router<T: TaskRepository, E: TimeEntryRepository>(state: AppState<T, E>) -> Router {
    Router::new().route("/sky", get(current_sky::<T, E>)).with_state(state)
}

async fn current_sky<T: TaskRepository, E: TimeEntryRepository>(State(state): State<AppState<T, E>>) -> Json<SkyState> {
    Json(state.sky.state().await)
}

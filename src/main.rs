use std::time::Duration;

use chrono::{Local, Timelike};
use hamlet::{
    application::{
        sky::{CancelFlag, SkyService},
        tick::Ticker,
    },
    config::AppConfig,
    domain::repository::{TaskRepository, TimeEntryRepository},
    http::{routing, state::AppState},
    infrastructure::{
        local_storage::FileStorage, open_meteo::OpenMeteoClient, sqlite_repo::SqliteStore,
        unconfigured::UnconfiguredStore,
    },
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match config.database_url.clone() {
        Some(database_url) => {
            let store = SqliteStore::connect(&database_url).await?;
            serve(config, store.tasks(), store.time_entries()).await
        }
        None => {
            tracing::warn!("DATABASE_URL is not set; tasks and timers are read-only until a store is configured");
            serve(config, UnconfiguredStore, UnconfiguredStore).await
        }
    }
}

async fn serve<T: TaskRepository, E: TimeEntryRepository>(config: AppConfig, tasks: T, entries: E) -> anyhow::Result<()> {
    tasks.init().await?;
    entries.init().await?;

    let sky = SkyService::new(Local::now().hour());
    let state = AppState::new(tasks, entries, FileStorage::new(config.data_dir.clone()), sky.clone());
    state.tasks.refresh().await?;
    if let Some(task_id) = state.timer.resume().await?.active_task() {
        tracing::info!(%task_id, "timer was left running");
    }

    let _clock = Ticker::spawn(Duration::from_secs(60), {
        let sky = sky.clone();
        move || {
            let sky = sky.clone();
            async move {
                sky.refresh_time_of_day(Local::now().hour()).await;
            }
        }
    });

    let cancel = CancelFlag::default();
    let weather = tokio::spawn({
        let cancel = cancel.clone();
        let client = OpenMeteoClient::new(config.weather_url.clone());
        let coordinates = config.coordinates;
        async move {
            sky.fetch_weather(&client, coordinates, Local::now().hour(), &cancel).await;
        }
    });

    let router = routing::app(state);
    tracing::info!(addr = %config.bind, data_dir = %config.data_dir.display(), "listening");
    axum::serve(tokio::net::TcpListener::bind(config.bind).await?, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cancel.cancel();
    weather.abort();
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal::ctrl_c;
    let _ = ctrl_c().await;
    tracing::info!("shutdown");
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{
    error::StoreError,
    task::{Task, TaskChanges, TaskId, TaskStatus},
    time_entry::{TimeEntry, TimeEntryId},
    weather::{Coordinates, Observation},
};

pub type StoreResult<T> = Result<T, StoreError>;

/// The `tasks` collection of the external store.
#[async_trait]
pub trait TaskRepository: Send + Sync + 'static {
    /// `false` when no store is behind this repository.
    fn is_configured(&self) -> bool { true }
    async fn init(&self) -> StoreResult<()>;
    /// All tasks, newest `created_at` first.
    async fn list(&self) -> StoreResult<Vec<Task>>;
    async fn get(&self, id: TaskId) -> StoreResult<Option<Task>>;
    async fn insert(&self, task: &Task) -> StoreResult<Task>;
    /// Writes `status` and `completed_at` only and returns the stored row.
    async fn set_status(&self, id: TaskId, status: TaskStatus, completed_at: Option<DateTime<Utc>>) -> StoreResult<Task>;
    /// Writes only the columns named in `changes` and returns the stored row.
    async fn patch(&self, id: TaskId, changes: &TaskChanges) -> StoreResult<Task>;
    async fn delete(&self, id: TaskId) -> StoreResult<bool>;
}

/// The `time_entries` collection of the external store.
#[async_trait]
pub trait TimeEntryRepository: Send + Sync + 'static {
    fn is_configured(&self) -> bool { true }
    async fn init(&self) -> StoreResult<()>;
    async fn insert(&self, entry: &TimeEntry) -> StoreResult<TimeEntry>;
    async fn close(&self, id: TimeEntryId, end_time: DateTime<Utc>, duration_seconds: i64) -> StoreResult<TimeEntry>;
    /// Entries with `start_time >= since`, newest first.
    async fn list_since(&self, since: DateTime<Utc>) -> StoreResult<Vec<TimeEntry>>;
    async fn find_open(&self) -> StoreResult<Option<TimeEntry>>;
}

/// Device-local string key/value storage.
pub trait LocalStorage: Send + Sync + 'static {
    fn get(&self, key: &str) -> std::io::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> std::io::Result<()>;
}

impl<S: LocalStorage + ?Sized> LocalStorage for Box<S> {
    fn get(&self, key: &str) -> std::io::Result<Option<String>> { (**self).get(key) }
    fn set(&self, key: &str, value: &str) -> std::io::Result<()> { (**self).set(key, value) }
}

#[derive(Debug, thiserror::Error)]
#[error("weather lookup failed: {0}")]
pub struct WeatherError(pub String);

#[async_trait]
pub trait WeatherProvider: Send + Sync + 'static {
    async fn current(&self, at: Coordinates) -> Result<Observation, WeatherError>;
}

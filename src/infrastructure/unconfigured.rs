use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    error::StoreError,
    repository::{StoreResult, TaskRepository, TimeEntryRepository},
    task::{Task, TaskChanges, TaskId, TaskStatus},
    time_entry::{TimeEntry, TimeEntryId},
};

/// Stands in for the store when no database is configured: reads are empty,
/// writes are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredStore;

#[async_trait]
impl TaskRepository for UnconfiguredStore {
    fn is_configured(&self) -> bool { false }
    async fn init(&self) -> StoreResult<()> { Ok(()) }
    async fn list(&self) -> StoreResult<Vec<Task>> { Ok(Vec::new()) }
    async fn get(&self, _id: TaskId) -> StoreResult<Option<Task>> { Ok(None) }
    async fn insert(&self, _task: &Task) -> StoreResult<Task> { Err(StoreError::Unconfigured) }
    async fn set_status(&self, _id: TaskId, _status: TaskStatus, _at: Option<DateTime<Utc>>) -> StoreResult<Task> {
        Err(StoreError::Unconfigured)
    }
    async fn patch(&self, _id: TaskId, _changes: &TaskChanges) -> StoreResult<Task> { Err(StoreError::Unconfigured) }
    async fn delete(&self, _id: TaskId) -> StoreResult<bool> { Err(StoreError::Unconfigured) }
}

#[async_trait]
impl TimeEntryRepository for UnconfiguredStore {
    fn is_configured(&self) -> bool { false }
    async fn init(&self) -> StoreResult<()> { Ok(()) }
    async fn insert(&self, _entry: &TimeEntry) -> StoreResult<TimeEntry> { Err(StoreError::Unconfigured) }
    async fn close(&self, _id: TimeEntryId, _end: DateTime<Utc>, _duration: i64) -> StoreResult<TimeEntry> {
        Err(StoreError::Unconfigured)
    }
    async fn list_since(&self, _since: DateTime<Utc>) -> StoreResult<Vec<TimeEntry>> { Ok(Vec::new()) }
    async fn find_open(&self) -> StoreResult<Option<TimeEntry>> { Ok(None) }
}

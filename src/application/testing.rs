//! In-memory repositories shared by the application unit tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    error::StoreError,
    repository::{StoreResult, TaskRepository, TimeEntryRepository},
    task::{Task, TaskChanges, TaskId, TaskStatus},
    time_entry::{TimeEntry, TimeEntryId},
};

#[derive(Clone, Default)]
pub struct InMemoryTasks {
    items: Arc<Mutex<HashMap<TaskId, Task>>>,
    failing: Arc<AtomicBool>,
}

impl InMemoryTasks {
    /// Makes every subsequent write fail like an unreachable store.
    pub fn fail_writes(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Failed("network unreachable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskRepository for InMemoryTasks {
    async fn init(&self) -> StoreResult<()> { Ok(()) }

    async fn list(&self) -> StoreResult<Vec<Task>> {
        let mut tasks: Vec<Task> = self.items.lock().unwrap().values().cloned().collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    async fn get(&self, id: TaskId) -> StoreResult<Option<Task>> {
        Ok(self.items.lock().unwrap().get(&id).cloned())
    }

    async fn insert(&self, task: &Task) -> StoreResult<Task> {
        self.check()?;
        self.items.lock().unwrap().insert(task.id, task.clone());
        Ok(task.clone())
    }

    async fn set_status(&self, id: TaskId, status: TaskStatus, completed_at: Option<DateTime<Utc>>) -> StoreResult<Task> {
        self.check()?;
        let mut items = self.items.lock().unwrap();
        let task = items.get_mut(&id).ok_or(StoreError::NotFound)?;
        task.status = status;
        task.completed_at = completed_at;
        Ok(task.clone())
    }

    async fn patch(&self, id: TaskId, changes: &TaskChanges) -> StoreResult<Task> {
        self.check()?;
        let mut items = self.items.lock().unwrap();
        let task = items.get_mut(&id).ok_or(StoreError::NotFound)?;
        changes.apply_to(task);
        Ok(task.clone())
    }

    async fn delete(&self, id: TaskId) -> StoreResult<bool> {
        self.check()?;
        Ok(self.items.lock().unwrap().remove(&id).is_some())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryEntries {
    items: Arc<Mutex<Vec<TimeEntry>>>,
    failing: Arc<AtomicBool>,
}

impl InMemoryEntries {
    /// Makes every subsequent write fail like an unreachable store.
    pub fn fail_writes(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Failed("network unreachable".into()));
        }
        Ok(())
    }

    /// Drops every entry of `task_id`, like the store does when a task is deleted.
    pub fn remove_task(&self, task_id: TaskId) {
        self.items.lock().unwrap().retain(|e| e.task_id != task_id);
    }

    pub fn all(&self) -> Vec<TimeEntry> {
        self.items.lock().unwrap().clone()
    }

    pub fn seed(&self, entry: TimeEntry) {
        self.items.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl TimeEntryRepository for InMemoryEntries {
    async fn init(&self) -> StoreResult<()> { Ok(()) }

    async fn insert(&self, entry: &TimeEntry) -> StoreResult<TimeEntry> {
        self.check()?;
        let mut items = self.items.lock().unwrap();
        if entry.is_open() && items.iter().any(TimeEntry::is_open) {
            return Err(StoreError::Failed("another timer is running".into()));
        }
        items.push(entry.clone());
        Ok(entry.clone())
    }

    async fn close(&self, id: TimeEntryId, end_time: DateTime<Utc>, duration_seconds: i64) -> StoreResult<TimeEntry> {
        self.check()?;
        let mut items = self.items.lock().unwrap();
        let entry = items.iter_mut().find(|e| e.id == id).ok_or(StoreError::NotFound)?;
        entry.end_time = Some(end_time);
        entry.duration_seconds = Some(duration_seconds);
        Ok(entry.clone())
    }

    async fn list_since(&self, since: DateTime<Utc>) -> StoreResult<Vec<TimeEntry>> {
        let mut entries: Vec<TimeEntry> =
            self.items.lock().unwrap().iter().filter(|e| e.start_time >= since).cloned().collect();
        entries.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(entries)
    }

    async fn find_open(&self) -> StoreResult<Option<TimeEntry>> {
        Ok(self.items.lock().unwrap().iter().find(|e| e.is_open()).cloned())
    }
}

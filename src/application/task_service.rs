use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::domain::{
    error::StoreError,
    repository::TaskRepository,
    task::{completion_time, NewTask, Task, TaskError, TaskId, TaskPatch, TaskStatus},
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskServiceError {
    #[error(transparent)]
    Invalid(#[from] TaskError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, TaskServiceError>;

/// Task store accessor. Every mutation goes to the store first; the cached
/// list only changes once the store has answered successfully.
pub struct TaskService<R: TaskRepository> {
    repo: Arc<R>,
    cache: Arc<RwLock<Vec<Task>>>,
}

impl<R: TaskRepository> Clone for TaskService<R> {
    fn clone(&self) -> Self { Self { repo: self.repo.clone(), cache: self.cache.clone() } }
}

impl<R: TaskRepository> TaskService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo: Arc::new(repo), cache: Arc::new(RwLock::new(Vec::new())) }
    }

    /// Reloads the cache from the store, newest first.
    pub async fn refresh(&self) -> Result<Vec<Task>> {
        let tasks = self.repo.list().await?;
        *self.cache.write().await = tasks.clone();
        tracing::debug!(count = tasks.len(), "task cache refreshed");
        Ok(tasks)
    }

    pub async fn list(&self) -> Result<Vec<Task>> { self.refresh().await }

    pub async fn cached(&self) -> Vec<Task> { self.cache.read().await.clone() }

    pub async fn get(&self, id: TaskId) -> Result<Option<Task>> {
        Ok(self.repo.get(id).await?)
    }

    pub fn is_configured(&self) -> bool { self.repo.is_configured() }

    fn ensure_configured(&self) -> Result<()> {
        if self.repo.is_configured() { Ok(()) } else { Err(StoreError::Unconfigured.into()) }
    }

    pub async fn create(&self, input: NewTask) -> Result<Task> {
        self.ensure_configured()?;
        let task = input.into_task(TaskId::default(), Utc::now())?;
        let stored = self.repo.insert(&task).await.inspect_err(|err| {
            tracing::warn!(error = %err, "failed to add task");
        })?;
        self.cache.write().await.insert(0, stored.clone());
        tracing::info!(id = %stored.id, category = stored.category.as_str(), "task created");
        Ok(stored)
    }

    /// The stored task; a missing one is `StoreError::NotFound`.
    pub async fn require(&self, id: TaskId) -> Result<Task> {
        self.ensure_configured()?;
        self.load(id).await
    }

    pub async fn set_status(&self, id: TaskId, status: TaskStatus) -> Result<Task> {
        self.ensure_configured()?;
        let stored = self.repo.set_status(id, status, completion_time(status, Utc::now())).await.inspect_err(|err| {
            tracing::warn!(%id, error = %err, "failed to update task status");
        })?;
        Ok(self.replace_cached(stored).await)
    }

    /// Moves a task one step along `todo → in_progress → done`.
    pub async fn advance(&self, id: TaskId) -> Result<Task> {
        self.ensure_configured()?;
        let task = self.load(id).await?;
        let next = task.status.next().ok_or(TaskError::NoNextStatus)?;
        self.set_status(id, next).await
    }

    /// Writes only the fields the patch names, so concurrent edits of other
    /// fields survive.
    pub async fn update(&self, id: TaskId, patch: TaskPatch) -> Result<Task> {
        self.ensure_configured()?;
        let changes = patch.validate()?;
        if changes.is_empty() {
            return self.load(id).await;
        }
        let stored = self.repo.patch(id, &changes).await.inspect_err(|err| {
            tracing::warn!(%id, error = %err, "failed to update task");
        })?;
        Ok(self.replace_cached(stored).await)
    }

    pub async fn delete(&self, id: TaskId) -> Result<()> {
        self.ensure_configured()?;
        if !self.repo.delete(id).await? {
            return Err(StoreError::NotFound.into());
        }
        self.cache.write().await.retain(|t| t.id != id);
        tracing::info!(%id, "task deleted");
        Ok(())
    }

    async fn load(&self, id: TaskId) -> Result<Task> {
        self.repo.get(id).await?.ok_or_else(|| StoreError::NotFound.into())
    }

    async fn replace_cached(&self, stored: Task) -> Task {
        if let Some(slot) = self.cache.write().await.iter_mut().find(|t| t.id == stored.id) {
            *slot = stored.clone();
        }
        stored
    }
}

use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use crate::domain::{
    dates::today_of,
    error::StoreError,
    repository::{StoreResult, TimeEntryRepository},
    task::TaskId,
    time_entry::{whole_seconds_between, TimeEntry, TimeEntryId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TimerState {
    #[default]
    Idle,
    Running { task_id: TaskId, entry_id: TimeEntryId, started_at: DateTime<Utc> },
}

impl TimerState {
    pub fn active_task(&self) -> Option<TaskId> {
        match self {
            TimerState::Idle => None,
            TimerState::Running { task_id, .. } => Some(*task_id),
        }
    }

    /// Derived from the recorded start instant on every call, so a stalled
    /// view catches up on its next read.
    pub fn elapsed_at(&self, now: DateTime<Utc>) -> i64 {
        match self {
            TimerState::Idle => 0,
            TimerState::Running { started_at, .. } => whole_seconds_between(*started_at, now),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started(TimeEntry),
    AlreadyRunning { active_task: TaskId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerSnapshot {
    #[serde(flatten)]
    pub state: TimerState,
    pub active_task_id: Option<TaskId>,
    pub elapsed_seconds: i64,
    pub today_total_seconds: i64,
}

/// Start of the local calendar day containing `now`.
pub fn local_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    today_of(&now)
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| midnight.and_local_timezone(Local).earliest())
        .map(|midnight| midnight.with_timezone(&Utc))
        .unwrap_or(now)
}

/// Single global timer. The state mutex is held across the store call so two
/// concurrent starts cannot both open an entry.
pub struct TimerSession<R: TimeEntryRepository> {
    repo: Arc<R>,
    state: Arc<Mutex<TimerState>>,
    entries: Arc<RwLock<Vec<TimeEntry>>>,
}

impl<R: TimeEntryRepository> Clone for TimerSession<R> {
    fn clone(&self) -> Self {
        Self { repo: self.repo.clone(), state: self.state.clone(), entries: self.entries.clone() }
    }
}

impl<R: TimeEntryRepository> TimerSession<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo: Arc::new(repo),
            state: Arc::new(Mutex::new(TimerState::Idle)),
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn state(&self) -> TimerState { *self.state.lock().await }

    /// Adopts an entry left open by an earlier process.
    pub async fn resume(&self) -> StoreResult<TimerState> {
        let mut state = self.state.lock().await;
        if let (TimerState::Idle, Some(open)) = (*state, self.repo.find_open().await?) {
            tracing::info!(task_id = %open.task_id, "resuming running timer");
            *state = TimerState::Running { task_id: open.task_id, entry_id: open.id, started_at: open.start_time };
        }
        Ok(*state)
    }

    pub async fn start(&self, task_id: TaskId) -> StoreResult<StartOutcome> {
        self.start_at(task_id, Utc::now()).await
    }

    pub async fn start_at(&self, task_id: TaskId, now: DateTime<Utc>) -> StoreResult<StartOutcome> {
        let mut state = self.state.lock().await;
        if let Some(active_task) = state.active_task() {
            tracing::debug!(%active_task, requested = %task_id, "timer already running");
            return Ok(StartOutcome::AlreadyRunning { active_task });
        }
        if !self.repo.is_configured() {
            return Err(StoreError::Unconfigured);
        }
        let entry = self.repo.insert(&TimeEntry::open(task_id, now)).await?;
        *state = TimerState::Running { task_id, entry_id: entry.id, started_at: entry.start_time };
        tracing::info!(%task_id, "timer started");
        Ok(StartOutcome::Started(entry))
    }

    pub async fn stop(&self) -> StoreResult<Option<TimeEntry>> {
        self.stop_at(Utc::now()).await
    }

    /// Closes the open entry. A failed write keeps the timer running.
    pub async fn stop_at(&self, now: DateTime<Utc>) -> StoreResult<Option<TimeEntry>> {
        let closed = {
            let mut state = self.state.lock().await;
            let TimerState::Running { task_id, entry_id, started_at } = *state else { return Ok(None) };
            let duration = whole_seconds_between(started_at, now);
            let closed = self.repo.close(entry_id, now, duration).await?;
            *state = TimerState::Idle;
            tracing::info!(%task_id, duration_seconds = duration, "timer stopped");
            closed
        };
        self.refresh_entries_at(now).await?;
        Ok(Some(closed))
    }

    /// Returns to Idle when the running entry belonged to `task_id`, whose
    /// entries went with it when it was deleted.
    pub async fn release_task(&self, task_id: TaskId) -> bool {
        {
            let mut state = self.state.lock().await;
            if state.active_task() != Some(task_id) {
                return false;
            }
            *state = TimerState::Idle;
        }
        self.entries.write().await.retain(|e| e.task_id != task_id);
        tracing::info!(%task_id, "timer released with its deleted task");
        true
    }

    pub async fn elapsed_at(&self, now: DateTime<Utc>) -> i64 {
        self.state.lock().await.elapsed_at(now)
    }

    pub async fn refresh_entries(&self) -> StoreResult<Vec<TimeEntry>> {
        self.refresh_entries_at(Utc::now()).await
    }

    /// Loads entries started since local midnight of `now`, newest first.
    pub async fn refresh_entries_at(&self, now: DateTime<Utc>) -> StoreResult<Vec<TimeEntry>> {
        let entries = self.repo.list_since(local_midnight(now)).await?;
        *self.entries.write().await = entries.clone();
        Ok(entries)
    }

    pub async fn entries(&self) -> Vec<TimeEntry> { self.entries.read().await.clone() }

    /// Closed entries only; the running one has no duration yet.
    pub async fn today_total(&self) -> i64 {
        self.entries.read().await.iter().filter_map(|e| e.duration_seconds).sum()
    }

    pub async fn snapshot_at(&self, now: DateTime<Utc>) -> TimerSnapshot {
        let state = self.state().await;
        TimerSnapshot {
            state,
            active_task_id: state.active_task(),
            elapsed_seconds: state.elapsed_at(now),
            today_total_seconds: self.today_total().await,
        }
    }
}

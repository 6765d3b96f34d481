use std::{str::FromStr, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow}, Pool, QueryBuilder, Row, Sqlite};
use uuid::Uuid;

use crate::domain::{
    dates::{parse_date_key, to_date_key},
    error::StoreError,
    repository::{StoreResult, TaskRepository, TimeEntryRepository},
    task::{Category, ClockTime, RepeatDays, Task, TaskChanges, TaskId, TaskStatus},
    time_entry::{TimeEntry, TimeEntryId},
};

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            // a time entry naming a task that is not stored
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => StoreError::NotFound,
            other => StoreError::failed(other),
        }
    }
}

const TASK_COLUMNS: &str = "id, title, description, status, category, subcategory, scheduled_date, \
     scheduled_start, scheduled_end, repeat_days, show_required, created_at, completed_at";

const ENTRY_COLUMNS: &str = "id, task_id, start_time, end_time, duration_seconds, created_at";

/// Shared SQLite pool backing both record collections.
#[derive(Clone)]
pub struct SqliteStore {
    pool: Arc<Pool<Sqlite>>,
}

impl SqliteStore {
    /// Opens the database, creating a file-backed one and its directory on
    /// first use.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // every connection to `sqlite::memory:` is a separate database
        let in_memory = database_url.contains(":memory:");
        let pool_options = if in_memory {
            SqlitePoolOptions::new().max_connections(1).idle_timeout(None).max_lifetime(None)
        } else {
            if let Some(dir) = options.clone().get_filename().parent().filter(|dir| !dir.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)?;
            }
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options.connect_with(options).await?;
        tracing::debug!(database_url, in_memory, "connected to sqlite");
        Ok(Self { pool: Arc::new(pool) })
    }

    pub fn tasks(&self) -> SqliteTaskRepository {
        SqliteTaskRepository { pool: self.pool.clone() }
    }

    pub fn time_entries(&self) -> SqliteTimeEntryRepository {
        SqliteTimeEntryRepository { pool: self.pool.clone() }
    }
}

#[derive(Clone)]
pub struct SqliteTaskRepository {
    pool: Arc<Pool<Sqlite>>,
}

#[derive(Clone)]
pub struct SqliteTimeEntryRepository {
    pool: Arc<Pool<Sqlite>>,
}

fn timestamp(at: DateTime<Utc>) -> String {
    // fixed width so that text comparison orders like time
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn init(&self) -> StoreResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL CHECK (length(title) > 0),
                description TEXT,
                status TEXT NOT NULL CHECK (status IN ('todo', 'in_progress', 'done')),
                category TEXT NOT NULL CHECK (category IN ('university', 'work', 'social', 'goal')),
                subcategory TEXT,
                scheduled_date TEXT,
                scheduled_start TEXT,
                scheduled_end TEXT,
                repeat_days TEXT,
                show_required INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                completed_at TEXT
            )",
        )
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<Task>> {
        let rows = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at DESC"))
            .fetch_all(&*self.pool)
            .await?;
        rows.iter().map(row_to_task).collect()
    }

    async fn get(&self, id: TaskId) -> StoreResult<Option<Task>> {
        let row = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"))
            .bind(id.to_string())
            .fetch_optional(&*self.pool)
            .await?;
        row.as_ref().map(row_to_task).transpose()
    }

    async fn insert(&self, task: &Task) -> StoreResult<Task> {
        sqlx::query(&format!(
            "INSERT INTO tasks ({TASK_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
        ))
        .bind(task.id.to_string())
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.category.as_str())
        .bind(&task.subcategory)
        .bind(task.scheduled_date.map(to_date_key))
        .bind(task.scheduled_start.map(|t| t.to_string()))
        .bind(task.scheduled_end.map(|t| t.to_string()))
        .bind(encode_repeat_days(task.repeat_days.as_ref())?)
        .bind(task.show_required)
        .bind(timestamp(task.created_at))
        .bind(task.completed_at.map(timestamp))
        .execute(&*self.pool)
        .await?;
        self.get(task.id).await?.ok_or(StoreError::NotFound)
    }

    async fn set_status(&self, id: TaskId, status: TaskStatus, completed_at: Option<DateTime<Utc>>) -> StoreResult<Task> {
        let result = sqlx::query("UPDATE tasks SET status = ?2, completed_at = ?3 WHERE id = ?1")
            .bind(id.to_string())
            .bind(status.as_str())
            .bind(completed_at.map(timestamp))
            .execute(&*self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        self.get(id).await?.ok_or(StoreError::NotFound)
    }

    async fn patch(&self, id: TaskId, changes: &TaskChanges) -> StoreResult<Task> {
        if changes.is_empty() {
            return self.get(id).await?.ok_or(StoreError::NotFound);
        }
        let mut query = QueryBuilder::<Sqlite>::new("UPDATE tasks SET ");
        {
            let mut columns = query.separated(", ");
            if let Some(title) = &changes.title {
                columns.push("title = ").push_bind_unseparated(title.clone());
            }
            if let Some(description) = &changes.description {
                columns.push("description = ").push_bind_unseparated(description.clone());
            }
            if let Some(category) = changes.category {
                columns.push("category = ").push_bind_unseparated(category.as_str());
            }
            if let Some(subcategory) = &changes.subcategory {
                columns.push("subcategory = ").push_bind_unseparated(subcategory.clone());
            }
            if let Some(date) = changes.scheduled_date {
                columns.push("scheduled_date = ").push_bind_unseparated(date.map(to_date_key));
            }
            if let Some(start) = changes.scheduled_start {
                columns.push("scheduled_start = ").push_bind_unseparated(start.map(|t| t.to_string()));
            }
            if let Some(end) = changes.scheduled_end {
                columns.push("scheduled_end = ").push_bind_unseparated(end.map(|t| t.to_string()));
            }
            if let Some(days) = &changes.repeat_days {
                columns.push("repeat_days = ").push_bind_unseparated(encode_repeat_days(days.as_ref())?);
            }
            if let Some(flag) = changes.show_required {
                columns.push("show_required = ").push_bind_unseparated(flag);
            }
        }
        query.push(" WHERE id = ").push_bind(id.to_string());

        let result = query.build().execute(&*self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        self.get(id).await?.ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: TaskId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?1")
            .bind(id.to_string())
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl TimeEntryRepository for SqliteTimeEntryRepository {
    async fn init(&self) -> StoreResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS time_entries (
                id TEXT PRIMARY KEY,
                task_id TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
                start_time TEXT NOT NULL,
                end_time TEXT,
                duration_seconds INTEGER,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&*self.pool)
        .await?;
        // at most one running timer across the store
        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS time_entries_single_open
             ON time_entries ((end_time IS NULL)) WHERE end_time IS NULL",
        )
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    async fn insert(&self, entry: &TimeEntry) -> StoreResult<TimeEntry> {
        sqlx::query(&format!("INSERT INTO time_entries ({ENTRY_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"))
            .bind(entry.id.0.to_string())
            .bind(entry.task_id.to_string())
            .bind(timestamp(entry.start_time))
            .bind(entry.end_time.map(timestamp))
            .bind(entry.duration_seconds)
            .bind(timestamp(entry.created_at))
            .execute(&*self.pool)
            .await?;
        Ok(entry.clone())
    }

    async fn close(&self, id: TimeEntryId, end_time: DateTime<Utc>, duration_seconds: i64) -> StoreResult<TimeEntry> {
        let row = sqlx::query(&format!(
            "UPDATE time_entries SET end_time = ?2, duration_seconds = ?3 WHERE id = ?1 RETURNING {ENTRY_COLUMNS}"
        ))
        .bind(id.0.to_string())
        .bind(timestamp(end_time))
        .bind(duration_seconds)
        .fetch_optional(&*self.pool)
        .await?;
        row.as_ref().map(row_to_entry).transpose()?.ok_or(StoreError::NotFound)
    }

    async fn list_since(&self, since: DateTime<Utc>) -> StoreResult<Vec<TimeEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM time_entries WHERE start_time >= ?1 ORDER BY start_time DESC"
        ))
        .bind(timestamp(since))
        .fetch_all(&*self.pool)
        .await?;
        rows.iter().map(row_to_entry).collect()
    }

    async fn find_open(&self) -> StoreResult<Option<TimeEntry>> {
        let row = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM time_entries WHERE end_time IS NULL ORDER BY start_time DESC LIMIT 1"
        ))
        .fetch_optional(&*self.pool)
        .await?;
        row.as_ref().map(row_to_entry).transpose()
    }
}

fn encode_repeat_days(days: Option<&RepeatDays>) -> StoreResult<Option<String>> {
    days.map(|d| serde_json::to_string(d.days()).map_err(StoreError::failed)).transpose()
}

fn corrupt(column: &str, value: &str) -> StoreError {
    StoreError::Failed(format!("corrupt {column} value `{value}`"))
}

fn parse_uuid(column: &str, value: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(value).map_err(|_| corrupt(column, value))
}

fn parse_timestamp(column: &str, value: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|_| corrupt(column, value))
}

fn parse_optional<T>(column: &str, value: Option<String>, parse: impl Fn(&str) -> Option<T>) -> StoreResult<Option<T>> {
    value.map(|v| parse(&v).ok_or_else(|| corrupt(column, &v))).transpose()
}

fn row_to_task(row: &SqliteRow) -> StoreResult<Task> {
    let id: String = row.try_get("id")?;
    let status: String = row.try_get("status")?;
    let category: String = row.try_get("category")?;
    let created_at: String = row.try_get("created_at")?;

    let scheduled_date = parse_optional("scheduled_date", row.try_get("scheduled_date")?, |v| {
        parse_date_key(v).ok()
    })?;
    let scheduled_start = parse_optional("scheduled_start", row.try_get("scheduled_start")?, |v| {
        ClockTime::from_str(v).ok()
    })?;
    let scheduled_end = parse_optional("scheduled_end", row.try_get("scheduled_end")?, |v| {
        ClockTime::from_str(v).ok()
    })?;
    let repeat_days = parse_optional("repeat_days", row.try_get("repeat_days")?, |v| {
        serde_json::from_str::<Vec<u8>>(v).ok().and_then(|days| RepeatDays::new(days).ok())
    })?
    .flatten();
    let completed_at = parse_optional("completed_at", row.try_get("completed_at")?, |v| {
        parse_timestamp("completed_at", v).ok()
    })?;

    Ok(Task {
        id: TaskId(parse_uuid("id", &id)?),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        status: TaskStatus::from_str(&status).map_err(|_| corrupt("status", &status))?,
        category: Category::from_str(&category).map_err(|_| corrupt("category", &category))?,
        subcategory: row.try_get("subcategory")?,
        scheduled_date,
        scheduled_start,
        scheduled_end,
        repeat_days,
        show_required: row.try_get("show_required")?,
        created_at: parse_timestamp("created_at", &created_at)?,
        completed_at,
    })
}

fn row_to_entry(row: &SqliteRow) -> StoreResult<TimeEntry> {
    let id: String = row.try_get("id")?;
    let task_id: String = row.try_get("task_id")?;
    let start_time: String = row.try_get("start_time")?;
    let created_at: String = row.try_get("created_at")?;
    let end_time = parse_optional("end_time", row.try_get("end_time")?, |v| parse_timestamp("end_time", v).ok())?;

    Ok(TimeEntry {
        id: TimeEntryId(parse_uuid("id", &id)?),
        task_id: TaskId(parse_uuid("task_id", &task_id)?),
        start_time: parse_timestamp("start_time", &start_time)?,
        end_time,
        duration_seconds: row.try_get("duration_seconds")?,
        created_at: parse_timestamp("created_at", &created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::NewTask;
    use chrono::{Duration, NaiveDate};

    async fn store() -> SqliteStore {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        store.tasks().init().await.unwrap();
        store.time_entries().init().await.unwrap();
        store
    }

    #[tokio::test]
    async fn task_columns_survive_storage() {
        let repo = store().await.tasks();
        let input = NewTask {
            description: Some("bring notes".into()),
            category: Some(Category::University),
            subcategory: Some("test".into()),
            scheduled_date: NaiveDate::from_ymd_opt(2026, 10, 19),
            scheduled_start: ClockTime::hm(9, 0),
            scheduled_end: ClockTime::hm(10, 30),
            repeat_days: Some(vec![1, 3]),
            show_required: Some(true),
            ..NewTask::titled("Midterm")
        };
        let task = input.into_task(TaskId::default(), Utc::now()).unwrap();
        let stored = repo.insert(&task).await.unwrap();
        assert_eq!(stored.scheduled_start, task.scheduled_start);
        assert_eq!(stored.repeat_days.as_ref().map(RepeatDays::days), Some(&[1u8, 3][..]));
        assert_eq!(stored.created_at.timestamp_millis(), task.created_at.timestamp_millis());
        assert!(stored.show_required);

        let done = repo.set_status(task.id, TaskStatus::Done, Some(Utc::now())).await.unwrap();
        assert!(done.completed_at.is_some());
        assert_eq!(done.title, "Midterm");
        assert!(repo.delete(task.id).await.unwrap());
        assert!(!repo.delete(task.id).await.unwrap());
        assert_eq!(repo.set_status(task.id, TaskStatus::Todo, None).await.unwrap_err(), StoreError::NotFound);
        assert_eq!(repo.patch(task.id, &TaskChanges { show_required: Some(false), ..TaskChanges::default() }).await.unwrap_err(), StoreError::NotFound);
    }

    #[tokio::test]
    async fn patch_writes_only_named_columns() {
        let repo = store().await.tasks();
        let task = NewTask { subcategory: Some("study".into()), ..NewTask::titled("Essay") }
            .into_task(TaskId::default(), Utc::now())
            .unwrap();
        repo.insert(&task).await.unwrap();

        // a rename and a status change that were both read from the same row
        let rename = TaskChanges { title: Some("Final essay".into()), ..TaskChanges::default() };
        repo.patch(task.id, &rename).await.unwrap();
        repo.set_status(task.id, TaskStatus::Done, Some(Utc::now())).await.unwrap();

        let clear = TaskChanges {
            subcategory: Some(None),
            repeat_days: Some(RepeatDays::new([5]).unwrap()),
            ..TaskChanges::default()
        };
        let stored = repo.patch(task.id, &clear).await.unwrap();
        assert_eq!(stored.title, "Final essay");
        assert_eq!(stored.status, TaskStatus::Done);
        assert_eq!(stored.subcategory, None);
        assert_eq!(stored.repeat_days.as_ref().map(RepeatDays::days), Some(&[5u8][..]));
        assert_eq!(repo.patch(task.id, &TaskChanges::default()).await.unwrap(), stored);
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let repo = store().await.tasks();
        let now = Utc::now();
        let older = NewTask::titled("older").into_task(TaskId::default(), now - Duration::hours(1)).unwrap();
        let newer = NewTask::titled("newer").into_task(TaskId::default(), now).unwrap();
        repo.insert(&older).await.unwrap();
        repo.insert(&newer).await.unwrap();
        let titles: Vec<String> = repo.list().await.unwrap().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, ["newer", "older"]);
    }

    #[tokio::test]
    async fn file_database_is_created_with_its_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/village.db");
        let store = SqliteStore::connect(&format!("sqlite://{}", path.display())).await.unwrap();
        store.tasks().init().await.unwrap();
        assert!(path.exists());
    }

    async fn stored_task(store: &SqliteStore, title: &str) -> TaskId {
        let task = NewTask::titled(title).into_task(TaskId::default(), Utc::now()).unwrap();
        store.tasks().insert(&task).await.unwrap().id
    }

    #[tokio::test]
    async fn only_one_entry_may_be_open() {
        let store = store().await;
        let entries = store.time_entries();
        let (a, b) = (stored_task(&store, "a").await, stored_task(&store, "b").await);
        let start = Utc::now() - Duration::minutes(5);
        let first = entries.insert(&TimeEntry::open(a, start)).await.unwrap();
        let second = entries.insert(&TimeEntry::open(b, start)).await;
        assert!(matches!(second, Err(StoreError::Failed(_))));

        assert_eq!(entries.find_open().await.unwrap().map(|e| e.id), Some(first.id));
        let closed = entries.close(first.id, start + Duration::seconds(300), 300).await.unwrap();
        assert_eq!(closed.duration_seconds, Some(300));
        assert!(entries.find_open().await.unwrap().is_none());
        assert_eq!(entries.list_since(start).await.unwrap().len(), 1);
        assert!(entries.list_since(start + Duration::seconds(1)).await.unwrap().is_empty());
        assert_eq!(entries.close(TimeEntryId::default(), Utc::now(), 1).await.unwrap_err(), StoreError::NotFound);
    }

    #[tokio::test]
    async fn entries_must_reference_a_stored_task() {
        let store = store().await;
        let entries = store.time_entries();
        let err = entries.insert(&TimeEntry::open(TaskId::default(), Utc::now())).await.unwrap_err();
        assert_eq!(err, StoreError::NotFound);
        assert!(entries.find_open().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_a_task_removes_its_entries() {
        let store = store().await;
        let entries = store.time_entries();
        let task = stored_task(&store, "doomed").await;
        let start = Utc::now() - Duration::minutes(1);
        entries.insert(&TimeEntry::open(task, start)).await.unwrap();

        assert!(store.tasks().delete(task).await.unwrap());
        assert!(entries.find_open().await.unwrap().is_none());
        assert!(entries.list_since(start).await.unwrap().is_empty());
    }
}

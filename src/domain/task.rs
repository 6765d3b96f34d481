use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct TaskId(pub Uuid);

impl Default for TaskId {
    fn default() -> Self { Self(Uuid::new_v4()) }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

impl FromStr for TaskId {
    type Err = uuid::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> { Uuid::parse_str(s).map(TaskId) }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("repeat day {0} is out of range, expected 0 (Sunday) to 6 (Saturday)")]
    InvalidRepeatDay(u8),
    #[error("task is already done")]
    NoNextStatus,
    #[error("unknown status `{0}`")]
    InvalidStatus(String),
    #[error("unknown category `{0}`")]
    InvalidCategory(String),
    #[error("invalid clock time `{0}`, expected HH:MM")]
    InvalidTime(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }

    /// Forward-only progression offered by the interface.
    pub fn next(self) -> Option<TaskStatus> {
        match self {
            TaskStatus::Todo => Some(TaskStatus::InProgress),
            TaskStatus::InProgress => Some(TaskStatus::Done),
            TaskStatus::Done => None,
        }
    }
}

impl FromStr for TaskStatus {
    type Err = TaskError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            other => Err(TaskError::InvalidStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    University,
    Work,
    Social,
    #[default]
    Goal,
}

impl Category {
    pub const ALL: [Category; 4] = [Category::University, Category::Work, Category::Social, Category::Goal];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::University => "university",
            Category::Work => "work",
            Category::Social => "social",
            Category::Goal => "goal",
        }
    }
}

impl FromStr for Category {
    type Err = TaskError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "university" => Ok(Category::University),
            "work" => Ok(Category::Work),
            "social" => Ok(Category::Social),
            "goal" => Ok(Category::Goal),
            other => Err(TaskError::InvalidCategory(other.to_string())),
        }
    }
}

/// Wall-clock time of day, written as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(pub NaiveTime);

impl ClockTime {
    pub fn hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(ClockTime)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0.format("%H:%M")) }
}

impl FromStr for ClockTime {
    type Err = TaskError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
            .map(ClockTime)
            .map_err(|_| TaskError::InvalidTime(s.to_string()))
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Weekly recurrence pattern, 0 = Sunday. Display-only: nothing expands it
/// into scheduled occurrences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct RepeatDays(Vec<u8>);

impl RepeatDays {
    /// Sorted and de-duplicated; `None` when no day is selected.
    pub fn new(days: impl IntoIterator<Item = u8>) -> Result<Option<Self>, TaskError> {
        let mut days: Vec<u8> = days.into_iter().collect();
        if let Some(bad) = days.iter().copied().find(|d| *d > 6) {
            return Err(TaskError::InvalidRepeatDay(bad));
        }
        days.sort_unstable();
        days.dedup();
        Ok((!days.is_empty()).then_some(RepeatDays(days)))
    }

    pub fn days(&self) -> &[u8] { &self.0 }

    /// `"Mo We Fr"`
    pub fn label(&self) -> String {
        const SHORT: [&str; 7] = ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"];
        self.0.iter().map(|d| SHORT[*d as usize]).collect::<Vec<_>>().join(" ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub category: Category,
    pub subcategory: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_start: Option<ClockTime>,
    pub scheduled_end: Option<ClockTime>,
    pub repeat_days: Option<RepeatDays>,
    pub show_required: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn is_done(&self) -> bool { self.status == TaskStatus::Done }

    /// Keeps `completed_at` set exactly while the task is done.
    pub fn set_status(&mut self, status: TaskStatus, now: DateTime<Utc>) {
        self.status = status;
        self.completed_at = completion_time(status, now);
    }

    pub fn has_subcategory(&self, tag: &str) -> bool {
        self.subcategory.as_deref() == Some(tag)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn required_title(title: &str) -> Result<String, TaskError> {
    let title = title.trim();
    if title.is_empty() { return Err(TaskError::EmptyTitle) }
    Ok(title.to_string())
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub scheduled_date: Option<NaiveDate>,
    #[serde(default)]
    pub scheduled_start: Option<ClockTime>,
    #[serde(default)]
    pub scheduled_end: Option<ClockTime>,
    #[serde(default)]
    pub repeat_days: Option<Vec<u8>>,
    #[serde(default)]
    pub show_required: Option<bool>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self { title: title.into(), ..Self::default() }
    }

    /// Applies creation defaults: `todo`, category `goal`, blank fields absent.
    pub fn into_task(self, id: TaskId, now: DateTime<Utc>) -> Result<Task, TaskError> {
        Ok(Task {
            id,
            title: required_title(&self.title)?,
            description: non_blank(self.description),
            status: TaskStatus::Todo,
            category: self.category.unwrap_or_default(),
            subcategory: non_blank(self.subcategory),
            scheduled_date: self.scheduled_date,
            scheduled_start: self.scheduled_start,
            scheduled_end: self.scheduled_end,
            repeat_days: RepeatDays::new(self.repeat_days.unwrap_or_default())?,
            show_required: self.show_required.unwrap_or(false),
            created_at: now,
            completed_at: None,
        })
    }
}

/// Distinguishes an absent field from an explicit `null`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial update. Outer `None` leaves a field alone, `Some(None)` clears it.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default, deserialize_with = "double_option")]
    pub subcategory: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub scheduled_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub scheduled_start: Option<Option<ClockTime>>,
    #[serde(default, deserialize_with = "double_option")]
    pub scheduled_end: Option<Option<ClockTime>>,
    #[serde(default, deserialize_with = "double_option")]
    pub repeat_days: Option<Option<Vec<u8>>>,
    #[serde(default)]
    pub show_required: Option<bool>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.subcategory.is_none()
            && self.scheduled_date.is_none()
            && self.scheduled_start.is_none()
            && self.scheduled_end.is_none()
            && self.repeat_days.is_none()
            && self.show_required.is_none()
    }

    /// Normalizes and validates the patch without touching any task.
    pub fn validate(self) -> Result<TaskChanges, TaskError> {
        let title = self.title.as_deref().map(required_title).transpose()?;
        let repeat_days = match self.repeat_days {
            Some(days) => Some(RepeatDays::new(days.unwrap_or_default())?),
            None => None,
        };
        Ok(TaskChanges {
            title,
            description: self.description.map(non_blank),
            category: self.category,
            subcategory: self.subcategory.map(non_blank),
            scheduled_date: self.scheduled_date,
            scheduled_start: self.scheduled_start,
            scheduled_end: self.scheduled_end,
            repeat_days,
            show_required: self.show_required,
        })
    }

    /// A rejected patch leaves `task` unchanged.
    pub fn apply(self, task: &mut Task) -> Result<(), TaskError> {
        self.validate()?.apply_to(task);
        Ok(())
    }
}

/// A validated [`TaskPatch`]: only the columns it names get written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub category: Option<Category>,
    pub subcategory: Option<Option<String>>,
    pub scheduled_date: Option<Option<NaiveDate>>,
    pub scheduled_start: Option<Option<ClockTime>>,
    pub scheduled_end: Option<Option<ClockTime>>,
    pub repeat_days: Option<Option<RepeatDays>>,
    pub show_required: Option<bool>,
}

impl TaskChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title { task.title = title.clone(); }
        if let Some(description) = &self.description { task.description = description.clone(); }
        if let Some(category) = self.category { task.category = category; }
        if let Some(subcategory) = &self.subcategory { task.subcategory = subcategory.clone(); }
        if let Some(date) = self.scheduled_date { task.scheduled_date = date; }
        if let Some(start) = self.scheduled_start { task.scheduled_start = start; }
        if let Some(end) = self.scheduled_end { task.scheduled_end = end; }
        if let Some(days) = &self.repeat_days { task.repeat_days = days.clone(); }
        if let Some(flag) = self.show_required { task.show_required = flag; }
    }
}

/// `completed_at` for a task entering `status` at `now`.
pub fn completion_time(status: TaskStatus, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    (status == TaskStatus::Done).then_some(now)
}

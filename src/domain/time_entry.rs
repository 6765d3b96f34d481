use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task::TaskId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct TimeEntryId(pub Uuid);

impl Default for TimeEntryId {
    fn default() -> Self { Self(Uuid::new_v4()) }
}

/// One contiguous timed interval against a task. Open while `end_time` is `None`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeEntry {
    pub id: TimeEntryId,
    pub task_id: TaskId,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl TimeEntry {
    pub fn open(task_id: TaskId, start_time: DateTime<Utc>) -> Self {
        Self {
            id: TimeEntryId::default(),
            task_id,
            start_time,
            end_time: None,
            duration_seconds: None,
            created_at: start_time,
        }
    }

    pub fn is_open(&self) -> bool { self.end_time.is_none() }
}

/// Whole seconds between two instants, never negative.
pub fn whole_seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start).num_seconds().max(0)
}

/// `h:mm:ss`
pub fn format_clock(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{}:{:02}:{:02}", seconds / 3600, (seconds % 3600) / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn seconds_are_floored() {
        let start = Utc::now();
        assert_eq!(whole_seconds_between(start, start + Duration::milliseconds(125_999)), 125);
        assert_eq!(whole_seconds_between(start, start - Duration::seconds(3)), 0);
    }

    #[test]
    fn clock_format() {
        assert_eq!(format_clock(0), "0:00:00");
        assert_eq!(format_clock(3725), "1:02:05");
    }
}

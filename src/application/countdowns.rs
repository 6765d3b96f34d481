use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    countdown::{format_remaining, Countdown, COUNTDOWNS_KEY},
    repository::LocalStorage,
};

#[derive(Debug, Error)]
pub enum CountdownError {
    #[error("countdown title must not be empty")]
    EmptyTitle,
    #[error("countdown needs a date")]
    MissingDate,
    #[error("could not save countdowns: {0}")]
    Storage(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountdownLine {
    #[serde(flatten)]
    pub countdown: Countdown,
    pub remaining: String,
    pub arrived: bool,
}

/// Countdowns kept in device-local storage and rewritten wholesale on change.
pub struct CountdownBoard<S: LocalStorage> {
    storage: S,
    entries: Vec<Countdown>,
}

impl<S: LocalStorage> CountdownBoard<S> {
    /// Unreadable or malformed stored content starts an empty board.
    pub fn load(storage: S) -> Self {
        let entries = match storage.get(COUNTDOWNS_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                tracing::debug!(error = %err, "discarding malformed countdown list");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(err) => {
                tracing::debug!(error = %err, "countdown storage unreadable");
                Vec::new()
            }
        };
        Self { storage, entries }
    }

    pub fn entries(&self) -> &[Countdown] { &self.entries }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn add(&mut self, title: &str, date: Option<NaiveDate>, time: Option<NaiveTime>) -> Result<Countdown, CountdownError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(CountdownError::EmptyTitle);
        }
        let date = date.ok_or(CountdownError::MissingDate)?;
        let countdown = Countdown {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            target: date.and_time(time.unwrap_or(NaiveTime::MIN)),
        };
        let mut next = self.entries.clone();
        next.push(countdown.clone());
        self.persist(next)?;
        Ok(countdown)
    }

    /// Unknown ids are ignored.
    pub fn remove(&mut self, id: &str) -> Result<(), CountdownError> {
        let next: Vec<Countdown> = self.entries.iter().filter(|c| c.id != id).cloned().collect();
        self.persist(next)
    }

    pub fn render(&self, now: NaiveDateTime) -> Vec<CountdownLine> {
        self.entries
            .iter()
            .map(|countdown| {
                let remaining = countdown.remaining(now);
                CountdownLine {
                    countdown: countdown.clone(),
                    remaining: format_remaining(remaining),
                    arrived: remaining <= chrono::Duration::zero(),
                }
            })
            .collect()
    }

    fn persist(&mut self, next: Vec<Countdown>) -> Result<(), CountdownError> {
        let raw = serde_json::to_string(&next).map_err(std::io::Error::other)?;
        self.storage.set(COUNTDOWNS_KEY, &raw)?;
        self.entries = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::local_storage::MemoryStorage;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn add_validates_and_persists() {
        let storage = MemoryStorage::default();
        let mut board = CountdownBoard::load(storage.clone());
        assert!(matches!(board.add("  ", Some(d(2026, 12, 25)), None), Err(CountdownError::EmptyTitle)));
        assert!(matches!(board.add("Exam", None, None), Err(CountdownError::MissingDate)));

        let added = board.add(" Exam ", Some(d(2026, 12, 1)), NaiveTime::from_hms_opt(9, 30, 0)).unwrap();
        assert_eq!(added.title, "Exam");
        assert_eq!(added.target, d(2026, 12, 1).and_hms_opt(9, 30, 0).unwrap());
        let xmas = board.add("Christmas", Some(d(2026, 12, 25)), None).unwrap();
        assert_eq!(xmas.target, d(2026, 12, 25).and_hms_opt(0, 0, 0).unwrap());

        let reloaded = CountdownBoard::load(storage);
        assert_eq!(reloaded.entries(), board.entries());
    }

    #[test]
    fn remove_rewrites_the_list() {
        let storage = MemoryStorage::default();
        let mut board = CountdownBoard::load(storage.clone());
        let keep = board.add("Keep", Some(d(2027, 1, 1)), None).unwrap();
        let drop = board.add("Drop", Some(d(2027, 1, 2)), None).unwrap();
        board.remove(&drop.id).unwrap();
        board.remove("no-such-id").unwrap();
        assert_eq!(CountdownBoard::load(storage).entries(), std::slice::from_ref(&keep));
    }

    #[test]
    fn corrupt_storage_falls_back_to_empty() {
        let storage = MemoryStorage::default();
        storage.set(COUNTDOWNS_KEY, "{not json").unwrap();
        let mut board = CountdownBoard::load(storage.clone());
        assert!(board.is_empty());
        board.add("Fresh", Some(d(2027, 1, 1)), None).unwrap();
        assert_eq!(CountdownBoard::load(storage).entries().len(), 1);
    }

    #[test]
    fn render_formats_remaining_time() {
        let mut board = CountdownBoard::load(MemoryStorage::default());
        board.add("Trip", Some(d(2026, 10, 21)), NaiveTime::from_hms_opt(1, 1, 1)).unwrap();
        board.add("Past", Some(d(2026, 10, 1)), None).unwrap();
        let now = d(2026, 10, 20).and_hms_opt(0, 0, 0).unwrap();
        let lines = board.render(now);
        assert_eq!(lines[0].remaining, "1d 1h 1m");
        assert!(!lines[0].arrived);
        assert_eq!(lines[1].remaining, "Arrived!");
        assert!(lines[1].arrived);
    }
}

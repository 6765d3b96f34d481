use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const COUNTDOWNS_KEY: &str = "gt_countdowns";

/// A user-authored reminder kept in device-local storage. Unrelated to tasks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Countdown {
    pub id: String,
    pub title: String,
    pub target: NaiveDateTime,
}

impl Countdown {
    pub fn remaining(&self, now: NaiveDateTime) -> Duration {
        self.target - now
    }
}

pub fn format_remaining(remaining: Duration) -> String {
    if remaining <= Duration::zero() {
        return "Arrived!".to_string();
    }
    let total = remaining.num_seconds();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else {
        format!("{minutes}m {seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_by_largest_unit() {
        assert_eq!(format_remaining(Duration::seconds(90_061)), "1d 1h 1m");
        assert_eq!(format_remaining(Duration::seconds(3_725)), "1h 2m 5s");
        assert_eq!(format_remaining(Duration::seconds(65)), "1m 5s");
        assert_eq!(format_remaining(Duration::seconds(0)), "Arrived!");
        assert_eq!(format_remaining(Duration::seconds(-10)), "Arrived!");
    }

    #[test]
    fn sub_second_remainder_has_not_arrived() {
        assert_eq!(format_remaining(Duration::milliseconds(400)), "0m 0s");
    }
}

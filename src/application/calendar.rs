//! Day, week and month groupings of the flat task list, the required-tasks
//! panel, and the dashboard's navigation state.
//!
//! Everything here is a pure function of its inputs and is recomputed on
//! every read.

use std::{cmp::Ordering, collections::BTreeMap};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::{
    dates::{add_days, checked_add_days, last_day_of_month, month_grid, month_name, relative_day_label, short_date, week_start, weekday_label, MonthCell},
    task::{Category, Task, TaskStatus},
};

/// Orders present values ascending and puts missing values after all of them.
pub fn cmp_missing_last<T: Ord>(a: Option<&T>, b: Option<&T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Tasks scheduled on `date`, earliest start first, untimed tasks last.
pub fn day_schedule(tasks: &[Task], date: NaiveDate) -> Vec<Task> {
    let mut day: Vec<Task> = tasks.iter().filter(|t| t.scheduled_date == Some(date)).cloned().collect();
    day.sort_by(|a, b| cmp_missing_last(a.scheduled_start.as_ref(), b.scheduled_start.as_ref()));
    day
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayBucket {
    pub date: NaiveDate,
    pub label: &'static str,
    pub is_today: bool,
    pub tasks: Vec<Task>,
}

pub fn week_dates(start: NaiveDate) -> [NaiveDate; 7] {
    std::array::from_fn(|i| add_days(start, i as i64))
}

pub fn week_view(tasks: &[Task], start: NaiveDate, today: NaiveDate) -> Vec<DayBucket> {
    week_dates(start)
        .into_iter()
        .map(|date| DayBucket { date, label: weekday_label(date), is_today: date == today, tasks: day_schedule(tasks, date) })
        .collect()
}

/// `"This Week"` for the week containing `today`, else `"18 Oct – 24 Oct"`.
pub fn week_label(start: NaiveDate, today: NaiveDate) -> String {
    if start == week_start(today) {
        return "This Week".to_string();
    }
    format!("{} – {}", short_date(start), short_date(add_days(start, 6)))
}

/// 1-based month of a year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self { year: date.year(), month: date.month() }
    }

    /// Steps by whole months, rolling the year over past December/January.
    pub fn step(self, months: i32) -> Self {
        let index = self.year * 12 + self.month as i32 - 1 + months;
        Self { year: index.div_euclid(12), month: index.rem_euclid(12) as u32 + 1 }
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    pub fn last_day(self) -> Option<NaiveDate> {
        last_day_of_month(self.year, self.month)
    }

    /// `"October 2026"`
    pub fn title(self) -> String {
        format!("{} {}", month_name(self.month), self.year)
    }
}

/// Which categories appear on a month-grid day; markers stack independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DayMarkers {
    pub work: bool,
    pub test: bool,
    pub class: bool,
    pub social: bool,
}

impl DayMarkers {
    pub fn for_tasks(tasks: &[Task]) -> Self {
        let university = |tag: &str| tasks.iter().any(|t| t.category == Category::University && t.has_subcategory(tag));
        Self {
            work: tasks.iter().any(|t| t.category == Category::Work),
            test: university("test"),
            class: university("class"),
            social: tasks.iter().any(|t| t.category == Category::Social),
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.work || self.test || self.class || self.social)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthView {
    pub month: YearMonth,
    pub cells: Vec<MonthCell>,
    pub tasks_by_day: BTreeMap<NaiveDate, Vec<Task>>,
    pub markers: BTreeMap<NaiveDate, DayMarkers>,
}

pub fn month_view(tasks: &[Task], month: YearMonth, today: NaiveDate) -> MonthView {
    let mut tasks_by_day: BTreeMap<NaiveDate, Vec<Task>> = BTreeMap::new();
    for task in tasks {
        if let Some(date) = task.scheduled_date.filter(|d| month.contains(*d)) {
            tasks_by_day.entry(date).or_default().push(task.clone());
        }
    }
    let markers = tasks_by_day
        .iter()
        .map(|(date, day)| (*date, DayMarkers::for_tasks(day)))
        .filter(|(_, markers)| !markers.is_empty())
        .collect();
    MonthView { month, cells: month_grid(month.year, month.month, today), tasks_by_day, markers }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequiredTask {
    #[serde(flatten)]
    pub task: Task,
    pub overdue: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequiredTasks {
    /// Goals, shown regardless of `show_required`.
    pub goals: Vec<RequiredTask>,
    /// Other categories that opted in with `show_required`.
    pub others: Vec<RequiredTask>,
}

impl RequiredTasks {
    pub fn is_empty(&self) -> bool { self.goals.is_empty() && self.others.is_empty() }
}

/// Overdue is always judged against the real today, not the viewed range.
pub fn is_overdue(task: &Task, today: NaiveDate) -> bool {
    task.scheduled_date.is_some_and(|date| date < today)
}

/// Open tasks that are unscheduled or due by `range_end`, soonest first.
pub fn required_tasks(tasks: &[Task], range_end: NaiveDate, today: NaiveDate) -> RequiredTasks {
    let mut open: Vec<&Task> = tasks
        .iter()
        .filter(|t| t.status != TaskStatus::Done)
        .filter(|t| t.scheduled_date.is_none_or(|date| date <= range_end))
        .collect();
    open.sort_by(|a, b| cmp_missing_last(a.scheduled_date.as_ref(), b.scheduled_date.as_ref()));

    let mut required = RequiredTasks::default();
    for task in open {
        let entry = RequiredTask { task: task.clone(), overdue: is_overdue(task, today) };
        if task.category == Category::Goal {
            required.goals.push(entry);
        } else if task.show_required {
            required.others.push(entry);
        }
    }
    required
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CalendarMode {
    #[default]
    Week,
    Month,
}

/// Navigation state of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalendarView {
    pub viewing_date: NaiveDate,
    pub week_start: NaiveDate,
    pub mode: CalendarMode,
    pub month: YearMonth,
}

impl CalendarView {
    pub fn new(today: NaiveDate) -> Self {
        Self { viewing_date: today, week_start: week_start(today), mode: CalendarMode::Week, month: YearMonth::of(today) }
    }

    /// Steps past the ends of the calendar are ignored.
    pub fn shift_day(&mut self, days: i64) {
        if let Some(date) = checked_add_days(self.viewing_date, days) {
            self.viewing_date = date;
        }
    }

    pub fn shift_week(&mut self, weeks: i64) {
        let start = weeks.checked_mul(7).and_then(|days| checked_add_days(self.week_start, days));
        if let Some(start) = start.filter(|start| checked_add_days(*start, 6).is_some()) {
            self.week_start = start;
        }
    }

    pub fn step_month(&mut self, months: i32) {
        let next = self.month.step(months);
        if next.last_day().is_some() {
            self.month = next;
        }
    }

    /// Steps the calendar panel in whichever mode it is showing.
    pub fn previous(&mut self) {
        match self.mode {
            CalendarMode::Week => self.shift_week(-1),
            CalendarMode::Month => self.step_month(-1),
        }
    }

    pub fn next(&mut self) {
        match self.mode {
            CalendarMode::Week => self.shift_week(1),
            CalendarMode::Month => self.step_month(1),
        }
    }

    /// Returns the day panel to today; the calendar panel keeps its anchor.
    pub fn jump_to_today(&mut self, today: NaiveDate) {
        self.viewing_date = today;
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            CalendarMode::Week => CalendarMode::Month,
            CalendarMode::Month => CalendarMode::Week,
        };
    }

    /// Picks a day from the month grid without leaving month mode.
    pub fn select_date(&mut self, date: NaiveDate) {
        self.viewing_date = date;
    }

    pub fn is_viewing_today(&self, today: NaiveDate) -> bool {
        self.viewing_date == today
    }

    /// Last visible day: end of the week, or the viewed month's true last day.
    pub fn range_end(&self) -> NaiveDate {
        match self.mode {
            CalendarMode::Week => add_days(self.week_start, 6),
            CalendarMode::Month => self.month.last_day().unwrap_or(self.viewing_date),
        }
    }

    pub fn day_label(&self, today: NaiveDate) -> String {
        relative_day_label(self.viewing_date, today)
    }

    pub fn title(&self, today: NaiveDate) -> String {
        match self.mode {
            CalendarMode::Week => week_label(self.week_start, today),
            CalendarMode::Month => self.month.title(),
        }
    }

    pub fn apply(&mut self, action: NavAction, today: NaiveDate) {
        match action {
            NavAction::PrevDay => self.shift_day(-1),
            NavAction::NextDay => self.shift_day(1),
            NavAction::PrevWeek => self.shift_week(-1),
            NavAction::NextWeek => self.shift_week(1),
            NavAction::PrevMonth => self.step_month(-1),
            NavAction::NextMonth => self.step_month(1),
            NavAction::Previous => self.previous(),
            NavAction::Next => self.next(),
            NavAction::Today => self.jump_to_today(today),
            NavAction::ToggleMode => self.toggle_mode(),
            NavAction::Select { date } => self.select_date(date),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum NavAction {
    PrevDay,
    NextDay,
    PrevWeek,
    NextWeek,
    PrevMonth,
    NextMonth,
    Previous,
    Next,
    Today,
    ToggleMode,
    Select { date: NaiveDate },
}

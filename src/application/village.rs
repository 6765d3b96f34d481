//! Routes categories to village buildings and assembles the dashboard.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::application::{
    calendar::{day_schedule, month_view, required_tasks, week_view, CalendarMode, CalendarView, DayBucket, MonthView, RequiredTasks},
    countdowns::CountdownLine,
};
use crate::domain::task::{Category, Task, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Building {
    UniversitySchool,
    WorkPlace,
    TavernPub,
    NoticeBoard,
}

impl Building {
    pub const ALL: [Building; 4] = [Building::UniversitySchool, Building::WorkPlace, Building::TavernPub, Building::NoticeBoard];

    pub fn for_category(category: Category) -> Self {
        match category {
            Category::University => Building::UniversitySchool,
            Category::Work => Building::WorkPlace,
            Category::Social => Building::TavernPub,
            Category::Goal => Building::NoticeBoard,
        }
    }

    pub fn category(self) -> Category {
        match self {
            Building::UniversitySchool => Category::University,
            Building::WorkPlace => Category::Work,
            Building::TavernPub => Category::Social,
            Building::NoticeBoard => Category::Goal,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Building::UniversitySchool => "University School",
            Building::WorkPlace => "Work Place",
            Building::TavernPub => "Tavern Pub",
            Building::NoticeBoard => "Notice Board",
        }
    }

    pub fn subtitle(self) -> &'static str {
        match self {
            Building::UniversitySchool => "Study & classes",
            Building::WorkPlace => "Shifts & projects",
            Building::TavernPub => "Social events",
            Building::NoticeBoard => "Goals & schedule",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Building::UniversitySchool => "university_school",
            Building::WorkPlace => "work_place",
            Building::TavernPub => "tavern_pub",
            Building::NoticeBoard => "notice_board",
        }
    }

    /// Tags offered when posting a task in this building.
    pub fn subcategory_options(self) -> &'static [&'static str] {
        match self {
            Building::UniversitySchool => &["class", "test", "study"],
            Building::WorkPlace => &["exodus", "on-site"],
            Building::TavernPub | Building::NoticeBoard => &[],
        }
    }

    /// The building's tasks, in cache order.
    pub fn tasks(self, tasks: &[Task]) -> Vec<Task> {
        let category = self.category();
        tasks.iter().filter(|t| t.category == category).cloned().collect()
    }
}

impl FromStr for Building {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Building::ALL
            .into_iter()
            .find(|b| b.slug() == s)
            .ok_or_else(|| format!("unknown building `{s}`"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    Todo,
    InProgress,
    Done,
}

impl StatusFilter {
    pub fn matches(self, status: TaskStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Todo => status == TaskStatus::Todo,
            StatusFilter::InProgress => status == TaskStatus::InProgress,
            StatusFilter::Done => status == TaskStatus::Done,
        }
    }

    pub fn apply(self, tasks: &[Task]) -> Vec<Task> {
        tasks.iter().filter(|t| self.matches(t.status)).cloned().collect()
    }

    pub fn cycle(self) -> Self {
        match self {
            StatusFilter::All => StatusFilter::Todo,
            StatusFilter::Todo => StatusFilter::InProgress,
            StatusFilter::InProgress => StatusFilter::Done,
            StatusFilter::Done => StatusFilter::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusFilter::All => "All Quests",
            StatusFilter::Todo => "Awaiting",
            StatusFilter::InProgress => "In Battle",
            StatusFilter::Done => "Conquered",
        }
    }
}

/// Only open university study sessions get a time tracker.
pub fn can_track_time(task: &Task) -> bool {
    task.category == Category::University && task.has_subcategory("study") && !task.is_done()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoticeBoardView {
    pub goals: Vec<Task>,
    pub today: Vec<Task>,
}

pub fn notice_board_schedule(tasks: &[Task], today: NaiveDate) -> NoticeBoardView {
    NoticeBoardView { goals: Building::NoticeBoard.tasks(tasks), today: day_schedule(tasks, today) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CalendarPanel {
    Week { days: Vec<DayBucket> },
    Month(MonthView),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayPanel {
    pub date: NaiveDate,
    pub label: String,
    pub is_today: bool,
    pub tasks: Vec<Task>,
}

/// Everything the town square shows, for one navigation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub today: NaiveDate,
    pub view: CalendarView,
    pub day: DayPanel,
    pub calendar_title: String,
    pub calendar: CalendarPanel,
    pub required: RequiredTasks,
    pub countdowns: Vec<CountdownLine>,
}

impl Dashboard {
    pub fn build(tasks: &[Task], view: &CalendarView, today: NaiveDate, countdowns: Vec<CountdownLine>) -> Self {
        let calendar = match view.mode {
            CalendarMode::Week => CalendarPanel::Week { days: week_view(tasks, view.week_start, today) },
            CalendarMode::Month => CalendarPanel::Month(month_view(tasks, view.month, today)),
        };
        Self {
            today,
            view: *view,
            day: DayPanel {
                date: view.viewing_date,
                label: view.day_label(today),
                is_today: view.is_viewing_today(today),
                tasks: day_schedule(tasks, view.viewing_date),
            },
            calendar_title: view.title(today),
            calendar,
            required: required_tasks(tasks, view.range_end(), today),
            countdowns,
        }
    }
}

/// Local "now" as a naive date-time, the frame countdown targets use.
pub fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

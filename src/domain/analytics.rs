use crate::domain::models::{Priority, Task};
use crate::domain::style::{category_token, priority_token, StyleToken};
use chrono::{DateTime, Duration, Months, NaiveDate, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimeRange {
    #[default]
    Week,
    Month,
    Year,
}

impl TimeRange {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "week" | "7d" => Some(Self::Week),
            "month" | "30d" => Some(Self::Month),
            "year" | "365d" => Some(Self::Year),
            _ => None,
        }
    }

    pub fn window_start(self, now: DateTime<Utc>) -> DateTime<Utc> {
        let start = match self {
            Self::Week => Some(now - Duration::days(7)),
            Self::Month => now.checked_sub_months(Months::new(1)),
            Self::Year => now.checked_sub_months(Months::new(12)),
        };
        start.unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn contains(self, task: &Task, now: DateTime<Utc>) -> bool {
        task.created_at >= self.window_start(now)
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
pub struct TaskStats {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub pending_tasks: usize,
    pub overdue_tasks: usize,
    pub total_time: u64,
    pub completed_time: u64,
    pub remaining_time: u64,
    pub productivity_score: u32,
    pub average_task_time: u64,
    pub completed_time_percentage: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub day: String,
    pub completed: usize,
    pub pending: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CategoryBreakdown {
    pub category: String,
    pub completed: usize,
    pub total: usize,
    pub percentage: Option<u32>,
    pub token: StyleToken,
    pub color: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PriorityCount {
    pub priority: Priority,
    pub label: &'static str,
    pub count: usize,
    pub token: StyleToken,
    pub color: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
pub struct DashboardCounts {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub overdue: usize,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Completed,
}

impl StatusFilter {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Some(Self::All),
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    fn matches(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Pending => !task.completed,
            Self::Completed => task.completed,
        }
    }
}

/// `round(100 * part / whole)` with halves rounded up; 0 when `whole` is 0.
pub fn rounded_percentage(part: u64, whole: u64) -> u32 {
    if whole == 0 {
        return 0;
    }
    let scaled = (200 * part + whole) / (2 * whole);
    u32::try_from(scaled).unwrap_or(u32::MAX)
}

/// A due date counts as midnight UTC of that day.
pub fn is_overdue(task: &Task, now: DateTime<Utc>) -> bool {
    if task.completed {
        return false;
    }
    task.due_date
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc() < now)
        .unwrap_or(false)
}

pub fn dashboard_counts(tasks: &[Task], now: DateTime<Utc>) -> DashboardCounts {
    let completed = tasks.iter().filter(|task| task.completed).count();
    DashboardCounts {
        total: tasks.len(),
        completed,
        pending: tasks.len() - completed,
        overdue: tasks.iter().filter(|task| is_overdue(task, now)).count(),
    }
}

pub fn task_stats(tasks: &[Task], range: TimeRange, now: DateTime<Utc>) -> TaskStats {
    let window = tasks
        .iter()
        .filter(|task| range.contains(task, now))
        .collect::<Vec<_>>();

    let total_tasks = window.len();
    let completed_tasks = window.iter().filter(|task| task.completed).count();
    let overdue_tasks = window.iter().filter(|task| is_overdue(task, now)).count();
    let total_time = window.iter().map(|task| task.estimated_minutes()).sum::<u64>();
    let completed_time = window
        .iter()
        .filter(|task| task.completed)
        .map(|task| task.estimated_minutes())
        .sum::<u64>();
    let average_task_time = if total_tasks == 0 {
        0
    } else {
        let count = total_tasks as u64;
        (2 * total_time + count) / (2 * count)
    };

    TaskStats {
        total_tasks,
        completed_tasks,
        pending_tasks: total_tasks - completed_tasks,
        overdue_tasks,
        total_time,
        completed_time,
        remaining_time: total_time.saturating_sub(completed_time),
        productivity_score: rounded_percentage(completed_tasks as u64, total_tasks as u64),
        average_task_time,
        completed_time_percentage: rounded_percentage(completed_time, total_time),
    }
}

/// Trailing seven calendar days, oldest first, by creation date.
pub fn weekly_activity(tasks: &[Task], now: DateTime<Utc>) -> Vec<DailyActivity> {
    let today = now.date_naive();
    (0..7)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            let (completed, pending) = tasks
                .iter()
                .filter(|task| task.created_at.date_naive() == date)
                .fold((0, 0), |(completed, pending), task| {
                    if task.completed {
                        (completed + 1, pending)
                    } else {
                        (completed, pending + 1)
                    }
                });
            DailyActivity {
                date,
                day: date.format("%a").to_string(),
                completed,
                pending,
                total: completed + pending,
            }
        })
        .collect()
}

/// Every category seen across all tasks, in order of first appearance.
pub fn category_breakdown(tasks: &[Task]) -> Vec<CategoryBreakdown> {
    let mut breakdown: Vec<CategoryBreakdown> = Vec::new();
    for task in tasks {
        let category = task.category_or_default();
        let index = match breakdown.iter().position(|entry| entry.category == category) {
            Some(index) => index,
            None => {
                breakdown.push(CategoryBreakdown {
                    category: category.to_string(),
                    completed: 0,
                    total: 0,
                    percentage: None,
                    token: category_token(breakdown.len()),
                    color: category_token(breakdown.len()).chart_color(),
                });
                breakdown.len() - 1
            }
        };
        let entry = &mut breakdown[index];
        entry.total += 1;
        if task.completed {
            entry.completed += 1;
        }
    }

    for entry in &mut breakdown {
        entry.percentage = (entry.total > 0)
            .then(|| rounded_percentage(entry.completed as u64, entry.total as u64));
    }
    breakdown
}

pub fn priority_distribution(tasks: &[Task]) -> Vec<PriorityCount> {
    Priority::KNOWN
        .iter()
        .map(|priority| PriorityCount {
            priority: *priority,
            label: priority.label(),
            count: tasks.iter().filter(|task| task.priority == *priority).count(),
            token: priority_token(*priority),
            color: priority_token(*priority).chart_color(),
        })
        .collect()
}

/// Dashboard list: status filter plus case-insensitive search over title and description.
pub fn filter_tasks<'a>(tasks: &'a [Task], filter: StatusFilter, search: &str) -> Vec<&'a Task> {
    let needle = search.trim().to_lowercase();
    tasks
        .iter()
        .filter(|task| filter.matches(task))
        .filter(|task| {
            needle.is_empty()
                || task.title.to_lowercase().contains(&needle)
                || task
                    .description
                    .as_deref()
                    .map(|description| description.to_lowercase().contains(&needle))
                    .unwrap_or(false)
        })
        .collect()
}

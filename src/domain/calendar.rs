use crate::domain::models::Task;
use chrono::{Datelike, Months, NaiveDate};

pub const UPCOMING_DEADLINE_LIMIT: usize = 5;

pub fn tasks_due_on(tasks: &[Task], date: NaiveDate) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|task| task.due_date == Some(date))
        .collect()
}

/// Cells for a Sunday-first month view: blanks before the 1st, then every day.
pub fn month_grid(year: i32, month: u32) -> Vec<Option<NaiveDate>> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };
    let leading = first.weekday().num_days_from_sunday() as usize;
    let mut cells = vec![None; leading];
    cells.extend(first.iter_days().take_while(|day| day.month() == month).map(Some));
    cells
}

pub fn shift_month(date: NaiveDate, delta: i32) -> NaiveDate {
    let months = Months::new(delta.unsigned_abs());
    let shifted = if delta >= 0 {
        date.checked_add_months(months)
    } else {
        date.checked_sub_months(months)
    };
    shifted.unwrap_or(date)
}

/// Pending tasks with a due date, soonest first.
pub fn upcoming_deadlines(tasks: &[Task], limit: usize) -> Vec<&Task> {
    let mut pending = tasks
        .iter()
        .filter(|task| !task.completed && task.due_date.is_some())
        .collect::<Vec<_>>();
    pending.sort_by_key(|task| task.due_date);
    pending.truncate(limit);
    pending
}

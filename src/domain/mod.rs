pub mod analytics;
pub mod calendar;
pub mod models;
pub mod pomodoro;
pub mod style;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_CATEGORY: &str = "General";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    #[serde(other)]
    Unknown,
}

impl Priority {
    pub const KNOWN: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Unknown => "Unknown",
        }
    }

    fn unspecified() -> Self {
        Self::Unknown
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub description: Option<String>,
    #[serde(default = "Priority::unspecified")]
    pub priority: Priority,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default, deserialize_with = "optional_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "optional_minutes")]
    pub estimated_time: Option<u32>,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.title, "task.title")?;
        if self.id <= 0 {
            return Err("task.id must be > 0".to_string());
        }
        Ok(())
    }

    pub fn category_or_default(&self) -> &str {
        let category = self.category.trim();
        if category.is_empty() {
            DEFAULT_CATEGORY
        } else {
            category
        }
    }

    pub fn estimated_minutes(&self) -> u64 {
        u64::from(self.estimated_time.unwrap_or(0))
    }
}

/// Fields supplied by the "add task" form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub category: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub estimated_time: Option<u32>,
}

/// Partial edit; `None` leaves a field untouched. `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub category: Option<String>,
    pub due_date: Option<Option<NaiveDate>>,
    pub estimated_time: Option<Option<u32>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum TimerMode {
    Work,
    ShortBreak,
    LongBreak,
}

impl TimerMode {
    pub const ALL: [TimerMode; 3] = [TimerMode::Work, TimerMode::ShortBreak, TimerMode::LongBreak];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::ShortBreak => "shortBreak",
            Self::LongBreak => "longBreak",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Work => "Focus Time",
            Self::ShortBreak => "Short Break",
            Self::LongBreak => "Long Break",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroSettings {
    pub work_time: u32,
    pub short_break: u32,
    pub long_break: u32,
    pub auto_start_breaks: bool,
    pub auto_start_pomodoros: bool,
}

impl Default for PomodoroSettings {
    fn default() -> Self {
        Self {
            work_time: 25,
            short_break: 5,
            long_break: 15,
            auto_start_breaks: false,
            auto_start_pomodoros: false,
        }
    }
}

impl PomodoroSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.work_time == 0 {
            return Err("pomodoro.work_time must be > 0".to_string());
        }
        if self.short_break == 0 {
            return Err("pomodoro.short_break must be > 0".to_string());
        }
        if self.long_break == 0 {
            return Err("pomodoro.long_break must be > 0".to_string());
        }
        Ok(())
    }

    pub fn duration_seconds(&self, mode: TimerMode) -> u32 {
        let minutes = match mode {
            TimerMode::Work => self.work_time,
            TimerMode::ShortBreak => self.short_break,
            TimerMode::LongBreak => self.long_break,
        };
        minutes.saturating_mul(60)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimerState {
    pub mode: TimerMode,
    pub seconds_remaining: u32,
    pub running: bool,
    pub completed_work_sessions: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyQuote {
    pub quote: String,
    pub author: String,
    pub date: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub notifications: bool,
    pub sound_enabled: bool,
    pub auto_start_breaks: bool,
    pub auto_start_pomodoros: bool,
    pub work_time: u32,
    pub short_break: u32,
    pub long_break: u32,
    pub long_break_interval: u32,
    pub user_name: String,
    pub user_email: String,
    pub theme: Theme,
}

impl Default for AppSettings {
    fn default() -> Self {
        let pomodoro = PomodoroSettings::default();
        Self {
            notifications: true,
            sound_enabled: true,
            auto_start_breaks: pomodoro.auto_start_breaks,
            auto_start_pomodoros: pomodoro.auto_start_pomodoros,
            work_time: pomodoro.work_time,
            short_break: pomodoro.short_break,
            long_break: pomodoro.long_break,
            long_break_interval: 4,
            user_name: "Student".to_string(),
            user_email: "student@example.com".to_string(),
            theme: Theme::default(),
        }
    }
}

impl AppSettings {
    pub fn pomodoro(&self) -> PomodoroSettings {
        PomodoroSettings {
            work_time: self.work_time,
            short_break: self.short_break,
            long_break: self.long_break,
            auto_start_breaks: self.auto_start_breaks,
            auto_start_pomodoros: self.auto_start_pomodoros,
        }
    }

    pub fn set_pomodoro(&mut self, pomodoro: PomodoroSettings) {
        self.work_time = pomodoro.work_time;
        self.short_break = pomodoro.short_break;
        self.long_break = pomodoro.long_break;
        self.auto_start_breaks = pomodoro.auto_start_breaks;
        self.auto_start_pomodoros = pomodoro.auto_start_pomodoros;
    }

    pub fn validate(&self) -> Result<(), String> {
        self.pomodoro().validate()?;
        if self.long_break_interval == 0 {
            return Err("settings.long_break_interval must be > 0".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Message,
    Typing,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender: Sender,
    pub kind: MessageKind,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn is_typing(&self) -> bool {
        self.kind == MessageKind::Typing
    }
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|text| !text.trim().is_empty()))
}

// The dashboard stores "" for an unset due date.
fn optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("dueDate must be YYYY-MM-DD, got '{raw}'"))),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMinutes {
    Number(u64),
    Text(String),
}

// Form input arrives as a string ("", "45"); unparsable text counts as unset.
fn optional_minutes<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<RawMinutes>::deserialize(deserializer)?;
    Ok(match value {
        None => None,
        Some(RawMinutes::Number(minutes)) => u32::try_from(minutes).ok(),
        Some(RawMinutes::Text(text)) => text.trim().parse::<u32>().ok(),
    })
}

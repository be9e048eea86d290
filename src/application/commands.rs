use crate::application::backup::{self, BackupFile, ImportSummary};
use crate::application::bootstrap::bootstrap_workspace;
use crate::application::chat_relay::{ChatRelay, DictationOutcome, DICTATION_LANGUAGE};
use crate::application::quote_cache::{QuoteCache, QuoteOrigin, QuoteOutcome};
use crate::application::settings_store::SettingsStore;
use crate::application::task_store::TaskStore;
use crate::application::ticker::{PomodoroTicker, TickFlow, TICK_PERIOD};
use crate::domain::analytics::{
    category_breakdown, dashboard_counts, filter_tasks, is_overdue, priority_distribution,
    task_stats, weekly_activity, CategoryBreakdown, DailyActivity, DashboardCounts, PriorityCount,
    StatusFilter, TaskStats, TimeRange,
};
use crate::domain::calendar::{
    month_grid, shift_month, tasks_due_on, upcoming_deadlines, UPCOMING_DEADLINE_LIMIT,
};
use crate::domain::models::{
    AppSettings, ChatMessage, Task, TaskDraft, TaskPatch, TimerMode, TimerState,
};
use crate::domain::pomodoro::{ModeCompleted, PomodoroTimer};
use crate::domain::style::{priority_token, sender_token, timer_mode_token, StyleToken};
use crate::infrastructure::chat_client::{ChatTransport, ReqwestChatClient};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::quote_client::ReqwestQuoteClient;
use crate::infrastructure::speech::{SpeechRecognizer, UnavailableRecognizer};
use crate::infrastructure::storage::{KeyValueStore, SqliteKeyValueStore};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;

type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// JSON-lines command log shared with the ticker task.
#[derive(Debug)]
struct CommandLog {
    path: PathBuf,
    guard: Mutex<()>,
}

impl CommandLog {
    fn new(logs_dir: &Path) -> Self {
        Self {
            path: logs_dir.join("commands.log"),
            guard: Mutex::new(()),
        }
    }

    fn append(&self, level: &str, command: &str, message: &str) {
        let Ok(_guard) = self.guard.lock() else {
            return;
        };
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(file, "{}", payload);
        }
    }
}

pub struct AppState {
    config: AppConfig,
    config_dir: PathBuf,
    database_path: PathBuf,
    store: Arc<dyn KeyValueStore>,
    runtime: Arc<Mutex<RuntimeState>>,
    ticker: Mutex<Option<PomodoroTicker>>,
    quote_cache: QuoteCache<ReqwestQuoteClient>,
    chat_transport: Arc<dyn ChatTransport>,
    speech: Arc<dyn SpeechRecognizer>,
    log: Arc<CommandLog>,
    now_provider: NowProvider,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let config = bootstrap.config;
        let store: Arc<dyn KeyValueStore> =
            Arc::new(SqliteKeyValueStore::new(&bootstrap.database_path));

        let tasks = TaskStore::load(store.clone())?;
        let settings = SettingsStore::load(store.clone())?;
        let timer = PomodoroTimer::new(&settings.settings().pomodoro());
        let runtime = RuntimeState {
            tasks,
            settings,
            timer,
            chat: ChatRelay::new(),
            notices: Vec::new(),
            ticker_generation: 0,
        };

        let quote_cache = QuoteCache::new(
            Arc::new(ReqwestQuoteClient::new(config.quote_endpoint.clone())),
            store.clone(),
            config.timezone,
        );
        let chat_transport: Arc<dyn ChatTransport> =
            Arc::new(ReqwestChatClient::new(config.chat_endpoint.clone()));

        Ok(Self {
            config,
            config_dir: bootstrap.config_dir,
            database_path: bootstrap.database_path,
            store,
            runtime: Arc::new(Mutex::new(runtime)),
            ticker: Mutex::new(None),
            quote_cache,
            chat_transport,
            speech: Arc::new(UnavailableRecognizer),
            log: Arc::new(CommandLog::new(&bootstrap.logs_dir)),
            now_provider: Arc::new(Utc::now),
        })
    }

    /// Hosts with a microphone pipeline plug it in here.
    pub fn with_speech_recognizer(mut self, speech: Arc<dyn SpeechRecognizer>) -> Self {
        self.speech = speech;
        self
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.log.append("info", command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        self.log.append("error", command, message);
    }

    fn now(&self) -> DateTime<Utc> {
        (self.now_provider)()
    }
}

struct RuntimeState {
    tasks: TaskStore,
    settings: SettingsStore,
    timer: PomodoroTimer,
    chat: ChatRelay,
    notices: Vec<TimerNotice>,
    ticker_generation: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TaskCardView {
    pub task: Task,
    pub priority_label: &'static str,
    pub priority_token: StyleToken,
    pub overdue: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DashboardView {
    pub counts: DashboardCounts,
    pub upcoming_deadlines: Vec<Task>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AnalyticsView {
    pub range: TimeRange,
    pub stats: TaskStats,
    pub weekly_activity: Vec<DailyActivity>,
    pub categories: Vec<CategoryBreakdown>,
    pub priorities: Vec<PriorityCount>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CalendarCell {
    pub date: Option<NaiveDate>,
    pub task_count: usize,
    pub is_today: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CalendarMonthView {
    pub year: i32,
    pub month: u32,
    pub title: String,
    pub cells: Vec<CalendarCell>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PomodoroView {
    pub state: TimerState,
    pub label: &'static str,
    pub token: StyleToken,
    pub remaining: String,
    pub duration_seconds: u32,
    pub progress: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TimerNotice {
    pub finished: TimerMode,
    pub next: TimerMode,
    pub message: String,
    pub play_sound: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChatMessageView {
    pub message: ChatMessage,
    pub token: StyleToken,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChatTranscriptView {
    pub messages: Vec<ChatMessageView>,
    pub draft: String,
    pub listening: bool,
    pub waiting: bool,
}

pub fn create_task_impl(state: &AppState, draft: TaskDraft) -> Result<Task, InfraError> {
    let now = state.now();
    let task = {
        let mut runtime = lock_runtime(state)?;
        runtime.tasks.add(draft, now)?
    };

    state.log_info("create_task", &format!("created task_id={}", task.id));
    Ok(task)
}

pub fn list_tasks_impl(state: &AppState) -> Result<Vec<Task>, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(runtime.tasks.tasks().to_vec())
}

pub fn toggle_task_impl(state: &AppState, task_id: i64) -> Result<Task, InfraError> {
    let task = {
        let mut runtime = lock_runtime(state)?;
        runtime.tasks.toggle_complete(task_id)?
    };

    state.log_info(
        "toggle_task",
        &format!("task_id={task_id} completed={}", task.completed),
    );
    Ok(task)
}

pub fn edit_task_impl(state: &AppState, task_id: i64, patch: TaskPatch) -> Result<Task, InfraError> {
    let task = {
        let mut runtime = lock_runtime(state)?;
        runtime.tasks.edit(task_id, patch)?
    };

    state.log_info("edit_task", &format!("updated task_id={task_id}"));
    Ok(task)
}

pub fn delete_task_impl(state: &AppState, task_id: i64) -> Result<bool, InfraError> {
    let removed = {
        let mut runtime = lock_runtime(state)?;
        runtime.tasks.delete(task_id)?
    };

    if removed {
        state.log_info("delete_task", &format!("deleted task_id={task_id}"));
    }
    Ok(removed)
}

pub fn dashboard_impl(state: &AppState) -> Result<DashboardView, InfraError> {
    let now = state.now();
    let runtime = lock_runtime(state)?;
    let tasks = runtime.tasks.tasks();
    Ok(DashboardView {
        counts: dashboard_counts(tasks, now),
        upcoming_deadlines: upcoming_deadlines(tasks, UPCOMING_DEADLINE_LIMIT)
            .into_iter()
            .cloned()
            .collect(),
    })
}

pub fn filter_tasks_impl(
    state: &AppState,
    filter: Option<String>,
    search: Option<String>,
) -> Result<Vec<TaskCardView>, InfraError> {
    let filter = match filter.as_deref() {
        Some(value) => StatusFilter::parse(value)
            .ok_or_else(|| InfraError::InvalidInput(format!("unknown task filter: {value}")))?,
        None => StatusFilter::All,
    };
    let now = state.now();
    let runtime = lock_runtime(state)?;
    Ok(filter_tasks(runtime.tasks.tasks(), filter, search.as_deref().unwrap_or(""))
        .into_iter()
        .map(|task| TaskCardView {
            task: task.clone(),
            priority_label: task.priority.label(),
            priority_token: priority_token(task.priority),
            overdue: is_overdue(task, now),
        })
        .collect())
}

pub fn analytics_impl(state: &AppState, range: Option<String>) -> Result<AnalyticsView, InfraError> {
    let range = match range.as_deref() {
        Some(value) => TimeRange::parse(value)
            .ok_or_else(|| InfraError::InvalidInput(format!("unknown time range: {value}")))?,
        None => TimeRange::Week,
    };
    let now = state.now();
    let runtime = lock_runtime(state)?;
    let tasks = runtime.tasks.tasks();
    Ok(AnalyticsView {
        range,
        stats: task_stats(tasks, range, now),
        weekly_activity: weekly_activity(tasks, now),
        categories: category_breakdown(tasks),
        priorities: priority_distribution(tasks),
    })
}

/// Month containing `anchor` shifted by `offset` months; `anchor` defaults to today.
pub fn calendar_month_impl(
    state: &AppState,
    anchor: Option<String>,
    offset: i32,
) -> Result<CalendarMonthView, InfraError> {
    let today = state.now().date_naive();
    let anchor = match anchor.as_deref() {
        Some(value) => parse_date_input(value, "anchor")?,
        None => today,
    };
    let month_start = shift_month(anchor.with_day(1).unwrap_or(anchor), offset);

    let runtime = lock_runtime(state)?;
    let tasks = runtime.tasks.tasks();
    let cells = month_grid(month_start.year(), month_start.month())
        .into_iter()
        .map(|date| CalendarCell {
            date,
            task_count: date.map_or(0, |day| tasks_due_on(tasks, day).len()),
            is_today: date == Some(today),
        })
        .collect();

    Ok(CalendarMonthView {
        year: month_start.year(),
        month: month_start.month(),
        title: month_start.format("%B %Y").to_string(),
        cells,
    })
}

pub fn tasks_due_on_impl(state: &AppState, date: String) -> Result<Vec<Task>, InfraError> {
    let date = parse_date_input(&date, "date")?;
    let runtime = lock_runtime(state)?;
    Ok(tasks_due_on(runtime.tasks.tasks(), date)
        .into_iter()
        .cloned()
        .collect())
}

pub fn get_pomodoro_state_impl(state: &AppState) -> Result<PomodoroView, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(pomodoro_view(&runtime))
}

/// Starts the countdown and its one-second ticker on the current tokio runtime.
pub fn start_pomodoro_impl(state: &AppState) -> Result<PomodoroView, InfraError> {
    let handle = Handle::try_current().map_err(|error| {
        InfraError::Unsupported(format!("pomodoro ticker requires a tokio runtime: {error}"))
    })?;

    // Lock order: runtime, then ticker.
    let view = {
        let mut runtime = lock_runtime(state)?;
        let mut ticker = lock_ticker(state)?;
        let was_running = runtime.timer.is_running();
        let ticking = ticker.as_ref().is_some_and(|current| !current.is_finished());
        runtime.timer.start();
        if !was_running || !ticking {
            runtime.ticker_generation = runtime.ticker_generation.wrapping_add(1);
            if let Some(previous) = ticker.take() {
                previous.cancel();
            }
            *ticker = Some(spawn_ticker(state, &handle, runtime.ticker_generation));
        }
        pomodoro_view(&runtime)
    };

    state.log_info(
        "start_pomodoro",
        &format!("mode={} remaining={}", view.state.mode.as_str(), view.remaining),
    );
    Ok(view)
}

pub fn pause_pomodoro_impl(state: &AppState) -> Result<PomodoroView, InfraError> {
    let view = {
        let mut runtime = lock_runtime(state)?;
        runtime.timer.pause();
        pomodoro_view(&runtime)
    };
    stop_ticker(state)?;

    state.log_info("pause_pomodoro", &format!("remaining={}", view.remaining));
    Ok(view)
}

pub fn reset_pomodoro_impl(state: &AppState) -> Result<PomodoroView, InfraError> {
    let view = {
        let mut runtime = lock_runtime(state)?;
        let settings = runtime.settings.settings().pomodoro();
        runtime.timer.reset(&settings);
        pomodoro_view(&runtime)
    };
    stop_ticker(state)?;

    state.log_info("reset_pomodoro", &format!("mode={}", view.state.mode.as_str()));
    Ok(view)
}

pub fn switch_pomodoro_mode_impl(state: &AppState, mode: String) -> Result<PomodoroView, InfraError> {
    let target = parse_timer_mode(&mode)?;
    let view = {
        let mut runtime = lock_runtime(state)?;
        let settings = runtime.settings.settings().pomodoro();
        runtime
            .timer
            .switch_mode(target, &settings)
            .map_err(InfraError::InvalidInput)?;
        pomodoro_view(&runtime)
    };

    state.log_info("switch_pomodoro_mode", &format!("mode={}", target.as_str()));
    Ok(view)
}

/// Drains completion notices queued by the ticker.
pub fn take_timer_notices_impl(state: &AppState) -> Result<Vec<TimerNotice>, InfraError> {
    let mut runtime = lock_runtime(state)?;
    Ok(std::mem::take(&mut runtime.notices))
}

pub fn get_settings_impl(state: &AppState) -> Result<AppSettings, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(runtime.settings.settings().clone())
}

pub fn update_settings_impl(state: &AppState, settings: AppSettings) -> Result<AppSettings, InfraError> {
    let updated = {
        let mut runtime = lock_runtime(state)?;
        let previous = runtime.settings.update(settings)?;
        let current = runtime.settings.settings().clone();
        runtime
            .timer
            .settings_changed(&previous.pomodoro(), &current.pomodoro());
        current
    };

    state.log_info(
        "update_settings",
        &format!(
            "work={} short_break={} long_break={}",
            updated.work_time, updated.short_break, updated.long_break
        ),
    );
    Ok(updated)
}

pub fn reset_settings_impl(state: &AppState) -> Result<AppSettings, InfraError> {
    let updated = {
        let mut runtime = lock_runtime(state)?;
        let previous = runtime.settings.reset_to_defaults()?;
        let current = runtime.settings.settings().clone();
        runtime
            .timer
            .settings_changed(&previous.pomodoro(), &current.pomodoro());
        current
    };

    state.log_info("reset_settings", "settings restored to defaults");
    Ok(updated)
}

pub async fn get_quote_impl(state: &AppState) -> QuoteOutcome {
    let outcome = state.quote_cache.get_quote().await;
    log_quote(state, "get_quote", &outcome);
    outcome
}

pub async fn refresh_quote_impl(state: &AppState) -> QuoteOutcome {
    let outcome = state.quote_cache.refresh().await;
    log_quote(state, "refresh_quote", &outcome);
    outcome
}

/// Returns `None` when the input was blank and nothing was sent.
pub async fn send_chat_message_impl(
    state: &AppState,
    text: String,
) -> Result<Option<ChatMessage>, InfraError> {
    let pending = {
        let mut runtime = lock_runtime(state)?;
        runtime.chat.begin_send(&text)
    };
    let Some(pending) = pending else {
        return Ok(None);
    };

    let transport = state.chat_transport.clone();
    let reply = transport.send_message(&pending.message).await;
    if let Err(error) = &reply {
        state.log_error("send_chat_message", &error.to_string());
    }

    let message = {
        let mut runtime = lock_runtime(state)?;
        runtime.chat.finish_send(pending, reply).clone()
    };

    state.log_info("send_chat_message", &format!("reply_chars={}", message.text.len()));
    Ok(Some(message))
}

pub fn chat_transcript_impl(state: &AppState) -> Result<ChatTranscriptView, InfraError> {
    let runtime = lock_runtime(state)?;
    let chat = &runtime.chat;
    Ok(ChatTranscriptView {
        messages: chat
            .transcript()
            .iter()
            .map(|message| ChatMessageView {
                message: message.clone(),
                token: sender_token(message.sender),
            })
            .collect(),
        draft: chat.draft().to_string(),
        listening: chat.is_listening(),
        waiting: chat.is_waiting(),
    })
}

pub fn set_chat_draft_impl(state: &AppState, text: String) -> Result<(), InfraError> {
    let mut runtime = lock_runtime(state)?;
    runtime.chat.set_draft(text);
    Ok(())
}

pub async fn dictate_impl(state: &AppState) -> Result<DictationOutcome, InfraError> {
    let recognizer = state.speech.clone();
    let started = {
        let mut runtime = lock_runtime(state)?;
        runtime.chat.begin_dictation(recognizer.as_ref())
    };
    if let Err(outcome) = started {
        return Ok(outcome);
    }

    let result = recognizer.recognize_once(DICTATION_LANGUAGE).await;
    let outcome = {
        let mut runtime = lock_runtime(state)?;
        runtime.chat.finish_dictation(result)
    };

    state.log_info("dictate", &format!("outcome={outcome:?}"));
    Ok(outcome)
}

pub fn export_backup_impl(state: &AppState) -> Result<BackupFile, InfraError> {
    let backup = backup::export_backup(state.store.as_ref(), state.now())?;
    state.log_info("export_backup", &format!("file={}", backup.file_name));
    Ok(backup)
}

/// Writes the validated blobs only; call `reload_impl` to pick them up.
pub fn import_backup_impl(state: &AppState, raw: String) -> Result<ImportSummary, InfraError> {
    let summary = backup::import_backup(state.store.as_ref(), &raw)?;
    state.log_info(
        "import_backup",
        &format!(
            "tasks={:?} settings={}",
            summary.tasks_imported, summary.settings_imported
        ),
    );
    Ok(summary)
}

pub fn clear_all_data_impl(state: &AppState) -> Result<(), InfraError> {
    backup::clear_all_data(state.store.as_ref())?;
    reload_runtime(state)?;
    state.log_info("clear_all_data", "removed persisted tasks, settings and quote");
    Ok(())
}

pub fn reload_impl(state: &AppState) -> Result<(), InfraError> {
    reload_runtime(state)?;
    state.log_info("reload", "reloaded tasks and settings");
    Ok(())
}

fn reload_runtime(state: &AppState) -> Result<(), InfraError> {
    let mut runtime = lock_runtime(state)?;
    let previous = runtime.settings.settings().pomodoro();
    runtime.tasks.reload()?;
    runtime.settings.reload()?;
    let current = runtime.settings.settings().pomodoro();
    runtime.timer.settings_changed(&previous, &current);
    Ok(())
}

fn lock_runtime(state: &AppState) -> Result<MutexGuard<'_, RuntimeState>, InfraError> {
    state
        .runtime
        .lock()
        .map_err(|error| InfraError::InvalidConfig(format!("runtime lock poisoned: {error}")))
}

fn lock_ticker(state: &AppState) -> Result<MutexGuard<'_, Option<PomodoroTicker>>, InfraError> {
    state
        .ticker
        .lock()
        .map_err(|error| InfraError::InvalidConfig(format!("ticker lock poisoned: {error}")))
}

// A ticker whose generation was superseded stops without ticking.
fn spawn_ticker(state: &AppState, handle: &Handle, generation: u64) -> PomodoroTicker {
    let runtime = state.runtime.clone();
    let log = state.log.clone();
    PomodoroTicker::spawn(handle, TICK_PERIOD, move || {
        let Ok(mut runtime) = runtime.lock() else {
            return TickFlow::Stop;
        };
        if runtime.ticker_generation != generation {
            return TickFlow::Stop;
        }
        let settings = runtime.settings.settings().clone();
        if let Some(completed) = runtime.timer.tick(&settings.pomodoro()) {
            log.append("info", "pomodoro_tick", &completion_message(&completed));
            if settings.notifications {
                runtime.notices.push(TimerNotice {
                    finished: completed.finished,
                    next: completed.next,
                    message: completion_message(&completed),
                    play_sound: settings.sound_enabled,
                });
            }
        }
        if runtime.timer.is_running() {
            TickFlow::Continue
        } else {
            TickFlow::Stop
        }
    })
}

fn stop_ticker(state: &AppState) -> Result<(), InfraError> {
    if let Some(ticker) = lock_ticker(state)?.take() {
        ticker.cancel();
    }
    Ok(())
}

fn completion_message(completed: &ModeCompleted) -> String {
    format!(
        "{} complete. Up next: {}",
        completed.finished.label(),
        completed.next.label()
    )
}

fn pomodoro_view(runtime: &RuntimeState) -> PomodoroView {
    let settings = runtime.settings.settings().pomodoro();
    let timer = &runtime.timer;
    PomodoroView {
        state: timer.state(),
        label: timer.mode().label(),
        token: timer_mode_token(timer.mode()),
        remaining: timer.formatted_remaining(),
        duration_seconds: timer.duration(&settings),
        progress: timer.progress(&settings),
    }
}

fn log_quote(state: &AppState, command: &str, outcome: &QuoteOutcome) {
    match outcome.origin {
        QuoteOrigin::Fallback => state.log_error(command, "quote fetch failed; served fallback"),
        origin => state.log_info(command, &format!("origin={origin:?}")),
    }
}

fn parse_timer_mode(value: &str) -> Result<TimerMode, InfraError> {
    TimerMode::ALL
        .into_iter()
        .find(|mode| mode.as_str().eq_ignore_ascii_case(value.trim()))
        .ok_or_else(|| InfraError::InvalidInput(format!("unknown timer mode: {value}")))
}

fn parse_date_input(value: &str, field_name: &str) -> Result<NaiveDate, InfraError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|error| {
        InfraError::InvalidInput(format!("{field_name} must be YYYY-MM-DD: {error}"))
    })
}

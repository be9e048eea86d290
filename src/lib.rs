pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::backup::{BackupFile, ImportSummary};
pub use application::bootstrap::{bootstrap_workspace, BootstrapResult};
pub use application::chat_relay::{ChatRelay, DictationOutcome};
pub use application::commands::{
    analytics_impl, calendar_month_impl, chat_transcript_impl, clear_all_data_impl,
    create_task_impl, dashboard_impl, delete_task_impl, dictate_impl, edit_task_impl,
    export_backup_impl, filter_tasks_impl, get_pomodoro_state_impl, get_quote_impl,
    get_settings_impl, import_backup_impl, list_tasks_impl, pause_pomodoro_impl,
    refresh_quote_impl, reload_impl, reset_pomodoro_impl, reset_settings_impl,
    send_chat_message_impl, set_chat_draft_impl, start_pomodoro_impl, switch_pomodoro_mode_impl,
    take_timer_notices_impl, tasks_due_on_impl, toggle_task_impl, update_settings_impl,
    AnalyticsView, AppState, CalendarCell, CalendarMonthView, ChatMessageView,
    ChatTranscriptView, DashboardView, PomodoroView, TaskCardView, TimerNotice,
};
pub use application::quote_cache::{QuoteOrigin, QuoteOutcome};
pub use domain::models::{
    AppSettings, ChatMessage, PomodoroSettings, Priority, Task, TaskDraft, TaskPatch, Theme,
    TimerMode, TimerState,
};
pub use infrastructure::error::InfraError;

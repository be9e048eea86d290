use crate::domain::models::{PomodoroSettings, TimerMode, TimerState};
use serde::Serialize;

/// Work sessions per long-break cycle; the third completion in each cycle earns the long break.
const LONG_BREAK_CYCLE: u32 = 3;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ModeCompleted {
    pub finished: TimerMode,
    pub next: TimerMode,
    pub auto_started: bool,
    pub completed_work_sessions: u32,
}

/// Countdown state machine. Durations are never cached: every call takes the
/// live settings so edits show up on the next render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PomodoroTimer {
    mode: TimerMode,
    seconds_remaining: u32,
    running: bool,
    completed_work_sessions: u32,
}

impl PomodoroTimer {
    pub fn new(settings: &PomodoroSettings) -> Self {
        Self {
            mode: TimerMode::Work,
            seconds_remaining: settings.duration_seconds(TimerMode::Work),
            running: false,
            completed_work_sessions: 0,
        }
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.seconds_remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn completed_work_sessions(&self) -> u32 {
        self.completed_work_sessions
    }

    pub fn state(&self) -> TimerState {
        TimerState {
            mode: self.mode,
            seconds_remaining: self.seconds_remaining,
            running: self.running,
            completed_work_sessions: self.completed_work_sessions,
        }
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn reset(&mut self, settings: &PomodoroSettings) {
        self.running = false;
        self.seconds_remaining = settings.duration_seconds(self.mode);
    }

    pub fn switch_mode(&mut self, target: TimerMode, settings: &PomodoroSettings) -> Result<(), String> {
        if self.running {
            return Err("cannot switch mode while the timer is running".to_string());
        }
        self.mode = target;
        self.seconds_remaining = settings.duration_seconds(target);
        Ok(())
    }

    /// One second elapsed. Ignored while paused.
    pub fn tick(&mut self, settings: &PomodoroSettings) -> Option<ModeCompleted> {
        if !self.running {
            return None;
        }
        self.seconds_remaining = self.seconds_remaining.saturating_sub(1);
        if self.seconds_remaining > 0 {
            return None;
        }
        Some(self.complete(settings))
    }

    fn complete(&mut self, settings: &PomodoroSettings) -> ModeCompleted {
        let finished = self.mode;
        let (next, auto_started) = if finished == TimerMode::Work {
            let next = next_break(self.completed_work_sessions);
            self.completed_work_sessions = self.completed_work_sessions.saturating_add(1);
            (next, settings.auto_start_breaks)
        } else {
            (TimerMode::Work, settings.auto_start_pomodoros)
        };

        self.mode = next;
        self.seconds_remaining = settings.duration_seconds(next);
        self.running = auto_started;

        ModeCompleted {
            finished,
            next,
            auto_started,
            completed_work_sessions: self.completed_work_sessions,
        }
    }

    /// Keeps an untouched paused countdown in step with edited durations. A
    /// partially elapsed countdown is only clamped so progress stays in range.
    pub fn settings_changed(&mut self, previous: &PomodoroSettings, current: &PomodoroSettings) {
        if self.running {
            return;
        }
        let new_duration = current.duration_seconds(self.mode);
        if self.seconds_remaining == previous.duration_seconds(self.mode) {
            self.seconds_remaining = new_duration;
        } else {
            self.seconds_remaining = self.seconds_remaining.min(new_duration);
        }
    }

    pub fn duration(&self, settings: &PomodoroSettings) -> u32 {
        settings.duration_seconds(self.mode)
    }

    pub fn progress(&self, settings: &PomodoroSettings) -> f64 {
        let duration = self.duration(settings);
        if duration == 0 {
            return 0.0;
        }
        let elapsed = duration.saturating_sub(self.seconds_remaining);
        (f64::from(elapsed) / f64::from(duration)).clamp(0.0, 1.0)
    }

    pub fn formatted_remaining(&self) -> String {
        format_clock(self.seconds_remaining)
    }
}

fn next_break(completed_before: u32) -> TimerMode {
    if completed_before % LONG_BREAK_CYCLE == LONG_BREAK_CYCLE - 1 {
        TimerMode::LongBreak
    } else {
        TimerMode::ShortBreak
    }
}

pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn settings(work: u32, short: u32, long: u32) -> PomodoroSettings {
        PomodoroSettings {
            work_time: work,
            short_break: short,
            long_break: long,
            auto_start_breaks: false,
            auto_start_pomodoros: false,
        }
    }

    fn finish_current(timer: &mut PomodoroTimer, settings: &PomodoroSettings) -> ModeCompleted {
        timer.start();
        loop {
            if let Some(event) = timer.tick(settings) {
                return event;
            }
        }
    }

    #[test]
    fn new_timer_is_paused_work_at_full_duration() {
        let settings = PomodoroSettings::default();
        let timer = PomodoroTimer::new(&settings);
        assert_eq!(timer.mode(), TimerMode::Work);
        assert_eq!(timer.seconds_remaining(), 25 * 60);
        assert!(!timer.is_running());
        assert_eq!(timer.formatted_remaining(), "25:00");
    }

    #[test]
    fn one_second_work_session_moves_to_paused_short_break() {
        let settings = settings(1, 5, 15);
        let mut timer = PomodoroTimer::new(&settings);
        timer.seconds_remaining = 1;
        timer.start();

        let event = timer.tick(&settings).expect("work session completes");

        assert_eq!(event.finished, TimerMode::Work);
        assert_eq!(timer.mode(), TimerMode::ShortBreak);
        assert!(!timer.is_running());
        assert_eq!(timer.seconds_remaining(), 5 * 60);
        assert_eq!(timer.completed_work_sessions(), 1);
    }

    #[test]
    fn third_completed_session_earns_long_break() {
        let settings = settings(1, 5, 15);
        let mut timer = PomodoroTimer::new(&settings);
        let mut breaks = Vec::new();
        for _ in 0..3 {
            let event = finish_current(&mut timer, &settings);
            breaks.push(event.next);
            finish_current(&mut timer, &settings);
        }
        assert_eq!(
            breaks,
            vec![TimerMode::ShortBreak, TimerMode::ShortBreak, TimerMode::LongBreak]
        );
        assert_eq!(timer.completed_work_sessions(), 3);
        assert_eq!(timer.mode(), TimerMode::Work);
    }

    #[test]
    fn auto_start_flags_control_running_after_completion() {
        let mut settings = settings(1, 1, 1);
        settings.auto_start_breaks = true;
        let mut timer = PomodoroTimer::new(&settings);

        let event = finish_current(&mut timer, &settings);
        assert!(event.auto_started);
        assert!(timer.is_running());

        let event = finish_current(&mut timer, &settings);
        assert_eq!(event.next, TimerMode::Work);
        assert!(!event.auto_started);
        assert!(!timer.is_running());
    }

    #[test]
    fn pause_retains_remaining_and_ignores_ticks() {
        let settings = PomodoroSettings::default();
        let mut timer = PomodoroTimer::new(&settings);
        timer.start();
        timer.tick(&settings);
        timer.tick(&settings);
        timer.pause();
        assert_eq!(timer.tick(&settings), None);
        assert_eq!(timer.seconds_remaining(), 25 * 60 - 2);
    }

    #[test]
    fn reset_restores_duration_of_current_mode() {
        let settings = PomodoroSettings::default();
        let mut timer = PomodoroTimer::new(&settings);
        timer.switch_mode(TimerMode::LongBreak, &settings).expect("switch while paused");
        timer.start();
        timer.tick(&settings);
        timer.reset(&settings);
        assert!(!timer.is_running());
        assert_eq!(timer.mode(), TimerMode::LongBreak);
        assert_eq!(timer.seconds_remaining(), 15 * 60);
    }

    #[test]
    fn switch_mode_is_rejected_while_running() {
        let settings = PomodoroSettings::default();
        let mut timer = PomodoroTimer::new(&settings);
        timer.start();
        assert!(timer.switch_mode(TimerMode::ShortBreak, &settings).is_err());
        assert_eq!(timer.mode(), TimerMode::Work);
    }

    #[test]
    fn paused_untouched_countdown_tracks_settings_edits() {
        let previous = PomodoroSettings::default();
        let mut timer = PomodoroTimer::new(&previous);
        let current = PomodoroSettings {
            work_time: 50,
            ..previous
        };
        timer.settings_changed(&previous, &current);
        assert_eq!(timer.seconds_remaining(), 50 * 60);
        assert_eq!(timer.progress(&current), 0.0);
    }

    #[test]
    fn partially_elapsed_countdown_is_clamped_to_shorter_duration() {
        let previous = PomodoroSettings::default();
        let mut timer = PomodoroTimer::new(&previous);
        timer.seconds_remaining = 20 * 60;
        let current = PomodoroSettings {
            work_time: 10,
            ..previous
        };
        timer.settings_changed(&previous, &current);
        assert_eq!(timer.seconds_remaining(), 10 * 60);
    }

    #[test]
    fn running_countdown_ignores_settings_edits() {
        let previous = PomodoroSettings::default();
        let mut timer = PomodoroTimer::new(&previous);
        timer.start();
        let current = PomodoroSettings {
            work_time: 50,
            ..previous
        };
        timer.settings_changed(&previous, &current);
        assert_eq!(timer.seconds_remaining(), 25 * 60);
    }

    #[test]
    fn progress_uses_live_duration() {
        let settings = settings(10, 5, 15);
        let mut timer = PomodoroTimer::new(&settings);
        timer.seconds_remaining = 150;
        assert_eq!(timer.progress(&settings), 0.75);
    }

    #[test]
    fn format_clock_pads_minutes_and_seconds() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(61), "01:01");
        assert_eq!(format_clock(3600), "60:00");
    }

    // Long breaks land on every completion whose prior count is 2 mod 3.
    proptest! {
        #[test]
        fn long_break_cadence_holds_for_any_run(sessions in 1u32..30u32) {
            let settings = settings(1, 1, 1);
            let mut timer = PomodoroTimer::new(&settings);
            for index in 0..sessions {
                let event = finish_current(&mut timer, &settings);
                let expected = if index % 3 == 2 {
                    TimerMode::LongBreak
                } else {
                    TimerMode::ShortBreak
                };
                prop_assert_eq!(event.next, expected);
                prop_assert_eq!(event.completed_work_sessions, index + 1);
                finish_current(&mut timer, &settings);
            }
        }
    }
}

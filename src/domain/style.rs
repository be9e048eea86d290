use crate::domain::models::{Priority, Sender, TimerMode};
use serde::Serialize;

/// Fixed presentation tokens handed to the view layer.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StyleToken {
    Danger,
    Warning,
    Success,
    Neutral,
    Accent,
    Muted,
}

impl StyleToken {
    /// Chart colour used by the analytics surface.
    pub fn chart_color(self) -> &'static str {
        match self {
            Self::Danger => "#ef4444",
            Self::Warning => "#f59e0b",
            Self::Success => "#10b981",
            Self::Neutral => "#6b7280",
            Self::Accent => "#3b82f6",
            Self::Muted => "#8b5cf6",
        }
    }
}

pub fn priority_token(priority: Priority) -> StyleToken {
    match priority {
        Priority::High => StyleToken::Danger,
        Priority::Medium => StyleToken::Warning,
        Priority::Low => StyleToken::Success,
        Priority::Unknown => StyleToken::Neutral,
    }
}

pub fn timer_mode_token(mode: TimerMode) -> StyleToken {
    match mode {
        TimerMode::Work => StyleToken::Accent,
        TimerMode::ShortBreak => StyleToken::Success,
        TimerMode::LongBreak => StyleToken::Muted,
    }
}

pub fn sender_token(sender: Sender) -> StyleToken {
    match sender {
        Sender::User => StyleToken::Accent,
        Sender::Bot => StyleToken::Neutral,
    }
}

const CATEGORY_PALETTE: [StyleToken; 5] = [
    StyleToken::Accent,
    StyleToken::Success,
    StyleToken::Warning,
    StyleToken::Danger,
    StyleToken::Muted,
];

/// Categories are free text, so they cycle through the palette by position.
pub fn category_token(index: usize) -> StyleToken {
    CATEGORY_PALETTE[index % CATEGORY_PALETTE.len()]
}

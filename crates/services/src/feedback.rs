//! Everything the user sees besides the panels: notices, status lights and
//! the speech history.

use serde::Serialize;

use abacus_core::Clock;
use abacus_core::model::VoiceSettings;

use crate::history::{HistoryKind, SpeechHistoryLog};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A transient user-visible message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Microphone and speaker indicators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VoiceStatus {
    pub mic_active: bool,
    pub speaker_ready: bool,
}

/// Sink shared by the voice components for user-facing output.
#[derive(Debug)]
pub struct Feedback {
    clock: Clock,
    history: SpeechHistoryLog,
    notices: Vec<Notice>,
    status: VoiceStatus,
}

impl Feedback {
    #[must_use]
    pub fn new(settings: &VoiceSettings, clock: Clock) -> Self {
        Self {
            clock,
            history: SpeechHistoryLog::new(
                settings.history_capacity(),
                settings.history_visible(),
            ),
            notices: Vec::new(),
            status: VoiceStatus::default(),
        }
    }

    pub fn set_clock(&mut self, clock: Clock) {
        self.clock = clock;
    }

    pub fn record(&mut self, kind: HistoryKind, message: impl Into<String>) {
        let at = self.clock.now();
        self.history.record(kind, message, at);
    }

    pub fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice {
            level,
            message: message.into(),
        });
    }

    /// Drains queued notices, oldest first.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Queued notices not yet drained.
    #[must_use]
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    #[must_use]
    pub fn history(&self) -> &SpeechHistoryLog {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    #[must_use]
    pub fn status(&self) -> VoiceStatus {
        self.status
    }

    pub fn set_mic_active(&mut self, active: bool) {
        self.status.mic_active = active;
    }

    pub fn set_speaker_ready(&mut self, ready: bool) {
        self.status.speaker_ready = ready;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abacus_core::time::{fixed_clock, fixed_now};

    #[test]
    fn records_with_clock_time() {
        let mut feedback = Feedback::new(&VoiceSettings::default(), fixed_clock());
        feedback.record(HistoryKind::Recognition, "Started listening");
        let entry = feedback.history().latest().unwrap();
        assert_eq!(entry.timestamp, fixed_now());
        assert_eq!(entry.kind, HistoryKind::Recognition);
    }

    #[test]
    fn take_notices_drains() {
        let mut feedback = Feedback::new(&VoiceSettings::default(), fixed_clock());
        feedback.notify(NoticeLevel::Info, "hello");
        assert_eq!(feedback.take_notices().len(), 1);
        assert!(feedback.take_notices().is_empty());
    }
}

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("confidence threshold must be within [0, 1], got {0}")]
    InvalidConfidence(f32),
    #[error("backoff cap ({cap_ms}ms) is below the base delay ({base_ms}ms)")]
    BackoffCapTooLow { cap_ms: u64, base_ms: u64 },
    #[error("history capacity must be positive and at least the visible count ({visible})")]
    InvalidHistory { capacity: usize, visible: usize },
    #[error("voice {field} out of range: {value}")]
    InvalidVoice { field: &'static str, value: f32 },
    #[error("voice name must not be empty")]
    EmptyVoiceName,
}

/// Voice and prosody handed to the synthesis capability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeakerVoice {
    pub name: String,
    pub pitch: f32,
    pub rate: f32,
    pub volume: f32,
}

impl Default for SpeakerVoice {
    fn default() -> Self {
        Self {
            name: "US English Female".to_string(),
            pitch: 1.0,
            rate: 0.9,
            volume: 1.0,
        }
    }
}

/// Tunable constants of the voice pipeline.
///
/// The confidence gate is a policy knob, not a derived invariant: it only
/// applies outside continuous mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceSettings {
    confidence_threshold: f32,
    submit_delay_ms: u64,
    feedback_clear_ms: u64,
    resume_delay_ms: u64,
    end_backoff_base_ms: u64,
    error_backoff_step_ms: u64,
    backoff_cap_ms: u64,
    max_retries: u32,
    history_capacity: usize,
    history_visible: usize,
    praise_advance_ms: u64,
    silent_advance_ms: u64,
    announce_delay_ms: u64,
    clear_input_ms: u64,
    mic_test_ms: u64,
    voice: SpeakerVoice,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.3,
            submit_delay_ms: 800,
            feedback_clear_ms: 2_000,
            resume_delay_ms: 1_000,
            end_backoff_base_ms: 200,
            error_backoff_step_ms: 500,
            backoff_cap_ms: 2_000,
            max_retries: 5,
            history_capacity: 50,
            history_visible: 10,
            praise_advance_ms: 1_500,
            silent_advance_ms: 1_000,
            announce_delay_ms: 500,
            clear_input_ms: 3_000,
            mic_test_ms: 3_000,
            voice: SpeakerVoice::default(),
        }
    }
}

/// Partial overrides applied on top of the defaults.
#[derive(Debug, Clone, Default)]
pub struct VoiceSettingsDraft {
    pub confidence_threshold: Option<f32>,
    pub submit_delay_ms: Option<u64>,
    pub feedback_clear_ms: Option<u64>,
    pub resume_delay_ms: Option<u64>,
    pub backoff_cap_ms: Option<u64>,
    pub max_retries: Option<u32>,
    pub history_capacity: Option<usize>,
    pub history_visible: Option<usize>,
    pub voice: Option<SpeakerVoice>,
}

impl VoiceSettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the overrides and merge them into the defaults.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` when a value is out of range.
    pub fn validate(self) -> Result<VoiceSettings, SettingsError> {
        let mut settings = VoiceSettings::default();

        if let Some(threshold) = self.confidence_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(SettingsError::InvalidConfidence(threshold));
            }
            settings.confidence_threshold = threshold;
        }
        if let Some(ms) = self.submit_delay_ms {
            settings.submit_delay_ms = ms;
        }
        if let Some(ms) = self.feedback_clear_ms {
            settings.feedback_clear_ms = ms;
        }
        if let Some(ms) = self.resume_delay_ms {
            settings.resume_delay_ms = ms;
        }
        if let Some(cap) = self.backoff_cap_ms {
            if cap < settings.end_backoff_base_ms {
                return Err(SettingsError::BackoffCapTooLow {
                    cap_ms: cap,
                    base_ms: settings.end_backoff_base_ms,
                });
            }
            settings.backoff_cap_ms = cap;
        }
        if let Some(retries) = self.max_retries {
            settings.max_retries = retries;
        }

        let capacity = self.history_capacity.unwrap_or(settings.history_capacity);
        let visible = self.history_visible.unwrap_or(settings.history_visible);
        if capacity == 0 || visible > capacity {
            return Err(SettingsError::InvalidHistory { capacity, visible });
        }
        settings.history_capacity = capacity;
        settings.history_visible = visible;

        if let Some(voice) = self.voice {
            settings.voice = validate_voice(voice)?;
        }

        Ok(settings)
    }
}

fn validate_voice(mut voice: SpeakerVoice) -> Result<SpeakerVoice, SettingsError> {
    voice.name = voice.name.trim().to_string();
    if voice.name.is_empty() {
        return Err(SettingsError::EmptyVoiceName);
    }
    let checks = [
        ("pitch", voice.pitch, 0.0..=2.0),
        ("rate", voice.rate, 0.1..=1.5),
        ("volume", voice.volume, 0.0..=1.0),
    ];
    for (field, value, range) in checks {
        if !range.contains(&value) {
            return Err(SettingsError::InvalidVoice { field, value });
        }
    }
    Ok(voice)
}

impl VoiceSettings {
    #[must_use]
    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    /// Settle time between writing a recognized answer and submitting it.
    #[must_use]
    pub fn submit_delay(&self) -> Duration {
        Duration::from_millis(self.submit_delay_ms)
    }

    #[must_use]
    pub fn feedback_clear_delay(&self) -> Duration {
        Duration::from_millis(self.feedback_clear_ms)
    }

    #[must_use]
    pub fn resume_delay(&self) -> Duration {
        Duration::from_millis(self.resume_delay_ms)
    }

    /// Delay before restarting after the engine ended on its own.
    ///
    /// Doubles from the base per retry and is capped.
    #[must_use]
    pub fn end_backoff(&self, retry_count: u32) -> Duration {
        let exponent = retry_count.min(self.max_retries).min(16);
        let ms = self.end_backoff_base_ms.saturating_mul(1_u64 << exponent);
        Duration::from_millis(ms.min(self.backoff_cap_ms))
    }

    /// Linear delay used after start failures and recoverable engine errors.
    #[must_use]
    pub fn linear_backoff(&self, attempt: u32) -> Duration {
        let ms = self
            .error_backoff_step_ms
            .saturating_mul(u64::from(attempt));
        Duration::from_millis(ms.min(self.backoff_cap_ms))
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    #[must_use]
    pub fn history_capacity(&self) -> usize {
        self.history_capacity
    }

    #[must_use]
    pub fn history_visible(&self) -> usize {
        self.history_visible
    }

    #[must_use]
    pub fn praise_advance_delay(&self) -> Duration {
        Duration::from_millis(self.praise_advance_ms)
    }

    #[must_use]
    pub fn silent_advance_delay(&self) -> Duration {
        Duration::from_millis(self.silent_advance_ms)
    }

    #[must_use]
    pub fn announce_delay(&self) -> Duration {
        Duration::from_millis(self.announce_delay_ms)
    }

    #[must_use]
    pub fn clear_input_delay(&self) -> Duration {
        Duration::from_millis(self.clear_input_ms)
    }

    /// How long a microphone check listens before giving up.
    #[must_use]
    pub fn mic_test_window(&self) -> Duration {
        Duration::from_millis(self.mic_test_ms)
    }

    #[must_use]
    pub fn voice(&self) -> &SpeakerVoice {
        &self.voice
    }
}

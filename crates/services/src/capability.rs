//! Contracts for the external speech engines.
//!
//! The recognizer is driven through `start`/`stop` and reports back through
//! `RecognitionEvent`s that the host delivers to the assistant. The
//! synthesizer is a plain call that may be unavailable at any time.

use std::fmt;

use abacus_core::model::SpeakerVoice;

use crate::error::{EngineError, SynthesisError};

/// Microphone permission as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    /// The user has not been asked yet.
    Prompt,
}

/// A speech-recognition engine.
pub trait RecognitionEngine {
    /// Begin listening. A `Started` event follows once audio capture runs.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` when the engine refuses to start synchronously.
    fn start(&mut self) -> Result<(), EngineError>;

    /// Stop listening. Engines that are not running may fail; callers
    /// tolerate that.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` if the engine was not running.
    fn stop(&mut self) -> Result<(), EngineError>;

    fn permission(&self) -> Permission {
        Permission::Granted
    }

    /// Asks the user for microphone access.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` when the platform cannot be asked.
    fn request_permission(&mut self) -> Result<Permission, EngineError> {
        Ok(Permission::Granted)
    }
}

/// A speech-synthesis engine.
pub trait SpeechSynthesizer {
    /// Probed before every call; a loaded library can disappear.
    fn is_available(&self) -> bool {
        true
    }

    /// Speak `text` with the given voice options.
    ///
    /// # Errors
    ///
    /// Returns `SynthesisError` when the engine rejects the request.
    fn speak(&mut self, text: &str, options: &SpeakOptions) -> Result<(), SynthesisError>;
}

/// Voice and prosody for one utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeakOptions {
    pub voice: String,
    pub pitch: f32,
    pub rate: f32,
    pub volume: f32,
}

impl From<&SpeakerVoice> for SpeakOptions {
    fn from(voice: &SpeakerVoice) -> Self {
        Self {
            voice: voice.name.clone(),
            pitch: voice.pitch,
            rate: voice.rate,
            volume: voice.volume,
        }
    }
}

/// Error codes reported by recognizers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionErrorKind {
    Aborted,
    NoSpeech,
    AudioCapture,
    Network,
    NotAllowed,
    ServiceNotAllowed,
    LanguageNotSupported,
    Other(String),
}

impl RecognitionErrorKind {
    /// Maps a recognizer error code such as `no-speech`.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "aborted" => Self::Aborted,
            "no-speech" => Self::NoSpeech,
            "audio-capture" => Self::AudioCapture,
            "network" => Self::Network,
            "not-allowed" => Self::NotAllowed,
            "service-not-allowed" => Self::ServiceNotAllowed,
            "language-not-supported" => Self::LanguageNotSupported,
            other => Self::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Aborted => "aborted",
            Self::NoSpeech => "no-speech",
            Self::AudioCapture => "audio-capture",
            Self::Network => "network",
            Self::NotAllowed => "not-allowed",
            Self::ServiceNotAllowed => "service-not-allowed",
            Self::LanguageNotSupported => "language-not-supported",
            Self::Other(code) => code,
        }
    }

    /// Errors that end continuous listening until the user acts.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Network | Self::NotAllowed)
    }

    /// Errors that are routine and never shown to the user.
    #[must_use]
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::Aborted | Self::NoSpeech)
    }
}

impl fmt::Display for RecognitionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One hypothesis for a recognized segment.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionAlternative {
    pub transcript: String,
    pub confidence: f32,
}

/// One recognized segment, interim or final.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    pub is_final: bool,
    pub alternatives: Vec<RecognitionAlternative>,
}

impl RecognitionResult {
    /// A final result with a single alternative.
    #[must_use]
    pub fn final_text(transcript: impl Into<String>, confidence: f32) -> Self {
        Self {
            is_final: true,
            alternatives: vec![RecognitionAlternative {
                transcript: transcript.into(),
                confidence,
            }],
        }
    }

    #[must_use]
    pub fn best(&self) -> Option<&RecognitionAlternative> {
        self.alternatives.first()
    }
}

/// Events a recognizer delivers to the assistant.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionEvent {
    Started,
    /// Results from `result_index` onwards are new since the last event.
    Result {
        result_index: usize,
        results: Vec<RecognitionResult>,
    },
    Ended,
    Error(RecognitionErrorKind),
}

impl RecognitionEvent {
    /// Shorthand for a single final transcript.
    #[must_use]
    pub fn final_transcript(transcript: impl Into<String>, confidence: f32) -> Self {
        Self::Result {
            result_index: 0,
            results: vec![RecognitionResult::final_text(transcript, confidence)],
        }
    }
}

//! Shared error types for the services crate.

use thiserror::Error;

use abacus_core::model::{PanelId, QuestionError};

/// Failures reported by a speech-recognition capability.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EngineError {
    #[error("recognition has already started")]
    AlreadyStarted,
    #[error("recognition is not running")]
    NotRunning,
    #[error("recognition engine failed: {0}")]
    Failed(String),
}

/// Failures reported by a speech-synthesis capability.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SynthesisError {
    #[error("speech synthesis is not loaded")]
    NotLoaded,
    #[error("speech synthesis failed: {0}")]
    Failed(String),
}

/// Errors returned by `VoiceAssistant` entry points.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VoiceError {
    #[error("speech recognition is not available")]
    RecognitionUnavailable,
    #[error("microphone permission denied")]
    PermissionDenied,
    #[error("unknown panel {0}")]
    UnknownPanel(PanelId),
    #[error(transparent)]
    Question(#[from] QuestionError),
}

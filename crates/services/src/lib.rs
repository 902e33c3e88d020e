#![forbid(unsafe_code)]

pub mod assistant;
pub mod capability;
pub mod error;
pub mod feedback;
pub mod history;
pub mod pipeline;
pub mod quiz;
pub mod recognition;
pub mod scheduler;
pub mod speech_output;

pub use abacus_core::Clock;

pub use assistant::{Capabilities, VoiceAssistant};
pub use capability::{
    Permission, RecognitionAlternative, RecognitionEngine, RecognitionErrorKind,
    RecognitionEvent, RecognitionResult, SpeakOptions, SpeechSynthesizer,
};
pub use error::{EngineError, SynthesisError, VoiceError};
pub use feedback::{Feedback, Notice, NoticeLevel, VoiceStatus};
pub use history::{HistoryEntry, HistoryKind, SpeechHistoryLog};
pub use pipeline::{AnswerPipeline, TranscriptOutcome};
pub use quiz::QuizFlow;
pub use recognition::{ErrorOutcome, RecognitionSession, SessionPhase};
pub use scheduler::{FiredTimer, ManualScheduler, Scheduler, TimerHandle, TokioScheduler, VoiceTask};
pub use speech_output::SpeechOutput;

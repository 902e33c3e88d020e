use abacus_core::model::SpeakerVoice;
use tracing::{debug, warn};

use crate::capability::{SpeakOptions, SpeechSynthesizer};
use crate::feedback::{Feedback, NoticeLevel};
use crate::history::HistoryKind;

const TEST_SENTENCE: &str = "This is a speaker test. If you can hear this, your speaker is working.";

/// Spoken feedback through an optional synthesizer. Failures never escape.
pub struct SpeechOutput {
    synth: Option<Box<dyn SpeechSynthesizer>>,
    options: SpeakOptions,
}

impl SpeechOutput {
    #[must_use]
    pub fn new(synth: Option<Box<dyn SpeechSynthesizer>>, voice: &SpeakerVoice) -> Self {
        Self {
            synth,
            options: SpeakOptions::from(voice),
        }
    }

    /// True when a synthesizer is present and currently reports availability.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.synth.as_ref().is_some_and(|synth| synth.is_available())
    }

    #[must_use]
    pub fn options(&self) -> &SpeakOptions {
        &self.options
    }

    /// Speaks `text`. Returns true iff the utterance was dispatched.
    pub fn speak(&mut self, text: &str, feedback: &mut Feedback) -> bool {
        let Some(synth) = self.synth.as_mut().filter(|synth| synth.is_available()) else {
            debug!(text, "speech synthesis not available");
            feedback.record(HistoryKind::Speaker, format!("Not said (no speaker): \"{text}\""));
            return false;
        };

        match synth.speak(text, &self.options) {
            Ok(()) => {
                debug!(text, "speaking");
                feedback.record(HistoryKind::Speaker, format!("Said: \"{text}\""));
                true
            }
            Err(err) => {
                warn!(%err, text, "speech synthesis failed");
                feedback.record(HistoryKind::Speaker, format!("Failed to say: \"{text}\""));
                feedback.notify(NoticeLevel::Error, "Could not speak message");
                false
            }
        }
    }

    /// Plays the test sentence and reports the outcome as a notice.
    pub fn test_speaker(&mut self, feedback: &mut Feedback) -> bool {
        let spoken = self.speak(TEST_SENTENCE, feedback);
        if spoken {
            feedback.notify(NoticeLevel::Info, "Playing test sound...");
        } else {
            feedback.notify(
                NoticeLevel::Error,
                "Speaker not available. Please refresh the page.",
            );
        }
        feedback.set_speaker_ready(spoken);
        spoken
    }
}

impl std::fmt::Debug for SpeechOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechOutput")
            .field("synth", &self.synth.is_some())
            .field("options", &self.options)
            .finish()
    }
}

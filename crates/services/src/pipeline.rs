//! Turns final transcripts into answers on the active panel.

use abacus_core::model::{PanelId, QuizBoard, ResultTone, VoiceSettings};
use abacus_core::speech::{SpokenNumber, TranscriptParser};
use tracing::debug;

use crate::feedback::{Feedback, NoticeLevel};
use crate::recognition::RecognitionSession;
use crate::scheduler::{Scheduler, VoiceTask};

pub const LOW_CONFIDENCE_MESSAGE: &str = "Sorry, I didn't catch that. Please try again.";

/// Shown in turn when a transcript holds no number.
pub const GUIDANCE: &[&str] = &[
    "Could not understand the number. Please try again.",
    "Try saying just the number, like \"twelve\".",
    "Please say a number, for example \"minus three\".",
];

/// What happened to one final transcript.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TranscriptOutcome {
    /// No panel is waiting for voice input.
    Ignored,
    /// Confidence was below the gate.
    Rejected,
    Accepted(SpokenNumber),
    Unparsed,
}

#[derive(Debug, Clone)]
pub struct AnswerPipeline {
    parser: TranscriptParser,
    settings: VoiceSettings,
    guidance_index: usize,
}

impl AnswerPipeline {
    #[must_use]
    pub fn new(settings: VoiceSettings) -> Self {
        Self {
            parser: TranscriptParser::default(),
            settings,
            guidance_index: 0,
        }
    }

    /// Handles one final transcript for the panel `session` listens on.
    ///
    /// A parsed value is written into the panel and submitted after the settle
    /// delay. The low-confidence gate only applies outside continuous mode.
    /// Follow-up work is deferred through the session so a stop cancels it.
    pub fn on_final_transcript(
        &mut self,
        text: &str,
        confidence: f32,
        session: &mut RecognitionSession,
        board: &mut QuizBoard,
        scheduler: &mut dyn Scheduler,
        feedback: &mut Feedback,
    ) -> TranscriptOutcome {
        let continuous = session.is_continuous();
        let generation = session.generation();
        let Some(id) = session.active_panel().filter(|id| board.contains(*id)) else {
            debug!(text, "no active panel for transcript");
            return TranscriptOutcome::Ignored;
        };
        let Some(target) = board.get_mut(id) else {
            return TranscriptOutcome::Ignored;
        };

        if !continuous && confidence < self.settings.confidence_threshold() {
            debug!(text, confidence, "transcript below confidence gate");
            target.show_result(LOW_CONFIDENCE_MESSAGE, ResultTone::Error);
            return TranscriptOutcome::Rejected;
        }

        match self.parser.parse(text) {
            Some(value) => {
                debug!(text, %value, panel = %id, "transcript accepted");
                target.set_input(value.to_string());
                feedback.notify(NoticeLevel::Info, format!("Recognized: {value}"));
                session.defer(
                    self.settings.submit_delay(),
                    VoiceTask::SubmitAnswer { panel: id, generation },
                    scheduler,
                );
                TranscriptOutcome::Accepted(value)
            }
            None => {
                debug!(text, panel = %id, "no number in transcript");
                target.show_result(self.next_guidance(), ResultTone::Error);
                let task = if continuous {
                    VoiceTask::ClearFeedback { panel: id, generation }
                } else {
                    VoiceTask::StopListening { generation }
                };
                session.defer(self.settings.feedback_clear_delay(), task, scheduler);
                TranscriptOutcome::Unparsed
            }
        }
    }

    fn next_guidance(&mut self) -> &'static str {
        let message = GUIDANCE[self.guidance_index % GUIDANCE.len()];
        self.guidance_index = self.guidance_index.wrapping_add(1);
        message
    }
}

/// True if `message` is one of the rotating guidance lines.
#[must_use]
pub fn is_guidance(message: &str) -> bool {
    GUIDANCE.contains(&message)
}

//! Answer checking and question turnover for a single panel.

use abacus_core::model::{AnswerCheck, PanelId, QuestionError, QuizBoard, VoiceSettings};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::feedback::Feedback;
use crate::history::HistoryKind;
use crate::scheduler::{Scheduler, VoiceTask};
use crate::speech_output::SpeechOutput;

#[derive(Debug)]
pub struct QuizFlow {
    rng: StdRng,
    settings: VoiceSettings,
}

impl QuizFlow {
    #[must_use]
    pub fn new(settings: VoiceSettings) -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            settings,
        }
    }

    /// Uses a seeded generator so question sequences repeat.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Checks the input of `panel`, speaks the verdict and schedules the
    /// follow-up: a new question after a correct answer, and clearing of the
    /// input and result line either way. Returns `None` for an unknown panel.
    pub fn submit(
        &mut self,
        id: PanelId,
        board: &mut QuizBoard,
        speech: &mut SpeechOutput,
        scheduler: &mut dyn Scheduler,
        feedback: &mut Feedback,
    ) -> Option<AnswerCheck> {
        let panel = board.get_mut(id)?;
        let input = panel.input().trim().to_string();
        let check = panel.check_answer();
        let round = panel.round();

        match check {
            AnswerCheck::Correct { answer } => {
                info!(panel = %id, answer, "correct answer");
                feedback.record(HistoryKind::Correct, format!("Correct: {answer}"));

                let praised =
                    speech.speak(&format!("Correct! The answer is {answer}. Next question."), feedback);
                let (delay, announce) = if praised {
                    (self.settings.praise_advance_delay(), true)
                } else {
                    (self.settings.silent_advance_delay(), false)
                };
                scheduler.schedule(delay, VoiceTask::AdvanceQuestion { panel: id, announce });
            }
            AnswerCheck::Incorrect { expected, .. } => {
                let given = if input.is_empty() { "nothing" } else { input.as_str() };
                info!(panel = %id, given, expected, "incorrect answer");
                feedback.record(
                    HistoryKind::Incorrect,
                    format!("Wrong: {given}, Correct: {expected}"),
                );
                speech.speak("Try again!", feedback);
            }
        }

        scheduler.schedule(
            self.settings.clear_input_delay(),
            VoiceTask::ClearInput { panel: id, round },
        );
        Some(check)
    }

    /// Replaces the question of `id`. When `announce` is set the new question
    /// is read out after a short pause.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the board cannot generate questions.
    pub fn advance(
        &mut self,
        id: PanelId,
        announce: bool,
        board: &mut QuizBoard,
        scheduler: &mut dyn Scheduler,
    ) -> Result<bool, QuestionError> {
        if !board.advance(id, &mut self.rng)? {
            return Ok(false);
        }
        debug!(panel = %id, announce, "next question");
        if announce {
            scheduler.schedule(
                self.settings.announce_delay(),
                VoiceTask::AnnounceQuestion { panel: id },
            );
        }
        Ok(true)
    }

    /// Reads the current question of `id` aloud.
    pub fn announce(
        &self,
        id: PanelId,
        board: &QuizBoard,
        speech: &mut SpeechOutput,
        feedback: &mut Feedback,
    ) -> bool {
        board
            .get(id)
            .is_some_and(|panel| speech.speak(&panel.question().prompt(), feedback))
    }

    /// Wipes input and result of `id` unless it moved on to another question.
    pub fn clear_input(id: PanelId, round: u64, board: &mut QuizBoard) -> bool {
        match board.get_mut(id) {
            Some(panel) if panel.round() == round => {
                panel.clear_input();
                panel.clear_result();
                true
            }
            _ => false,
        }
    }
}

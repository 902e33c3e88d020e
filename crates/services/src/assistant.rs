//! The voice assistant: one owner for the board, the recognition session and
//! every deferred task.
//!
//! Hosts feed it two kinds of input: `RecognitionEvent`s from the engine and
//! fired timers from the scheduler. Everything else is a direct call from the
//! UI layer.

use std::time::Duration;

use abacus_core::Clock;
use abacus_core::model::{AnswerCheck, PanelId, QuizBoard, ResultTone, VoiceSettings};
use tracing::{debug, info, warn};

use crate::capability::{
    Permission, RecognitionEngine, RecognitionEvent, RecognitionResult, SpeechSynthesizer,
};
use crate::error::VoiceError;
use crate::feedback::{Feedback, Notice, NoticeLevel, VoiceStatus};
use crate::history::{HistoryKind, SpeechHistoryLog};
use crate::pipeline::{self, AnswerPipeline, TranscriptOutcome};
use crate::quiz::QuizFlow;
use crate::recognition::{ErrorOutcome, RecognitionSession};
use crate::scheduler::{ManualScheduler, Scheduler, TimerHandle, VoiceTask};
use crate::speech_output::SpeechOutput;

/// Speech engines found at startup. Either may be missing.
#[derive(Default)]
pub struct Capabilities {
    pub recognizer: Option<Box<dyn RecognitionEngine>>,
    pub synthesizer: Option<Box<dyn SpeechSynthesizer>>,
}

impl Capabilities {
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_recognizer(mut self, engine: impl RecognitionEngine + 'static) -> Self {
        self.recognizer = Some(Box::new(engine));
        self
    }

    #[must_use]
    pub fn with_synthesizer(mut self, synth: impl SpeechSynthesizer + 'static) -> Self {
        self.synthesizer = Some(Box::new(synth));
        self
    }
}

#[derive(Debug)]
pub struct VoiceAssistant<S: Scheduler> {
    settings: VoiceSettings,
    board: QuizBoard,
    session: RecognitionSession,
    pipeline: AnswerPipeline,
    speech: SpeechOutput,
    quiz: QuizFlow,
    feedback: Feedback,
    scheduler: S,
    /// Generation of the running microphone check, if any.
    mic_test: Option<u64>,
}

const MIC_TEST_FAILED: &str = "Microphone test failed";

impl<S: Scheduler> VoiceAssistant<S> {
    #[must_use]
    pub fn new(settings: VoiceSettings, board: QuizBoard, caps: Capabilities, scheduler: S) -> Self {
        let mut feedback = Feedback::new(&settings, Clock::system());

        if caps.recognizer.is_none() {
            feedback.notify(
                NoticeLevel::Warning,
                "Voice input is not supported here. You can still type answers.",
            );
        }
        if caps.synthesizer.is_none() {
            feedback.notify(
                NoticeLevel::Warning,
                "Voice output not available. Some features may be limited.",
            );
        }

        let speech = SpeechOutput::new(caps.synthesizer, settings.voice());
        feedback.set_speaker_ready(speech.is_ready());
        info!(
            recognizer = caps.recognizer.is_some(),
            speaker = speech.is_ready(),
            panels = board.panels().len(),
            "voice assistant ready"
        );

        Self {
            session: RecognitionSession::new(caps.recognizer, settings.clone()),
            pipeline: AnswerPipeline::new(settings.clone()),
            quiz: QuizFlow::new(settings.clone()),
            settings,
            board,
            speech,
            feedback,
            scheduler,
            mic_test: None,
        }
    }

    /// Timestamps history entries with `clock`.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.feedback.set_clock(clock);
        self
    }

    /// Seeds question generation.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.quiz = QuizFlow::new(self.settings.clone()).with_seed(seed);
        self
    }

    //
    // ─── LISTENING ────────────────────────────────────────────────────────────
    //

    /// Microphone button: asks for permission if needed, then stops when
    /// listening and starts continuous listening on `panel` otherwise.
    /// Returns whether listening is now on.
    ///
    /// # Errors
    ///
    /// Returns `VoiceError` when recognition is unavailable, the panel is
    /// unknown, or permission was refused.
    pub fn toggle_listening(&mut self, panel: PanelId) -> Result<bool, VoiceError> {
        self.ensure_recognizer()?;
        self.ensure_panel(panel)?;
        self.ensure_permission()?;

        if self.session.is_listening() || self.session.is_continuous() {
            self.stop();
            Ok(false)
        } else {
            self.start_continuous(panel)?;
            Ok(true)
        }
    }

    /// # Errors
    ///
    /// Returns `VoiceError` when recognition is unavailable or the panel is
    /// unknown.
    pub fn start_continuous(&mut self, panel: PanelId) -> Result<(), VoiceError> {
        self.ensure_recognizer()?;
        self.ensure_panel(panel)?;

        self.session
            .start_continuous(panel, &mut self.scheduler, &mut self.feedback);
        self.feedback.notify(
            NoticeLevel::Success,
            "Continuous listening enabled. Speak answers anytime!",
        );
        Ok(())
    }

    /// Listens for one answer on `panel`.
    ///
    /// # Errors
    ///
    /// Returns `VoiceError` when recognition is unavailable or the panel is
    /// unknown.
    pub fn listen_once(&mut self, panel: PanelId) -> Result<(), VoiceError> {
        self.ensure_recognizer()?;
        self.ensure_panel(panel)?;

        self.session
            .listen_once(panel, &mut self.scheduler, &mut self.feedback);
        Ok(())
    }

    /// Stops listening. Safe to call at any time.
    pub fn stop(&mut self) -> bool {
        let stopped = self.session.stop(&mut self.scheduler, &mut self.feedback);
        if stopped {
            self.feedback
                .notify(NoticeLevel::Info, "Continuous listening disabled");
        }
        stopped
    }

    pub fn resume_for_next_question(&mut self) -> bool {
        self.session.resume_for_next_question(&mut self.scheduler)
    }

    //
    // ─── SPEAKING ─────────────────────────────────────────────────────────────
    //

    pub fn speak(&mut self, text: &str) -> bool {
        self.speech.speak(text, &mut self.feedback)
    }

    pub fn test_speaker(&mut self) -> bool {
        self.speech.test_speaker(&mut self.feedback)
    }

    /// Listens briefly for the word "test". Success or failure is reported as
    /// a notice; the check ends by itself after the test window.
    ///
    /// Any session that was running is stopped first.
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::RecognitionUnavailable` without a recognizer.
    pub fn test_microphone(&mut self) -> Result<(), VoiceError> {
        self.ensure_recognizer()?;
        self.session.stop(&mut self.scheduler, &mut self.feedback);

        self.feedback
            .notify(NoticeLevel::Info, "Say \"test\" to check microphone");
        let generation = self
            .session
            .listen_detached(&mut self.scheduler, &mut self.feedback);
        if !self.session.is_listening() {
            self.feedback.notify(NoticeLevel::Error, MIC_TEST_FAILED);
            return Ok(());
        }

        self.mic_test = Some(generation);
        self.session.defer(
            self.settings.mic_test_window(),
            VoiceTask::EndMicTest { generation },
            &mut self.scheduler,
        );
        info!("microphone test started");
        Ok(())
    }

    /// True while a microphone check is listening.
    #[must_use]
    pub fn is_testing_microphone(&self) -> bool {
        self.mic_test
            .is_some_and(|generation| self.session.is_current(generation))
    }

    fn end_mic_test(&mut self) {
        self.mic_test = None;
        self.session.stop(&mut self.scheduler, &mut self.feedback);
    }

    //
    // ─── ANSWERS ──────────────────────────────────────────────────────────────
    //

    /// Checks whatever is currently written into `panel`.
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::UnknownPanel` for a panel not on the board.
    pub fn submit(&mut self, panel: PanelId) -> Result<AnswerCheck, VoiceError> {
        let check = self
            .quiz
            .submit(
                panel,
                &mut self.board,
                &mut self.speech,
                &mut self.scheduler,
                &mut self.feedback,
            )
            .ok_or(VoiceError::UnknownPanel(panel))?;

        if !check.is_correct() {
            self.session.resume_for_next_question(&mut self.scheduler);
        }
        Ok(check)
    }

    /// Writes a typed answer into `panel` and submits it.
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::UnknownPanel` for a panel not on the board.
    pub fn enter_answer(&mut self, panel: PanelId, text: &str) -> Result<AnswerCheck, VoiceError> {
        self.board
            .get_mut(panel)
            .ok_or(VoiceError::UnknownPanel(panel))?
            .set_input(text.trim());
        self.submit(panel)
    }

    //
    // ─── EVENTS ───────────────────────────────────────────────────────────────
    //

    /// Delivers one recognizer event.
    pub fn handle_recognition(&mut self, event: RecognitionEvent) -> Vec<TranscriptOutcome> {
        match event {
            RecognitionEvent::Started => {
                self.session.on_engine_started(&mut self.feedback);
                Vec::new()
            }
            RecognitionEvent::Ended => {
                self.session
                    .on_engine_ended(&mut self.scheduler, &mut self.feedback);
                Vec::new()
            }
            RecognitionEvent::Error(kind) => {
                let testing = self.is_testing_microphone();
                let active = self.session.active_panel();
                let outcome = self.session.on_engine_error(
                    &kind,
                    &mut self.scheduler,
                    &mut self.feedback,
                );

                if testing {
                    self.feedback.notify(NoticeLevel::Error, MIC_TEST_FAILED);
                    self.end_mic_test();
                } else if outcome != ErrorOutcome::Suppressed {
                    if let Some(panel) = active.and_then(|id| self.board.get_mut(id)) {
                        panel.show_result(format!("Voice error: {kind}"), ResultTone::Error);
                    }
                }
                Vec::new()
            }
            RecognitionEvent::Result {
                result_index,
                results,
            } if self.is_testing_microphone() => {
                let heard = results
                    .iter()
                    .skip(result_index)
                    .filter_map(RecognitionResult::best)
                    .any(|alt| alt.transcript.to_lowercase().contains("test"));
                if heard {
                    self.feedback
                        .notify(NoticeLevel::Success, "Microphone test successful!");
                    self.end_mic_test();
                }
                Vec::new()
            }
            RecognitionEvent::Result {
                result_index,
                results,
            } => results
                .iter()
                .skip(result_index)
                .filter(|result| result.is_final)
                .filter_map(|result| self.handle_final(result))
                .collect(),
        }
    }

    fn handle_final(&mut self, result: &RecognitionResult) -> Option<TranscriptOutcome> {
        let best = result.best()?;
        let transcript = best.transcript.trim().to_lowercase();
        debug!(%transcript, confidence = best.confidence, "final transcript");
        self.feedback
            .record(HistoryKind::Recognition, format!("Heard: \"{transcript}\""));

        Some(self.pipeline.on_final_transcript(
            &transcript,
            best.confidence,
            &mut self.session,
            &mut self.board,
            &mut self.scheduler,
            &mut self.feedback,
        ))
    }

    /// Delivers a fired timer. Cancelled handles are dropped.
    pub fn on_timer(&mut self, handle: TimerHandle, task: VoiceTask) {
        if !self.scheduler.fire(handle) {
            debug!(handle = handle.value(), ?task, "dropping cancelled timer");
            return;
        }
        self.session.settle(handle);
        self.run_task(handle, task);
    }

    fn run_task(&mut self, handle: TimerHandle, task: VoiceTask) {
        match task {
            VoiceTask::Restart => {
                self.session
                    .on_restart_timer(handle, &mut self.scheduler, &mut self.feedback);
            }
            VoiceTask::SubmitAnswer { panel, generation } => {
                if !self.session.is_current(generation) || !self.board.contains(panel) {
                    debug!(%panel, generation, "dropping stale submission");
                    return;
                }
                let check = self.quiz.submit(
                    panel,
                    &mut self.board,
                    &mut self.speech,
                    &mut self.scheduler,
                    &mut self.feedback,
                );
                if !self.session.is_continuous() {
                    self.session.stop(&mut self.scheduler, &mut self.feedback);
                } else if check.is_some_and(|c| !c.is_correct()) {
                    self.session.resume_for_next_question(&mut self.scheduler);
                }
            }
            VoiceTask::ClearFeedback { panel, generation } => {
                if !self.session.is_current(generation) {
                    return;
                }
                if let Some(panel) = self.board.get_mut(panel) {
                    if panel.result().is_some_and(|(msg, _)| pipeline::is_guidance(msg)) {
                        panel.clear_result();
                    }
                }
            }
            VoiceTask::StopListening { generation } => {
                if self.session.is_current(generation) && !self.session.is_continuous() {
                    self.session.stop(&mut self.scheduler, &mut self.feedback);
                }
            }
            VoiceTask::EndMicTest { generation } => {
                if self.mic_test == Some(generation) && self.session.is_current(generation) {
                    debug!("microphone test window closed");
                    self.end_mic_test();
                }
            }
            VoiceTask::AdvanceQuestion { panel, announce } => {
                match self
                    .quiz
                    .advance(panel, announce, &mut self.board, &mut self.scheduler)
                {
                    Ok(true) if !announce => {
                        self.session.resume_for_next_question(&mut self.scheduler);
                    }
                    Ok(_) => {}
                    Err(err) => warn!(%err, %panel, "could not generate next question"),
                }
            }
            VoiceTask::AnnounceQuestion { panel } => {
                self.quiz
                    .announce(panel, &self.board, &mut self.speech, &mut self.feedback);
                self.session.resume_for_next_question(&mut self.scheduler);
            }
            VoiceTask::ClearInput { panel, round } => {
                QuizFlow::clear_input(panel, round, &mut self.board);
            }
        }
    }

    //
    // ─── VIEW ─────────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn history(&self) -> &SpeechHistoryLog {
        self.feedback.history()
    }

    pub fn clear_history(&mut self) {
        self.feedback.clear_history();
        self.feedback.notify(NoticeLevel::Success, "History cleared");
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.feedback.take_notices()
    }

    #[must_use]
    pub fn status(&self) -> VoiceStatus {
        self.feedback.status()
    }

    #[must_use]
    pub fn board(&self) -> &QuizBoard {
        &self.board
    }

    #[must_use]
    pub fn session(&self) -> &RecognitionSession {
        &self.session
    }

    #[must_use]
    pub fn settings(&self) -> &VoiceSettings {
        &self.settings
    }

    #[must_use]
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    fn ensure_recognizer(&mut self) -> Result<(), VoiceError> {
        if self.session.is_available() {
            return Ok(());
        }
        self.feedback
            .notify(NoticeLevel::Error, "Speech recognition is not available");
        Err(VoiceError::RecognitionUnavailable)
    }

    fn ensure_panel(&self, panel: PanelId) -> Result<(), VoiceError> {
        if self.board.contains(panel) {
            Ok(())
        } else {
            Err(VoiceError::UnknownPanel(panel))
        }
    }

    fn ensure_permission(&mut self) -> Result<(), VoiceError> {
        let permission = match self.session.permission() {
            Permission::Prompt => match self.session.request_permission() {
                Ok(Permission::Granted) => {
                    self.feedback
                        .notify(NoticeLevel::Success, "Microphone permission granted!");
                    Permission::Granted
                }
                Ok(other) => other,
                Err(err) => {
                    warn!(%err, "microphone permission request failed");
                    Permission::Denied
                }
            },
            other => other,
        };

        if permission == Permission::Granted {
            Ok(())
        } else {
            self.feedback.notify(
                NoticeLevel::Error,
                "Microphone permission denied. Please allow access in your browser settings.",
            );
            Err(VoiceError::PermissionDenied)
        }
    }
}

impl VoiceAssistant<ManualScheduler> {
    /// Moves virtual time forward by `by`, running every task that falls due.
    pub fn advance(&mut self, by: Duration) {
        let until = self.scheduler.now() + by;
        while let Some((handle, task)) = self.scheduler.pop_due(until) {
            self.on_timer(handle, task);
        }
        self.scheduler.set_now(until);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use abacus_core::time::fixed_clock;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::capability::RecognitionErrorKind;
    use crate::error::EngineError;

    #[derive(Default)]
    struct Mic {
        permission: Option<Permission>,
        running: bool,
    }

    struct SharedMic(Rc<RefCell<Mic>>);

    impl RecognitionEngine for SharedMic {
        fn start(&mut self) -> Result<(), EngineError> {
            self.0.borrow_mut().running = true;
            Ok(())
        }

        fn stop(&mut self) -> Result<(), EngineError> {
            self.0.borrow_mut().running = false;
            Ok(())
        }

        fn permission(&self) -> Permission {
            self.0.borrow().permission.unwrap_or(Permission::Granted)
        }

        fn request_permission(&mut self) -> Result<Permission, EngineError> {
            self.0.borrow_mut().permission = Some(Permission::Denied);
            Ok(Permission::Denied)
        }
    }

    const PANEL: PanelId = PanelId::new(0);

    fn assistant(mic: &Rc<RefCell<Mic>>) -> VoiceAssistant<ManualScheduler> {
        let settings = VoiceSettings::default();
        let board = QuizBoard::generate(2, 2, &mut StdRng::seed_from_u64(5)).unwrap();
        let caps = Capabilities::none().with_recognizer(SharedMic(mic.clone()));
        VoiceAssistant::new(settings, board, caps, ManualScheduler::new())
            .with_clock(fixed_clock())
            .with_seed(5)
    }

    #[test]
    fn missing_capabilities_are_reported_once() {
        let settings = VoiceSettings::default();
        let board = QuizBoard::generate(1, 2, &mut StdRng::seed_from_u64(1)).unwrap();
        let mut assistant =
            VoiceAssistant::new(settings, board, Capabilities::none(), ManualScheduler::new());

        let notices = assistant.take_notices();
        assert_eq!(notices.len(), 2);
        assert!(notices.iter().all(|n| n.level == NoticeLevel::Warning));
        assert!(!assistant.status().speaker_ready);

        assert!(matches!(
            assistant.listen_once(PANEL),
            Err(VoiceError::RecognitionUnavailable)
        ));
        assert!(assistant.enter_answer(PANEL, "3").is_ok());
    }

    #[test]
    fn toggle_starts_then_stops() {
        let mic = Rc::new(RefCell::new(Mic::default()));
        let mut assistant = assistant(&mic);

        assert!(assistant.toggle_listening(PANEL).unwrap());
        assistant.handle_recognition(RecognitionEvent::Started);
        assert!(mic.borrow().running);
        assert!(assistant.status().mic_active);

        assert!(!assistant.toggle_listening(PANEL).unwrap());
        assert!(!mic.borrow().running);
        assert!(!assistant.session().is_continuous());
        assert_eq!(
            assistant.take_notices().last().unwrap().message,
            "Continuous listening disabled"
        );
    }

    #[test]
    fn refused_permission_blocks_toggle() {
        let mic = Rc::new(RefCell::new(Mic {
            permission: Some(Permission::Prompt),
            running: false,
        }));
        let mut assistant = assistant(&mic);

        assert!(matches!(
            assistant.toggle_listening(PANEL),
            Err(VoiceError::PermissionDenied)
        ));
        assert!(!mic.borrow().running);
    }

    #[test]
    fn unknown_panel_is_rejected() {
        let mic = Rc::new(RefCell::new(Mic::default()));
        let mut assistant = assistant(&mic);
        assert!(matches!(
            assistant.start_continuous(PanelId::new(42)),
            Err(VoiceError::UnknownPanel(_))
        ));
    }

    #[test]
    fn interim_and_skipped_results_are_ignored() {
        let mic = Rc::new(RefCell::new(Mic::default()));
        let mut assistant = assistant(&mic);
        assistant.listen_once(PANEL).unwrap();
        assistant.handle_recognition(RecognitionEvent::Started);

        let mut interim = RecognitionResult::final_text("seven", 0.9);
        interim.is_final = false;
        let outcomes = assistant.handle_recognition(RecognitionEvent::Result {
            result_index: 1,
            results: vec![
                RecognitionResult::final_text("three", 0.9),
                interim,
                RecognitionResult::final_text("  Nine ", 0.9),
            ],
        });

        assert_eq!(outcomes.len(), 1);
        assert_eq!(assistant.board().get(PANEL).unwrap().input(), "9");
        assert_eq!(
            assistant.history().latest().unwrap().message,
            "Heard: \"nine\""
        );
    }

    #[test]
    fn visible_errors_are_written_to_the_panel() {
        let mic = Rc::new(RefCell::new(Mic::default()));
        let mut assistant = assistant(&mic);
        assistant.start_continuous(PANEL).unwrap();

        assistant.handle_recognition(RecognitionEvent::Error(RecognitionErrorKind::NoSpeech));
        assert_eq!(assistant.board().get(PANEL).unwrap().result(), None);

        assistant.handle_recognition(RecognitionEvent::Error(RecognitionErrorKind::NotAllowed));
        assert_eq!(
            assistant.board().get(PANEL).unwrap().result(),
            Some(("Voice error: not-allowed", ResultTone::Error))
        );
        assert!(!assistant.session().is_continuous());
        assert!(assistant.scheduler().pending().is_empty());
    }

    #[test]
    fn cleared_history_stays_empty() {
        let mic = Rc::new(RefCell::new(Mic::default()));
        let mut assistant = assistant(&mic);
        assistant.speak("hello");
        assistant.clear_history();
        assert!(assistant.history().is_empty());
    }
}

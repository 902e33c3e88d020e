//! Lifecycle of the continuous listening session.
//!
//! The session owns the recognizer and a single restart slot. Every path
//! that schedules a restart first cancels the one already pending, so at
//! most one restart timer exists at any time.
//!
//! Each user-initiated start or stop opens a new generation. Work deferred
//! on behalf of a transcript is stamped with the generation it belongs to and
//! tracked here, so `stop` can cancel it and a late firing can be recognized
//! as stale.

use std::fmt;
use std::time::Duration;

use abacus_core::model::{PanelId, VoiceSettings};
use tracing::{debug, error, info, warn};

use crate::capability::{Permission, RecognitionEngine, RecognitionErrorKind};
use crate::error::EngineError;
use crate::feedback::{Feedback, NoticeLevel};
use crate::history::HistoryKind;
use crate::scheduler::{Scheduler, TimerHandle, VoiceTask};

/// Consecutive start failures that still raise a notice.
const NOTIFY_FAILED_STARTS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    /// `start` was accepted; waiting for the engine to confirm.
    Starting,
    Listening,
}

/// How an engine error was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorOutcome {
    /// Routine error, history only.
    Suppressed,
    /// Shown to the user; a restart may be pending.
    Recoverable,
    /// Continuous listening was switched off.
    Fatal,
}

pub struct RecognitionSession {
    engine: Option<Box<dyn RecognitionEngine>>,
    settings: VoiceSettings,
    phase: SessionPhase,
    continuous: bool,
    retry_count: u32,
    active_panel: Option<PanelId>,
    pending_restart: Option<TimerHandle>,
    generation: u64,
    deferred: Vec<TimerHandle>,
}

impl RecognitionSession {
    #[must_use]
    pub fn new(engine: Option<Box<dyn RecognitionEngine>>, settings: VoiceSettings) -> Self {
        Self {
            engine,
            settings,
            phase: SessionPhase::Idle,
            continuous: false,
            retry_count: 0,
            active_panel: None,
            pending_restart: None,
            generation: 0,
            deferred: Vec::new(),
        }
    }

    /// True when a recognizer was resolved at startup.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.engine.is_some()
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// True from an accepted start until the engine ends or is stopped.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.phase != SessionPhase::Idle
    }

    #[must_use]
    pub fn is_continuous(&self) -> bool {
        self.continuous
    }

    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    #[must_use]
    pub fn active_panel(&self) -> Option<PanelId> {
        self.active_panel
    }

    #[must_use]
    pub fn pending_restart(&self) -> Option<TimerHandle> {
        self.pending_restart
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True if work stamped with `generation` still belongs to this session.
    #[must_use]
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Deferred tasks that have neither fired nor been cancelled.
    #[must_use]
    pub fn deferred(&self) -> &[TimerHandle] {
        &self.deferred
    }

    #[must_use]
    pub fn permission(&self) -> Permission {
        self.engine
            .as_ref()
            .map_or(Permission::Denied, |engine| engine.permission())
    }

    /// Asks for microphone access through the engine.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` when no engine is present or the request fails.
    pub fn request_permission(&mut self) -> Result<Permission, EngineError> {
        match self.engine.as_mut() {
            Some(engine) => engine.request_permission(),
            None => Err(EngineError::Failed("no recognizer".into())),
        }
    }

    /// Switches to continuous listening for `panel`, taking over from any
    /// previously active panel.
    pub fn start_continuous(
        &mut self,
        panel: PanelId,
        scheduler: &mut dyn Scheduler,
        feedback: &mut Feedback,
    ) {
        if let Some(previous) = self.active_panel.filter(|p| *p != panel) {
            debug!(%previous, %panel, "voice input moves to another panel");
        }
        self.begin(scheduler);
        self.active_panel = Some(panel);
        self.continuous = true;
        self.start_once(scheduler, feedback);
    }

    /// Listens for a single answer for `panel`.
    pub fn listen_once(
        &mut self,
        panel: PanelId,
        scheduler: &mut dyn Scheduler,
        feedback: &mut Feedback,
    ) {
        self.begin(scheduler);
        self.active_panel = Some(panel);
        self.continuous = false;
        self.start_once(scheduler, feedback);
    }

    /// Starts the engine with no panel attached, for a microphone check.
    /// Returns the generation of the new session.
    pub fn listen_detached(
        &mut self,
        scheduler: &mut dyn Scheduler,
        feedback: &mut Feedback,
    ) -> u64 {
        self.begin(scheduler);
        self.active_panel = None;
        self.continuous = false;
        self.start_once(scheduler, feedback);
        self.generation
    }

    /// Starts the engine unless it is already listening.
    pub fn start_once(&mut self, scheduler: &mut dyn Scheduler, feedback: &mut Feedback) {
        self.cancel_restart(scheduler);

        if self.is_listening() {
            return;
        }
        let Some(engine) = self.engine.as_mut() else {
            return;
        };

        match engine.start() {
            Ok(()) => {
                self.phase = SessionPhase::Starting;
                debug!("recognizer start requested");
            }
            Err(err) => {
                self.phase = SessionPhase::Idle;
                self.bump_retry();
                warn!(%err, retry = self.retry_count, "failed to start recognition");

                if self.retry_count <= NOTIFY_FAILED_STARTS {
                    feedback.notify(NoticeLevel::Warning, "Voice recognition failed, retrying...");
                }
                if self.continuous {
                    let delay = self.settings.linear_backoff(self.retry_count);
                    self.schedule_restart(delay, scheduler);
                } else {
                    self.active_panel = None;
                }
            }
        }
    }

    pub fn on_engine_started(&mut self, feedback: &mut Feedback) {
        self.phase = SessionPhase::Listening;
        self.retry_count = 0;
        feedback.set_mic_active(true);
        feedback.record(HistoryKind::Recognition, "Started listening");
        info!(continuous = self.continuous, "listening started");
    }

    /// The engine stopped on its own. In continuous mode a restart follows
    /// with exponential backoff.
    pub fn on_engine_ended(&mut self, scheduler: &mut dyn Scheduler, feedback: &mut Feedback) {
        self.phase = SessionPhase::Idle;
        feedback.set_mic_active(false);

        if self.continuous {
            let delay = self.settings.end_backoff(self.retry_count);
            debug!(?delay, retry = self.retry_count + 1, "recognizer ended, restarting");
            self.schedule_restart(delay, scheduler);
            self.bump_retry();
        } else {
            self.active_panel = None;
        }
    }

    pub fn on_engine_error(
        &mut self,
        kind: &RecognitionErrorKind,
        scheduler: &mut dyn Scheduler,
        feedback: &mut Feedback,
    ) -> ErrorOutcome {
        self.phase = SessionPhase::Idle;
        feedback.set_mic_active(false);
        feedback.record(HistoryKind::Recognition, format!("Error: {kind}"));

        if kind.is_fatal() {
            error!(%kind, "recognition error ends continuous listening");
            self.stop(scheduler, feedback);
            feedback.notify(NoticeLevel::Error, fatal_message(kind));
            return ErrorOutcome::Fatal;
        }

        if self.continuous {
            let delay = self.settings.linear_backoff(self.retry_count + 1);
            debug!(%kind, ?delay, "retrying after recognition error");
            self.schedule_restart(delay, scheduler);
            self.bump_retry();
        } else {
            self.active_panel = None;
        }

        if kind.is_silent() {
            ErrorOutcome::Suppressed
        } else {
            warn!(%kind, "recognition error");
            ErrorOutcome::Recoverable
        }
    }

    /// Explicit stop. Safe to call repeatedly. Returns true if anything was
    /// running or pending.
    ///
    /// Cancels the restart slot and every deferred task of the session.
    pub fn stop(&mut self, scheduler: &mut dyn Scheduler, feedback: &mut Feedback) -> bool {
        let was_active = self.continuous
            || self.is_listening()
            || self.pending_restart.is_some()
            || !self.deferred.is_empty();

        self.begin(scheduler);
        self.continuous = false;
        self.retry_count = 0;
        self.cancel_restart(scheduler);

        if self.is_listening() {
            if let Some(engine) = self.engine.as_mut() {
                if let Err(err) = engine.stop() {
                    debug!(%err, "recognizer was already stopped");
                }
            }
        }
        self.phase = SessionPhase::Idle;
        self.active_panel = None;
        feedback.set_mic_active(false);

        if was_active {
            info!("listening stopped");
        }
        was_active
    }

    /// Called once feedback for an answer is done. Schedules a start unless
    /// the session is already listening or not in continuous mode.
    pub fn resume_for_next_question(&mut self, scheduler: &mut dyn Scheduler) -> bool {
        if !self.continuous || self.active_panel.is_none() || self.is_listening() {
            return false;
        }
        debug!("resuming listening for next question");
        self.schedule_restart(self.settings.resume_delay(), scheduler);
        true
    }

    /// A restart timer fired. Stale handles are ignored.
    pub fn on_restart_timer(
        &mut self,
        handle: TimerHandle,
        scheduler: &mut dyn Scheduler,
        feedback: &mut Feedback,
    ) {
        if self.pending_restart != Some(handle) {
            debug!(handle = handle.value(), "ignoring stale restart timer");
            return;
        }
        self.pending_restart = None;

        if self.continuous && !self.is_listening() {
            self.start_once(scheduler, feedback);
        }
    }

    /// Schedules `task` on behalf of the current generation. The task should
    /// carry `generation()` so its handler can re-check it.
    pub fn defer(
        &mut self,
        delay: Duration,
        task: VoiceTask,
        scheduler: &mut dyn Scheduler,
    ) -> TimerHandle {
        let handle = scheduler.schedule(delay, task);
        self.deferred.push(handle);
        handle
    }

    /// Forgets a deferred task that fired. Returns false for handles the
    /// session never deferred.
    pub fn settle(&mut self, handle: TimerHandle) -> bool {
        let before = self.deferred.len();
        self.deferred.retain(|h| *h != handle);
        self.deferred.len() != before
    }

    fn begin(&mut self, scheduler: &mut dyn Scheduler) {
        self.generation = self.generation.wrapping_add(1);
        for handle in self.deferred.drain(..) {
            scheduler.cancel(handle);
        }
    }

    fn schedule_restart(&mut self, delay: Duration, scheduler: &mut dyn Scheduler) {
        self.cancel_restart(scheduler);
        self.pending_restart = Some(scheduler.schedule(delay, VoiceTask::Restart));
    }

    fn cancel_restart(&mut self, scheduler: &mut dyn Scheduler) {
        if let Some(handle) = self.pending_restart.take() {
            scheduler.cancel(handle);
        }
    }

    fn bump_retry(&mut self) {
        self.retry_count = (self.retry_count + 1).min(self.settings.max_retries());
    }
}

fn fatal_message(kind: &RecognitionErrorKind) -> &'static str {
    match kind {
        RecognitionErrorKind::NotAllowed => {
            "Microphone permission denied. Please allow access in your browser settings."
        }
        _ => "Voice recognition lost its network connection. Click the microphone to try again.",
    }
}

impl fmt::Debug for RecognitionSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecognitionSession")
            .field("available", &self.engine.is_some())
            .field("phase", &self.phase)
            .field("continuous", &self.continuous)
            .field("retry_count", &self.retry_count)
            .field("active_panel", &self.active_panel)
            .field("pending_restart", &self.pending_restart)
            .field("generation", &self.generation)
            .field("deferred", &self.deferred.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use abacus_core::time::fixed_clock;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use abacus_core::model::QuizBoard;

    use super::*;
    use crate::pipeline::AnswerPipeline;
    use crate::scheduler::ManualScheduler;

    #[derive(Debug, Default)]
    struct EngineLog {
        starts: u32,
        stops: u32,
        fail_starts: bool,
        running: bool,
    }

    struct FakeEngine(Rc<RefCell<EngineLog>>);

    impl RecognitionEngine for FakeEngine {
        fn start(&mut self) -> Result<(), EngineError> {
            let mut log = self.0.borrow_mut();
            log.starts += 1;
            if log.fail_starts {
                return Err(EngineError::Failed("busy".into()));
            }
            log.running = true;
            Ok(())
        }

        fn stop(&mut self) -> Result<(), EngineError> {
            let mut log = self.0.borrow_mut();
            log.stops += 1;
            if !log.running {
                return Err(EngineError::NotRunning);
            }
            log.running = false;
            Ok(())
        }
    }

    struct Harness {
        session: RecognitionSession,
        scheduler: ManualScheduler,
        feedback: Feedback,
        log: Rc<RefCell<EngineLog>>,
    }

    fn harness() -> Harness {
        let log = Rc::new(RefCell::new(EngineLog::default()));
        let settings = VoiceSettings::default();
        Harness {
            session: RecognitionSession::new(Some(Box::new(FakeEngine(log.clone()))), settings.clone()),
            scheduler: ManualScheduler::new(),
            feedback: Feedback::new(&settings, fixed_clock()),
            log,
        }
    }

    fn restart_timers(scheduler: &ManualScheduler) -> usize {
        scheduler.pending_of(VoiceTask::Restart).count()
    }

    const PANEL: PanelId = PanelId::new(0);

    #[test]
    fn stop_twice_is_idempotent() {
        let mut h = harness();
        let mut board = QuizBoard::generate(1, 2, &mut StdRng::seed_from_u64(8)).unwrap();
        let mut pipeline = AnswerPipeline::new(VoiceSettings::default());
        h.session.start_continuous(PANEL, &mut h.scheduler, &mut h.feedback);
        h.session.on_engine_started(&mut h.feedback);
        pipeline.on_final_transcript(
            "banana",
            0.9,
            &mut h.session,
            &mut board,
            &mut h.scheduler,
            &mut h.feedback,
        );
        assert_eq!(h.session.deferred().len(), 1);

        assert!(h.session.stop(&mut h.scheduler, &mut h.feedback));
        assert!(!h.session.stop(&mut h.scheduler, &mut h.feedback));

        assert!(!h.session.is_listening());
        assert!(!h.session.is_continuous());
        assert_eq!(h.session.retry_count(), 0);
        assert_eq!(h.session.pending_restart(), None);
        assert_eq!(h.session.active_panel(), None);
        assert!(h.session.deferred().is_empty());
        assert!(h.scheduler.pending().is_empty());
        assert_eq!(h.log.borrow().stops, 1);
    }

    #[test]
    fn new_session_cancels_deferred_work_of_the_old_one() {
        let mut h = harness();
        h.session.listen_once(PANEL, &mut h.scheduler, &mut h.feedback);
        let first = h.session.generation();
        h.session.defer(
            Duration::from_secs(2),
            VoiceTask::StopListening { generation: first },
            &mut h.scheduler,
        );
        h.session.on_engine_ended(&mut h.scheduler, &mut h.feedback);

        h.session.listen_once(PANEL, &mut h.scheduler, &mut h.feedback);
        assert!(!h.session.is_current(first));
        assert!(h.session.deferred().is_empty());
        assert!(h.scheduler.pending().is_empty());
    }

    #[test]
    fn settle_forgets_fired_tasks_only_once() {
        let mut h = harness();
        h.session.start_continuous(PANEL, &mut h.scheduler, &mut h.feedback);
        let generation = h.session.generation();
        let handle = h.session.defer(
            Duration::from_millis(800),
            VoiceTask::SubmitAnswer { panel: PANEL, generation },
            &mut h.scheduler,
        );

        assert!(h.session.settle(handle));
        assert!(!h.session.settle(handle));
        assert!(h.session.is_current(generation));
    }

    #[test]
    fn detached_listening_has_no_panel() {
        let mut h = harness();
        h.session.start_continuous(PANEL, &mut h.scheduler, &mut h.feedback);
        h.session.stop(&mut h.scheduler, &mut h.feedback);

        let generation = h.session.listen_detached(&mut h.scheduler, &mut h.feedback);
        assert!(h.session.is_current(generation));
        assert!(h.session.is_listening());
        assert!(!h.session.is_continuous());
        assert_eq!(h.session.active_panel(), None);
    }

    #[test]
    fn stop_tolerates_engine_that_already_stopped() {
        let mut h = harness();
        h.session.start_continuous(PANEL, &mut h.scheduler, &mut h.feedback);
        h.log.borrow_mut().running = false;

        h.session.stop(&mut h.scheduler, &mut h.feedback);
        assert_eq!(h.log.borrow().stops, 1);
        assert_eq!(h.session.phase(), SessionPhase::Idle);
    }

    #[test]
    fn repeated_ends_back_off_exponentially() {
        let mut h = harness();
        h.session.start_continuous(PANEL, &mut h.scheduler, &mut h.feedback);

        let mut delays = Vec::new();
        for _ in 0..7 {
            h.session.on_engine_ended(&mut h.scheduler, &mut h.feedback);
            assert_eq!(restart_timers(&h.scheduler), 1);
            let delay = h.scheduler.pending()[0].delay;
            delays.push(delay.as_millis());
            assert!(h.session.retry_count() <= 5);

            let until = h.scheduler.now() + delay;
            let (handle, _) = h.scheduler.pop_due(until).unwrap();
            h.session.on_restart_timer(handle, &mut h.scheduler, &mut h.feedback);
        }

        assert_eq!(delays, vec![200, 400, 800, 1600, 2000, 2000, 2000]);
        assert_eq!(h.session.retry_count(), 5);
        assert_eq!(h.log.borrow().starts, 8);
    }

    #[test]
    fn engine_start_resets_retry_count() {
        let mut h = harness();
        h.session.start_continuous(PANEL, &mut h.scheduler, &mut h.feedback);
        h.session.on_engine_ended(&mut h.scheduler, &mut h.feedback);
        h.session.on_engine_ended(&mut h.scheduler, &mut h.feedback);
        assert_eq!(h.session.retry_count(), 2);

        h.session.on_engine_started(&mut h.feedback);
        assert_eq!(h.session.retry_count(), 0);
        assert!(h.feedback.status().mic_active);
    }

    #[test]
    fn fatal_errors_end_continuous_mode() {
        for kind in [RecognitionErrorKind::Network, RecognitionErrorKind::NotAllowed] {
            let mut h = harness();
            h.session.start_continuous(PANEL, &mut h.scheduler, &mut h.feedback);
            h.session.on_engine_ended(&mut h.scheduler, &mut h.feedback);

            let outcome = h.session.on_engine_error(&kind, &mut h.scheduler, &mut h.feedback);

            assert_eq!(outcome, ErrorOutcome::Fatal);
            assert!(!h.session.is_continuous());
            assert_eq!(h.session.retry_count(), 0);
            assert_eq!(restart_timers(&h.scheduler), 0);
            assert!(
                h.feedback
                    .notices()
                    .iter()
                    .any(|n| n.level == NoticeLevel::Error)
            );
        }
    }

    #[test]
    fn recoverable_errors_retry_linearly() {
        let mut h = harness();
        h.session.start_continuous(PANEL, &mut h.scheduler, &mut h.feedback);

        let outcome = h.session.on_engine_error(
            &RecognitionErrorKind::AudioCapture,
            &mut h.scheduler,
            &mut h.feedback,
        );
        assert_eq!(outcome, ErrorOutcome::Recoverable);
        let delay = h.scheduler.pending_of(VoiceTask::Restart).next().unwrap().delay;
        assert_eq!(delay, Duration::from_millis(500));
        assert_eq!(h.session.retry_count(), 1);

        h.session.on_engine_error(
            &RecognitionErrorKind::AudioCapture,
            &mut h.scheduler,
            &mut h.feedback,
        );
        let delay = h.scheduler.pending_of(VoiceTask::Restart).next().unwrap().delay;
        assert_eq!(delay, Duration::from_millis(1000));
        assert_eq!(restart_timers(&h.scheduler), 1);
    }

    #[test]
    fn silent_errors_are_suppressed_but_logged() {
        let mut h = harness();
        h.session.start_continuous(PANEL, &mut h.scheduler, &mut h.feedback);
        let outcome = h.session.on_engine_error(
            &RecognitionErrorKind::NoSpeech,
            &mut h.scheduler,
            &mut h.feedback,
        );

        assert_eq!(outcome, ErrorOutcome::Suppressed);
        assert!(h.feedback.notices().is_empty());
        assert_eq!(h.feedback.history().latest().unwrap().message, "Error: no-speech");
        assert!(h.session.is_continuous());
    }

    #[test]
    fn failed_start_retries_only_in_continuous_mode() {
        let mut h = harness();
        h.log.borrow_mut().fail_starts = true;

        h.session.listen_once(PANEL, &mut h.scheduler, &mut h.feedback);
        assert_eq!(h.session.retry_count(), 1);
        assert_eq!(restart_timers(&h.scheduler), 0);

        h.session.start_continuous(PANEL, &mut h.scheduler, &mut h.feedback);
        assert_eq!(h.session.retry_count(), 2);
        let delay = h.scheduler.pending_of(VoiceTask::Restart).next().unwrap().delay;
        assert_eq!(delay, Duration::from_millis(1000));

        // Two warnings, then quiet retries.
        h.session.start_once(&mut h.scheduler, &mut h.feedback);
        assert_eq!(h.feedback.notices().len(), 2);
    }

    #[test]
    fn start_once_is_noop_while_listening() {
        let mut h = harness();
        h.session.start_continuous(PANEL, &mut h.scheduler, &mut h.feedback);
        h.session.start_once(&mut h.scheduler, &mut h.feedback);
        assert_eq!(h.log.borrow().starts, 1);
    }

    #[test]
    fn missing_engine_never_starts() {
        let settings = VoiceSettings::default();
        let mut session = RecognitionSession::new(None, settings.clone());
        let mut scheduler = ManualScheduler::new();
        let mut feedback = Feedback::new(&settings, fixed_clock());

        session.start_continuous(PANEL, &mut scheduler, &mut feedback);
        assert!(!session.is_listening());
        assert!(scheduler.pending().is_empty());
        assert_eq!(session.permission(), Permission::Denied);
    }

    #[test]
    fn resume_requires_continuous_idle_session() {
        let mut h = harness();
        assert!(!h.session.resume_for_next_question(&mut h.scheduler));

        h.session.start_continuous(PANEL, &mut h.scheduler, &mut h.feedback);
        assert!(!h.session.resume_for_next_question(&mut h.scheduler));

        h.session.on_engine_ended(&mut h.scheduler, &mut h.feedback);
        assert!(h.session.resume_for_next_question(&mut h.scheduler));
        let pending: Vec<_> = h.scheduler.pending_of(VoiceTask::Restart).collect();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].delay, Duration::from_secs(1));
    }

    #[test]
    fn stale_restart_handle_is_ignored() {
        let mut h = harness();
        h.session.start_continuous(PANEL, &mut h.scheduler, &mut h.feedback);
        h.session.on_engine_ended(&mut h.scheduler, &mut h.feedback);
        let stale = h.session.pending_restart().unwrap();
        h.session.on_engine_ended(&mut h.scheduler, &mut h.feedback);

        h.session.on_restart_timer(stale, &mut h.scheduler, &mut h.feedback);
        assert_eq!(h.log.borrow().starts, 1);
        assert_eq!(restart_timers(&h.scheduler), 1);
    }

    #[test]
    fn at_most_one_restart_timer_over_random_events() {
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..50 {
            let mut h = harness();
            for _ in 0..200 {
                match rng.random_range(0..9) {
                    0 => h.session.start_continuous(PANEL, &mut h.scheduler, &mut h.feedback),
                    1 => h.session.start_once(&mut h.scheduler, &mut h.feedback),
                    2 => {
                        h.session.stop(&mut h.scheduler, &mut h.feedback);
                    }
                    3 => h.session.on_engine_started(&mut h.feedback),
                    4 => h.session.on_engine_ended(&mut h.scheduler, &mut h.feedback),
                    5 => {
                        let kind = match rng.random_range(0..4) {
                            0 => RecognitionErrorKind::Network,
                            1 => RecognitionErrorKind::NoSpeech,
                            2 => RecognitionErrorKind::Aborted,
                            _ => RecognitionErrorKind::AudioCapture,
                        };
                        h.session.on_engine_error(&kind, &mut h.scheduler, &mut h.feedback);
                    }
                    6 => {
                        h.session.resume_for_next_question(&mut h.scheduler);
                    }
                    7 => {
                        let fail = rng.random_bool(0.3);
                        h.log.borrow_mut().fail_starts = fail;
                    }
                    _ => {
                        let until = h.scheduler.now() + Duration::from_millis(rng.random_range(0..2500));
                        if let Some((handle, VoiceTask::Restart)) = h.scheduler.pop_due(until) {
                            h.session.on_restart_timer(handle, &mut h.scheduler, &mut h.feedback);
                        }
                    }
                }

                assert!(restart_timers(&h.scheduler) <= 1);
                assert!(h.session.retry_count() <= 5);
                if let Some(handle) = h.session.pending_restart() {
                    assert!(h.scheduler.pending().iter().any(|p| p.handle == handle));
                }
                if h.session.active_panel().is_some() {
                    assert!(h.session.is_continuous() || h.session.is_listening());
                }
            }
        }
    }
}

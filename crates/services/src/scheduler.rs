//! Cancellable delayed tasks.
//!
//! Every deferred step of the voice pipeline is a `VoiceTask` handed to a
//! `Scheduler`. When it fires, the host passes it back to the assistant,
//! which re-checks its guards before acting.

use std::collections::HashMap;
use std::time::Duration;

use abacus_core::model::PanelId;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

/// Identifies one scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Deferred work of the voice pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceTask {
    /// Try to start the recognizer again.
    Restart,
    /// Submit the answer written into a panel.
    SubmitAnswer { panel: PanelId, generation: u64 },
    /// Remove guidance left after an unparseable transcript.
    ClearFeedback { panel: PanelId, generation: u64 },
    /// End a single-shot recognition that heard nothing usable.
    StopListening { generation: u64 },
    /// Close the microphone check window.
    EndMicTest { generation: u64 },
    /// Replace the question of a panel.
    AdvanceQuestion { panel: PanelId, announce: bool },
    /// Read the new question aloud and resume listening.
    AnnounceQuestion { panel: PanelId },
    /// Wipe input and result of a panel if it is still on the same round.
    ClearInput { panel: PanelId, round: u64 },
}

/// A scheduler for delayed, cancellable tasks.
pub trait Scheduler {
    /// Schedules `task` to fire after `delay`.
    fn schedule(&mut self, delay: Duration, task: VoiceTask) -> TimerHandle;

    /// Cancels a pending task. Returns false if it already fired or was unknown.
    fn cancel(&mut self, handle: TimerHandle) -> bool;

    /// Confirms delivery of a fired task. Returns false if the task was
    /// cancelled after it had already been queued for delivery.
    fn fire(&mut self, _handle: TimerHandle) -> bool {
        true
    }
}

//
// ─── MANUAL ───────────────────────────────────────────────────────────────────
//

/// A task waiting in a `ManualScheduler`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub handle: TimerHandle,
    pub due: Duration,
    pub delay: Duration,
    pub task: VoiceTask,
}

/// Virtual-time scheduler. Nothing fires until the owner pops due tasks.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    now: Duration,
    next_id: u64,
    pending: Vec<ScheduledTask>,
}

impl ManualScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.now
    }

    #[must_use]
    pub fn pending(&self) -> &[ScheduledTask] {
        &self.pending
    }

    /// Pending tasks that match `task`.
    pub fn pending_of(&self, task: VoiceTask) -> impl Iterator<Item = &ScheduledTask> {
        self.pending.iter().filter(move |p| p.task == task)
    }

    /// Removes and returns the earliest task due at or before `until`,
    /// moving virtual time to its deadline.
    pub fn pop_due(&mut self, until: Duration) -> Option<(TimerHandle, VoiceTask)> {
        let (index, _) = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.due <= until)
            .min_by_key(|(_, p)| (p.due, p.handle))?;
        let next = self.pending.remove(index);
        self.now = self.now.max(next.due);
        Some((next.handle, next.task))
    }

    /// Moves virtual time forward without firing anything.
    pub fn set_now(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, delay: Duration, task: VoiceTask) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        self.pending.push(ScheduledTask {
            handle,
            due: self.now + delay,
            delay,
            task,
        });
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.handle != handle);
        self.pending.len() != before
    }
}

//
// ─── TOKIO ────────────────────────────────────────────────────────────────────
//

/// A task whose delay elapsed on the tokio runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiredTimer {
    pub handle: TimerHandle,
    pub task: VoiceTask,
}

/// Scheduler backed by `tokio::time::sleep`.
///
/// Fired tasks are posted to the receiver returned by `new`; the event loop
/// hands them back to the assistant. Must be used inside a tokio runtime.
#[derive(Debug)]
pub struct TokioScheduler {
    tx: mpsc::UnboundedSender<FiredTimer>,
    next_id: u64,
    live: HashMap<TimerHandle, AbortHandle>,
}

impl TokioScheduler {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FiredTimer>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                next_id: 0,
                live: HashMap::new(),
            },
            rx,
        )
    }

    /// Number of tasks that have neither fired nor been cancelled.
    #[must_use]
    pub fn live(&self) -> usize {
        self.live.len()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, delay: Duration, task: VoiceTask) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        let tx = self.tx.clone();
        let join = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The receiver is gone only when the event loop shut down.
            let _ = tx.send(FiredTimer { handle, task });
        });
        self.live.insert(handle, join.abort_handle());
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.live.remove(&handle) {
            Some(abort) => {
                abort.abort();
                true
            }
            None => false,
        }
    }

    fn fire(&mut self, handle: TimerHandle) -> bool {
        self.live.remove(&handle).is_some()
    }
}

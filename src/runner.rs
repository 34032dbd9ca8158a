//! Periodic session driver
//!
//! Runs a session on one owning thread so every mutation is serialized. Two
//! tick channels drive the poll and one-second triggers; the handle returned
//! by `spawn` cancels both and hands the session back.

use crate::error::CounterError;
use crate::session::{PollOutcome, SessionSnapshot, WorkoutSession};
use crate::source::PoseSource;
use crate::types::RepetitionEvent;
use chrono::Utc;
use crossbeam_channel::{select, tick, unbounded, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub struct SessionRunner;

impl SessionRunner {
    /// Start the poll and clock triggers for `session` on a dedicated thread
    pub fn spawn<S>(mut session: WorkoutSession, mut source: S) -> Result<RunHandle, CounterError>
    where
        S: PoseSource + Send + 'static,
    {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let (snapshot_tx, snapshot_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();

        let poll_every = Duration::from_millis(session.config().poll_interval_ms);
        let second_every = Duration::from_millis(session.config().clock_interval_ms);

        let thread = thread::Builder::new()
            .name("burpee-session".to_string())
            .spawn(move || {
                run_loop(
                    &mut session,
                    &mut source,
                    poll_every,
                    second_every,
                    stop_rx,
                    snapshot_tx,
                    event_tx,
                );
                session
            })
            .map_err(|e| CounterError::TaskError(format!("Failed to spawn session thread: {e}")))?;

        Ok(RunHandle {
            stop_tx,
            snapshots: snapshot_rx,
            events: event_rx,
            thread: Some(thread),
        })
    }
}

fn run_loop(
    session: &mut WorkoutSession,
    source: &mut dyn PoseSource,
    poll_every: Duration,
    second_every: Duration,
    stop_rx: Receiver<()>,
    snapshot_tx: Sender<SessionSnapshot>,
    event_tx: Sender<RepetitionEvent>,
) {
    let poll_ticks = tick(poll_every);
    let second_ticks = tick(second_every);
    session.begin(Utc::now());

    loop {
        select! {
            // Fires on an explicit cancel and when the handle is dropped
            recv(stop_rx) -> _ => break,
            recv(poll_ticks) -> _ => match session.poll(source) {
                PollOutcome::Observed { repetition: Some(event), .. } => {
                    let _ = event_tx.send(event);
                }
                PollOutcome::Exhausted | PollOutcome::Stopped => break,
                _ => {}
            },
            recv(second_ticks) -> _ => {
                session.tick_second(Utc::now());
                let _ = snapshot_tx.send(session.snapshot());
            }
        }
    }

    session.stop(Utc::now());
    let _ = snapshot_tx.send(session.snapshot());
}

/// Cancellation handle for a running session
pub struct RunHandle {
    stop_tx: Sender<()>,
    snapshots: Receiver<SessionSnapshot>,
    events: Receiver<RepetitionEvent>,
    thread: Option<JoinHandle<WorkoutSession>>,
}

impl RunHandle {
    /// Snapshot after every one-second tick, plus a final one on stop
    pub fn snapshots(&self) -> &Receiver<SessionSnapshot> {
        &self.snapshots
    }

    /// Every completed repetition, as it happens
    pub fn events(&self) -> &Receiver<RepetitionEvent> {
        &self.events
    }

    /// Stop both triggers, end the session and return it
    pub fn cancel(mut self) -> Result<WorkoutSession, CounterError> {
        let _ = self.stop_tx.try_send(());
        self.join_thread()
    }

    /// Wait for the source to run dry, then return the stopped session
    pub fn join(mut self) -> Result<WorkoutSession, CounterError> {
        self.join_thread()
    }

    fn join_thread(&mut self) -> Result<WorkoutSession, CounterError> {
        let thread = self
            .thread
            .take()
            .ok_or_else(|| CounterError::TaskError("session already joined".to_string()))?;
        thread
            .join()
            .map_err(|_| CounterError::TaskError("session thread panicked".to_string()))
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.stop_tx.try_send(());
            let _ = thread.join();
        }
    }
}

use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc,
        mpsc::{self, Receiver, Sender, TryRecvError},
    },
    thread,
    time::{Duration, Instant},
};

use super::sync::{StepFailure, StagedSnapshot, SyncKind, SyncStep, run_steps};
use crate::planning::{PlanningApi, RemoteError};

/// Messages sent from a sync worker back to the controller thread.
#[derive(Debug)]
pub(super) enum SyncMessage {
    /// The worker is about to run `step`.
    Step { sync_id: u64, step: SyncStep },
    Finished(SyncResult),
}

#[derive(Debug)]
pub(super) struct SyncResult {
    pub(super) sync_id: u64,
    pub(super) kind: SyncKind,
    pub(super) outcome: Result<StagedSnapshot, StepFailure>,
    pub(super) elapsed: Duration,
}

/// Bookkeeping for the one sync allowed in flight.
#[derive(Debug, Clone)]
pub(super) struct InFlight {
    pub(super) sync_id: u64,
    pub(super) kind: SyncKind,
    pub(super) step: Option<SyncStep>,
    pub(super) started: Instant,
}

pub(super) struct SyncJobs {
    api: Arc<dyn PlanningApi>,
    message_tx: Sender<SyncMessage>,
    message_rx: Receiver<SyncMessage>,
    in_flight: Option<InFlight>,
    next_sync_id: u64,
}

impl SyncJobs {
    pub(super) fn new(api: Arc<dyn PlanningApi>) -> Self {
        let (message_tx, message_rx) = mpsc::channel();
        Self {
            api,
            message_tx,
            message_rx,
            in_flight: None,
            next_sync_id: 1,
        }
    }

    pub(super) fn in_flight(&self) -> Option<&InFlight> {
        self.in_flight.as_ref()
    }

    pub(super) fn try_recv_message(&self) -> Result<SyncMessage, TryRecvError> {
        self.message_rx.try_recv()
    }

    /// Spawn a worker running the steps of `kind` in order. Caller checks reentrancy.
    pub(super) fn begin_sync(&mut self, kind: SyncKind) -> u64 {
        let sync_id = self.next_sync_id;
        self.next_sync_id = self.next_sync_id.wrapping_add(1).max(1);
        self.in_flight = Some(InFlight {
            sync_id,
            kind: kind.clone(),
            step: None,
            started: Instant::now(),
        });
        let api = Arc::clone(&self.api);
        let tx = self.message_tx.clone();
        thread::spawn(move || {
            let started = Instant::now();
            let steps = kind.steps();
            let mut current: Option<SyncStep> = None;
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                run_steps(api.as_ref(), &steps, |step| {
                    current = Some(step.clone());
                    let _ = tx.send(SyncMessage::Step {
                        sync_id,
                        step: step.clone(),
                    });
                })
            }))
            .unwrap_or_else(|payload| {
                let message = panic_to_string(payload);
                tracing::error!(sync_id, %message, "Sync worker panicked");
                Err(StepFailure {
                    step: current
                        .take()
                        .or_else(|| steps.first().cloned())
                        .unwrap_or(SyncStep::FetchTrains),
                    error: RemoteError::Service {
                        status: None,
                        message: format!("sync worker panicked: {message}"),
                    },
                })
            });
            let _ = tx.send(SyncMessage::Finished(SyncResult {
                sync_id,
                kind,
                outcome,
                elapsed: started.elapsed(),
            }));
        });
        sync_id
    }

    /// Note which step the in-flight sync reached, ignoring stale ids.
    pub(super) fn mark_step(&mut self, sync_id: u64, step: SyncStep) {
        if let Some(in_flight) = self.in_flight.as_mut()
            && in_flight.sync_id == sync_id
        {
            in_flight.step = Some(step);
        }
    }

    /// Release the in-flight slot if `sync_id` owns it.
    pub(super) fn finish(&mut self, sync_id: u64) -> bool {
        if self
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.sync_id == sync_id)
        {
            self.in_flight = None;
            return true;
        }
        false
    }

    /// Swap in a fresh channel so late worker results are dropped.
    /// Returns whether a sync was in flight.
    pub(super) fn detach(&mut self) -> bool {
        let (message_tx, message_rx) = mpsc::channel();
        self.message_tx = message_tx;
        self.message_rx = message_rx;
        self.in_flight.take().is_some()
    }
}

fn panic_to_string(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

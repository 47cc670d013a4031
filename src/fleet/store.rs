//! Authoritative local copy of the fleet plus operation flags.
//!
//! The store performs no I/O. Trains and status are only ever replaced
//! wholesale, and every mutation is announced to subscribers exactly once.

use std::sync::mpsc::{self, Receiver, Sender};

use time::OffsetDateTime;

use super::model::{SystemStatus, Train};

/// Broad class of a user-visible failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Service unreachable or timed out.
    Network,
    /// Service answered with a failure or an unusable body.
    Service,
    /// Input rejected locally before any call was made.
    Validation,
}

/// The single error descriptor surfaced to the operator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorNotice {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorNotice {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Trains in service order plus the last known system status.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FleetSnapshot {
    pub trains: Vec<Train>,
    pub status: Option<SystemStatus>,
}

/// Flags describing in-flight work and the last outcome.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OperationState {
    /// True while any remote operation is running.
    pub loading: bool,
    /// When the train list was last committed.
    pub last_update: Option<OffsetDateTime>,
    pub error: Option<ErrorNotice>,
    pub auto_refresh_enabled: bool,
}

/// Change notifications delivered to subscribers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreEvent {
    TrainsReplaced { generation: u64, count: usize },
    StatusReplaced,
    OperationChanged,
}

pub struct FleetStore {
    snapshot: FleetSnapshot,
    operation: OperationState,
    generation: u64,
    observers: Vec<Sender<StoreEvent>>,
}

impl Default for FleetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FleetStore {
    pub fn new() -> Self {
        Self {
            snapshot: FleetSnapshot::default(),
            operation: OperationState::default(),
            generation: 0,
            observers: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> &FleetSnapshot {
        &self.snapshot
    }

    pub fn trains(&self) -> &[Train] {
        &self.snapshot.trains
    }

    pub fn status(&self) -> Option<&SystemStatus> {
        self.snapshot.status.as_ref()
    }

    pub fn operation(&self) -> &OperationState {
        &self.operation
    }

    /// Number of train-list replacements committed so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn contains_train(&self, train_id: &str) -> bool {
        self.snapshot
            .trains
            .iter()
            .any(|train| train.train_id == train_id)
    }

    /// Register a new observer. Dropping the receiver unsubscribes it.
    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        let (tx, rx) = mpsc::channel();
        self.observers.push(tx);
        rx
    }

    /// Replace the whole train list with one service response.
    pub fn replace_trains(&mut self, trains: Vec<Train>, fetched_at: OffsetDateTime) {
        self.generation += 1;
        let count = trains.len();
        self.snapshot.trains = trains;
        self.operation.last_update = Some(fetched_at);
        self.notify(StoreEvent::TrainsReplaced {
            generation: self.generation,
            count,
        });
    }

    pub fn replace_status(&mut self, status: SystemStatus) {
        self.snapshot.status = Some(status);
        self.notify(StoreEvent::StatusReplaced);
    }

    pub fn set_loading(&mut self, loading: bool) {
        if self.operation.loading != loading {
            self.operation.loading = loading;
            self.notify(StoreEvent::OperationChanged);
        }
    }

    /// Record (or clear) the current error. A new error replaces any previous one.
    pub fn set_error(&mut self, error: Option<ErrorNotice>) {
        self.operation.error = error;
        self.notify(StoreEvent::OperationChanged);
    }

    pub fn set_auto_refresh(&mut self, enabled: bool) {
        if self.operation.auto_refresh_enabled != enabled {
            self.operation.auto_refresh_enabled = enabled;
            self.notify(StoreEvent::OperationChanged);
        }
    }

    fn notify(&mut self, event: StoreEvent) {
        self.observers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

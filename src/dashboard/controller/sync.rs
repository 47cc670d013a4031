//! Sync sequencing, reentrancy and commit.
//!
//! A sync is an ordered list of remote steps. Results are staged in the
//! worker and committed together once every step has succeeded; the first
//! failure ends the sync and nothing is committed.

use std::time::Instant;

use time::OffsetDateTime;

use super::DashboardController;
use super::jobs::{SyncMessage, SyncResult};
use crate::fleet::{ErrorNotice, OverrideRequest, PredictionOptions, SystemStatus, Train};
use crate::planning::{PlanningApi, RemoteError};

/// What started a sync; decides which steps it runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncKind {
    /// First load when the dashboard opens.
    Startup,
    /// "Refresh Data": ask the service to recompute, then reload.
    RefreshAll,
    /// Timer tick: reload only.
    AutoRefresh,
    Predict(PredictionOptions),
    Override(OverrideRequest),
    ClearOverrides,
}

impl SyncKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Startup => "initial load",
            Self::RefreshAll => "refresh",
            Self::AutoRefresh => "auto-refresh",
            Self::Predict(_) => "prediction run",
            Self::Override(_) => "override",
            Self::ClearOverrides => "clear overrides",
        }
    }

    fn failure_context(&self) -> &'static str {
        match self {
            Self::Startup | Self::AutoRefresh => "Failed to fetch train data",
            Self::RefreshAll => "Failed to refresh data",
            Self::Predict(_) => "Failed to generate predictions",
            Self::Override(_) => "Failed to apply override",
            Self::ClearOverrides => "Failed to clear overrides",
        }
    }

    /// Ordered remote steps. Every kind ends with the lightweight reload.
    pub fn steps(&self) -> Vec<SyncStep> {
        let lead = match self {
            Self::Startup | Self::AutoRefresh => None,
            Self::RefreshAll => Some(SyncStep::RefreshData),
            Self::Predict(options) => Some(SyncStep::Predict(*options)),
            Self::Override(request) => Some(SyncStep::Override(request.clone())),
            Self::ClearOverrides => Some(SyncStep::ClearOverrides),
        };
        lead.into_iter()
            .chain([SyncStep::FetchTrains, SyncStep::FetchStatus])
            .collect()
    }
}

/// One remote call within a sync.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncStep {
    RefreshData,
    Predict(PredictionOptions),
    Override(OverrideRequest),
    ClearOverrides,
    FetchTrains,
    FetchStatus,
}

impl SyncStep {
    pub fn label(&self) -> &'static str {
        match self {
            Self::RefreshData => "Recomputing plan",
            Self::Predict(_) => "Generating predictions",
            Self::Override(_) => "Applying override",
            Self::ClearOverrides => "Clearing overrides",
            Self::FetchTrains => "Loading trains",
            Self::FetchStatus => "Loading status",
        }
    }

    /// Steps that change state on the service rather than read it.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::FetchTrains | Self::FetchStatus)
    }
}

/// Whether a trigger started a sync or was dropped because one is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    Started,
    Dropped,
}

/// Scheduler state as seen from outside. Failures return straight to `Idle`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Syncing {
        kind: SyncKind,
        step: Option<SyncStep>,
        since: Instant,
    },
}

/// Results gathered by a sync before commit.
#[derive(Debug, Default)]
pub(super) struct StagedSnapshot {
    pub(super) trains: Option<(Vec<Train>, OffsetDateTime)>,
    pub(super) status: Option<SystemStatus>,
}

/// The step that ended a sync and why.
#[derive(Debug)]
pub(super) struct StepFailure {
    pub(super) step: SyncStep,
    pub(super) error: RemoteError,
}

/// Run `steps` strictly in order, stopping at the first failure.
pub(super) fn run_steps(
    api: &dyn PlanningApi,
    steps: &[SyncStep],
    mut on_step: impl FnMut(&SyncStep),
) -> Result<StagedSnapshot, StepFailure> {
    let mut staged = StagedSnapshot::default();
    for step in steps {
        on_step(step);
        let fail = |error| StepFailure {
            step: step.clone(),
            error,
        };
        match step {
            SyncStep::RefreshData => api.refresh_data().map_err(fail)?,
            SyncStep::Predict(options) => api.predict_induction(options).map_err(fail)?,
            SyncStep::Override(request) => api.override_train(request).map_err(fail)?,
            SyncStep::ClearOverrides => api.clear_overrides().map_err(fail)?,
            SyncStep::FetchTrains => {
                let trains = api.get_induction_list().map_err(fail)?;
                staged.trains = Some((trains, OffsetDateTime::now_utc()));
            }
            SyncStep::FetchStatus => {
                staged.status = Some(api.get_status().map_err(fail)?);
            }
        }
    }
    Ok(staged)
}

impl DashboardController {
    /// "Refresh Data": recompute on the service, then reload trains and status.
    pub fn refresh_all(&mut self) -> Dispatch {
        self.trigger(SyncKind::RefreshAll)
    }

    pub fn phase(&self) -> SyncPhase {
        match self.jobs.in_flight() {
            Some(in_flight) => SyncPhase::Syncing {
                kind: in_flight.kind.clone(),
                step: in_flight.step.clone(),
                since: in_flight.started,
            },
            None => SyncPhase::Idle,
        }
    }

    /// Start `kind` unless a sync is already running, in which case it is dropped.
    pub(super) fn trigger(&mut self, kind: SyncKind) -> Dispatch {
        if self.is_busy() {
            tracing::debug!(trigger = kind.label(), "Sync in flight; dropping trigger");
            return Dispatch::Dropped;
        }
        self.store.set_loading(true);
        let sync_id = self.jobs.begin_sync(kind.clone());
        tracing::info!(sync_id, trigger = kind.label(), "Sync started");
        Dispatch::Started
    }

    pub(super) fn poll_jobs(&mut self) {
        while let Ok(message) = self.jobs.try_recv_message() {
            match message {
                SyncMessage::Step { sync_id, step } => {
                    tracing::debug!(sync_id, step = step.label(), "Sync step");
                    self.jobs.mark_step(sync_id, step);
                }
                SyncMessage::Finished(result) => self.finish_sync(result),
            }
        }
    }

    fn finish_sync(&mut self, result: SyncResult) {
        if !self.jobs.finish(result.sync_id) {
            tracing::debug!(sync_id = result.sync_id, "Ignoring result of a detached sync");
            return;
        }
        let SyncResult {
            sync_id,
            kind,
            outcome,
            elapsed,
        } = result;
        match outcome {
            Ok(staged) => {
                self.commit(staged);
                tracing::info!(
                    sync_id,
                    trigger = kind.label(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    trains = self.store.trains().len(),
                    "Sync finished"
                );
                self.note_override_outcome(&kind, Ok(()));
            }
            Err(StepFailure { step, error }) => {
                tracing::warn!(
                    sync_id,
                    trigger = kind.label(),
                    step = step.label(),
                    %error,
                    "Sync failed"
                );
                // A failure after the mutating step means the service accepted it.
                let mutation_result = if step.is_mutation() {
                    Err(error.to_string())
                } else {
                    Ok(())
                };
                self.record_error(ErrorNotice::new(
                    error.kind(),
                    format!("{}: {error}", kind.failure_context()),
                ));
                self.note_override_outcome(&kind, mutation_result);
            }
        }
        self.store.set_loading(false);
    }

    fn commit(&mut self, staged: StagedSnapshot) {
        if let Some((trains, fetched_at)) = staged.trains {
            self.store.replace_trains(trains, fetched_at);
            self.recompute_metrics();
        }
        if let Some(status) = staged.status {
            self.store.replace_status(status);
        }
    }
}

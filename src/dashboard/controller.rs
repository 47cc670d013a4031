//! Owns the fleet store and drives every remote operation against it.
//!
//! The controller lives on the UI thread. Remote work runs on worker threads
//! and comes back through a channel that `tick` drains, so all store commits
//! happen here.

mod auto_refresh;
mod jobs;
mod overrides;
mod sync;

#[cfg(test)]
mod test_support;

pub use auto_refresh::{AUTO_REFRESH_INTERVAL, AutoRefreshTimer};
pub use overrides::{OverrideFeedback, ValidationError};
pub use sync::{Dispatch, SyncKind, SyncPhase, SyncStep};

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Instant;

use crate::config::{ConfigError, DashboardConfig};
use crate::fleet::{
    ErrorNotice, FleetMetrics, FleetStore, PredictionOptions, StoreEvent, compute_metrics,
};
use crate::planning::{PlanningApi, PlanningClient};
use jobs::SyncJobs;

/// Behaviour knobs supplied at construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ControllerOptions {
    pub predictions: PredictionOptions,
    pub auto_refresh_on_start: bool,
}

impl From<&DashboardConfig> for ControllerOptions {
    fn from(config: &DashboardConfig) -> Self {
        Self {
            predictions: config.predictions.options(),
            auto_refresh_on_start: config.refresh.auto_refresh_on_start,
        }
    }
}

/// Explicit context for the dashboard: store, service handle, jobs and timer.
pub struct DashboardController {
    store: FleetStore,
    metrics: FleetMetrics,
    jobs: SyncJobs,
    auto_refresh: AutoRefreshTimer,
    options: ControllerOptions,
    override_feedback: Option<OverrideFeedback>,
}

impl DashboardController {
    pub fn new(api: Arc<dyn PlanningApi>, options: ControllerOptions) -> Self {
        Self {
            store: FleetStore::new(),
            metrics: FleetMetrics::default(),
            jobs: SyncJobs::new(api),
            auto_refresh: AutoRefreshTimer::new(AUTO_REFRESH_INTERVAL),
            options,
            override_feedback: None,
        }
    }

    /// Build a controller talking HTTP to the configured planning service.
    pub fn from_config(config: &DashboardConfig) -> Result<Self, ConfigError> {
        let base_url = config.service.parsed_base_url()?;
        tracing::info!(%base_url, "Using planning service");
        let client = PlanningClient::new(base_url, config.service.transport_limits());
        Ok(Self::new(Arc::new(client), ControllerOptions::from(config)))
    }

    /// Initial mount: load trains and status, and arm auto-refresh if configured.
    pub fn startup(&mut self, now: Instant) {
        self.trigger(SyncKind::Startup);
        if self.options.auto_refresh_on_start {
            self.set_auto_refresh(true, now);
        }
    }

    /// Drain finished work, then let the auto-refresh timer fire if due.
    pub fn tick(&mut self, now: Instant) {
        self.poll_jobs();
        self.poll_auto_refresh(now);
    }

    /// Cancel the timer and stop listening for in-flight results.
    pub fn shutdown(&mut self) {
        self.auto_refresh.disable();
        self.store.set_auto_refresh(false);
        if self.jobs.detach() {
            tracing::info!("Shutting down with a sync in flight; its result will be discarded");
        }
        self.store.set_loading(false);
    }

    pub fn store(&self) -> &FleetStore {
        &self.store
    }

    /// Metrics for the currently committed train list.
    pub fn metrics(&self) -> &FleetMetrics {
        &self.metrics
    }

    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        self.store.subscribe()
    }

    pub fn prediction_options(&self) -> PredictionOptions {
        self.options.predictions
    }

    /// True while a sync is running; new triggers are dropped meanwhile.
    pub fn is_busy(&self) -> bool {
        self.store.operation().loading || self.jobs.in_flight().is_some()
    }

    /// Clear the surfaced error without touching anything else.
    pub fn dismiss_error(&mut self) {
        if self.store.operation().error.is_some() {
            self.store.set_error(None);
        }
    }

    fn record_error(&mut self, notice: ErrorNotice) {
        tracing::warn!(kind = ?notice.kind, message = %notice.message, "Dashboard error");
        self.store.set_error(Some(notice));
    }

    fn recompute_metrics(&mut self) {
        self.metrics = compute_metrics(self.store.trains());
    }
}

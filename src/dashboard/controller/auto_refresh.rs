use std::time::{Duration, Instant};

use super::DashboardController;
use super::sync::{Dispatch, SyncKind};

/// Fixed period between automatic reloads.
pub const AUTO_REFRESH_INTERVAL: Duration = Duration::from_secs(300);

/// Deadline-based periodic timer driven by `tick`.
#[derive(Clone, Debug)]
pub struct AutoRefreshTimer {
    interval: Duration,
    next_due: Option<Instant>,
}

impl AutoRefreshTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    /// Arm the timer; the first fire is one interval from `now`.
    /// Re-enabling an armed timer keeps its current deadline.
    pub fn enable(&mut self, now: Instant) {
        if self.next_due.is_none() {
            self.next_due = Some(now + self.interval);
        }
    }

    pub fn disable(&mut self) {
        self.next_due = None;
    }

    pub fn is_armed(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.next_due
    }

    /// True when the deadline has passed; the next deadline is one interval
    /// after `now`, so missed periods are not replayed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                self.next_due = Some(now + self.interval);
                true
            }
            _ => false,
        }
    }
}

impl DashboardController {
    /// Turn periodic reloads on or off. Disabling never aborts a running sync.
    pub fn set_auto_refresh(&mut self, enabled: bool, now: Instant) {
        if enabled {
            self.auto_refresh.enable(now);
        } else {
            self.auto_refresh.disable();
        }
        if self.store.operation().auto_refresh_enabled != enabled {
            tracing::info!(enabled, "Auto-refresh toggled");
        }
        self.store.set_auto_refresh(enabled);
    }

    pub fn auto_refresh_timer(&self) -> &AutoRefreshTimer {
        &self.auto_refresh
    }

    pub(super) fn poll_auto_refresh(&mut self, now: Instant) {
        if !self.auto_refresh.poll(now) {
            return;
        }
        tracing::debug!("Auto-refresh timer fired");
        if self.trigger(SyncKind::AutoRefresh) == Dispatch::Dropped {
            tracing::debug!("Auto-refresh fired during a sync; skipped");
        }
    }
}

//! Service-mutating operator actions: overrides, clearing them, predictions.

use thiserror::Error;

use super::DashboardController;
use super::sync::{Dispatch, SyncKind};
use crate::fleet::{Decision, ErrorKind, ErrorNotice, OverrideRequest};

const BUSY_MESSAGE: &str = "Another sync is in progress; try again when it finishes";

/// Reasons an override is refused before any remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Decision '{0}' cannot be applied as an override; use Induct, Reject or Hold")]
    NotOverridable(Decision),
    #[error("Train '{0}' is not in the current fleet")]
    UnknownTrain(String),
}

/// Result of one override call, handed to the UI once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideFeedback {
    pub train_id: String,
    pub decision: Decision,
    pub outcome: Result<(), String>,
}

impl DashboardController {
    /// Ask the service to force `decision` onto `train_id`, then reload.
    ///
    /// The snapshot is never patched locally; it changes only through the
    /// reload that follows a successful call.
    pub fn apply_override(
        &mut self,
        train_id: &str,
        decision: Decision,
        reason: &str,
    ) -> Result<Dispatch, ValidationError> {
        let train_id = train_id.trim();
        let rejected = if !decision.is_overridable() {
            Some(ValidationError::NotOverridable(decision))
        } else if !self.store.contains_train(train_id) {
            Some(ValidationError::UnknownTrain(train_id.to_string()))
        } else {
            None
        };
        if let Some(err) = rejected {
            self.record_error(ErrorNotice::new(ErrorKind::Validation, err.to_string()));
            return Err(err);
        }
        let kind = SyncKind::Override(OverrideRequest {
            train_id: train_id.to_string(),
            decision,
            reason: reason.trim().to_string(),
        });
        let dispatch = self.trigger(kind.clone());
        if dispatch == Dispatch::Dropped {
            self.note_override_outcome(&kind, Err(BUSY_MESSAGE.to_string()));
        }
        Ok(dispatch)
    }

    /// Remove every manual override on the service, then reload.
    pub fn clear_overrides(&mut self) -> Dispatch {
        self.trigger(SyncKind::ClearOverrides)
    }

    /// Run the service's prediction with the configured options, then reload.
    pub fn generate_predictions(&mut self) -> Dispatch {
        self.trigger(SyncKind::Predict(self.options.predictions))
    }

    /// Outcome of the most recent override call, if not yet taken.
    pub fn take_override_feedback(&mut self) -> Option<OverrideFeedback> {
        self.override_feedback.take()
    }

    pub(super) fn note_override_outcome(&mut self, kind: &SyncKind, outcome: Result<(), String>) {
        if let SyncKind::Override(request) = kind {
            self.override_feedback = Some(OverrideFeedback {
                train_id: request.train_id.clone(),
                decision: request.decision,
                outcome,
            });
        }
    }
}

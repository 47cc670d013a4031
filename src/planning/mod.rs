//! Typed access to the remote induction-planning service.
//!
//! `PlanningApi` is the seam the controller talks through; `PlanningClient`
//! is the HTTP implementation. Nothing in this module touches local state.

mod client;
pub(crate) mod wire;

pub use client::PlanningClient;

use crate::fleet::{ErrorKind, OverrideRequest, PredictionOptions, SystemStatus, Train};

/// Failure modes of a remote call, passed through to callers unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The service could not be reached or the transfer timed out.
    #[error("Planning service unreachable: {0}")]
    Network(String),
    /// Non-2xx response, or a 2xx whose `status` field is not `"success"`.
    #[error("Planning service error{}: {message}", http_suffix(.status))]
    Service {
        status: Option<u16>,
        message: String,
    },
    /// The body could not be decoded into the expected shape.
    #[error("Malformed planning service response: {0}")]
    Malformed(String),
}

impl RemoteError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) => ErrorKind::Network,
            Self::Service { .. } | Self::Malformed(_) => ErrorKind::Service,
        }
    }
}

fn http_suffix(status: &Option<u16>) -> String {
    status
        .map(|code| format!(" (HTTP {code})"))
        .unwrap_or_default()
}

/// One operation per remote capability of the planning service.
pub trait PlanningApi: Send + Sync {
    /// `GET /status`
    fn get_status(&self) -> Result<SystemStatus, RemoteError>;
    /// `GET /get_induction_list`, in service order.
    fn get_induction_list(&self) -> Result<Vec<Train>, RemoteError>;
    /// `GET /refresh_data`: asks the service to recompute.
    fn refresh_data(&self) -> Result<(), RemoteError>;
    /// `POST /predict_induction`
    fn predict_induction(&self, options: &PredictionOptions) -> Result<(), RemoteError>;
    /// `POST /override_train`
    fn override_train(&self, request: &OverrideRequest) -> Result<(), RemoteError>;
    /// `DELETE /clear_overrides`
    fn clear_overrides(&self) -> Result<(), RemoteError>;
}

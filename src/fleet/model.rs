use std::fmt;
use std::str::FromStr;

use time::OffsetDateTime;

/// Depot label used when the service omits one.
pub const UNKNOWN_DEPOT: &str = "Unknown";

/// Induction decision attached to a train.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Decision {
    Induct,
    Reject,
    Hold,
    Pending,
    Unknown,
}

impl Decision {
    /// Decisions an operator may apply as a manual override.
    pub const OVERRIDABLE: [Decision; 3] = [Decision::Induct, Decision::Reject, Decision::Hold];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Induct => "Induct",
            Self::Reject => "Reject",
            Self::Hold => "Hold",
            Self::Pending => "Pending",
            Self::Unknown => "Unknown",
        }
    }

    /// Map a raw service value onto a decision, treating anything unrecognised as `Unknown`.
    pub fn from_service_value(raw: Option<&str>) -> Self {
        raw.and_then(|value| value.parse().ok())
            .unwrap_or(Self::Unknown)
    }

    pub fn is_overridable(self) -> bool {
        Self::OVERRIDABLE.contains(&self)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a decision.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unrecognised decision '{0}'")]
pub struct ParseDecisionError(pub String);

impl FromStr for Decision {
    type Err = ParseDecisionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        [
            Self::Induct,
            Self::Reject,
            Self::Hold,
            Self::Pending,
            Self::Unknown,
        ]
        .into_iter()
        .find(|decision| decision.as_str().eq_ignore_ascii_case(trimmed))
        .ok_or_else(|| ParseDecisionError(value.to_string()))
    }
}

/// One train in a fleet snapshot, with service defaults already applied.
#[derive(Clone, Debug, PartialEq)]
pub struct Train {
    pub train_id: String,
    /// Fitness on a 0-100 scale; absent scores are stored as 0.
    pub fitness_score: f64,
    pub depot: String,
    pub final_decision: Decision,
    pub open_work_orders: u32,
}

impl Train {
    /// Train with every optional field at its default.
    pub fn new(train_id: impl Into<String>) -> Self {
        Self {
            train_id: train_id.into(),
            fitness_score: 0.0,
            depot: UNKNOWN_DEPOT.to_string(),
            final_decision: Decision::Unknown,
            open_work_orders: 0,
        }
    }

    pub fn is_inducted(&self) -> bool {
        self.final_decision == Decision::Induct
    }
}

/// Lifecycle state reported by the planning service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceState {
    Running,
    Error,
    Initializing,
}

impl ServiceState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Error => "error",
            Self::Initializing => "initializing",
        }
    }

    pub fn from_service_value(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "running" => Some(Self::Running),
            "error" => Some(Self::Error),
            "initializing" => Some(Self::Initializing),
            _ => None,
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service-wide status mirrored from `/status`.
#[derive(Clone, Debug, PartialEq)]
pub struct SystemStatus {
    pub status: ServiceState,
    pub trains_count: u32,
    pub ml_model_trained: bool,
    pub optimization_completed: bool,
    pub manual_overrides_count: u32,
    pub last_update: Option<OffsetDateTime>,
}

/// Parameters for a prediction run on the planning service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PredictionOptions {
    pub use_mock_data: bool,
    pub retrain_model: bool,
    pub target_inductions: u32,
}

impl Default for PredictionOptions {
    fn default() -> Self {
        Self {
            use_mock_data: true,
            retrain_model: false,
            target_inductions: 25,
        }
    }
}

/// Manual decision an operator wants the service to apply to one train.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverrideRequest {
    pub train_id: String,
    pub decision: Decision,
    pub reason: String,
}

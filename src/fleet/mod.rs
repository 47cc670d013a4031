//! Fleet data model, local store and derived metrics.

pub mod metrics;
pub mod model;
pub mod store;

pub use metrics::{FitnessBuckets, FitnessPoint, FleetMetrics, compute_metrics, fitness_series};
pub use model::{
    Decision, OverrideRequest, PredictionOptions, ServiceState, SystemStatus, Train,
    UNKNOWN_DEPOT,
};
pub use store::{ErrorKind, ErrorNotice, FleetSnapshot, FleetStore, OperationState, StoreEvent};

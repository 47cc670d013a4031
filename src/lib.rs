//! Library exports for the dashboard binary, benchmarks and tests.
/// Application directory resolution.
pub mod app_dirs;
/// TOML configuration.
pub mod config;
/// Controller and egui shell.
pub mod dashboard;
/// Fleet model, store and metrics.
pub mod fleet;
/// Shared HTTP transport settings.
pub mod http_client;
/// Tracing setup.
pub mod logging;
/// Planning service client.
pub mod planning;

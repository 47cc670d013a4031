//! Dashboard state machine and its egui front end.

pub mod controller;
pub mod ui;

#![deny(missing_docs)]

//! Entry point for the fleetdeck induction planning dashboard.
use std::time::Instant;

use eframe::egui;
use fleetdeck::config;
use fleetdeck::dashboard::controller::DashboardController;
use fleetdeck::dashboard::ui::{DashboardApp, MIN_VIEWPORT_SIZE};
use fleetdeck::logging;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }

    let controller = config::load_or_default().and_then(|config| {
        let mut controller = DashboardController::from_config(&config)?;
        controller.startup(Instant::now());
        Ok(controller)
    });
    if let Err(err) = &controller {
        tracing::error!(%err, "Dashboard failed to start");
    }

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_min_inner_size(MIN_VIEWPORT_SIZE)
            .with_inner_size(MIN_VIEWPORT_SIZE),
        ..Default::default()
    };

    eframe::run_native(
        "Fleetdeck",
        native_options,
        Box::new(move |_cc| match controller {
            Ok(controller) => Ok(Box::new(DashboardApp::new(controller))),
            Err(err) => Ok(Box::new(LaunchError {
                message: err.to_string(),
            })),
        }),
    )?;
    Ok(())
}

/// Minimal fallback app to display initialization errors.
struct LaunchError {
    message: String,
}

impl eframe::App for LaunchError {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.heading("Failed to start dashboard");
                ui.label(&self.message);
            });
        });
    }
}

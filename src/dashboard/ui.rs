//! egui shell over [`DashboardController`]. Holds no fleet state of its own.

use std::time::{Duration, Instant};

use egui::{Color32, RichText};
use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};

use super::controller::{DashboardController, Dispatch, OverrideFeedback, SyncPhase};
use crate::fleet::{Decision, ErrorKind, FleetMetrics, ServiceState, Train, fitness_series};

/// Minimum window size that keeps the train table readable.
pub const MIN_VIEWPORT_SIZE: egui::Vec2 = egui::vec2(960.0, 640.0);

const REPAINT_INTERVAL: Duration = Duration::from_secs(1);
const CLOCK_FORMAT: &[FormatItem<'static>] = format_description!("[hour]:[minute]:[second]");

#[derive(Default)]
struct OverrideForm {
    train_id: String,
    decision: Option<Decision>,
    reason: String,
}

pub struct DashboardApp {
    controller: DashboardController,
    form: OverrideForm,
    feedback: Option<OverrideFeedback>,
}

impl DashboardApp {
    pub fn new(controller: DashboardController) -> Self {
        Self {
            controller,
            form: OverrideForm::default(),
            feedback: None,
        }
    }

    fn render_header(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("Train Induction Planning");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if let Some(updated) = self.controller.store().operation().last_update {
                    ui.label(format!("Last update: {}", clock(updated)));
                }
                if let Some(status) = self.controller.store().status() {
                    ui.label(format!("Overrides: {}", status.manual_overrides_count));
                    ui.label(format!("Optimized: {}", yes_no(status.optimization_completed)));
                    ui.label(format!("Model trained: {}", yes_no(status.ml_model_trained)));
                    ui.label(format!("Trains: {}", status.trains_count));
                    let color = match status.status {
                        ServiceState::Running => Color32::from_rgb(70, 170, 90),
                        ServiceState::Initializing => Color32::from_rgb(220, 160, 40),
                        ServiceState::Error => Color32::from_rgb(220, 70, 70),
                    };
                    ui.label(RichText::new(status.status.as_str()).strong().color(color));
                }
            });
        });
    }

    fn render_controls(&mut self, ui: &mut egui::Ui) {
        let busy = self.controller.is_busy();
        ui.horizontal(|ui| {
            if ui
                .add_enabled(!busy, egui::Button::new("Refresh Data"))
                .clicked()
            {
                self.controller.refresh_all();
            }
            if ui
                .add_enabled(!busy, egui::Button::new("Generate Predictions"))
                .clicked()
            {
                self.controller.generate_predictions();
            }
            if ui
                .add_enabled(!busy, egui::Button::new("Clear Overrides"))
                .clicked()
            {
                self.controller.clear_overrides();
            }
            let mut auto = self.controller.store().operation().auto_refresh_enabled;
            if ui.checkbox(&mut auto, "Auto-refresh (5 min)").changed() {
                self.controller.set_auto_refresh(auto, Instant::now());
            }
            if let SyncPhase::Syncing { kind, step, since } = self.controller.phase() {
                ui.spinner();
                let detail = step.map(|step| step.label()).unwrap_or("Starting");
                ui.label(format!(
                    "{} ({}s): {detail}",
                    kind.label(),
                    since.elapsed().as_secs()
                ));
            }
        });
    }

    fn render_error(&mut self, ui: &mut egui::Ui) {
        let Some(error) = self.controller.store().operation().error.clone() else {
            return;
        };
        let color = match error.kind {
            ErrorKind::Validation => Color32::from_rgb(220, 160, 40),
            ErrorKind::Network | ErrorKind::Service => Color32::from_rgb(220, 70, 70),
        };
        ui.horizontal(|ui| {
            ui.label(RichText::new(&error.message).color(color));
            if ui.small_button("Dismiss").clicked() {
                self.controller.dismiss_error();
            }
        });
    }

    fn render_override_form(&mut self, ui: &mut egui::Ui) {
        ui.strong("Manual override");
        let busy = self.controller.is_busy();
        ui.horizontal(|ui| {
            egui::ComboBox::from_id_salt("override_train")
                .selected_text(if self.form.train_id.is_empty() {
                    "Select train"
                } else {
                    self.form.train_id.as_str()
                })
                .show_ui(ui, |ui| {
                    for train in self.controller.store().trains() {
                        ui.selectable_value(
                            &mut self.form.train_id,
                            train.train_id.clone(),
                            train.train_id.as_str(),
                        );
                    }
                });
            egui::ComboBox::from_id_salt("override_decision")
                .selected_text(self.form.decision.map_or("Decision", Decision::as_str))
                .show_ui(ui, |ui| {
                    for decision in Decision::OVERRIDABLE {
                        ui.selectable_value(
                            &mut self.form.decision,
                            Some(decision),
                            decision.as_str(),
                        );
                    }
                });
            ui.add(egui::TextEdit::singleline(&mut self.form.reason).hint_text("Reason"));
            let ready = !busy && !self.form.train_id.is_empty() && self.form.decision.is_some();
            if ui.add_enabled(ready, egui::Button::new("Apply")).clicked()
                && let Some(decision) = self.form.decision
                && let Ok(Dispatch::Started) =
                    self.controller
                        .apply_override(&self.form.train_id, decision, &self.form.reason)
            {
                self.form.reason.clear();
            }
        });
        if let Some(feedback) = &self.feedback {
            let text = match &feedback.outcome {
                Ok(()) => format!("{} set to {}", feedback.train_id, feedback.decision),
                Err(err) => format!("Override of {} failed: {err}", feedback.train_id),
            };
            ui.label(text);
        }
    }

    fn render_metrics(ui: &mut egui::Ui, metrics: &FleetMetrics) {
        ui.horizontal(|ui| {
            metric_card(ui, "Fleet", metrics.fleet_size.to_string());
            metric_card(ui, "Inducted", metrics.inducted_count.to_string());
            metric_card(ui, "Held", metrics.held_count.to_string());
            metric_card(ui, "Rejected", metrics.rejected_count.to_string());
            metric_card(ui, "Avg fitness", format!("{:.1}", metrics.avg_fitness));
            metric_card(ui, "Open work orders", metrics.active_work_orders.to_string());
        });
        ui.add_space(6.0);
        ui.columns(3, |columns| {
            columns[0].strong("Fitness");
            let buckets = &metrics.fitness_buckets;
            for (label, count) in [
                ("Excellent (90+)", buckets.excellent),
                ("Good (80-89)", buckets.good),
                ("Fair (70-79)", buckets.fair),
                ("Poor (<70)", buckets.poor),
            ] {
                share_bar(&mut columns[0], label, count, metrics.fleet_size);
            }
            columns[1].strong("Depots");
            for (depot, count) in metrics.depot_distribution.iter() {
                share_bar(&mut columns[1], depot, count, metrics.fleet_size);
            }
            columns[2].strong("Decisions");
            for (decision, count) in metrics.decision_distribution.iter() {
                share_bar(&mut columns[2], decision.as_str(), count, metrics.fleet_size);
            }
        });
    }

    fn render_trains(ui: &mut egui::Ui, trains: &[Train]) {
        let series = fitness_series(trains);
        egui::ScrollArea::vertical().show(ui, |ui| {
            egui::Grid::new("train_table")
                .striped(true)
                .num_columns(5)
                .show(ui, |ui| {
                    for header in ["Train", "Fitness", "Depot", "Decision", "Work orders"] {
                        ui.strong(header);
                    }
                    ui.end_row();
                    for (train, point) in trains.iter().zip(&series) {
                        ui.label(train.train_id.as_str());
                        ui.add(
                            egui::ProgressBar::new((point.fitness_score / 100.0) as f32)
                                .desired_width(120.0)
                                .text(format!("{:.1}", point.fitness_score)),
                        );
                        ui.label(train.depot.as_str());
                        let decision = RichText::new(train.final_decision.as_str());
                        ui.label(if point.inducted {
                            decision.color(Color32::from_rgb(70, 170, 90))
                        } else {
                            decision
                        });
                        ui.label(train.open_work_orders.to_string());
                        ui.end_row();
                    }
                });
        });
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.controller.tick(Instant::now());
        if let Some(feedback) = self.controller.take_override_feedback() {
            self.feedback = Some(feedback);
        }
        egui::TopBottomPanel::top("dashboard_header").show(ctx, |ui| {
            self.render_header(ui);
            self.render_controls(ui);
            self.render_error(ui);
        });
        egui::TopBottomPanel::bottom("dashboard_overrides").show(ctx, |ui| {
            self.render_override_form(ui);
        });
        egui::CentralPanel::default().show(ctx, |ui| {
            Self::render_metrics(ui, self.controller.metrics());
            ui.separator();
            Self::render_trains(ui, self.controller.store().trains());
        });
        ctx.request_repaint_after(REPAINT_INTERVAL);
    }
}

impl Drop for DashboardApp {
    fn drop(&mut self) {
        self.controller.shutdown();
    }
}

fn metric_card(ui: &mut egui::Ui, title: &str, value: String) {
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.vertical(|ui| {
            ui.label(RichText::new(title).small());
            ui.heading(value);
        });
    });
}

fn share_bar(ui: &mut egui::Ui, label: &str, count: usize, total: usize) {
    let fraction = if total == 0 {
        0.0
    } else {
        count as f32 / total as f32
    };
    ui.add(
        egui::ProgressBar::new(fraction)
            .desired_width(180.0)
            .text(format!("{label}: {count}")),
    );
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

/// Wall-clock time in the local zone, or labelled UTC when the offset is unknown.
fn clock(at: OffsetDateTime) -> String {
    clock_in(at, UtcOffset::current_local_offset().ok())
}

fn clock_in(at: OffsetDateTime, local: Option<UtcOffset>) -> String {
    match local {
        Some(offset) => at.to_offset(offset).format(CLOCK_FORMAT).unwrap_or_default(),
        None => {
            let utc = at.to_offset(UtcOffset::UTC).format(CLOCK_FORMAT);
            utc.map(|text| format!("{text} UTC")).unwrap_or_default()
        }
    }
}

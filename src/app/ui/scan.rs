use eframe::egui::{self, Color32, Context, RichText, Ui};

use super::super::TopologyApp;
use crate::controller::{ScanDialog, ScanPhase};

const ALERT_COLOR: Color32 = Color32::from_rgb(0xEA, 0x43, 0x35);

#[derive(Clone, Copy)]
enum ScanAction {
    Start,
    Add,
    Cancel,
}

impl TopologyApp {
    pub(in crate::app) fn draw_scan_dialog(&mut self, ctx: &Context) {
        if !self.controller.scan().open {
            return;
        }

        let mut open = true;
        let mut action = None;
        egui::Window::new("Scan network")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .default_width(420.0)
            .show(ctx, |ui| {
                action = draw_scan_form(ui, self.controller.scan_mut());
            });

        if !open {
            action = Some(ScanAction::Cancel);
        }
        match action {
            Some(ScanAction::Start) => self.controller.submit_scan(),
            Some(ScanAction::Add) => self.controller.add_selected_devices(),
            Some(ScanAction::Cancel) => self.controller.cancel_scan(),
            None => {}
        }
    }
}

fn draw_scan_form(ui: &mut Ui, dialog: &mut ScanDialog) -> Option<ScanAction> {
    let mut action = None;
    let editable = matches!(dialog.phase(), ScanPhase::Idle | ScanPhase::Failed { .. });

    ui.add_enabled_ui(editable, |ui| {
        ui.horizontal(|ui| {
            ui.label("IP range");
            let response = ui.add(
                egui::TextEdit::singleline(&mut dialog.range).hint_text("192.168.1.0/24"),
            );
            if response.lost_focus() && ui.input(|input| input.key_pressed(egui::Key::Enter)) {
                action = Some(ScanAction::Start);
            }
        });
        ui.checkbox(&mut dialog.options.scan_ports, "Scan ports");
        ui.checkbox(&mut dialog.options.detect_vendors, "Detect vendors");
        ui.checkbox(&mut dialog.options.detect_services, "Detect services");
    });

    if let Some(alert) = dialog.alert() {
        ui.add_space(4.0);
        ui.label(RichText::new(alert).color(ALERT_COLOR));
    }

    if let Some(status) = dialog.status_text() {
        ui.add_space(6.0);
        match (dialog.phase(), dialog.progress()) {
            (ScanPhase::Failed { .. }, _) => {
                ui.label(RichText::new(status).color(ALERT_COLOR));
            }
            (_, Some(progress)) => {
                ui.add(egui::ProgressBar::new(progress / 100.0).text(status));
            }
            (_, None) => {
                ui.label(status);
            }
        }
    }

    let adding = dialog.is_adding();
    if let Some(candidates) = dialog.candidates_mut() {
        ui.separator();
        if candidates.is_empty() {
            ui.label(RichText::new("No new devices found").weak());
        } else {
            ui.label(RichText::new(format!("Found {} device(s)", candidates.len())).strong());
            egui::ScrollArea::vertical()
                .id_salt("scan_candidates_scroll")
                .max_height(240.0)
                .show(ui, |ui| {
                    for candidate in candidates.iter_mut() {
                        ui.checkbox(&mut candidate.checked, candidate.device.label());
                    }
                });
        }
    }

    ui.separator();
    ui.horizontal(|ui| {
        if matches!(dialog.phase(), ScanPhase::Completed { .. }) {
            let add = ui.add_enabled(!adding, egui::Button::new("Add selected"));
            if add.clicked() {
                action = Some(ScanAction::Add);
            }
            if adding {
                ui.spinner();
            }
        } else if ui
            .add_enabled(editable, egui::Button::new("Start scan"))
            .clicked()
        {
            action = Some(ScanAction::Start);
        }
        if ui.button("Cancel").clicked() {
            action = Some(ScanAction::Cancel);
        }
    });

    action
}

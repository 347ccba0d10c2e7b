use std::time::Duration;

use eframe::egui::{self, Align, Context, Layout, Ui};

use super::super::{TopologyApp, apply_theme};
use crate::controller::LoadState;

impl TopologyApp {
    pub(in crate::app) fn show_ready(&mut self, ctx: &Context, dt: Duration) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| self.draw_top_bar(ui));

        egui::SidePanel::left("devices")
            .resizable(true)
            .default_width(440.0)
            .show_animated(ctx, self.show_devices, |ui| self.draw_devices(ui));

        if self.controller.details().is_some() {
            egui::SidePanel::right("details")
                .resizable(true)
                .default_width(340.0)
                .show(ctx, |ui| self.draw_details(ui));
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_canvas(ui, dt));
    }

    fn draw_top_bar(&mut self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            ui.heading("Network Topology");
            ui.separator();
            ui.label(format!("api: {}", self.api_url));
            ui.label(format!("nodes: {}", self.controller.engine().node_count()));
            ui.label(format!("links: {}", self.controller.engine().link_count()));
            ui.separator();

            if ui.button("Scan network").clicked() {
                self.controller.open_scan_dialog();
            }
            let ready = self.controller.load_state().is_ready();
            if ui.add_enabled(ready, egui::Button::new("Save layout")).clicked() {
                self.controller.save_topology();
            }
            ui.toggle_value(&mut self.show_devices, "Devices");
            ui.separator();

            if ui.button("−").on_hover_text("Zoom out").clicked() {
                self.controller.zoom_out();
            }
            if ui.button("+").on_hover_text("Zoom in").clicked() {
                self.controller.zoom_in();
            }
            if ui.button("Reset view").clicked() {
                self.controller.reset_zoom();
            }
            let next_theme = self.controller.engine().theme().toggled();
            if ui.button(format!("{} theme", next_theme.label())).clicked() {
                let theme = self.controller.toggle_theme();
                apply_theme(ui.ctx(), theme);
            }

            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                if *self.controller.load_state() == LoadState::Loading {
                    ui.spinner();
                    ui.label("Refreshing...");
                } else if self.controller.engine().is_settling() {
                    ui.label(format!("layout α {:.3}", self.controller.engine().alpha()));
                }
            });
        });
    }
}

use eframe::egui::{self, Align, Color32, Layout, RichText, Ui};

use super::super::TopologyApp;
use crate::controller::{DeviceDetails, NO_DATA};

const ONLINE_COLOR: Color32 = Color32::from_rgb(0x34, 0xA8, 0x53);
const OFFLINE_COLOR: Color32 = Color32::from_rgb(0xEA, 0x43, 0x35);

enum DetailsAction {
    Close,
    Ping,
    Scan,
    Remove,
}

pub(super) fn status_text(online: bool, label: &str) -> RichText {
    RichText::new(label).color(if online { ONLINE_COLOR } else { OFFLINE_COLOR })
}

impl TopologyApp {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        let Some(details) = self.controller.details().cloned() else {
            return;
        };
        let engine = self.controller.engine();
        let layout = engine.position(&details.id).map(|position| {
            let state = if engine.is_pinned(&details.id) { "pinned" } else { "free" };
            format!("{:.0}, {:.0} ({state})", position.x, position.y)
        });
        let mut action = None;

        ui.horizontal(|ui| {
            ui.heading(details.name.as_str());
            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                if ui.button("✕").on_hover_text("Close").clicked() {
                    action = Some(DetailsAction::Close);
                }
            });
        });
        ui.horizontal(|ui| {
            ui.label(RichText::new(details.type_name()).weak());
            ui.label(status_text(details.online, details.status_label()));
        });
        ui.add_space(6.0);

        egui::Grid::new("device_identity")
            .num_columns(2)
            .spacing([12.0, 4.0])
            .show(ui, |ui| {
                ui.label("IP address");
                ui.label(details.ip.as_str());
                ui.end_row();
                ui.label("MAC address");
                ui.label(details.mac.as_str());
                ui.end_row();
                ui.label("Vendor");
                ui.label(details.vendor.as_str());
                ui.end_row();
                if let Some(layout) = &layout {
                    ui.label("Position");
                    ui.label(layout.as_str());
                    ui.end_row();
                }
            });

        ui.separator();
        ui.horizontal(|ui| {
            if ui.button("Ping").clicked() {
                action = Some(DetailsAction::Ping);
            }
            if ui
                .add_enabled(details.scan_target.is_some(), egui::Button::new("Scan this device"))
                .clicked()
            {
                action = Some(DetailsAction::Scan);
            }
            if ui.button("Remove").clicked() {
                action = Some(DetailsAction::Remove);
            }
        });

        ui.separator();
        egui::ScrollArea::vertical()
            .id_salt("device_details_scroll")
            .auto_shrink([false, false])
            .show(ui, |ui| draw_tables(ui, &details));

        match action {
            Some(DetailsAction::Close) => self.controller.close_details(),
            Some(DetailsAction::Ping) => self.controller.ping_device(&details.id),
            Some(DetailsAction::Scan) => self.controller.scan_device(&details.id),
            Some(DetailsAction::Remove) => self.controller.request_removal(&details.id),
            None => {}
        }
    }
}

fn draw_tables(ui: &mut Ui, details: &DeviceDetails) {
    ui.label(RichText::new("Interfaces").strong());
    egui::Grid::new("device_interfaces")
        .num_columns(4)
        .striped(true)
        .show(ui, |ui| {
            for header in ["Name", "IP", "MAC", "State"] {
                ui.label(RichText::new(header).strong());
            }
            ui.end_row();

            if details.interfaces.is_empty() {
                ui.label(RichText::new(NO_DATA).weak());
                ui.end_row();
            }
            for interface in &details.interfaces {
                ui.label(interface.name.as_str());
                ui.label(interface.ip.as_str());
                ui.label(interface.mac.as_str());
                ui.label(status_text(interface.is_up, interface.state_label()));
                ui.end_row();
            }
        });

    ui.add_space(8.0);
    ui.label(RichText::new("Services").strong());
    egui::Grid::new("device_services")
        .num_columns(4)
        .striped(true)
        .show(ui, |ui| {
            for header in ["Port", "Protocol", "Name", "State"] {
                ui.label(RichText::new(header).strong());
            }
            ui.end_row();

            if details.services.is_empty() {
                ui.label(RichText::new(NO_DATA).weak());
                ui.end_row();
            }
            for service in &details.services {
                ui.label(service.port.as_str());
                ui.label(service.protocol.as_str());
                ui.label(service.name.as_str());
                ui.label(status_text(service.open, service.state_label()));
                ui.end_row();
            }
        });
}

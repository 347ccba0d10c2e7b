use eframe::egui::{self, Align, Align2, Color32, Context, Layout, RichText, Stroke};

use super::super::TopologyApp;
use crate::controller::NotificationKind;

const TOAST_WIDTH: f32 = 320.0;

fn accent(kind: NotificationKind) -> Color32 {
    match kind {
        NotificationKind::Info => Color32::from_rgb(0x42, 0x85, 0xF4),
        NotificationKind::Success => Color32::from_rgb(0x34, 0xA8, 0x53),
        NotificationKind::Warning => Color32::from_rgb(0xFB, 0xBC, 0x05),
        NotificationKind::Error => Color32::from_rgb(0xEA, 0x43, 0x35),
    }
}

impl TopologyApp {
    pub(in crate::app) fn draw_toasts(&mut self, ctx: &Context) {
        if self.notifications.borrow().is_empty() {
            return;
        }

        let mut dismissed = Vec::new();
        egui::Area::new(egui::Id::new("toasts"))
            .anchor(Align2::RIGHT_BOTTOM, [-12.0, -12.0])
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                ui.set_max_width(TOAST_WIDTH);
                for toast in self.notifications.borrow().toasts() {
                    let color = accent(toast.notification.kind);
                    egui::Frame::popup(ui.style())
                        .stroke(Stroke::new(1.5, color))
                        .show(ui, |ui| {
                            ui.set_width(TOAST_WIDTH);
                            ui.horizontal(|ui| {
                                ui.label(
                                    RichText::new(toast.notification.title.as_str())
                                        .strong()
                                        .color(color),
                                );
                                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                                    if ui.small_button("✕").clicked() {
                                        dismissed.push(toast.id);
                                    }
                                });
                            });
                            ui.label(toast.notification.message.as_str());
                        });
                    ui.add_space(6.0);
                }
            });

        let mut center = self.notifications.borrow_mut();
        for id in dismissed {
            center.dismiss(id);
        }
    }
}

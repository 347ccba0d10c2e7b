use eframe::egui::{self, Align2, Context, RichText, Ui};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use super::super::TopologyApp;
use super::details::status_text;
use crate::controller::DeviceRow;
use crate::engine::{NEIGHBOR_STROKE, SELECTED_STROKE};

enum RowAction {
    Show(String),
    Ping(String),
    Remove(String),
}

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

fn filter_rows<'a>(rows: &'a [DeviceRow], query: &str) -> Vec<&'a DeviceRow> {
    let query = query.trim();
    if query.is_empty() {
        return rows.iter().collect();
    }

    let matcher = SkimMatcherV2::default();
    let mut scored = rows
        .iter()
        .filter_map(|row| {
            fuzzy_match_score(&matcher, &row.search_text(), query).map(|score| (score, row))
        })
        .collect::<Vec<_>>();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, row)| row).collect()
}

impl TopologyApp {
    pub(in crate::app) fn draw_devices(&mut self, ui: &mut Ui) {
        ui.heading("Devices");
        ui.add_space(4.0);
        ui.add(
            egui::TextEdit::singleline(&mut self.device_filter)
                .hint_text("Filter by name, IP or MAC"),
        );
        ui.add_space(6.0);

        let engine = self.controller.engine();
        let rows = filter_rows(self.controller.device_rows(), &self.device_filter);
        let mut action = None;

        egui::ScrollArea::vertical()
            .id_salt("device_table_scroll")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                egui::Grid::new("device_table")
                    .num_columns(6)
                    .striped(true)
                    .show(ui, |ui| {
                        for header in ["Name", "IP", "MAC", "Type", "Status", ""] {
                            ui.label(RichText::new(header).strong());
                        }
                        ui.end_row();

                        if rows.is_empty() {
                            ui.label(RichText::new("No devices").weak());
                            ui.end_row();
                        }
                        for row in &rows {
                            let mut name = RichText::new(row.name.as_str());
                            if engine.selected().is_some_and(|node| node.id == row.id) {
                                name = name.strong().color(SELECTED_STROKE);
                            } else if engine.is_neighbor_of_selection(&row.id) {
                                name = name.color(NEIGHBOR_STROKE);
                            }
                            ui.label(name);
                            ui.label(row.ip.as_str());
                            ui.label(row.mac.as_str());
                            ui.label(row.type_name);
                            ui.label(status_text(row.online, row.status_label()));
                            ui.horizontal(|ui| {
                                if ui.small_button("Show").on_hover_text("Show on map").clicked() {
                                    action = Some(RowAction::Show(row.id.clone()));
                                }
                                if ui.small_button("Ping").clicked() {
                                    action = Some(RowAction::Ping(row.id.clone()));
                                }
                                if ui.small_button("Remove").clicked() {
                                    action = Some(RowAction::Remove(row.id.clone()));
                                }
                            });
                            ui.end_row();
                        }
                    });
            });

        match action {
            Some(RowAction::Show(id)) => self.controller.show_on_map(&id),
            Some(RowAction::Ping(id)) => self.controller.ping_device(&id),
            Some(RowAction::Remove(id)) => self.controller.request_removal(&id),
            None => {}
        }
    }

    pub(in crate::app) fn draw_removal_prompt(&mut self, ctx: &Context) {
        let Some(pending) = self.controller.pending_removal().cloned() else {
            return;
        };
        let mut confirmed = false;
        let mut cancelled = false;

        egui::Window::new("Remove device")
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(format!(
                    "Remove {} from the topology? This cannot be undone.",
                    pending.label
                ));
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    confirmed = ui.button("Remove").clicked();
                    cancelled = ui.button("Cancel").clicked();
                });
            });

        if confirmed {
            self.controller.confirm_removal();
        } else if cancelled {
            self.controller.cancel_removal();
        }
    }
}

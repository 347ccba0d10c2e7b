use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use eframe::egui::{self, Context, Visuals};

use crate::config::AppConfig;
use crate::controller::{LoadState, NotificationCenter, TopologyController};
use crate::engine::Theme;
use crate::topology::TopologyApi;

mod canvas;
mod render_utils;
mod ui;

const BUSY_REPAINT: Duration = Duration::from_millis(100);
const MAX_FRAME_DT: f32 = 0.1;

pub struct TopologyApp {
    controller: TopologyController,
    notifications: Rc<RefCell<NotificationCenter>>,
    api_url: String,
    device_filter: String,
    show_devices: bool,
}

impl TopologyApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: AppConfig,
        api: Arc<dyn TopologyApi>,
    ) -> Self {
        let notifications = Rc::new(RefCell::new(NotificationCenter::default()));
        let mut controller = TopologyController::new(
            api,
            config.engine,
            config.controller,
            Rc::clone(&notifications),
        );
        apply_theme(&cc.egui_ctx, controller.engine().theme());
        controller.load();

        Self {
            controller,
            notifications,
            api_url: config.api_url,
            device_filter: String::new(),
            show_devices: true,
        }
    }

    fn frame_dt(ctx: &Context) -> Duration {
        let seconds = ctx.input(|input| input.stable_dt);
        Duration::from_secs_f32(seconds.max(0.0).min(MAX_FRAME_DT))
    }
}

fn apply_theme(ctx: &Context, theme: Theme) {
    ctx.set_visuals(match theme {
        Theme::Light => Visuals::light(),
        Theme::Dark => Visuals::dark(),
    });
}

impl eframe::App for TopologyApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.controller.update();
        let dt = Self::frame_dt(ctx);
        self.notifications.borrow_mut().expire(dt);

        match self.controller.load_state().clone() {
            LoadState::Loading if self.controller.engine().node_count() == 0 => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading network topology...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            LoadState::Failed(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load network topology");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        self.controller.retry();
                    }
                });
            }
            LoadState::Loading | LoadState::Ready => self.show_ready(ctx, dt),
        }

        self.draw_scan_dialog(ctx);
        self.draw_removal_prompt(ctx);
        self.draw_toasts(ctx);

        if self.controller.is_busy() || !self.notifications.borrow().is_empty() {
            ctx.request_repaint_after(BUSY_REPAINT);
        }
    }
}

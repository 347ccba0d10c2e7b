mod details;
mod notify;
mod scan;
#[cfg(test)]
mod testing;

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Instant;

use log::{debug, error, info, warn};

use crate::config::{ControllerConfig, EngineConfig};
use crate::engine::{GraphEngine, SelectionEvent, Theme};
use crate::topology::{ApiError, PingReport, TopologyApi, TopologySnapshot};
use crate::util::format_millis;
use scan::ScanUpdate;

pub use details::{DeviceDetails, DeviceRow, NO_DATA};
pub use notify::{Notification, NotificationCenter, NotificationKind, Notifier};
pub use scan::{ScanDialog, ScanPhase};

const ZOOM_IN_FACTOR: f32 = 1.2;
const ZOOM_OUT_FACTOR: f32 = 0.8;

enum ControllerEvent {
    Loaded {
        generation: u64,
        result: Result<TopologySnapshot, ApiError>,
    },
    Scan {
        generation: u64,
        update: ScanUpdate,
    },
    DevicesAdded {
        generation: u64,
        count: usize,
        result: Result<(), ApiError>,
    },
    Pinged {
        label: String,
        result: Result<PingReport, ApiError>,
    },
    Removed {
        label: String,
        result: Result<(), ApiError>,
    },
    Saved(Result<(), ApiError>),
    Selection(SelectionEvent),
}

#[derive(Clone, Debug, PartialEq)]
pub enum LoadState {
    Loading,
    Ready,
    Failed(String),
}

impl LoadState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PendingRemoval {
    pub id: String,
    pub label: String,
}

pub struct TopologyController {
    api: Arc<dyn TopologyApi>,
    notifier: Box<dyn Notifier>,
    engine: GraphEngine,
    config: ControllerConfig,
    tx: Sender<ControllerEvent>,
    rx: Receiver<ControllerEvent>,
    load: LoadState,
    load_generation: u64,
    in_flight: usize,
    details: Option<DeviceDetails>,
    device_rows: Vec<DeviceRow>,
    scan: ScanDialog,
    pending_removal: Option<PendingRemoval>,
}

impl TopologyController {
    pub fn new(
        api: Arc<dyn TopologyApi>,
        engine_config: EngineConfig,
        config: ControllerConfig,
        notifier: impl Notifier + 'static,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        let mut engine = GraphEngine::new(engine_config);

        let select_tx = tx.clone();
        engine.on_select(move |node| {
            let _ = select_tx.send(ControllerEvent::Selection(SelectionEvent::Selected(
                node.clone(),
            )));
        });
        let deselect_tx = tx.clone();
        engine.on_deselect(move |node| {
            let _ = deselect_tx.send(ControllerEvent::Selection(SelectionEvent::Deselected(
                node.clone(),
            )));
        });

        Self {
            api,
            notifier: Box::new(notifier),
            engine,
            config,
            tx,
            rx,
            load: LoadState::Loading,
            load_generation: 0,
            in_flight: 0,
            details: None,
            device_rows: Vec::new(),
            scan: ScanDialog::default(),
            pending_removal: None,
        }
    }

    pub fn engine(&self) -> &GraphEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut GraphEngine {
        &mut self.engine
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load
    }

    pub fn details(&self) -> Option<&DeviceDetails> {
        self.details.as_ref()
    }

    pub fn device_rows(&self) -> &[DeviceRow] {
        &self.device_rows
    }

    pub fn pending_removal(&self) -> Option<&PendingRemoval> {
        self.pending_removal.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.load == LoadState::Loading || self.in_flight > 0 || self.scan.is_active()
    }

    pub fn load(&mut self) {
        self.load_generation += 1;
        self.load = LoadState::Loading;

        let generation = self.load_generation;
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        debug!("loading topology (generation {generation})");
        thread::spawn(move || {
            let result = api.fetch_topology();
            let _ = tx.send(ControllerEvent::Loaded { generation, result });
        });
    }

    pub fn retry(&mut self) {
        info!("retrying topology load");
        self.load();
    }

    pub fn update(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(event) => self.handle(event),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        self.expire_failed_scan(Instant::now());
    }

    fn handle(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::Loaded { generation, result } => self.handle_loaded(generation, result),
            ControllerEvent::Scan { generation, update } => {
                self.handle_scan_update(generation, update)
            }
            ControllerEvent::DevicesAdded {
                generation,
                count,
                result,
            } => self.handle_devices_added(generation, count, result),
            ControllerEvent::Pinged { label, result } => {
                self.in_flight = self.in_flight.saturating_sub(1);
                self.handle_pinged(&label, result);
            }
            ControllerEvent::Removed { label, result } => {
                self.in_flight = self.in_flight.saturating_sub(1);
                self.handle_removed(&label, result);
            }
            ControllerEvent::Saved(result) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                self.handle_saved(result);
            }
            ControllerEvent::Selection(SelectionEvent::Selected(node)) => {
                self.details = Some(DeviceDetails::from(&node));
            }
            ControllerEvent::Selection(SelectionEvent::Deselected(node)) => {
                if self.details.as_ref().is_some_and(|details| details.id == node.id) {
                    self.details = None;
                }
            }
        }
    }

    fn handle_loaded(&mut self, generation: u64, result: Result<TopologySnapshot, ApiError>) {
        if generation != self.load_generation {
            debug!("ignoring stale topology load (generation {generation})");
            return;
        }

        match result {
            Ok(snapshot) => {
                self.engine.set_data(&snapshot.nodes, &snapshot.links);
                self.device_rows = self.engine.nodes().iter().map(DeviceRow::from).collect();
                if let Some(selected) = self.engine.selected() {
                    self.details = Some(DeviceDetails::from(selected));
                }
                self.load = LoadState::Ready;
            }
            Err(error) => {
                error!("failed to load topology from {}: {error}", error.url());
                self.load = LoadState::Failed(error.to_string());
                self.notify(
                    NotificationKind::Error,
                    format!("Failed to load topology: {error}"),
                );
            }
        }
    }

    pub fn show_on_map(&mut self, id: &str) {
        if !self.engine.select_node(id) {
            warn!("cannot show unknown device {id}");
        }
    }

    pub fn close_details(&mut self) {
        self.details = None;
        self.engine.deselect_node();
    }

    pub fn ping_device(&mut self, id: &str) {
        let Some(node) = self.engine.node(id) else {
            return;
        };
        let label = node.short_label().to_owned();
        let device_id = node.id.clone();

        self.notify(NotificationKind::Info, format!("Pinging {label}..."));
        self.in_flight += 1;
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        thread::spawn(move || {
            let result = api.ping_device(&device_id);
            let _ = tx.send(ControllerEvent::Pinged { label, result });
        });
    }

    fn handle_pinged(&mut self, label: &str, result: Result<PingReport, ApiError>) {
        match result {
            Ok(PingReport {
                success: true,
                time,
            }) => {
                let message = match time {
                    Some(time) => format!("{label} is reachable ({})", format_millis(time)),
                    None => format!("{label} is reachable"),
                };
                self.notify(NotificationKind::Success, message);
            }
            Ok(_) => self.notify(NotificationKind::Error, format!("{label} is unreachable")),
            Err(error) => {
                error!("ping of {label} failed: {error}");
                self.notify(NotificationKind::Error, format!("Ping failed: {error}"));
            }
        }
    }

    pub fn request_removal(&mut self, id: &str) {
        if let Some(node) = self.engine.node(id) {
            self.pending_removal = Some(PendingRemoval {
                id: node.id.clone(),
                label: node.short_label().to_owned(),
            });
        }
    }

    pub fn cancel_removal(&mut self) {
        self.pending_removal = None;
    }

    pub fn confirm_removal(&mut self) {
        let Some(PendingRemoval { id, label }) = self.pending_removal.take() else {
            return;
        };

        info!("removing device {id}");
        self.in_flight += 1;
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        thread::spawn(move || {
            let result = api.remove_device(&id);
            let _ = tx.send(ControllerEvent::Removed { label, result });
        });
    }

    fn handle_removed(&mut self, label: &str, result: Result<(), ApiError>) {
        match result {
            Ok(()) => {
                self.notify(NotificationKind::Success, format!("Removed {label}"));
                self.load();
            }
            Err(error) => {
                error!("removing {label} failed: {error}");
                self.notify(
                    NotificationKind::Error,
                    format!("Could not remove {label}: {error}"),
                );
            }
        }
    }

    pub fn save_topology(&mut self) {
        if !self.load.is_ready() {
            self.notify(
                NotificationKind::Error,
                "Nothing to save: the topology is not loaded",
            );
            return;
        }

        let snapshot = self.engine.data();
        info!("saving {} node(s)", snapshot.nodes.len());
        self.in_flight += 1;
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        thread::spawn(move || {
            let result = api.save_topology(&snapshot);
            let _ = tx.send(ControllerEvent::Saved(result));
        });
    }

    fn handle_saved(&mut self, result: Result<(), ApiError>) {
        match result {
            Ok(()) => self.notify(NotificationKind::Success, "Topology saved"),
            Err(error) => {
                error!("saving topology failed: {error}");
                self.notify(
                    NotificationKind::Error,
                    format!("Could not save topology: {error}"),
                );
            }
        }
    }

    pub fn zoom_in(&mut self) {
        self.engine.zoom(ZOOM_IN_FACTOR);
    }

    pub fn zoom_out(&mut self) {
        self.engine.zoom(ZOOM_OUT_FACTOR);
    }

    pub fn reset_zoom(&mut self) {
        self.engine.reset_zoom();
    }

    pub fn toggle_theme(&mut self) -> Theme {
        let theme = self.engine.theme().toggled();
        self.engine.set_theme(theme);
        theme
    }

    fn notify(&mut self, kind: NotificationKind, message: impl Into<String>) {
        self.notifier.notify(Notification::new(
            kind,
            message,
            self.config.notification_duration,
        ));
    }

    #[cfg(test)]
    fn pump_until(
        &mut self,
        timeout: std::time::Duration,
        done: impl Fn(&Self) -> bool,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        while !done(self) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            match self.rx.recv_timeout(remaining) {
                Ok(event) => self.handle(event),
                Err(_) => return false,
            }
        }
        true
    }
}

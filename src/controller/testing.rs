use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::TopologyController;
use super::notify::{Notification, Notifier};
use crate::config::{ControllerConfig, EngineConfig, PollPolicy};
use crate::topology::{
    ApiError, LinkRecord, NodeRecord, NodeStatus, NodeType, PingReport, ScanJobState, ScanOptions,
    ScanStatusReport, ScanTicket, TopologyApi, TopologySnapshot,
};

pub(super) type Notes = Rc<RefCell<Vec<Notification>>>;

impl Notifier for Vec<Notification> {
    fn notify(&mut self, notification: Notification) {
        self.push(notification);
    }
}

pub(super) fn unavailable() -> ApiError {
    ApiError::Status {
        url: "http://router.test/api/topology".to_owned(),
        status: 503,
        reason: "Service Unavailable".to_owned(),
    }
}

pub(super) fn running(progress: f32) -> ScanStatusReport {
    ScanStatusReport {
        status: ScanJobState::Running,
        progress,
        devices: Vec::new(),
        message: None,
    }
}

fn default_snapshot() -> TopologySnapshot {
    let mut router = NodeRecord::new("r1", NodeType::Router);
    router.name = Some("Core".to_owned());
    router.ip = Some("192.168.1.1".to_owned());
    router.status = NodeStatus::Online;

    let mut device = NodeRecord::new("d1", NodeType::Device);
    device.ip = Some("192.168.1.20".to_owned());

    TopologySnapshot {
        nodes: vec![router, device],
        links: vec![LinkRecord::new("r1", "d1")],
    }
}

#[derive(Default)]
pub(super) struct FakeApi {
    snapshots: Mutex<VecDeque<Result<TopologySnapshot, ApiError>>>,
    statuses: Mutex<VecDeque<Result<ScanStatusReport, ApiError>>>,
    pings: Mutex<VecDeque<Result<PingReport, ApiError>>>,
    failing: Mutex<HashSet<&'static str>>,
    calls: Mutex<Vec<(&'static str, String)>>,
    saved: Mutex<Vec<TopologySnapshot>>,
}

impl FakeApi {
    pub(super) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(super) fn push_snapshot(&self, result: Result<TopologySnapshot, ApiError>) {
        self.snapshots.lock().unwrap().push_back(result);
    }

    pub(super) fn push_status(&self, result: Result<ScanStatusReport, ApiError>) {
        self.statuses.lock().unwrap().push_back(result);
    }

    pub(super) fn push_ping(&self, result: Result<PingReport, ApiError>) {
        self.pings.lock().unwrap().push_back(result);
    }

    pub(super) fn fail(&self, operation: &'static str) {
        self.failing.lock().unwrap().insert(operation);
    }

    pub(super) fn fail_submit(&self) {
        self.fail("submit_scan");
    }

    pub(super) fn calls_to(&self, operation: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| *name == operation)
            .map(|(_, argument)| argument.clone())
            .collect()
    }

    pub(super) fn saved(&self) -> Vec<TopologySnapshot> {
        self.saved.lock().unwrap().clone()
    }

    fn record(&self, operation: &'static str, argument: impl Into<String>) -> Result<(), ApiError> {
        self.calls
            .lock()
            .unwrap()
            .push((operation, argument.into()));
        if self.failing.lock().unwrap().contains(operation) {
            Err(unavailable())
        } else {
            Ok(())
        }
    }
}

impl TopologyApi for FakeApi {
    fn fetch_topology(&self) -> Result<TopologySnapshot, ApiError> {
        self.record("fetch_topology", "")?;
        self.snapshots
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(default_snapshot()))
    }

    fn save_topology(&self, snapshot: &TopologySnapshot) -> Result<(), ApiError> {
        self.record("save_topology", "")?;
        self.saved.lock().unwrap().push(snapshot.clone());
        Ok(())
    }

    fn submit_scan(&self, range: &str, _options: ScanOptions) -> Result<ScanTicket, ApiError> {
        self.record("submit_scan", range)?;
        Ok(ScanTicket {
            job_id: "job-1".to_owned(),
        })
    }

    fn scan_status(&self, job_id: &str) -> Result<ScanStatusReport, ApiError> {
        self.record("scan_status", job_id)?;
        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(running(0.0)))
    }

    fn add_devices(&self, job_id: &str, device_ids: &[String]) -> Result<(), ApiError> {
        self.record("add_devices", format!("{job_id}:{}", device_ids.join(",")))
    }

    fn ping_device(&self, device_id: &str) -> Result<PingReport, ApiError> {
        self.record("ping_device", device_id)?;
        self.pings.lock().unwrap().pop_front().unwrap_or(Ok(PingReport {
            success: true,
            time: Some(3.2),
        }))
    }

    fn remove_device(&self, device_id: &str) -> Result<(), ApiError> {
        self.record("remove_device", device_id)
    }
}

pub(super) fn harness(api: &Arc<FakeApi>) -> (TopologyController, Notes) {
    let notes = Notes::default();
    let config = ControllerConfig {
        poll: PollPolicy {
            interval: Duration::from_millis(1),
            ..PollPolicy::default()
        },
        failed_reset_delay: Duration::ZERO,
        ..ControllerConfig::default()
    };
    let controller = TopologyController::new(
        Arc::clone(api) as Arc<dyn TopologyApi>,
        EngineConfig::default(),
        config,
        Rc::clone(&notes),
    );
    (controller, notes)
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use super::notify::NotificationKind;
use super::{ControllerEvent, TopologyController};
use crate::config::PollPolicy;
use crate::topology::{ApiError, DiscoveredDevice, ScanJobState, ScanOptions, TopologyApi};

const UNKNOWN_FAILURE: &str = "Unknown error";

#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<(Mutex<()>, Condvar, AtomicBool)>,
}

impl CancellationToken {
    pub fn cancel(&self) {
        let (lock, wake, cancelled) = &*self.inner;
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        cancelled.store(true, Ordering::SeqCst);
        wake.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.2.load(Ordering::SeqCst)
    }

    fn wait(&self, timeout: Duration) -> bool {
        let (lock, wake, cancelled) = &*self.inner;
        let guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let _guard = wake
            .wait_timeout_while(guard, timeout, |_| !cancelled.load(Ordering::SeqCst))
            .unwrap_or_else(PoisonError::into_inner);
        self.is_cancelled()
    }
}

#[derive(Debug)]
pub(super) enum ScanUpdate {
    Submitted { job_id: String },
    SubmitFailed(ApiError),
    Progress(f32),
    Completed(Vec<DiscoveredDevice>),
    Failed(Option<String>),
    PollFailed(ApiError),
    TimedOut { attempts: u32 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScanCandidate {
    pub device: DiscoveredDevice,
    pub checked: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ScanPhase {
    Idle,
    Submitting,
    Running {
        job_id: String,
        progress: f32,
    },
    Completed {
        job_id: String,
        candidates: Vec<ScanCandidate>,
    },
    Failed {
        message: String,
    },
}

pub struct ScanDialog {
    pub open: bool,
    pub range: String,
    pub options: ScanOptions,
    phase: ScanPhase,
    alert: Option<String>,
    adding: bool,
    generation: u64,
    token: Option<CancellationToken>,
    failed_at: Option<Instant>,
}

impl Default for ScanDialog {
    fn default() -> Self {
        Self {
            open: false,
            range: String::new(),
            options: ScanOptions::default(),
            phase: ScanPhase::Idle,
            alert: None,
            adding: false,
            generation: 0,
            token: None,
            failed_at: None,
        }
    }
}

impl ScanDialog {
    pub fn phase(&self) -> &ScanPhase {
        &self.phase
    }

    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    pub fn is_adding(&self) -> bool {
        self.adding
    }

    pub fn is_active(&self) -> bool {
        self.adding
            || matches!(
                self.phase,
                ScanPhase::Submitting | ScanPhase::Running { .. } | ScanPhase::Failed { .. }
            )
    }

    pub fn progress(&self) -> Option<f32> {
        match &self.phase {
            ScanPhase::Submitting => Some(0.0),
            ScanPhase::Running { progress, .. } => Some(*progress),
            ScanPhase::Completed { .. } => Some(100.0),
            ScanPhase::Idle | ScanPhase::Failed { .. } => None,
        }
    }

    pub fn status_text(&self) -> Option<String> {
        match &self.phase {
            ScanPhase::Idle => None,
            ScanPhase::Submitting => Some("Preparing scan...".to_owned()),
            ScanPhase::Running { progress, .. } => Some(format!("Scanning: {progress:.0}%")),
            ScanPhase::Completed { .. } => Some("Scan complete".to_owned()),
            ScanPhase::Failed { message } => Some(format!("Error: {message}")),
        }
    }

    pub fn candidates_mut(&mut self) -> Option<&mut [ScanCandidate]> {
        match &mut self.phase {
            ScanPhase::Completed { candidates, .. } => Some(candidates),
            _ => None,
        }
    }

    fn checked_ids(&self) -> Option<(String, Vec<String>)> {
        match &self.phase {
            ScanPhase::Completed { job_id, candidates } => Some((
                job_id.clone(),
                candidates
                    .iter()
                    .filter(|candidate| candidate.checked)
                    .map(|candidate| candidate.device.id.clone())
                    .collect(),
            )),
            _ => None,
        }
    }

    fn reset(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
        self.generation += 1;
        self.phase = ScanPhase::Idle;
        self.adding = false;
        self.failed_at = None;
    }

    fn fail(&mut self, message: String) {
        self.token = None;
        self.phase = ScanPhase::Failed { message };
        self.failed_at = Some(Instant::now());
    }
}

pub(super) fn spawn_scan_worker(
    api: Arc<dyn TopologyApi>,
    range: String,
    options: ScanOptions,
    policy: PollPolicy,
    token: CancellationToken,
    generation: u64,
    tx: Sender<ControllerEvent>,
) {
    thread::spawn(move || {
        let send = |update: ScanUpdate| {
            tx.send(ControllerEvent::Scan { generation, update })
                .is_ok()
        };

        let job_id = match api.submit_scan(&range, options) {
            Ok(ticket) => ticket.job_id,
            Err(error) => {
                send(ScanUpdate::SubmitFailed(error));
                return;
            }
        };
        if !send(ScanUpdate::Submitted {
            job_id: job_id.clone(),
        }) {
            return;
        }

        let started = Instant::now();
        let mut attempts = 0_u32;
        loop {
            if token.is_cancelled() {
                debug!("scan job {job_id} abandoned");
                return;
            }

            let report = match api.scan_status(&job_id) {
                Ok(report) => report,
                Err(error) => {
                    send(ScanUpdate::PollFailed(error));
                    return;
                }
            };
            attempts += 1;

            match report.status {
                ScanJobState::Completed => {
                    send(ScanUpdate::Completed(report.devices));
                    return;
                }
                ScanJobState::Failed => {
                    send(ScanUpdate::Failed(report.message));
                    return;
                }
                ScanJobState::Running => {
                    if !send(ScanUpdate::Progress(report.progress)) {
                        return;
                    }
                }
            }

            let out_of_time = policy
                .max_duration
                .is_some_and(|limit| started.elapsed() >= limit);
            if attempts >= policy.max_attempts || out_of_time {
                send(ScanUpdate::TimedOut { attempts });
                return;
            }

            if token.wait(policy.delay_for(attempts - 1)) {
                debug!("scan job {job_id} abandoned");
                return;
            }
        }
    });
}

impl TopologyController {
    pub fn scan(&self) -> &ScanDialog {
        &self.scan
    }

    pub fn scan_mut(&mut self) -> &mut ScanDialog {
        &mut self.scan
    }

    pub fn open_scan_dialog(&mut self) {
        self.scan.open = true;
    }

    pub fn scan_device(&mut self, id: &str) {
        let Some(ip) = self
            .engine
            .node(id)
            .and_then(|node| node.ip.as_deref())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
        else {
            return;
        };
        self.scan.range = ip.to_owned();
        self.scan.open = true;
    }

    pub fn submit_scan(&mut self) {
        if !matches!(
            self.scan.phase,
            ScanPhase::Idle | ScanPhase::Failed { .. }
        ) {
            return;
        }

        let range = self.scan.range.trim().to_owned();
        if range.is_empty() {
            self.scan.alert = Some("Enter an IP range to scan".to_owned());
            return;
        }

        self.scan.reset();
        self.scan.alert = None;
        self.scan.phase = ScanPhase::Submitting;
        let token = CancellationToken::default();
        self.scan.token = Some(token.clone());

        info!("starting scan of {range}");
        spawn_scan_worker(
            Arc::clone(&self.api),
            range,
            self.scan.options,
            self.config.poll.clone(),
            token,
            self.scan.generation,
            self.tx.clone(),
        );
    }

    /// Closes the dialog and forgets the job. The backend is not told to stop.
    pub fn cancel_scan(&mut self) {
        if let ScanPhase::Running { job_id, .. } | ScanPhase::Completed { job_id, .. } =
            &self.scan.phase
        {
            info!("discarding scan job {job_id}");
        }
        self.scan.reset();
        self.scan.alert = None;
        self.scan.open = false;
    }

    pub fn add_selected_devices(&mut self) {
        if self.scan.adding {
            return;
        }
        let Some((job_id, ids)) = self.scan.checked_ids() else {
            return;
        };
        if ids.is_empty() {
            self.scan.alert = Some("Select at least one device to add".to_owned());
            return;
        }

        self.scan.alert = None;
        self.scan.adding = true;
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        let generation = self.scan.generation;
        thread::spawn(move || {
            let count = ids.len();
            let result = api.add_devices(&job_id, &ids);
            let _ = tx.send(ControllerEvent::DevicesAdded {
                generation,
                count,
                result,
            });
        });
    }

    pub(super) fn handle_scan_update(&mut self, generation: u64, update: ScanUpdate) {
        if generation != self.scan.generation {
            debug!("ignoring stale scan update: {update:?}");
            return;
        }

        match update {
            ScanUpdate::Submitted { job_id } => {
                info!("scan job {job_id} started");
                self.scan.phase = ScanPhase::Running {
                    job_id,
                    progress: 0.0,
                };
            }
            ScanUpdate::SubmitFailed(error) => {
                error!("scan submit failed: {error}");
                self.scan.reset();
                self.notify(
                    NotificationKind::Error,
                    format!("Could not start scan: {error}"),
                );
            }
            ScanUpdate::Progress(reported) => {
                if let ScanPhase::Running { progress, .. } = &mut self.scan.phase {
                    let reported = if reported.is_finite() {
                        reported.clamp(0.0, 100.0)
                    } else {
                        0.0
                    };
                    *progress = progress.max(reported);
                }
            }
            ScanUpdate::Completed(devices) => {
                let job_id = match &self.scan.phase {
                    ScanPhase::Running { job_id, .. } => job_id.clone(),
                    _ => return,
                };
                info!("scan job {job_id} found {} device(s)", devices.len());
                self.scan.token = None;
                self.scan.phase = ScanPhase::Completed {
                    job_id,
                    candidates: devices
                        .into_iter()
                        .map(|device| ScanCandidate {
                            device,
                            checked: true,
                        })
                        .collect(),
                };
            }
            ScanUpdate::Failed(message) => {
                let message = message
                    .filter(|message| !message.trim().is_empty())
                    .unwrap_or_else(|| UNKNOWN_FAILURE.to_owned());
                warn!("scan failed: {message}");
                self.notify(NotificationKind::Error, format!("Scan failed: {message}"));
                self.scan.fail(message);
            }
            ScanUpdate::PollFailed(error) => {
                error!("scan status check failed: {error}");
                self.scan.reset();
                self.notify(
                    NotificationKind::Error,
                    format!("Could not check scan status: {error}"),
                );
            }
            ScanUpdate::TimedOut { attempts } => {
                let message = format!("no result after {attempts} status checks");
                warn!("scan timed out: {message}");
                self.notify(NotificationKind::Warning, format!("Scan failed: {message}"));
                self.scan.fail(message);
            }
        }
    }

    /// The devices are merged on the backend even if the scan that found
    /// them was cancelled, so a stale reply still reloads but leaves the
    /// current scan alone.
    pub(super) fn handle_devices_added(
        &mut self,
        generation: u64,
        count: usize,
        result: Result<(), ApiError>,
    ) {
        let current = generation == self.scan.generation;
        if current {
            self.scan.adding = false;
        }
        match result {
            Ok(()) => {
                self.notify(
                    NotificationKind::Success,
                    format!("Added {count} device(s)"),
                );
                if current {
                    self.scan.reset();
                    self.scan.open = false;
                } else {
                    debug!("devices added by an earlier scan; keeping the current one");
                }
                self.load();
            }
            Err(error) => {
                error!("adding devices failed: {error}");
                self.notify(
                    NotificationKind::Error,
                    format!("Could not add devices: {error}"),
                );
            }
        }
    }

    pub(super) fn expire_failed_scan(&mut self, now: Instant) {
        if let Some(failed_at) = self.scan.failed_at
            && now.saturating_duration_since(failed_at) >= self.config.failed_reset_delay
        {
            self.scan.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;
    use crate::controller::testing::{FakeApi, harness, running, unavailable};
    use crate::topology::ScanStatusReport;

    fn pump_until(
        controller: &mut TopologyController,
        done: impl Fn(&TopologyController) -> bool,
    ) {
        assert!(
            controller.pump_until(Duration::from_secs(5), done),
            "controller did not reach the expected state"
        );
    }

    fn completed(devices: &[(&str, &str)]) -> ScanStatusReport {
        ScanStatusReport {
            status: ScanJobState::Completed,
            progress: 100.0,
            devices: devices
                .iter()
                .map(|(id, ip)| DiscoveredDevice {
                    id: (*id).to_owned(),
                    ip: Some((*ip).to_owned()),
                    name: None,
                    mac: None,
                    vendor: None,
                    device_type: Default::default(),
                })
                .collect(),
            message: None,
        }
    }

    #[test]
    fn empty_range_is_rejected_without_a_request() {
        let api = FakeApi::new();
        let (mut controller, _) = harness(&api);
        controller.scan_mut().range = "   ".to_owned();
        controller.submit_scan();

        assert_eq!(controller.scan().alert(), Some("Enter an IP range to scan"));
        assert_eq!(controller.scan().phase(), &ScanPhase::Idle);
        assert!(api.calls_to("submit_scan").is_empty());
    }

    #[test]
    fn progress_is_monotonic_until_completion() {
        let api = FakeApi::new();
        api.push_status(Ok(running(10.0)));
        api.push_status(Ok(running(40.0)));
        api.push_status(Ok(running(25.0)));
        api.push_status(Ok(completed(&[("d1", "10.0.0.5"), ("d2", "10.0.0.6")])));
        let (mut controller, notes) = harness(&api);

        controller.scan_mut().range = "10.0.0.0/24".to_owned();
        controller.submit_scan();
        assert_eq!(controller.scan().phase(), &ScanPhase::Submitting);

        pump_until(&mut controller, |controller| {
            matches!(controller.scan().phase(), ScanPhase::Completed { .. })
        });

        assert_eq!(controller.scan().progress(), Some(100.0));
        assert_eq!(api.calls_to("scan_status").len(), 4);
        assert_eq!(api.calls_to("submit_scan"), vec!["10.0.0.0/24"]);
        let candidates = controller.scan_mut().candidates_mut().unwrap();
        assert_eq!(candidates.len(), 2);
        assert!(candidates.iter().all(|candidate| candidate.checked));
        assert!(notes.borrow().is_empty());
    }

    #[test]
    fn reported_progress_never_goes_backwards() {
        let api = FakeApi::new();
        let (mut controller, _) = harness(&api);
        controller.scan.phase = ScanPhase::Running {
            job_id: "7".to_owned(),
            progress: 0.0,
        };
        let generation = controller.scan.generation;

        for reported in [10.0, 40.0, 25.0, f32::NAN, 180.0] {
            controller.handle_scan_update(generation, ScanUpdate::Progress(reported));
        }
        assert_eq!(controller.scan().progress(), Some(100.0));
        assert_eq!(
            controller.scan().status_text().as_deref(),
            Some("Scanning: 100%")
        );
    }

    #[test]
    fn failed_scan_notifies_once_and_returns_to_idle() {
        let api = FakeApi::new();
        api.push_status(Ok(ScanStatusReport {
            status: ScanJobState::Failed,
            progress: 30.0,
            devices: Vec::new(),
            message: Some("nmap missing".to_owned()),
        }));
        let (mut controller, notes) = harness(&api);

        controller.scan_mut().range = "192.168.1.0/24".to_owned();
        controller.submit_scan();
        pump_until(&mut controller, |controller| {
            matches!(controller.scan().phase(), ScanPhase::Failed { .. })
        });

        assert_eq!(
            controller.scan().status_text().as_deref(),
            Some("Error: nmap missing")
        );
        controller.update();
        assert_eq!(controller.scan().phase(), &ScanPhase::Idle);

        let notes = notes.borrow();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, NotificationKind::Error);
        assert_eq!(notes[0].message, "Scan failed: nmap missing");
    }

    #[test]
    fn submit_failure_returns_to_idle() {
        let api = FakeApi::new();
        api.fail_submit();
        let (mut controller, notes) = harness(&api);

        controller.scan_mut().range = "10.0.0.0/24".to_owned();
        controller.submit_scan();
        pump_until(&mut controller, |_| !notes.borrow().is_empty());

        assert_eq!(controller.scan().phase(), &ScanPhase::Idle);
        assert_eq!(
            notes.borrow()[0].message,
            "Could not start scan: HTTP 503: Service Unavailable"
        );
        assert!(api.calls_to("scan_status").is_empty());
    }

    #[test]
    fn poll_errors_end_the_scan() {
        let api = FakeApi::new();
        api.push_status(Err(unavailable()));
        let (mut controller, notes) = harness(&api);

        controller.scan_mut().range = "10.0.0.0/24".to_owned();
        controller.submit_scan();
        pump_until(&mut controller, |_| !notes.borrow().is_empty());

        assert_eq!(controller.scan().phase(), &ScanPhase::Idle);
        assert!(notes.borrow()[0].message.starts_with("Could not check scan status"));
    }

    #[test]
    fn polling_gives_up_after_the_attempt_budget() {
        let api = FakeApi::new();
        let (mut controller, notes) = harness(&api);
        controller.config.poll.max_attempts = 3;
        controller.config.failed_reset_delay = Duration::from_secs(60);

        controller.scan_mut().range = "10.0.0.0/24".to_owned();
        controller.submit_scan();
        pump_until(&mut controller, |controller| {
            matches!(controller.scan().phase(), ScanPhase::Failed { .. })
        });

        assert_eq!(api.calls_to("scan_status").len(), 3);
        assert_eq!(notes.borrow()[0].kind, NotificationKind::Warning);
        assert_eq!(
            notes.borrow()[0].message,
            "Scan failed: no result after 3 status checks"
        );
        controller.update();
        assert!(matches!(controller.scan().phase(), ScanPhase::Failed { .. }));
    }

    #[test]
    fn cancelled_scan_ignores_late_results() {
        let api = FakeApi::new();
        let (mut controller, notes) = harness(&api);

        controller.scan_mut().range = "10.0.0.0/24".to_owned();
        controller.open_scan_dialog();
        controller.submit_scan();
        pump_until(&mut controller, |controller| {
            matches!(controller.scan().phase(), ScanPhase::Running { .. })
        });
        let stale_generation = controller.scan.generation;

        controller.cancel_scan();
        assert!(!controller.scan().open);
        assert_eq!(controller.scan().phase(), &ScanPhase::Idle);

        controller.handle_scan_update(
            stale_generation,
            ScanUpdate::Completed(completed(&[("d1", "10.0.0.9")]).devices),
        );
        controller.handle_scan_update(stale_generation, ScanUpdate::Failed(None));
        assert_eq!(controller.scan().phase(), &ScanPhase::Idle);
        assert!(notes.borrow().is_empty());
    }

    #[test]
    fn cancellation_wakes_a_sleeping_worker() {
        let api = FakeApi::new();
        let (tx, rx) = mpsc::channel();
        let token = CancellationToken::default();
        let policy = PollPolicy {
            interval: Duration::from_secs(30),
            ..PollPolicy::default()
        };
        spawn_scan_worker(
            api.clone(),
            "10.0.0.0/24".to_owned(),
            ScanOptions::default(),
            policy,
            token.clone(),
            1,
            tx,
        );

        let mut updates = 0;
        while updates < 2 {
            rx.recv_timeout(Duration::from_secs(5)).unwrap();
            updates += 1;
        }
        let started = Instant::now();
        token.cancel();
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_err());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn adding_requires_a_checked_device_then_reloads() {
        let api = FakeApi::new();
        api.push_status(Ok(completed(&[("d1", "10.0.0.5"), ("d2", "10.0.0.6")])));
        let (mut controller, notes) = harness(&api);

        controller.open_scan_dialog();
        controller.scan_mut().range = "10.0.0.0/24".to_owned();
        controller.submit_scan();
        pump_until(&mut controller, |controller| {
            matches!(controller.scan().phase(), ScanPhase::Completed { .. })
        });

        for candidate in controller.scan_mut().candidates_mut().unwrap() {
            candidate.checked = false;
        }
        controller.add_selected_devices();
        assert_eq!(
            controller.scan().alert(),
            Some("Select at least one device to add")
        );
        assert!(api.calls_to("add_devices").is_empty());

        controller.scan_mut().candidates_mut().unwrap()[1].checked = true;
        controller.add_selected_devices();
        pump_until(&mut controller, |controller| !controller.scan().open);
        pump_until(&mut controller, |controller| controller.load_state().is_ready());

        assert_eq!(api.calls_to("add_devices"), vec!["job-1:d2"]);
        assert_eq!(api.calls_to("fetch_topology").len(), 1);
        assert_eq!(controller.scan().phase(), &ScanPhase::Idle);
        assert_eq!(notes.borrow()[0].message, "Added 1 device(s)");
    }

    #[test]
    fn late_add_reply_leaves_a_newer_scan_running() {
        let api = FakeApi::new();
        api.push_status(Ok(completed(&[("d9", "10.0.0.9")])));
        let (mut controller, notes) = harness(&api);
        controller.config.poll.interval = Duration::from_millis(50);

        controller.open_scan_dialog();
        controller.scan_mut().range = "10.0.0.0/24".to_owned();
        controller.submit_scan();
        pump_until(&mut controller, |controller| {
            matches!(controller.scan().phase(), ScanPhase::Completed { .. })
        });

        controller.add_selected_devices();
        controller.cancel_scan();
        controller.open_scan_dialog();
        controller.scan_mut().range = "10.0.1.0/24".to_owned();
        controller.submit_scan();

        pump_until(&mut controller, |controller| {
            matches!(controller.scan().phase(), ScanPhase::Running { .. })
                && controller.load_state().is_ready()
        });

        assert_eq!(api.calls_to("add_devices"), vec!["job-1:d9"]);
        assert_eq!(api.calls_to("fetch_topology").len(), 1);
        assert!(controller.scan().open);
        assert!(!controller.scan().is_adding());
        assert!(matches!(controller.scan().phase(), ScanPhase::Running { .. }));
        assert_eq!(notes.borrow()[0].message, "Added 1 device(s)");
        controller.cancel_scan();
    }

    #[test]
    fn scan_this_device_prefills_the_range() {
        let api = FakeApi::new();
        let (mut controller, _) = harness(&api);
        controller.load();
        pump_until(&mut controller, |controller| controller.load_state().is_ready());

        controller.scan_device("r1");
        assert!(controller.scan().open);
        assert_eq!(controller.scan().range, "192.168.1.1");
    }
}

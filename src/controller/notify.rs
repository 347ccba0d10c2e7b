use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use log::{error, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    pub fn title(self) -> &'static str {
        match self {
            Self::Info => "Info",
            Self::Success => "Success",
            Self::Warning => "Warning",
            Self::Error => "Error",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    /// Zero keeps the notification until it is dismissed.
    pub duration: Duration,
}

impl Notification {
    pub fn new(kind: NotificationKind, message: impl Into<String>, duration: Duration) -> Self {
        Self {
            title: kind.title().to_owned(),
            message: message.into(),
            kind,
            duration,
        }
    }
}

pub trait Notifier {
    fn notify(&mut self, notification: Notification);
}

#[derive(Clone, Debug, PartialEq)]
pub struct Toast {
    pub id: u64,
    pub notification: Notification,
    remaining: Option<Duration>,
}

#[derive(Debug, Default)]
pub struct NotificationCenter {
    toasts: Vec<Toast>,
    next_id: u64,
}

impl NotificationCenter {
    pub fn push(&mut self, notification: Notification) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let remaining = (!notification.duration.is_zero()).then_some(notification.duration);
        self.toasts.push(Toast {
            id,
            notification,
            remaining,
        });
        id
    }

    pub fn dismiss(&mut self, id: u64) {
        self.toasts.retain(|toast| toast.id != id);
    }

    pub fn expire(&mut self, dt: Duration) {
        self.toasts.retain_mut(|toast| match toast.remaining.as_mut() {
            Some(remaining) => {
                *remaining = remaining.saturating_sub(dt);
                !remaining.is_zero()
            }
            None => true,
        });
    }

    pub fn toasts(&self) -> &[Toast] {
        &self.toasts
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}

impl Notifier for NotificationCenter {
    fn notify(&mut self, notification: Notification) {
        match notification.kind {
            NotificationKind::Error => error!("{}", notification.message),
            NotificationKind::Warning => warn!("{}", notification.message),
            NotificationKind::Info | NotificationKind::Success => {
                info!("{}", notification.message)
            }
        }
        self.push(notification);
    }
}

impl<N: Notifier> Notifier for Rc<RefCell<N>> {
    fn notify(&mut self, notification: Notification) {
        self.borrow_mut().notify(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timed_toasts_expire_and_persistent_ones_stay() {
        let mut center = NotificationCenter::default();
        center.notify(Notification::new(
            NotificationKind::Success,
            "saved",
            Duration::from_millis(5000),
        ));
        center.notify(Notification::new(
            NotificationKind::Error,
            "scan failed",
            Duration::ZERO,
        ));

        center.expire(Duration::from_millis(4000));
        assert_eq!(center.toasts().len(), 2);
        center.expire(Duration::from_millis(1000));
        assert_eq!(center.toasts().len(), 1);
        assert_eq!(center.toasts()[0].notification.title, "Error");

        let id = center.toasts()[0].id;
        center.dismiss(id);
        assert!(center.is_empty());
    }

    #[test]
    fn shared_center_receives_through_rc() {
        let center = Rc::new(RefCell::new(NotificationCenter::default()));
        let mut notifier: Box<dyn Notifier> = Box::new(Rc::clone(&center));
        notifier.notify(Notification::new(
            NotificationKind::Info,
            "pinging",
            Duration::from_secs(1),
        ));
        assert_eq!(center.borrow().toasts()[0].notification.message, "pinging");
    }
}

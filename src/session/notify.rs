//! Single-slot transient notification channel.
//!
//! A new notification replaces the current one and cancels its pending
//! expiry. Expiry is driven by a scheduled task when a Tokio runtime is
//! available, and is also checked on read.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Success,
    Failure(ErrorKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

#[derive(Debug, Default)]
struct Slot {
    current: Option<Notification>,
    expires_at: Option<Instant>,
    generation: u64,
    expiry: Option<JoinHandle<()>>,
}

#[derive(Debug, Clone)]
pub struct Notifier {
    display_for: Duration,
    slot: Arc<Mutex<Slot>>,
}

impl Notifier {
    pub fn new(display_for: Duration) -> Self {
        Self {
            display_for,
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.notify(NotificationKind::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.notify(NotificationKind::Success, message);
    }

    pub fn failure(&self, kind: ErrorKind, message: impl Into<String>) {
        self.notify(NotificationKind::Failure(kind), message);
    }

    pub fn notify(&self, kind: NotificationKind, message: impl Into<String>) {
        let message = message.into();
        match kind {
            NotificationKind::Failure(error) => {
                tracing::warn!(?error, "Notification: {}", message)
            }
            _ => tracing::info!("Notification: {}", message),
        }

        let mut slot = lock(&self.slot);
        if let Some(pending) = slot.expiry.take() {
            pending.abort();
        }
        slot.generation += 1;
        slot.current = Some(Notification { kind, message });
        slot.expires_at = Some(Instant::now() + self.display_for);

        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let generation = slot.generation;
            let shared = Arc::clone(&self.slot);
            let display_for = self.display_for;
            slot.expiry = Some(runtime.spawn(async move {
                tokio::time::sleep(display_for).await;
                let mut slot = lock(&shared);
                if slot.generation == generation {
                    slot.current = None;
                    slot.expires_at = None;
                    slot.expiry = None;
                }
            }));
        }
    }

    /// The visible notification, if it has not expired.
    pub fn current(&self) -> Option<Notification> {
        let mut slot = lock(&self.slot);
        if slot.expires_at.is_some_and(|at| at <= Instant::now()) {
            slot.current = None;
            slot.expires_at = None;
        }
        slot.current.clone()
    }
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(|e| e.into_inner())
}

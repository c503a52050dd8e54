//! Transient user-facing notices (toast messages).
//!
//! Stores publish a notice for every user action outcome. Delivery is
//! best-effort: with no subscriber the notice is dropped.

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Default number of notices buffered per subscriber.
const DEFAULT_CAPACITY: usize = 32;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A single notice.
#[derive(Debug, Clone)]
pub struct Notice {
    pub id: Uuid,
    pub level: NoticeLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Broadcasts notices to any number of UI subscribers.
#[derive(Debug, Clone)]
pub struct Notifier {
    sender: broadcast::Sender<Notice>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Notifier {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Receive notices published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.sender.subscribe()
    }

    pub fn success(&self, message: impl Into<String>) {
        self.publish(NoticeLevel::Success, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.publish(NoticeLevel::Error, message.into());
    }

    fn publish(&self, level: NoticeLevel, message: String) {
        let notice = Notice {
            id: Uuid::new_v4(),
            level,
            message,
            at: Utc::now(),
        };
        // No subscribers is fine
        let _ = self.sender.send(notice);
    }
}

//! Bounded, most-recent-first buffer of notifications for the UI.
//!
//! [`NotificationFeed::run`] subscribes to the bus and runs as a long-lived
//! background task; it exits when the bus is dropped.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::bus::Notification;

/// Default number of notifications retained.
pub const DEFAULT_FEED_CAPACITY: usize = 100;

pub struct NotificationFeed {
    capacity: usize,
    entries: Mutex<VecDeque<Notification>>,
}

impl Default for NotificationFeed {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}

impl NotificationFeed {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn push(&self, notification: Notification) {
        let mut entries = self.entries.lock();
        entries.push_front(notification);
        entries.truncate(self.capacity);
    }

    /// Up to `limit` notifications, most recent first.
    pub fn recent(&self, limit: usize) -> Vec<Notification> {
        self.entries.lock().iter().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Consume the bus until it closes.
    pub async fn run(self: Arc<Self>, mut receiver: broadcast::Receiver<Notification>) {
        loop {
            match receiver.recv().await {
                Ok(notification) => self.push(notification),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification feed lagged, some were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification feed shutting down");
                    break;
                }
            }
        }
    }
}

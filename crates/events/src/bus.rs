//! In-process notification bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>` by every collection so that
//! load and background-write failures reach the user without blocking the
//! operation that caused them.

use agency_core::tables::DomainTable;
use agency_core::types::Timestamp;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Reading a table from the datastore failed; the collection is unchanged.
    LoadFailed,
    /// A background write gave up; local and remote state now differ.
    WriteFailed,
    /// An undo reversal failed; the action was consumed.
    UndoFailed,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A transient message for whoever is watching the back-office.
///
/// Constructed via [`Notification::new`] or one of the shorthands and
/// enriched with [`with_table`](Notification::with_table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub severity: Severity,
    /// Table the notification concerns, if any.
    pub table: Option<String>,
    pub message: String,
    pub timestamp: Timestamp,
}

impl Notification {
    /// Create a notification; severity follows from the kind.
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        let severity = match kind {
            NotificationKind::LoadFailed | NotificationKind::WriteFailed => Severity::Error,
            NotificationKind::UndoFailed => Severity::Warning,
            NotificationKind::Info => Severity::Info,
        };
        Self {
            kind,
            severity,
            table: None,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn load_failed(table: DomainTable, error: impl std::fmt::Display) -> Self {
        Self::new(
            NotificationKind::LoadFailed,
            format!("Could not load {table}: {error}"),
        )
        .with_table(table)
    }

    pub fn write_failed(
        table: DomainTable,
        operation: impl std::fmt::Display,
        error: impl std::fmt::Display,
    ) -> Self {
        Self::new(
            NotificationKind::WriteFailed,
            format!("Saving {operation} to {table} failed: {error}"),
        )
        .with_table(table)
    }

    pub fn with_table(mut self, table: DomainTable) -> Self {
        self.table = Some(table.as_str().to_string());
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out bus.
///
/// # Usage
///
/// ```rust
/// use agency_events::bus::{EventBus, Notification, NotificationKind};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(Notification::new(NotificationKind::Info, "hello"));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<Notification>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. Dropped silently when nobody listens.
    pub fn publish(&self, notification: Notification) {
        let _ = self.sender.send(notification);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

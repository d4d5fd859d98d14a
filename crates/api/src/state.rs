use std::sync::Arc;

use agency_events::{EventBus, NotificationFeed};
use agency_sync::{TableSource, Workspace};

use crate::config::ServerConfig;
use crate::session::UndoRegistry;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// In-memory collections backed by the datastore.
    pub workspace: Workspace,
    pub undo: Arc<UndoRegistry>,
    /// Load and write failures are published here.
    pub event_bus: Arc<EventBus>,
    /// Recent notifications, fed from the bus.
    pub feed: Arc<NotificationFeed>,
}

impl AppState {
    /// Open every collection against `source` and start the notification
    /// feed. Must be called inside a Tokio runtime.
    pub fn new(config: ServerConfig, source: &dyn TableSource) -> Self {
        let event_bus = Arc::new(EventBus::default());
        let workspace = Workspace::open(source, Arc::clone(&event_bus), config.retry.clone());

        let feed = Arc::new(NotificationFeed::default());
        tokio::spawn(Arc::clone(&feed).run(event_bus.subscribe()));

        Self {
            undo: Arc::new(UndoRegistry::new(config.undo_capacity)),
            config: Arc::new(config),
            workspace,
            event_bus,
            feed,
        }
    }
}

//! Transient user-facing notifications.
//!
//! - [`bus`] -- broadcast [`EventBus`] carrying [`Notification`]s.
//! - [`feed`] -- bounded in-memory [`NotificationFeed`] the UI polls.

pub mod bus;
pub mod feed;

pub use bus::{EventBus, Notification, NotificationKind, Severity};
pub use feed::NotificationFeed;

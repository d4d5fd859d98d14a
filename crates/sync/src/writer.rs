//! Background write queue with exponential-backoff retry.
//!
//! Each collection owns one [`WriteQueue`]. A single worker task drains it,
//! so writes to one table are applied in submission order. A write that
//! still fails after the last attempt is logged, published as a
//! `write_failed` notification and dropped; the local copy keeps the
//! optimistic value.

use std::sync::Arc;
use std::time::Duration;

use agency_core::tables::DomainTable;
use agency_events::{EventBus, Notification};
use tokio::sync::{mpsc, oneshot};

use crate::error::SyncError;
use crate::remote::{RemoteTable, WriteOp};

/// Attempts per write, including the first.
pub const WRITE_MAX_ATTEMPTS: u32 = 3;

/// Delay before the first retry; doubles on each further retry.
pub const WRITE_BACKOFF_MS: u64 = 200;

/// Upper bound on a single retry delay.
const MAX_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: WRITE_MAX_ATTEMPTS,
            initial_backoff: Duration::from_millis(WRITE_BACKOFF_MS),
            max_backoff: MAX_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay after failed attempt number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

enum Command {
    Write(WriteOp),
    Flush(oneshot::Sender<()>),
}

/// Handle to a table's write worker. Cloning shares the worker.
#[derive(Clone)]
pub struct WriteQueue {
    table: DomainTable,
    sender: mpsc::UnboundedSender<Command>,
}

impl WriteQueue {
    /// Spawn the worker on the current Tokio runtime.
    pub fn spawn(remote: Arc<dyn RemoteTable>, bus: Arc<EventBus>, policy: RetryPolicy) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let table = remote.table();
        tokio::spawn(run(remote, bus, policy, receiver));
        Self { table, sender }
    }

    /// Queue a write without waiting for it.
    pub fn submit(&self, op: WriteOp) {
        if self.sender.send(Command::Write(op)).is_err() {
            tracing::error!(
                table = %self.table,
                error = %SyncError::QueueClosed(self.table),
                "Dropping write"
            );
        }
    }

    /// Wait until every write submitted before this call has been attempted.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.sender.send(Command::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }
}

async fn run(
    remote: Arc<dyn RemoteTable>,
    bus: Arc<EventBus>,
    policy: RetryPolicy,
    mut receiver: mpsc::UnboundedReceiver<Command>,
) {
    while let Some(command) = receiver.recv().await {
        match command {
            Command::Write(op) => {
                let _ = apply_with_retry(remote.as_ref(), &bus, &policy, &op).await;
            }
            Command::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    tracing::debug!(table = %remote.table(), "Write queue stopped");
}

/// Apply `op`, retrying transient failures per `policy`.
///
/// Publishes a `write_failed` notification when giving up.
pub async fn apply_with_retry(
    remote: &dyn RemoteTable,
    bus: &EventBus,
    policy: &RetryPolicy,
    op: &WriteOp,
) -> Result<(), SyncError> {
    let table = remote.table();
    let mut attempt = 1;
    loop {
        match remote.apply(op).await {
            Ok(()) => {
                tracing::debug!(%table, %op, attempt, "Write applied");
                return Ok(());
            }
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.backoff_for(attempt);
                tracing::warn!(
                    %table,
                    %op,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Write attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(
                    %table,
                    %op,
                    attempt,
                    error = %e,
                    "Write failed; local and remote state now differ"
                );
                bus.publish(Notification::write_failed(table, op, &e));
                return Err(e);
            }
        }
    }
}

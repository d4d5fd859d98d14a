use agency_core::tables::DomainTable;

/// Failure talking to the remote datastore.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Datastore rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Datastore unavailable: {0}")]
    Unavailable(String),

    #[error("Write queue for {0} is closed")]
    QueueClosed(DomainTable),
}

impl SyncError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::Database(err) => matches!(
                err,
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::WorkerCrashed
            ),
            SyncError::Http(err) => err.is_timeout() || err.is_connect(),
            SyncError::Rejected { status, .. } => *status >= 500 || *status == 429,
            SyncError::Unavailable(_) => true,
            SyncError::QueueClosed(_) => false,
        }
    }
}

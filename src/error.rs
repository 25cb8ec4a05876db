//! Error types for the kagami backend.

use thiserror::Error;

/// Errors from the session store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite failure.
    #[error("session store error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Session record could not be (de)serialized.
    #[error("session record serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Filesystem error while preparing the store location.
    #[error("session store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Blocking task running the store operation was cancelled.
    #[error("session store task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Errors from the generation backend client.
///
/// These never cross the orchestrator boundary; the client converts each
/// variant into the fixed fail-closed reply and an event-log detail.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// No API key configured.
    #[error("generation backend not configured: API key missing")]
    MissingApiKey,

    /// Transport-level failure (connect, timeout, TLS).
    #[error("generation transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("generation API returned {status}: {body}")]
    Api { status: u16, body: String },
}

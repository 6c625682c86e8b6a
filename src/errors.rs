//! Distributed Notification Error Hierarchy
//!
//! Defines error types for the observable engine, categorized by the
//! coordination layer and the notification protocol.
//!
//! Errors raised by user-supplied callbacks are never represented here:
//! callbacks run inside a guard that catches and logs panics, so they
//! cannot fail a cycle or reach a publisher.

use std::time::Duration;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Coordination-service failures (connectivity, node operations)
    #[error(transparent)]
    Coordination(#[from] CoordinationError),

    /// Configuration validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Notification protocol failures (lock, quorum, decode, join)
    #[error(transparent)]
    Notification(#[from] NotificationError),

    /// Payload (de)serialization failures
    #[error("Serialization error")]
    Serialization(#[from] SerializationError),
}

#[derive(Debug, thiserror::Error)]
pub enum CoordinationError {
    /// Service unreachable or session lost
    #[error("Coordination service unreachable: {0}")]
    Unreachable(String),

    /// Retry policy exhausted during session establishment
    #[error("Session establishment failed after {retries} retries")]
    SessionEstablishFailed { retries: usize },

    /// Operation on a node that does not exist
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Create on a node that already exists
    #[error("Node already exists: {0}")]
    NodeExists(String),

    /// Delete on a node that still has children
    #[error("Node {0} has children")]
    NotEmpty(String),

    /// Version-checked write lost the race
    #[error("Version conflict at {path} (expected: {expected}, actual: {actual})")]
    VersionConflict {
        path: String,
        expected: i64,
        actual: i64,
    },

    /// A one-shot watch channel closed before it fired
    #[error("Watch on {0} was lost before it fired")]
    WatchLost(String),

    /// Malformed node path
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    /// Distributed lock not acquired within budget; the cycle fails
    /// immediately rather than proceeding without mutual exclusion
    #[error("Lock on {path} not acquired within {timeout:?}")]
    LockTimeout { path: String, timeout: Duration },

    /// Not all registered observers signalled receipt in time
    #[error("Could not notify all the observers within {timeout:?} ({received}/{expected} receipts)")]
    QuorumTimeout {
        expected: usize,
        received: usize,
        timeout: Duration,
    },

    /// A single observer could not decode the published payload
    #[error("Payload decode failed for {topic}: {source}")]
    Decode {
        topic: String,
        #[source]
        source: bincode::Error,
    },

    /// Bounded wait on a pending task elapsed without resolution
    #[error("Join timed out after {0:?}")]
    JoinTimeout(Duration),

    /// Re-raise of a captured cycle error through `AsyncTask::join`
    #[error("Notification cycle failed: {0}")]
    CycleFailed(String),
}

// Serialization is classified separately (payloads cross the process boundary)
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("Bincode serialization failed: {0}")]
    Bincode(#[from] bincode::Error),
}

// ============== Conversion Implementations ============== //
impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Serialization(SerializationError::Bincode(e))
    }
}

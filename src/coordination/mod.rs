//! Coordination-service abstraction layer.
//!
//! The engine delegates all cross-process state to an external
//! hierarchical, watch-capable coordination service (ZooKeeper/etcd-like).
//! This module pins down the contract the engine needs from such a
//! service: versioned nodes, one-shot watches, and a named distributed
//! mutex. The service's own consensus and replication are out of scope.
//!
//! [`MemoryCoordination`] is the in-process adapter implementing the full
//! contract for embedded deployments and tests.

mod memory;
pub use memory::*;

#[cfg(test)]
mod memory_test;

// Trait definition of the current module
// -----------------------------------------------------------------------------

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::sync::oneshot;

use crate::Result;

/// A change signal delivered by a one-shot watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// Path of the node the watch was armed on
    pub path: String,
    pub kind: WatchKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchKind {
    DataChanged,
    Deleted,
}

/// A node's payload together with its version counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedData {
    pub data: Vec<u8>,
    pub version: i64,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait CoordinationClient: Send + Sync + 'static {
    /// Verifies the session is usable.
    ///
    /// Called by the factory inside its bounded-retry connect loop; a
    /// healthy session returns `Ok(())` cheaply.
    ///
    /// # Errors
    /// - Returns [`crate::CoordinationError::Unreachable`] while the service cannot be reached
    async fn ensure_session(&self) -> Result<()>;

    /// Creates a node holding `data`.
    ///
    /// # Arguments
    /// * `path` - Absolute node path
    /// * `data` - Initial payload (may be empty)
    /// * `create_parents` - Create missing ancestors as empty nodes
    ///
    /// # Errors
    /// - Returns [`crate::CoordinationError::NodeExists`] if the node is already present
    /// - Returns [`crate::CoordinationError::NodeNotFound`] if a parent is missing and
    ///   `create_parents` is false
    async fn create(&self, path: &str, data: Vec<u8>, create_parents: bool) -> Result<()>;

    /// Deletes a childless node. Pending watches on it fire with
    /// [`WatchKind::Deleted`].
    async fn delete(&self, path: &str) -> Result<()>;

    async fn exists(&self, path: &str) -> Result<bool>;

    /// Reads a node's payload and version.
    async fn get_data(&self, path: &str) -> Result<VersionedData>;

    /// Overwrites a node's payload unconditionally.
    ///
    /// Bumps the version counter and fires every pending watch on the node
    /// with [`WatchKind::DataChanged`].
    ///
    /// # Returns
    /// The node's new version
    async fn set_data(&self, path: &str, data: Vec<u8>) -> Result<i64>;

    /// Version-checked write; fails instead of clobbering a concurrent
    /// update.
    ///
    /// # Errors
    /// - Returns [`crate::CoordinationError::VersionConflict`] if `expected_version` is stale
    async fn set_data_versioned(&self, path: &str, data: Vec<u8>, expected_version: i64) -> Result<i64>;

    /// Lists the names (not full paths) of a node's direct children.
    async fn get_children(&self, path: &str) -> Result<Vec<String>>;

    /// Arms a one-shot watch on `path`.
    ///
    /// The returned receiver resolves at most once, on the next change to
    /// the node; it must be re-armed to keep observing.
    async fn add_watch(&self, path: &str) -> Result<oneshot::Receiver<WatchEvent>>;

    /// Acquires the distributed mutex keyed by `path`, waiting as long as
    /// it takes. Callers bound the wait themselves.
    async fn acquire_mutex(&self, path: &str) -> Result<()>;

    /// Releases the mutex keyed by `path`. Releasing a mutex this session
    /// does not hold is a no-op.
    async fn release_mutex(&self, path: &str) -> Result<()>;
}

// Module level utils
// -----------------------------------------------------------------------------

/// Parent path of `path`, or `None` at the root.
pub(crate) fn parent_path(path: &str) -> Option<&str> {
    let idx = path.rfind('/')?;
    if idx == 0 {
        (path.len() > 1).then_some("/")
    } else {
        Some(&path[..idx])
    }
}

/// Last path segment.
pub(crate) fn node_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

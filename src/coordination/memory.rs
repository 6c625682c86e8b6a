//! In-process coordination adapter.
//!
//! Implements the full [`CoordinationClient`] contract against process
//! memory: a node table with version counters, one-shot watch delivery,
//! and per-path async mutexes. Multiple factories and observables sharing
//! one `MemoryCoordination` instance see each other exactly as they would
//! through a real coordination service, which is what embedded deployments
//! and the integration tests rely on.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio::sync::Mutex;
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

use super::node_name;
use super::parent_path;
use super::CoordinationClient;
use super::VersionedData;
use super::WatchEvent;
use super::WatchKind;
use crate::CoordinationError;
use crate::Result;

struct NodeState {
    data: Vec<u8>,
    version: i64,
    /// One-shot watchers armed on this node, drained on the next change
    watchers: Vec<oneshot::Sender<WatchEvent>>,
}

impl NodeState {
    fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            version: 0,
            watchers: Vec::new(),
        }
    }
}

#[derive(Default)]
pub struct MemoryCoordination {
    nodes: DashMap<String, NodeState>,
    mutexes: DashMap<String, Arc<Mutex<()>>>,
    /// Guards held by this session, keyed by mutex path
    held: DashMap<String, OwnedMutexGuard<()>>,
}

impl MemoryCoordination {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn validate(path: &str) -> Result<()> {
        if !path.starts_with('/') || (path.len() > 1 && path.ends_with('/')) {
            return Err(CoordinationError::InvalidPath(path.to_string()).into());
        }
        Ok(())
    }

    fn has_children(&self, path: &str) -> bool {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        self.nodes
            .iter()
            .any(|entry| entry.key().starts_with(&prefix))
    }

    fn fire_watchers(state: &mut NodeState, path: &str, kind: WatchKind) {
        for tx in state.watchers.drain(..) {
            // A dropped receiver just means nobody is waiting anymore
            let _ = tx.send(WatchEvent {
                path: path.to_string(),
                kind,
            });
        }
    }
}

#[async_trait]
impl CoordinationClient for MemoryCoordination {
    async fn ensure_session(&self) -> Result<()> {
        Ok(())
    }

    async fn create(&self, path: &str, data: Vec<u8>, create_parents: bool) -> Result<()> {
        Self::validate(path)?;
        if self.nodes.contains_key(path) {
            return Err(CoordinationError::NodeExists(path.to_string()).into());
        }
        if let Some(parent) = parent_path(path) {
            if parent != "/" && !self.nodes.contains_key(parent) {
                if !create_parents {
                    return Err(CoordinationError::NodeNotFound(parent.to_string()).into());
                }
                Box::pin(self.create(parent, Vec::new(), true)).await?;
            }
        }
        self.nodes.insert(path.to_string(), NodeState::new(data));
        debug!("created node {}", path);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        Self::validate(path)?;
        if self.has_children(path) {
            return Err(CoordinationError::NotEmpty(path.to_string()).into());
        }
        match self.nodes.remove(path) {
            Some((_, mut state)) => {
                Self::fire_watchers(&mut state, path, WatchKind::Deleted);
                debug!("deleted node {}", path);
                Ok(())
            }
            None => Err(CoordinationError::NodeNotFound(path.to_string()).into()),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Self::validate(path)?;
        Ok(path == "/" || self.nodes.contains_key(path))
    }

    async fn get_data(&self, path: &str) -> Result<VersionedData> {
        Self::validate(path)?;
        match self.nodes.get(path) {
            Some(state) => Ok(VersionedData {
                data: state.data.clone(),
                version: state.version,
            }),
            None => Err(CoordinationError::NodeNotFound(path.to_string()).into()),
        }
    }

    async fn set_data(&self, path: &str, data: Vec<u8>) -> Result<i64> {
        Self::validate(path)?;
        match self.nodes.get_mut(path) {
            Some(mut state) => {
                state.data = data;
                state.version += 1;
                let version = state.version;
                Self::fire_watchers(&mut state, path, WatchKind::DataChanged);
                Ok(version)
            }
            None => Err(CoordinationError::NodeNotFound(path.to_string()).into()),
        }
    }

    async fn set_data_versioned(&self, path: &str, data: Vec<u8>, expected_version: i64) -> Result<i64> {
        Self::validate(path)?;
        match self.nodes.get_mut(path) {
            Some(mut state) => {
                if state.version != expected_version {
                    return Err(CoordinationError::VersionConflict {
                        path: path.to_string(),
                        expected: expected_version,
                        actual: state.version,
                    }
                    .into());
                }
                state.data = data;
                state.version += 1;
                let version = state.version;
                Self::fire_watchers(&mut state, path, WatchKind::DataChanged);
                Ok(version)
            }
            None => Err(CoordinationError::NodeNotFound(path.to_string()).into()),
        }
    }

    async fn get_children(&self, path: &str) -> Result<Vec<String>> {
        Self::validate(path)?;
        if path != "/" && !self.nodes.contains_key(path) {
            return Err(CoordinationError::NodeNotFound(path.to_string()).into());
        }
        let prefix = if path == "/" {
            "/".to_string()
        } else {
            format!("{}/", path)
        };
        let mut children: Vec<String> = self
            .nodes
            .iter()
            .filter(|entry| {
                let key = entry.key();
                key.starts_with(&prefix) && !key[prefix.len()..].contains('/')
            })
            .map(|entry| node_name(entry.key()).to_string())
            .collect();
        children.sort();
        Ok(children)
    }

    async fn add_watch(&self, path: &str) -> Result<oneshot::Receiver<WatchEvent>> {
        Self::validate(path)?;
        match self.nodes.get_mut(path) {
            Some(mut state) => {
                let (tx, rx) = oneshot::channel();
                state.watchers.push(tx);
                Ok(rx)
            }
            None => Err(CoordinationError::NodeNotFound(path.to_string()).into()),
        }
    }

    async fn acquire_mutex(&self, path: &str) -> Result<()> {
        Self::validate(path)?;
        let mutex = self
            .mutexes
            .entry(path.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = mutex.lock_owned().await;
        self.held.insert(path.to_string(), guard);
        Ok(())
    }

    async fn release_mutex(&self, path: &str) -> Result<()> {
        Self::validate(path)?;
        // Dropping the guard wakes the next acquirer
        if self.held.remove(path).is_none() {
            debug!("release of {} without a held mutex; ignoring", path);
        }
        Ok(())
    }
}

use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::trace;

use super::ConnectOptions;
use super::Connector;
use super::CoordinationClient;
use super::NodeData;
use super::NodeEvent;
use super::Subscription;
use crate::layout::join_path;
use crate::layout::parent_path;
use crate::layout::ROOT_PATH;
use crate::Acl;
use crate::CoordinationError;

#[derive(Debug, Clone)]
struct MemoryNode {
    data: Bytes,
    version: i32,
    acls: Vec<Acl>,
}

#[derive(Debug)]
struct Subscriber {
    session_id: String,
    path: String,
    sender: mpsc::UnboundedSender<NodeEvent>,
}

impl Subscriber {
    fn covers(
        &self,
        path: &str,
    ) -> bool {
        covers(&self.path, path)
    }
}

fn covers(
    subtree: &str,
    path: &str,
) -> bool {
    subtree == ROOT_PATH
        || path == subtree
        || (path.starts_with(subtree) && path.as_bytes().get(subtree.len()) == Some(&b'/'))
}

#[derive(Debug)]
struct TreeState {
    nodes: BTreeMap<String, MemoryNode>,
    subscribers: Vec<Subscriber>,
}

impl TreeState {
    fn notify(
        &mut self,
        event: NodeEvent,
    ) {
        trace!(path = %event.path, kind = ?event.kind, "notify subscribers");
        // Sending under the write lock keeps per-path delivery in write order
        self.subscribers.retain(|s| {
            if !s.covers(&event.path) {
                return true;
            }
            s.sender.send(event.clone()).is_ok()
        });
    }

    fn has_children(
        &self,
        path: &str,
    ) -> bool {
        let prefix = join_path(path, "");
        self.nodes
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(p, _)| p.starts_with(&prefix))
    }
}

#[derive(Debug)]
struct MemoryTree {
    state: RwLock<TreeState>,
    available: AtomicBool,
    connect_attempts: AtomicU64,
    writes: AtomicU64,
}

/// In-process coordination service.
///
/// Holds a single tree rooted at `/` that every connected client shares, so
/// several stores in one process observe each other's writes exactly as
/// separate processes would through a real service.
#[derive(Debug, Clone)]
pub struct MemoryCoordinationService {
    inner: Arc<MemoryTree>,
}

impl Default for MemoryCoordinationService {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCoordinationService {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            ROOT_PATH.to_string(),
            MemoryNode {
                data: Bytes::new(),
                version: 0,
                acls: Acl::open_unsafe(),
            },
        );
        Self {
            inner: Arc::new(MemoryTree {
                state: RwLock::new(TreeState {
                    nodes,
                    subscribers: Vec::new(),
                }),
                available: AtomicBool::new(true),
                connect_attempts: AtomicU64::new(0),
                writes: AtomicU64::new(0),
            }),
        }
    }

    /// Simulates an outage: connects and operations fail with
    /// `ConnectionLoss` while unavailable
    pub fn set_available(
        &self,
        available: bool,
    ) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    pub fn connect_attempts(&self) -> u64 {
        self.inner.connect_attempts.load(Ordering::SeqCst)
    }

    /// Number of successful data writes (creates and updates)
    pub fn write_count(&self) -> u64 {
        self.inner.writes.load(Ordering::SeqCst)
    }

    pub fn data(
        &self,
        path: &str,
    ) -> Option<Bytes> {
        self.inner.state.read().nodes.get(path).map(|n| n.data.clone())
    }

    pub fn version(
        &self,
        path: &str,
    ) -> Option<i32> {
        self.inner.state.read().nodes.get(path).map(|n| n.version)
    }

    pub fn acls(
        &self,
        path: &str,
    ) -> Option<Vec<Acl>> {
        self.inner.state.read().nodes.get(path).map(|n| n.acls.clone())
    }

    /// Removes a leaf node, as an operator would with a shell
    ///
    /// # Errors
    /// - `NoNode` if the path is missing
    /// - `NotEmpty` if the node still has children
    pub fn delete(
        &self,
        path: &str,
    ) -> Result<(), CoordinationError> {
        let mut state = self.inner.state.write();
        if !state.nodes.contains_key(path) || path == ROOT_PATH {
            return Err(CoordinationError::NoNode(path.to_string()));
        }
        if state.has_children(path) {
            return Err(CoordinationError::NotEmpty(path.to_string()));
        }
        state.nodes.remove(path);
        debug!(%path, "node deleted");
        state.notify(NodeEvent::removed(path));
        Ok(())
    }

    fn client(&self) -> MemoryClient {
        MemoryClient {
            tree: self.inner.clone(),
            session_id: nanoid::nanoid!(),
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Connector for MemoryCoordinationService {
    async fn connect(
        &self,
        endpoint: &str,
        options: ConnectOptions,
    ) -> Result<Arc<dyn CoordinationClient>, CoordinationError> {
        self.inner.connect_attempts.fetch_add(1, Ordering::SeqCst);
        if !self.inner.available.load(Ordering::SeqCst) {
            return Err(CoordinationError::ConnectionLoss(endpoint.to_string()));
        }
        let client = self.client();
        debug!(
            %endpoint,
            session_id = %client.session_id,
            session_timeout = ?options.session_timeout,
            "memory session established"
        );
        Ok(Arc::new(client))
    }
}

/// One session against a [`MemoryCoordinationService`]
#[derive(Debug)]
pub struct MemoryClient {
    tree: Arc<MemoryTree>,
    session_id: String,
    closed: AtomicBool,
}

impl MemoryClient {
    fn check(&self) -> Result<(), CoordinationError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CoordinationError::SessionClosed);
        }
        if !self.tree.available.load(Ordering::SeqCst) {
            return Err(CoordinationError::ConnectionLoss(self.session_id.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl CoordinationClient for MemoryClient {
    async fn exists(
        &self,
        path: &str,
    ) -> Result<bool, CoordinationError> {
        self.check()?;
        Ok(self.tree.state.read().nodes.contains_key(path))
    }

    async fn create(
        &self,
        path: &str,
        data: Bytes,
        acls: &[Acl],
        create_parents: bool,
    ) -> Result<(), CoordinationError> {
        self.check()?;
        let mut state = self.tree.state.write();
        if state.nodes.contains_key(path) {
            return Err(CoordinationError::NodeExists(path.to_string()));
        }

        // Collect missing ancestors, nearest first
        let mut missing = Vec::new();
        let mut cursor = parent_path(path);
        while let Some(parent) = cursor {
            if state.nodes.contains_key(parent) {
                break;
            }
            missing.push(parent.to_string());
            cursor = parent_path(parent);
        }
        if !missing.is_empty() && !create_parents {
            return Err(CoordinationError::NoNode(missing[0].clone()));
        }

        for ancestor in missing.into_iter().rev() {
            state.nodes.insert(
                ancestor.clone(),
                MemoryNode {
                    data: Bytes::new(),
                    version: 0,
                    acls: acls.to_vec(),
                },
            );
            state.notify(NodeEvent::added(ancestor, Bytes::new(), 0));
        }

        state.nodes.insert(
            path.to_string(),
            MemoryNode {
                data: data.clone(),
                version: 0,
                acls: acls.to_vec(),
            },
        );
        self.tree.writes.fetch_add(1, Ordering::SeqCst);
        state.notify(NodeEvent::added(path, data, 0));
        Ok(())
    }

    async fn set_data(
        &self,
        path: &str,
        data: Bytes,
    ) -> Result<i32, CoordinationError> {
        self.check()?;
        let mut state = self.tree.state.write();
        let node = state
            .nodes
            .get_mut(path)
            .ok_or_else(|| CoordinationError::NoNode(path.to_string()))?;
        node.data = data.clone();
        node.version += 1;
        let version = node.version;
        self.tree.writes.fetch_add(1, Ordering::SeqCst);
        state.notify(NodeEvent::updated(path, data, version));
        Ok(version)
    }

    async fn get_data(
        &self,
        path: &str,
    ) -> Result<Option<NodeData>, CoordinationError> {
        self.check()?;
        Ok(self.tree.state.read().nodes.get(path).map(|n| NodeData {
            data: n.data.clone(),
            version: n.version,
        }))
    }

    async fn get_children(
        &self,
        path: &str,
    ) -> Result<Vec<String>, CoordinationError> {
        self.check()?;
        let state = self.tree.state.read();
        if !state.nodes.contains_key(path) {
            return Err(CoordinationError::NoNode(path.to_string()));
        }
        Ok(state
            .nodes
            .keys()
            .filter(|p| p.as_str() != path && parent_path(p) == Some(path))
            .map(|p| crate::layout::node_name(p).to_string())
            .collect())
    }

    async fn subscribe(
        &self,
        path: &str,
    ) -> Result<Subscription, CoordinationError> {
        self.check()?;
        let (sender, events) = mpsc::unbounded_channel();
        let mut state = self.tree.state.write();

        // BTreeMap order puts every parent before its children
        let initial = state
            .nodes
            .iter()
            .filter(|(p, _)| covers(path, p))
            .map(|(p, n)| NodeEvent::added(p.clone(), n.data.clone(), n.version))
            .collect();

        state.subscribers.push(Subscriber {
            session_id: self.session_id.clone(),
            path: path.to_string(),
            sender,
        });
        trace!(session_id = %self.session_id, %path, "subscription registered");

        Ok(Subscription { initial, events })
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut state = self.tree.state.write();
        state.subscribers.retain(|s| s.session_id != self.session_id);
        debug!(session_id = %self.session_id, "memory session closed");
    }
}

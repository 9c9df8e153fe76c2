//! Coordination service abstraction
//!
//! The store talks to a hierarchical coordination service through the
//! [`CoordinationClient`] trait. The service is assumed to provide:
//! - atomic create-if-absent (a second create fails with `NodeExists`)
//! - versioned update of node data
//! - child enumeration
//! - subtree subscriptions that deliver added/updated/removed events in write
//!   order per path
//!
//! Paths passed to a client are absolute; chrooting under the configured
//! root happens in [`crate::ConnectionSession`].
//!
//! [`MemoryCoordinationService`] is an in-process implementation of the
//! contract for embedded single-process deployments and tests.

mod memory;
pub use memory::*;


use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
#[cfg(test)]
use mockall::automock;
use tokio::sync::mpsc;

use crate::Acl;
use crate::CoordinationError;

/// Kind of change a subscription reports for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeEventKind {
    Added,
    Updated,
    Removed,
}

/// Change notification for a single node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEvent {
    pub kind: NodeEventKind,
    /// Path of the node that changed
    pub path: String,
    /// Current payload (empty for `Removed`)
    pub data: Bytes,
    /// Data version after the change
    pub version: i32,
}

impl NodeEvent {
    pub fn added(
        path: impl Into<String>,
        data: impl Into<Bytes>,
        version: i32,
    ) -> Self {
        Self {
            kind: NodeEventKind::Added,
            path: path.into(),
            data: data.into(),
            version,
        }
    }

    pub fn updated(
        path: impl Into<String>,
        data: impl Into<Bytes>,
        version: i32,
    ) -> Self {
        Self {
            kind: NodeEventKind::Updated,
            path: path.into(),
            data: data.into(),
            version,
        }
    }

    pub fn removed(path: impl Into<String>) -> Self {
        Self {
            kind: NodeEventKind::Removed,
            path: path.into(),
            data: Bytes::new(),
            version: -1,
        }
    }
}

/// Node payload together with its data version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeData {
    pub data: Bytes,
    pub version: i32,
}

/// A live subtree subscription.
///
/// `initial` holds an `Added` event for every node present when the
/// subscription was registered, parents before children. `events` then
/// carries every later change, in write order.
#[derive(Debug)]
pub struct Subscription {
    pub initial: Vec<NodeEvent>,
    pub events: mpsc::UnboundedReceiver<NodeEvent>,
}

/// Timeouts handed to a connector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOptions {
    pub session_timeout: Duration,
    pub connection_timeout: Duration,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait CoordinationClient: Send + Sync + 'static {
    async fn exists(
        &self,
        path: &str,
    ) -> Result<bool, CoordinationError>;

    /// Creates a node with the given ACLs.
    ///
    /// # Errors
    /// - `NodeExists` if the node is already present
    /// - `NoNode` if the parent is missing and `create_parents` is false
    async fn create(
        &self,
        path: &str,
        data: Bytes,
        acls: &[Acl],
        create_parents: bool,
    ) -> Result<(), CoordinationError>;

    /// Replaces the node's data, returning the new version.
    ///
    /// # Errors
    /// - `NoNode` if the node is missing
    async fn set_data(
        &self,
        path: &str,
        data: Bytes,
    ) -> Result<i32, CoordinationError>;

    async fn get_data(
        &self,
        path: &str,
    ) -> Result<Option<NodeData>, CoordinationError>;

    async fn get_children(
        &self,
        path: &str,
    ) -> Result<Vec<String>, CoordinationError>;

    /// Subscribes to `path` and all of its descendants. The path does not
    /// need to exist yet.
    async fn subscribe(
        &self,
        path: &str,
    ) -> Result<Subscription, CoordinationError>;

    /// Ends the session. Subscriptions stop and later calls fail with
    /// `SessionClosed`.
    fn close(&self);
}

/// Opens client sessions against an endpoint
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(
        &self,
        endpoint: &str,
        options: ConnectOptions,
    ) -> Result<Arc<dyn CoordinationClient>, CoordinationError>;
}

//! Configuration Store Error Hierarchy
//!
//! Defines the error types surfaced by the store, categorized by the layer
//! that produced them: initial connection, coordination-service operations,
//! ACL parsing, watched document decoding and local configuration.

use std::time::Duration;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Initial connection could not be established (fatal at startup)
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Read or write failure against the coordination service after connect
    #[error(transparent)]
    Coordination(#[from] CoordinationError),

    /// ACL specification could not be parsed (fatal at startup)
    #[error(transparent)]
    MalformedAcl(#[from] AclError),

    /// A watched node holds a document that is not valid for its kind
    #[error("Malformed config at {path}: {source}")]
    MalformedConfig {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Local document serialization failures
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Identifier cannot be used as a tree path segment
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// The store's role does not mirror the requested cluster
    #[error("Cluster {0} is not mirrored by this store")]
    ClusterNotMirrored(String),

    /// Settings failed validation
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Settings could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// Every attempt within the retry policy timed out
    #[error("Connection to {endpoint} timed out after {attempts} attempts ({timeout:?} each)")]
    Timeout {
        endpoint: String,
        attempts: usize,
        timeout: Duration,
    },

    /// The endpoint refused or dropped the connection on the last attempt
    #[error("Coordination service at {endpoint} unreachable: {source}")]
    Unreachable {
        endpoint: String,
        #[source]
        source: CoordinationError,
    },

    /// Bootstrapping the role's required nodes failed
    #[error("Bootstrap of root {root} failed: {source}")]
    Bootstrap {
        root: String,
        #[source]
        source: CoordinationError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinationError {
    /// Create was issued for a path that is already present
    #[error("Node already exists: {0}")]
    NodeExists(String),

    /// Operation addressed a path that is not present
    #[error("No node: {0}")]
    NoNode(String),

    /// Delete was issued for a node that still has children
    #[error("Node not empty: {0}")]
    NotEmpty(String),

    /// Transient loss of the connection, the operation may be retried
    #[error("Connection lost: {0}")]
    ConnectionLoss(String),

    /// Operation did not complete within the configured timeout
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The session was closed, no further operations are accepted
    #[error("Session closed")]
    SessionClosed,
}

impl CoordinationError {
    /// Whether the session's retry policy applies to this failure
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoordinationError::ConnectionLoss(_) | CoordinationError::Timeout(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AclError {
    /// Entry does not have exactly `scheme:id:permissions`
    #[error("ACL entry '{entry}' must have 3 fields, found {found}")]
    FieldCount { entry: String, found: usize },

    /// Permission letter outside `rwcda`
    #[error("Unsupported permission '{letter}' in '{permissions}'")]
    UnknownPermission { letter: char, permissions: String },
}

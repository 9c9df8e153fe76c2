//! Coordination service session
//!
//! [`ConnectionSession`] owns the client handle for the lifetime of the store:
//! - connects with a per-attempt timeout and exponential backoff
//! - chroots every path under the configured root
//! - bootstraps the tree according to its [`Role`]
//! - applies the same backoff to retryable failures of later operations
//!
//! Dropping the session closes the underlying connection.

mod role;
pub use role::*;


use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::error;
use tracing::info;

use crate::utils::async_task::task_with_timeout_and_exponential_backoff;
use crate::Acl;
use crate::BackoffPolicy;
use crate::ConnectError;
use crate::ConnectOptions;
use crate::ConnectionConfig;
use crate::Connector;
use crate::CoordinationClient;
use crate::CoordinationError;
use crate::NodeData;
use crate::NodeEvent;
use crate::Result;

/// Maps store paths to absolute service paths under a root node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chroot {
    root: String,
}

impl Chroot {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn absolute(
        &self,
        path: &str,
    ) -> String {
        match (self.root.as_str(), path) {
            ("/", _) => path.to_string(),
            (root, "/") => root.to_string(),
            (root, _) => format!("{root}{path}"),
        }
    }

    /// Inverse of [`Chroot::absolute`]; `None` for paths outside the root
    pub fn relative(
        &self,
        path: &str,
    ) -> Option<String> {
        if self.root == "/" {
            return Some(path.to_string());
        }
        let rest = path.strip_prefix(self.root.as_str())?;
        match rest {
            "" => Some("/".to_string()),
            _ if rest.starts_with('/') => Some(rest.to_string()),
            _ => None,
        }
    }
}

/// Subtree subscription with paths relative to the session root
#[derive(Debug)]
pub struct SessionSubscription {
    initial: Vec<NodeEvent>,
    events: mpsc::UnboundedReceiver<NodeEvent>,
    chroot: Chroot,
}

impl SessionSubscription {
    /// Snapshot of the subtree at subscription time, parents first
    pub fn take_initial(&mut self) -> Vec<NodeEvent> {
        std::mem::take(&mut self.initial)
    }

    /// Next live change; `None` once the session is closed
    pub async fn recv(&mut self) -> Option<NodeEvent> {
        loop {
            let event = self.events.recv().await?;
            if let Some(event) = self.relativize(event) {
                return Some(event);
            }
        }
    }

    fn relativize(
        &self,
        mut event: NodeEvent,
    ) -> Option<NodeEvent> {
        event.path = self.chroot.relative(&event.path)?;
        Some(event)
    }
}

pub struct ConnectionSession {
    client: Arc<dyn CoordinationClient>,
    chroot: Chroot,
    role: Role,
    retry: BackoffPolicy,
    closed: AtomicBool,
}

impl std::fmt::Debug for ConnectionSession {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ConnectionSession")
            .field("root", &self.chroot.root)
            .field("role", &self.role)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl ConnectionSession {
    /// Connects to `config.endpoint` and bootstraps the tree for `role`.
    ///
    /// # Errors
    /// - [`ConnectError::Timeout`] if every attempt timed out
    /// - [`ConnectError::Unreachable`] if the last attempt was refused
    /// - [`ConnectError::Bootstrap`] if the role's required nodes could not be
    ///   provisioned or checked; the connection is released first
    pub async fn connect(
        connector: &dyn Connector,
        config: &ConnectionConfig,
        retry: BackoffPolicy,
        role: Role,
    ) -> Result<Self> {
        info!(
            "Connecting to coordination service at {}{} as {}",
            config.endpoint, config.root, role
        );
        let options = ConnectOptions {
            session_timeout: config.session_timeout(),
            connection_timeout: config.connection_timeout(),
        };

        let client = task_with_timeout_and_exponential_backoff(
            || connector.connect(&config.endpoint, options),
            retry,
            options.connection_timeout,
        )
        .await
        .map_err(|e| match e {
            CoordinationError::Timeout(timeout) => ConnectError::Timeout {
                endpoint: config.endpoint.clone(),
                attempts: retry.max_retries + 1,
                timeout,
            },
            source => ConnectError::Unreachable {
                endpoint: config.endpoint.clone(),
                source,
            },
        })?;

        let session = Self::from_client(client, &config.root, role, retry);
        if let Err(e) = role.bootstrap(&session, config).await {
            error!("Bootstrap as {} failed: {}", role, e);
            session.close();
            return Err(match e {
                crate::Error::Coordination(source) => ConnectError::Bootstrap {
                    root: config.root.clone(),
                    source,
                }
                .into(),
                other => other,
            });
        }

        info!("Connected to {}{}", config.endpoint, config.root);
        Ok(session)
    }

    /// Wraps an established client without bootstrapping
    pub fn from_client(
        client: Arc<dyn CoordinationClient>,
        root: &str,
        role: Role,
        retry: BackoffPolicy,
    ) -> Self {
        Self {
            client,
            chroot: Chroot::new(root),
            role,
            retry,
            closed: AtomicBool::new(false),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn root(&self) -> &str {
        self.chroot.root()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub async fn exists(
        &self,
        path: &str,
    ) -> Result<bool> {
        let abs = self.chroot.absolute(path);
        Ok(self.with_retry(|| self.client.exists(&abs)).await?)
    }

    /// Creates `path`, and any missing ancestors, with `acls`
    ///
    /// # Errors
    /// - `Coordination(NodeExists)` if the node is already present
    pub async fn create(
        &self,
        path: &str,
        data: Bytes,
        acls: &[Acl],
    ) -> Result<()> {
        let abs = self.chroot.absolute(path);
        self.with_retry(|| self.client.create(&abs, data.clone(), acls, true))
            .await?;
        Ok(())
    }

    /// Creates `path` unless it exists.
    ///
    /// Returns `false` when another writer got there first; that outcome is
    /// not an error.
    pub async fn create_if_absent(
        &self,
        path: &str,
        data: Bytes,
        acls: &[Acl],
    ) -> Result<bool> {
        match self.create(path, data, acls).await {
            Ok(()) => Ok(true),
            Err(crate::Error::Coordination(CoordinationError::NodeExists(_))) => {
                debug!("{} already exists", path);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Overwrites the data of an existing node, returning the new version
    pub async fn set_data(
        &self,
        path: &str,
        data: Bytes,
    ) -> Result<i32> {
        let abs = self.chroot.absolute(path);
        Ok(self
            .with_retry(|| self.client.set_data(&abs, data.clone()))
            .await?)
    }

    pub async fn get_data(
        &self,
        path: &str,
    ) -> Result<Option<NodeData>> {
        let abs = self.chroot.absolute(path);
        Ok(self.with_retry(|| self.client.get_data(&abs)).await?)
    }

    pub async fn get_children(
        &self,
        path: &str,
    ) -> Result<Vec<String>> {
        let abs = self.chroot.absolute(path);
        Ok(self.with_retry(|| self.client.get_children(&abs)).await?)
    }

    pub async fn subscribe(
        &self,
        path: &str,
    ) -> Result<SessionSubscription> {
        let abs = self.chroot.absolute(path);
        let subscription = self.with_retry(|| self.client.subscribe(&abs)).await?;
        let mut session_subscription = SessionSubscription {
            initial: Vec::new(),
            events: subscription.events,
            chroot: self.chroot.clone(),
        };
        session_subscription.initial = subscription
            .initial
            .into_iter()
            .filter_map(|e| session_subscription.relativize(e))
            .collect();
        Ok(session_subscription)
    }

    /// Releases the connection; later calls are no-ops
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Closing coordination service connection to {}", self.root());
        self.client.close();
    }

    async fn with_retry<F, T, P>(
        &self,
        task: F,
    ) -> std::result::Result<P, CoordinationError>
    where
        F: FnMut() -> T,
        T: std::future::Future<Output = std::result::Result<P, CoordinationError>>,
    {
        if self.is_closed() {
            return Err(CoordinationError::SessionClosed);
        }
        task_with_timeout_and_exponential_backoff(task, self.retry, self.retry.timeout()).await
    }
}

impl Drop for ConnectionSession {
    fn drop(&mut self) {
        self.close();
    }
}

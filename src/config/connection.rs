use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_CONNECTION_TIMEOUT_MS;
use crate::constants::DEFAULT_ROOT;
use crate::constants::DEFAULT_SESSION_TIMEOUT_MS;
use crate::constants::DEFAULT_WAIT_FOR_ROOT_INTERVAL_MS;
use crate::Error;
use crate::Result;

/// Coordination service endpoint and session parameters
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Connection string, e.g. `host1:2181,host2:2181`
    #[serde(default)]
    pub endpoint: String,

    /// Root node all store paths are relative to
    #[serde(default = "default_root")]
    pub root: String,

    /// Session expiry negotiated with the service
    /// Default: 15 seconds
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,

    /// Maximum time for a single connection attempt
    /// Default: 30 seconds
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// Poll interval of a feeder waiting for the authority to create the root
    /// Default: 10 seconds
    #[serde(default = "default_wait_for_root_interval_ms")]
    pub wait_for_root_interval_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            root: default_root(),
            session_timeout_ms: default_session_timeout_ms(),
            connection_timeout_ms: default_connection_timeout_ms(),
            wait_for_root_interval_ms: default_wait_for_root_interval_ms(),
        }
    }
}

impl ConnectionConfig {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    pub fn wait_for_root_interval(&self) -> Duration {
        Duration::from_millis(self.wait_for_root_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(Error::InvalidConfig("connection.endpoint must not be empty".into()));
        }

        if !self.root.starts_with('/') {
            return Err(Error::InvalidConfig(format!(
                "connection.root must be absolute, got '{}'",
                self.root
            )));
        }
        if self.root.len() > 1 && self.root.ends_with('/') {
            return Err(Error::InvalidConfig(format!(
                "connection.root must not end with '/', got '{}'",
                self.root
            )));
        }

        if self.session_timeout_ms == 0
            || self.connection_timeout_ms == 0
            || self.wait_for_root_interval_ms == 0
        {
            return Err(Error::InvalidConfig(
                "connection timeouts and intervals must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}

fn default_root() -> String {
    DEFAULT_ROOT.to_string()
}
fn default_session_timeout_ms() -> u64 {
    DEFAULT_SESSION_TIMEOUT_MS
}
fn default_connection_timeout_ms() -> u64 {
    DEFAULT_CONNECTION_TIMEOUT_MS
}
fn default_wait_for_root_interval_ms() -> u64 {
    DEFAULT_WAIT_FOR_ROOT_INTERVAL_MS
}

//! Configuration management for the configuration store client.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support
//! - Environment variable overrides
//! - Legacy `logsearch.config.*` property maps
mod cluster;
mod connection;
mod retry;
pub use cluster::*;
pub use connection::*;
pub use retry::*;


use std::collections::HashMap;
use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::ZK_ACLS_PROPERTY;
use crate::constants::ZK_CONNECT_STRING_PROPERTY;
use crate::constants::ZK_ROOT_NODE_PROPERTY;
use crate::Result;

/// Main configuration container for the store
///
/// Combines all subsystem configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables prefixed `LOGSEARCH__` (highest priority)
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct StoreConfig {
    /// Coordination service endpoint, root and timeouts
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// Backoff policy for connecting and for retryable operations
    #[serde(default)]
    pub retry: BackoffPolicy,
    /// Cluster identity and node ACLs
    #[serde(default)]
    pub cluster: ClusterConfig,
}

impl StoreConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// # Note
    /// Validation is deferred so that `with_override_config()` can be applied
    /// first. Callers must call `validate()` before using the configuration.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("LOGSEARCH__CONNECTION__ENDPOINT", "zk1:2181");
    /// let cfg = StoreConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("LOGSEARCH")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables (highest priority)
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("LOGSEARCH")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Builds a configuration from a flat `logsearch.config.*` property map,
    /// as handed over by the hosting process. Keys that are absent keep their
    /// defaults.
    pub fn from_properties(
        properties: &HashMap<String, String>,
        cluster_name: &str,
    ) -> Self {
        let mut config = Self::default();
        if let Some(endpoint) = properties.get(ZK_CONNECT_STRING_PROPERTY) {
            config.connection.endpoint = endpoint.clone();
        }
        if let Some(root) = properties.get(ZK_ROOT_NODE_PROPERTY) {
            config.connection.root = root.clone();
        }
        if let Some(acls) = properties.get(ZK_ACLS_PROPERTY) {
            config.cluster.acls = acls.clone();
        }
        config.cluster.name = cluster_name.to_string();
        config
    }

    /// Validates configuration and returns validated instance.
    ///
    /// # Errors
    /// - `Error::InvalidConfig` for empty endpoint, relative root, zero timeouts
    ///   or an invalid cluster name
    /// - `Error::MalformedAcl` if the ACL specification does not parse
    pub fn validate(self) -> Result<Self> {
        self.connection.validate()?;
        self.retry.validate()?;
        self.cluster.validate()?;
        Ok(self)
    }
}

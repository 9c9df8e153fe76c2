use super::ConfigStore;
use crate::BackoffPolicy;
use crate::Connector;
use crate::Result;
use crate::Role;
use crate::StoreConfig;

/// Assembles the settings of a [`ConfigStore`] before opening it
///
/// ```ignore
/// let store = ConfigStoreBuilder::new("zk1:2181,zk2:2181", Role::Feeder)
///     .cluster("cl1")
///     .acls("sasl:logfeeder:cdrwa")
///     .open(&connector)
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct ConfigStoreBuilder {
    config: StoreConfig,
    role: Role,
}

impl ConfigStoreBuilder {
    /// Create a new builder with default config and the given endpoint
    pub fn new(
        endpoint: impl Into<String>,
        role: Role,
    ) -> Self {
        let mut config = StoreConfig::default();
        config.connection.endpoint = endpoint.into();
        Self { config, role }
    }

    /// Root node every path lives under (default: `/logsearch`)
    pub fn root(
        mut self,
        root: impl Into<String>,
    ) -> Self {
        self.config.connection.root = root.into();
        self
    }

    /// Cluster this process belongs to; required for feeders
    pub fn cluster(
        mut self,
        name: impl Into<String>,
    ) -> Self {
        self.config.cluster.name = name.into();
        self
    }

    /// ACL specification for created nodes (default: fully open)
    pub fn acls(
        mut self,
        spec: impl Into<String>,
    ) -> Self {
        self.config.cluster.acls = spec.into();
        self
    }

    pub fn retry(
        mut self,
        policy: BackoffPolicy,
    ) -> Self {
        self.config.retry = policy;
        self
    }

    /// Completely replaces the configuration, endpoint included
    pub fn set_config(
        mut self,
        config: StoreConfig,
    ) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Validates the settings and opens the store
    pub async fn open(
        self,
        connector: &dyn Connector,
    ) -> Result<ConfigStore> {
        let config = self.config.validate()?;
        ConfigStore::open(connector, &config, self.role).await
    }
}

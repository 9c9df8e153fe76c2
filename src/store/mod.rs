//! Public configuration store API.
//!
//! A [`ConfigStore`] owns one [`ConnectionSession`] and two mirrors:
//! - the role's tree: `/` for the authority, `/<cluster>` for a feeder
//! - the output tree `/output`
//!
//! Reads are served from the mirrors and never block on the network. Writes
//! go straight to the coordination service; the mirrors catch up once the
//! write's own event has been delivered.

mod builder;
pub use builder::*;


use std::collections::BTreeSet;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::constants::DEFAULT_OUTPUT_DESTINATION;
use crate::dispatcher::parse_input_config;
use crate::layout::cluster_path;
use crate::layout::global_config_path;
use crate::layout::input_config_path;
use crate::layout::input_parent_path;
use crate::layout::log_level_filter_parent_path;
use crate::layout::log_level_filter_path;
use crate::layout::output_root_path;
use crate::layout::output_sink_path;
use crate::layout::ROOT_PATH;
use crate::model::decode;
use crate::model::encode;
use crate::Acl;
use crate::ConnectionSession;
use crate::Connector;
use crate::Error;
use crate::InputChangeDispatcher;
use crate::InputConfig;
use crate::InputConfigMonitor;
use crate::LogLevelFilter;
use crate::LogLevelFilterMap;
use crate::LogLevelFilterMonitor;
use crate::OutputChangeDispatcher;
use crate::OutputConfigMonitor;
use crate::OutputSinkProperties;
use crate::Result;
use crate::Role;
use crate::StoreConfig;
use crate::SubtreeMirror;

/// Member of a shipper document that holds its global template
const GLOBAL_MEMBER: &str = "global";

pub struct ConfigStore {
    session: Arc<ConnectionSession>,
    acls: Vec<Acl>,
    /// Cluster the feeder mirrors; empty for the authority
    cluster: String,
    tree: SubtreeMirror,
    output: SubtreeMirror,
    closed: AtomicBool,
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("session", &self.session)
            .field("cluster", &self.cluster)
            .field("tree", &self.tree)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

impl ConfigStore {
    /// Connects, bootstraps the tree for `role` and starts the mirrors.
    ///
    /// # Errors
    /// - `MalformedAcl` / `InvalidConfig` before any connection is attempted
    /// - `Connect` if the service cannot be reached or bootstrapped
    /// - `Coordination` if a mirror cannot subscribe; the session is closed
    ///   before returning
    pub async fn open(
        connector: &dyn Connector,
        config: &StoreConfig,
        role: Role,
    ) -> Result<Self> {
        let acls = config.cluster.parsed_acls()?;
        let cluster = config.cluster.name.clone();
        let tree_path = match role {
            Role::Authority => ROOT_PATH.to_string(),
            Role::Feeder if cluster.is_empty() => {
                return Err(Error::InvalidConfig(
                    "cluster.name is required for a feeder".to_string(),
                ));
            }
            Role::Feeder => cluster_path(&cluster)?,
        };

        let session = Arc::new(
            ConnectionSession::connect(connector, &config.connection, config.retry, role).await?,
        );

        let output = SubtreeMirror::open(session.clone(), output_root_path());
        let tree = SubtreeMirror::open(session.clone(), tree_path);
        for mirror in [&output, &tree] {
            if let Err(e) = mirror.start().await {
                error!("Failed to start mirror of {}: {}", mirror.path(), e);
                session.close();
                return Err(e);
            }
        }

        info!("Configuration store opened as {}", role);
        Ok(Self {
            session,
            acls,
            cluster,
            tree,
            output,
            closed: AtomicBool::new(false),
        })
    }

    pub fn role(&self) -> Role {
        self.session.role()
    }

    pub fn session(&self) -> &Arc<ConnectionSession> {
        &self.session
    }

    /// ACLs attached to every node this store creates
    pub fn acls(&self) -> &[Acl] {
        &self.acls
    }

    /// Whether the service's input config of `cluster` is in the local mirror
    pub fn input_config_exists(
        &self,
        cluster: &str,
        service: &str,
    ) -> Result<bool> {
        let path = input_config_path(cluster, service)?;
        Ok(self.mirror_for(cluster)?.current_data(&path).is_some())
    }

    /// Uploads an input config unless one is already present.
    ///
    /// Losing the race to another writer is not an error.
    pub async fn create_input_config(
        &self,
        cluster: &str,
        service: &str,
        input_config: &str,
    ) -> Result<()> {
        let path = input_config_path(cluster, service)?;
        let data = Bytes::copy_from_slice(input_config.as_bytes());
        if self.session.create_if_absent(&path, data, &self.acls).await? {
            info!("Uploaded input config for the service {} for cluster {}", service, cluster);
        } else {
            debug!(
                "Did not upload input config for service {} as it was already uploaded by another feeder",
                service
            );
        }
        Ok(())
    }

    /// Replaces an existing input config
    ///
    /// # Errors
    /// - `Coordination(NoNode)` if the service has no input config yet
    pub async fn set_input_config(
        &self,
        cluster: &str,
        service: &str,
        input_config: &str,
    ) -> Result<()> {
        let path = input_config_path(cluster, service)?;
        self.session
            .set_data(&path, Bytes::copy_from_slice(input_config.as_bytes()))
            .await?;
        info!("Set input config for the service {} for cluster {}", service, cluster);
        Ok(())
    }

    /// Publishes the cluster's global template array, replacing any previous one
    pub async fn create_global_config(
        &self,
        cluster: &str,
        templates: &[Value],
    ) -> Result<()> {
        let path = global_config_path(cluster)?;
        let data = encode(&templates)?;
        let cached = self.mirror_for(cluster)?.current_data(&path).is_some();
        self.upsert(&path, data, cached).await
    }

    pub fn get_global_config(
        &self,
        cluster: &str,
    ) -> Result<Option<Vec<Value>>> {
        let path = global_config_path(cluster)?;
        self.mirror_for(cluster)?
            .current_data(&path)
            .map(|data| decode(&path, &data))
            .transpose()
    }

    /// Input config of a service with the cluster's global templates applied.
    /// The stored document is left untouched.
    pub fn get_input_config(
        &self,
        cluster: &str,
        service: &str,
    ) -> Result<Option<InputConfig>> {
        let path = input_config_path(cluster, service)?;
        let Some(data) = self.mirror_for(cluster)?.current_data(&path) else {
            return Ok(None);
        };
        let templates = self.get_global_config(cluster)?.unwrap_or_default();
        parse_input_config(&path, &data, &templates).map(Some)
    }

    /// Services with an input config in `cluster`, sorted
    pub fn get_service_names(
        &self,
        cluster: &str,
    ) -> Result<BTreeSet<String>> {
        let parent = input_parent_path(cluster)?;
        Ok(self
            .mirror_for(cluster)?
            .current_children(&parent)
            .into_keys()
            .collect())
    }

    /// Uploads a log level filter unless one is already present
    pub async fn create_log_level_filter(
        &self,
        cluster: &str,
        log_id: &str,
        filter: &LogLevelFilter,
    ) -> Result<()> {
        let path = log_level_filter_path(cluster, log_id)?;
        if self
            .session
            .create_if_absent(&path, encode(filter)?, &self.acls)
            .await?
        {
            info!("Uploaded log level filter for the log {} for cluster {}", log_id, cluster);
        } else {
            debug!(
                "Did not upload log level filter for log {} as it was already uploaded by another feeder",
                log_id
            );
        }
        Ok(())
    }

    /// Writes every filter whose serialized form differs from the mirrored
    /// one. Filters missing from the tree are created.
    pub async fn set_log_level_filters(
        &self,
        cluster: &str,
        filters: &LogLevelFilterMap,
    ) -> Result<()> {
        let mirror = self.mirror_for(cluster)?;
        for (log_id, filter) in &filters.filter {
            let path = log_level_filter_path(cluster, log_id)?;
            let data = encode(filter)?;
            let cached = mirror.current_data(&path);
            if cached.as_ref() == Some(&data) {
                debug!("Log level filter of {} is unchanged, skipping", log_id);
                continue;
            }
            self.upsert(&path, data, cached.is_some()).await?;
            info!("Set log level filter for the log {} for cluster {}", log_id, cluster);
        }
        Ok(())
    }

    /// Every filter of the cluster. Documents that do not parse are logged
    /// and left out.
    pub fn get_log_level_filters(
        &self,
        cluster: &str,
    ) -> Result<LogLevelFilterMap> {
        let parent = log_level_filter_parent_path(cluster)?;
        let mut filters = LogLevelFilterMap::new();
        for (log_id, data) in self.mirror_for(cluster)?.current_children(&parent) {
            let path = log_level_filter_path(cluster, &log_id)?;
            match decode::<LogLevelFilter>(&path, &data) {
                Ok(filter) => {
                    filters.insert(log_id, filter);
                }
                Err(e) => error!("Skipping log level filter of {}: {}", log_id, e),
            }
        }
        Ok(filters)
    }

    /// Creates or updates the properties of a sink of the default destination
    pub async fn save_output_sink_properties(
        &self,
        sink_type: &str,
        properties: &OutputSinkProperties,
    ) -> Result<()> {
        self.save_output_sink_properties_for(DEFAULT_OUTPUT_DESTINATION, sink_type, properties)
            .await
    }

    pub async fn save_output_sink_properties_for(
        &self,
        destination: &str,
        sink_type: &str,
        properties: &OutputSinkProperties,
    ) -> Result<()> {
        let path = output_sink_path(destination, sink_type)?;
        let cached = self.output.current_data(&path).is_some();
        self.upsert(&path, encode(properties)?, cached).await
    }

    pub fn get_output_sink_properties(
        &self,
        sink_type: &str,
    ) -> Result<Option<OutputSinkProperties>> {
        self.get_output_sink_properties_for(DEFAULT_OUTPUT_DESTINATION, sink_type)
    }

    pub fn get_output_sink_properties_for(
        &self,
        destination: &str,
        sink_type: &str,
    ) -> Result<Option<OutputSinkProperties>> {
        let path = output_sink_path(destination, sink_type)?;
        self.output
            .current_data(&path)
            .map(|data| decode(&path, &data))
            .transpose()
    }

    /// Publishes the cluster's global templates, then routes the cluster's
    /// input config and log level filter changes to the monitors.
    ///
    /// The templates are the `global` member of every document returned by
    /// `input_monitor.global_config_jsons()`. Failing to publish them is
    /// logged; monitoring starts regardless. Configs already present are
    /// delivered as additions right away.
    pub async fn monitor_input_config_changes(
        &self,
        input_monitor: Arc<dyn InputConfigMonitor>,
        filter_monitor: Arc<dyn LogLevelFilterMonitor>,
        cluster: &str,
    ) -> Result<()> {
        let mirror = self.mirror_for(cluster)?;

        let mut templates = Vec::new();
        for json in input_monitor.global_config_jsons() {
            let mut doc: Value = serde_json::from_str(&json)?;
            match doc.get_mut(GLOBAL_MEMBER).map(Value::take) {
                Some(template) => templates.push(template),
                None => warn!("Shipper config without a global section ignored"),
            }
        }

        if let Err(e) = self.create_global_config(cluster, &templates).await {
            warn!("Exception during global config node creation/update: {}", e);
        }

        let dispatcher =
            InputChangeDispatcher::new(cluster, templates, input_monitor, filter_monitor)?;
        mirror.add_listener(Arc::new(dispatcher));
        info!("Monitoring input config changes of cluster {}", cluster);
        Ok(())
    }

    /// Routes sink property updates to the monitor of each sink
    pub fn monitor_output_properties(
        &self,
        monitors: Vec<Arc<dyn OutputConfigMonitor>>,
    ) -> Result<()> {
        let dispatcher = OutputChangeDispatcher::new(monitors)?;
        self.output.add_listener(Arc::new(dispatcher));
        Ok(())
    }

    /// Stops the mirrors and closes the session; later calls are no-ops
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.tree.close();
        self.output.close();
        self.session.close();
    }

    fn mirror_for(
        &self,
        cluster: &str,
    ) -> Result<&SubtreeMirror> {
        match self.role() {
            Role::Authority => Ok(&self.tree),
            Role::Feeder if cluster == self.cluster => Ok(&self.tree),
            Role::Feeder => Err(Error::ClusterNotMirrored(cluster.to_string())),
        }
    }

    /// Overwrites when the mirror already holds the node, creates otherwise.
    /// A create that loses to a concurrent writer falls back to an overwrite.
    async fn upsert(
        &self,
        path: &str,
        data: Bytes,
        cached: bool,
    ) -> Result<()> {
        if !cached && self.session.create_if_absent(path, data.clone(), &self.acls).await? {
            return Ok(());
        }
        self.session.set_data(path, data).await?;
        Ok(())
    }
}

impl Drop for ConfigStore {
    fn drop(&mut self) {
        self.close();
    }
}

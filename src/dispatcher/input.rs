use std::sync::Arc;

use serde_json::Value;
use tracing::debug;
use tracing::info;

use super::merge::apply_global_templates;
use super::InputConfigMonitor;
use super::LogLevelFilterMonitor;
use crate::layout::input_prefix;
use crate::layout::log_level_filter_prefix;
use crate::layout::validate_segment;
use crate::model::decode;
use crate::Error;
use crate::InputConfig;
use crate::LogLevelFilter;
use crate::MirrorListener;
use crate::MirrorView;
use crate::NodeEvent;
use crate::NodeEventKind;
use crate::Result;

/// Translates events of one cluster's subtree into input config and log
/// level filter callbacks.
///
/// Input documents are merged with the global templates this process
/// published before they reach the monitor. The templates are fixed for the
/// dispatcher's lifetime; `/<cluster>/global` writes by other processes do
/// not affect them.
pub struct InputChangeDispatcher {
    cluster: String,
    input_prefix: String,
    filter_prefix: String,
    global_templates: Vec<Value>,
    input_monitor: Arc<dyn InputConfigMonitor>,
    filter_monitor: Arc<dyn LogLevelFilterMonitor>,
}

impl std::fmt::Debug for InputChangeDispatcher {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("InputChangeDispatcher")
            .field("cluster", &self.cluster)
            .field("templates", &self.global_templates.len())
            .finish_non_exhaustive()
    }
}

impl InputChangeDispatcher {
    pub fn new(
        cluster: &str,
        global_templates: Vec<Value>,
        input_monitor: Arc<dyn InputConfigMonitor>,
        filter_monitor: Arc<dyn LogLevelFilterMonitor>,
    ) -> Result<Self> {
        validate_segment(cluster)?;
        Ok(Self {
            cluster: cluster.to_string(),
            input_prefix: input_prefix(cluster),
            filter_prefix: log_level_filter_prefix(cluster),
            global_templates,
            input_monitor,
            filter_monitor,
        })
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn global_templates(&self) -> &[Value] {
        &self.global_templates
    }

    fn parse(
        &self,
        event: &NodeEvent,
    ) -> Result<InputConfig> {
        parse_input_config(&event.path, &event.data, &self.global_templates)
    }

    fn handle_input_event(
        &self,
        service: &str,
        event: &NodeEvent,
    ) -> Result<()> {
        info!(
            "Input config {:?} for service {} of cluster {}",
            event.kind, service, self.cluster
        );
        match event.kind {
            NodeEventKind::Added => {
                let config = self.parse(event)?;
                self.input_monitor.on_input_config_loaded(service, config)
            }
            NodeEventKind::Updated => {
                // Parse before removing so a bad update leaves the old inputs running
                let config = self.parse(event)?;
                self.input_monitor.on_input_config_removed(service);
                self.input_monitor.on_input_config_loaded(service, config)
            }
            NodeEventKind::Removed => {
                self.input_monitor.on_input_config_removed(service);
                Ok(())
            }
        }
    }

    fn handle_filter_event(
        &self,
        log_id: &str,
        event: &NodeEvent,
    ) -> Result<()> {
        match event.kind {
            NodeEventKind::Added | NodeEventKind::Updated => {
                info!("Log level filter of {} set in cluster {}", log_id, self.cluster);
                let filter: LogLevelFilter = decode(&event.path, &event.data)?;
                self.filter_monitor.on_log_level_filter_changed(log_id, filter);
            }
            NodeEventKind::Removed => {
                info!("Log level filter of {} removed from cluster {}", log_id, self.cluster);
                self.filter_monitor.on_log_level_filter_removed(log_id);
            }
        }
        Ok(())
    }
}

impl MirrorListener for InputChangeDispatcher {
    fn on_event(
        &self,
        _view: &MirrorView,
        event: &NodeEvent,
    ) -> Result<()> {
        if let Some(service) = direct_child(&event.path, &self.input_prefix) {
            return self.handle_input_event(service, event);
        }
        if let Some(log_id) = direct_child(&event.path, &self.filter_prefix) {
            return self.handle_filter_event(log_id, event);
        }
        debug!(path = %event.path, kind = ?event.kind, "event ignored");
        Ok(())
    }
}

/// Decodes an input document and applies `templates` to a copy of it
pub fn parse_input_config(
    path: &str,
    data: &[u8],
    templates: &[Value],
) -> Result<InputConfig> {
    let mut doc: Value = decode(path, data)?;
    apply_global_templates(&mut doc, templates);
    serde_json::from_value(doc).map_err(|source| Error::MalformedConfig {
        path: path.to_string(),
        source,
    })
}

/// Name of `path` when it sits exactly one level below `prefix`
pub(super) fn direct_child<'a>(
    path: &'a str,
    prefix: &str,
) -> Option<&'a str> {
    path.strip_prefix(prefix)
        .filter(|name| !name.is_empty() && !name.contains('/'))
}

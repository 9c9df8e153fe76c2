//! Callbacks implemented by the domain consumers of configuration changes.
//!
//! Live changes are delivered on the mirror task that observed them, one at
//! a time. Contents already mirrored when monitoring starts are replayed
//! synchronously on the task that registers the monitor, before the
//! registering call returns.
//! They should return quickly; long work belongs on the consumer's own tasks.

#[cfg(test)]
use mockall::automock;

use crate::InputConfig;
use crate::LogLevelFilter;
use crate::OutputSinkProperties;
use crate::Result;

#[cfg_attr(test, automock)]
pub trait InputConfigMonitor: Send + Sync + 'static {
    /// Shipper documents known locally. The `global` member of each becomes
    /// one template of the cluster's global config.
    fn global_config_jsons(&self) -> Vec<String>;

    /// A service's input config appeared or was replaced; `config` already
    /// carries the cluster's global templates
    fn on_input_config_loaded(
        &self,
        service: &str,
        config: InputConfig,
    ) -> Result<()>;

    fn on_input_config_removed(
        &self,
        service: &str,
    );
}

#[cfg_attr(test, automock)]
pub trait LogLevelFilterMonitor: Send + Sync + 'static {
    fn on_log_level_filter_changed(
        &self,
        log_id: &str,
        filter: LogLevelFilter,
    );

    fn on_log_level_filter_removed(
        &self,
        log_id: &str,
    );
}

#[cfg_attr(test, automock)]
pub trait OutputConfigMonitor: Send + Sync + 'static {
    /// Destination segment of the watched sink path, e.g. `solr`
    fn destination(&self) -> String;

    /// Sink type segment of the watched sink path, e.g. `service`
    fn output_type(&self) -> String;

    fn on_output_config_changed(
        &self,
        properties: OutputSinkProperties,
    );
}

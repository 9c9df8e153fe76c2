use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::InputConfig;
use crate::InputConfigMonitor;
use crate::LogLevelFilter;
use crate::LogLevelFilterMonitor;
use crate::OutputConfigMonitor;
use crate::OutputSinkProperties;
use crate::Result;

/// A callback as seen by a monitor
#[derive(Debug, Clone, PartialEq)]
pub enum Observed {
    InputLoaded(String, InputConfig),
    InputRemoved(String),
    FilterChanged(String, LogLevelFilter),
    FilterRemoved(String),
    OutputChanged(OutputSinkProperties),
}

/// Implements every monitor trait and forwards each callback to a channel,
/// since callbacks arrive on the mirror task
pub struct RecordingMonitor {
    global_jsons: Vec<String>,
    destination: String,
    output_type: String,
    tx: mpsc::UnboundedSender<Observed>,
}

pub struct ObservedRx {
    rx: mpsc::UnboundedReceiver<Observed>,
}

impl RecordingMonitor {
    pub fn new(global_jsons: Vec<String>) -> (Arc<Self>, ObservedRx) {
        Self::for_sink(global_jsons, "solr", "service")
    }

    pub fn for_sink(
        global_jsons: Vec<String>,
        destination: &str,
        output_type: &str,
    ) -> (Arc<Self>, ObservedRx) {
        let (tx, rx) = mpsc::unbounded_channel();
        let monitor = Self {
            global_jsons,
            destination: destination.to_string(),
            output_type: output_type.to_string(),
            tx,
        };
        (Arc::new(monitor), ObservedRx { rx })
    }

    fn record(
        &self,
        observed: Observed,
    ) {
        let _ = self.tx.send(observed);
    }
}

impl ObservedRx {
    pub async fn next(&mut self) -> Observed {
        timeout(Duration::from_secs(1), self.rx.recv())
            .await
            .expect("no callback within a second")
            .expect("monitor dropped")
    }

    /// Asserts nothing else arrives within a short grace period
    pub async fn assert_quiet(&mut self) {
        if let Ok(Some(observed)) = timeout(Duration::from_millis(50), self.rx.recv()).await {
            panic!("unexpected callback: {observed:?}");
        }
    }
}

impl InputConfigMonitor for RecordingMonitor {
    fn global_config_jsons(&self) -> Vec<String> {
        self.global_jsons.clone()
    }

    fn on_input_config_loaded(
        &self,
        service: &str,
        config: InputConfig,
    ) -> Result<()> {
        self.record(Observed::InputLoaded(service.to_string(), config));
        Ok(())
    }

    fn on_input_config_removed(
        &self,
        service: &str,
    ) {
        self.record(Observed::InputRemoved(service.to_string()));
    }
}

impl LogLevelFilterMonitor for RecordingMonitor {
    fn on_log_level_filter_changed(
        &self,
        log_id: &str,
        filter: LogLevelFilter,
    ) {
        self.record(Observed::FilterChanged(log_id.to_string(), filter));
    }

    fn on_log_level_filter_removed(
        &self,
        log_id: &str,
    ) {
        self.record(Observed::FilterRemoved(log_id.to_string()));
    }
}

impl OutputConfigMonitor for RecordingMonitor {
    fn destination(&self) -> String {
        self.destination.clone()
    }

    fn output_type(&self) -> String {
        self.output_type.clone()
    }

    fn on_output_config_changed(
        &self,
        properties: OutputSinkProperties,
    ) {
        self.record(Observed::OutputChanged(properties));
    }
}

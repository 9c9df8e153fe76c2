use std::sync::Arc;
use std::time::Duration;

use logsearch_config::BackoffPolicy;
use logsearch_config::ConfigStore;
use logsearch_config::ConfigStoreBuilder;
use logsearch_config::InputConfig;
use logsearch_config::InputConfigMonitor;
use logsearch_config::LogLevelFilter;
use logsearch_config::LogLevelFilterMonitor;
use logsearch_config::MemoryCoordinationService;
use logsearch_config::OutputConfigMonitor;
use logsearch_config::OutputSinkProperties;
use logsearch_config::Role;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio::time::timeout;

pub const ENDPOINT: &str = "zk1:2181,zk2:2181";

pub fn retry() -> BackoffPolicy {
    BackoffPolicy {
        max_retries: 2,
        timeout_ms: 500,
        base_delay_ms: 10,
        max_delay_ms: 40,
    }
}

pub async fn authority(service: &MemoryCoordinationService) -> ConfigStore {
    ConfigStoreBuilder::new(ENDPOINT, Role::Authority)
        .retry(retry())
        .open(service)
        .await
        .expect("authority should open")
}

pub async fn feeder(
    service: &MemoryCoordinationService,
    cluster: &str,
) -> ConfigStore {
    ConfigStoreBuilder::new(ENDPOINT, Role::Feeder)
        .cluster(cluster)
        .retry(retry())
        .open(service)
        .await
        .expect("feeder should open")
}

pub async fn eventually<F: Fn() -> bool>(
    what: &str,
    condition: F,
) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}

#[derive(Debug, Clone, PartialEq)]
pub enum Callback {
    Loaded(String, InputConfig),
    Removed(String),
    FilterChanged(String, LogLevelFilter),
    FilterRemoved(String),
    Output(String, OutputSinkProperties),
}

/// Stand-in for a log shipper: records every callback it receives
pub struct Shipper {
    globals: Vec<String>,
    sink: (String, String),
    tx: mpsc::UnboundedSender<Callback>,
}

pub struct Callbacks(mpsc::UnboundedReceiver<Callback>);

impl Shipper {
    pub fn new(
        globals: &[&str],
        destination: &str,
        output_type: &str,
    ) -> (Arc<Self>, Callbacks) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shipper = Self {
            globals: globals.iter().map(|g| g.to_string()).collect(),
            sink: (destination.to_string(), output_type.to_string()),
            tx,
        };
        (Arc::new(shipper), Callbacks(rx))
    }
}

impl Callbacks {
    pub async fn next(&mut self) -> Callback {
        timeout(Duration::from_secs(1), self.0.recv())
            .await
            .expect("no callback within a second")
            .expect("shipper dropped")
    }

    pub async fn assert_quiet(&mut self) {
        if let Ok(Some(callback)) = timeout(Duration::from_millis(50), self.0.recv()).await {
            panic!("unexpected callback: {callback:?}");
        }
    }
}

impl InputConfigMonitor for Shipper {
    fn global_config_jsons(&self) -> Vec<String> {
        self.globals.clone()
    }

    fn on_input_config_loaded(
        &self,
        service: &str,
        config: InputConfig,
    ) -> logsearch_config::Result<()> {
        let _ = self.tx.send(Callback::Loaded(service.to_string(), config));
        Ok(())
    }

    fn on_input_config_removed(
        &self,
        service: &str,
    ) {
        let _ = self.tx.send(Callback::Removed(service.to_string()));
    }
}

impl LogLevelFilterMonitor for Shipper {
    fn on_log_level_filter_changed(
        &self,
        log_id: &str,
        filter: LogLevelFilter,
    ) {
        let _ = self.tx.send(Callback::FilterChanged(log_id.to_string(), filter));
    }

    fn on_log_level_filter_removed(
        &self,
        log_id: &str,
    ) {
        let _ = self.tx.send(Callback::FilterRemoved(log_id.to_string()));
    }
}

impl OutputConfigMonitor for Shipper {
    fn destination(&self) -> String {
        self.sink.0.clone()
    }

    fn output_type(&self) -> String {
        self.sink.1.clone()
    }

    fn on_output_config_changed(
        &self,
        properties: OutputSinkProperties,
    ) {
        let _ = self.tx.send(Callback::Output(self.sink.1.clone(), properties));
    }
}

use std::time::Duration;

use tokio::time::sleep;

use crate::BackoffPolicy;
use crate::ConfigStore;
use crate::ConnectionConfig;
use crate::MemoryCoordinationService;
use crate::Role;
use crate::StoreConfig;

pub const TEST_ENDPOINT: &str = "memory:2181";

pub fn fast_retry() -> BackoffPolicy {
    BackoffPolicy {
        max_retries: 2,
        timeout_ms: 500,
        base_delay_ms: 10,
        max_delay_ms: 40,
    }
}

pub fn store_config(cluster: &str) -> StoreConfig {
    let mut config = StoreConfig {
        connection: ConnectionConfig {
            endpoint: TEST_ENDPOINT.to_string(),
            ..ConnectionConfig::default()
        },
        retry: fast_retry(),
        ..StoreConfig::default()
    };
    config.cluster.name = cluster.to_string();
    config
}

pub async fn open_store(
    service: &MemoryCoordinationService,
    role: Role,
    cluster: &str,
) -> ConfigStore {
    ConfigStore::open(service, &store_config(cluster), role)
        .await
        .expect("store should open")
}

/// Polls `condition` until it holds, yielding to the mirror tasks in between
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

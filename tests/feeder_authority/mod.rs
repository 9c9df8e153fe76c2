use std::time::Duration;

use logsearch_config::LogLevelFilter;
use logsearch_config::LogLevelFilterMap;
use logsearch_config::MemoryCoordinationService;
use serde_json::json;
use tokio::time::sleep;

use crate::common::authority;
use crate::common::eventually;
use crate::common::feeder;
use crate::common::Callback;
use crate::common::Shipper;

const SHIPPER_CONFIG: &str = r#"{"global":{"source":"file","tail":"true","add_fields":{"cluster":"cl1"}}}"#;
const HDFS_INPUT: &str = r#"{"input":[{"type":"hdfs_namenode","rowtype":"service","path":"/var/log/hadoop/hdfs/*.log"}],"filter":[{"filter":"grok","conditions":{"fields":{"type":["hdfs_namenode"]}}}]}"#;

fn levels(levels: &[&str]) -> LogLevelFilter {
    LogLevelFilter {
        label: Some("NameNode".to_string()),
        hosts: vec!["c6401.ambari.apache.org".to_string()],
        default_levels: levels.iter().map(|l| l.to_string()).collect(),
        ..LogLevelFilter::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_feeder_started_first_waits_for_authority() {
    let service = MemoryCoordinationService::new();
    let pending = tokio::spawn({
        let service = service.clone();
        async move { feeder(&service, "cl1").await }
    });

    sleep(Duration::from_secs(25)).await;
    assert!(!pending.is_finished());

    let authority = authority(&service).await;
    let feeder = pending.await.unwrap();

    feeder.create_input_config("cl1", "hdfs", HDFS_INPUT).await.unwrap();
    eventually("authority sees the feeder's upload", || {
        authority.input_config_exists("cl1", "hdfs").unwrap()
    })
    .await;
}

#[tokio::test]
async fn test_authority_edits_reach_the_feeder() {
    let service = MemoryCoordinationService::new();
    let authority = authority(&service).await;
    let feeder = feeder(&service, "cl1").await;
    let (shipper, mut callbacks) = Shipper::new(&[SHIPPER_CONFIG], "solr", "service");

    feeder.create_input_config("cl1", "hdfs", HDFS_INPUT).await.unwrap();
    feeder
        .monitor_input_config_changes(shipper.clone(), shipper.clone(), "cl1")
        .await
        .unwrap();

    // Upload seen by the shipper with the cluster's templates applied
    match callbacks.next().await {
        Callback::Loaded(service, config) => {
            assert_eq!(service, "hdfs");
            assert_eq!(config.input[0]["source"], json!("file"));
            assert_eq!(config.input[0]["add_fields"], json!({"cluster": "cl1"}));
            assert_eq!(config.filter[0]["tail"], json!("true"));
        }
        other => panic!("unexpected callback: {other:?}"),
    }

    // The authority reads the raw document and the published templates
    eventually("authority mirrors cl1", || {
        authority.get_global_config("cl1").unwrap().is_some()
            && authority.input_config_exists("cl1", "hdfs").unwrap()
    })
    .await;
    assert_eq!(
        authority.get_service_names("cl1").unwrap().into_iter().collect::<Vec<_>>(),
        vec!["hdfs"]
    );

    // Replacement by the authority restarts the service's inputs
    let edited = HDFS_INPUT.replace("service", "audit");
    authority.set_input_config("cl1", "hdfs", &edited).await.unwrap();
    assert_eq!(callbacks.next().await, Callback::Removed("hdfs".to_string()));
    match callbacks.next().await {
        Callback::Loaded(service, config) => {
            assert_eq!(service, "hdfs");
            assert_eq!(config.input[0]["rowtype"], json!("audit"));
        }
        other => panic!("unexpected callback: {other:?}"),
    }

    // Log level filters, only changed entries are written
    let mut filters = LogLevelFilterMap::new();
    filters.insert("hdfs_namenode", levels(&["FATAL", "ERROR"]));
    authority.set_log_level_filters("cl1", &filters).await.unwrap();
    assert_eq!(
        callbacks.next().await,
        Callback::FilterChanged("hdfs_namenode".to_string(), levels(&["FATAL", "ERROR"]))
    );
    eventually("authority mirrors the filter", || {
        authority.get_log_level_filters("cl1").unwrap() == filters
    })
    .await;
    let writes = service.write_count();
    authority.set_log_level_filters("cl1", &filters).await.unwrap();
    assert_eq!(service.write_count(), writes);
    callbacks.assert_quiet().await;

    // Operator removes the service's node by hand
    service.delete("/logsearch/cl1/input/hdfs").unwrap();
    assert_eq!(callbacks.next().await, Callback::Removed("hdfs".to_string()));
    callbacks.assert_quiet().await;
}

#[tokio::test]
async fn test_concurrent_feeders_upload_once() {
    let service = MemoryCoordinationService::new();
    let _authority = authority(&service).await;
    let first = feeder(&service, "cl1").await;
    let second = feeder(&service, "cl1").await;
    let writes = service.write_count();

    let (a, b) = tokio::join!(
        first.create_input_config("cl1", "hdfs", HDFS_INPUT),
        second.create_input_config("cl1", "hdfs", r#"{"input":[]}"#),
    );

    assert!(a.is_ok() && b.is_ok());
    assert_eq!(service.write_count(), writes + 1);
    assert_eq!(service.version("/logsearch/cl1/input/hdfs"), Some(0));
}

#[tokio::test]
async fn test_feeders_only_see_their_cluster() {
    let service = MemoryCoordinationService::new();
    let authority = authority(&service).await;
    let cl1 = feeder(&service, "cl1").await;
    let cl2 = feeder(&service, "cl2").await;
    let (shipper, mut callbacks) = Shipper::new(&[], "solr", "service");
    cl2.monitor_input_config_changes(shipper.clone(), shipper, "cl2")
        .await
        .unwrap();

    cl1.create_input_config("cl1", "hdfs", HDFS_INPUT).await.unwrap();
    authority
        .create_log_level_filter("cl1", "hdfs_namenode", &levels(&["INFO"]))
        .await
        .unwrap();

    callbacks.assert_quiet().await;
    assert!(cl2.get_service_names("cl2").unwrap().is_empty());
    assert!(cl2.input_config_exists("cl1", "hdfs").is_err());
}

#[tokio::test]
async fn test_malformed_edit_is_dropped_until_fixed() {
    let service = MemoryCoordinationService::new();
    let authority = authority(&service).await;
    let feeder = feeder(&service, "cl1").await;
    let (shipper, mut callbacks) = Shipper::new(&[], "solr", "service");

    feeder.create_input_config("cl1", "hdfs", HDFS_INPUT).await.unwrap();
    feeder
        .monitor_input_config_changes(shipper.clone(), shipper, "cl1")
        .await
        .unwrap();
    assert!(matches!(callbacks.next().await, Callback::Loaded(..)));

    // Running inputs are kept while the stored document is broken
    authority.set_input_config("cl1", "hdfs", "{broken").await.unwrap();
    callbacks.assert_quiet().await;

    authority.set_input_config("cl1", "hdfs", HDFS_INPUT).await.unwrap();
    assert_eq!(callbacks.next().await, Callback::Removed("hdfs".to_string()));
    assert!(matches!(callbacks.next().await, Callback::Loaded(service, _) if service == "hdfs"));
}

#[tokio::test]
async fn test_each_feeder_merges_its_own_templates() {
    let service = MemoryCoordinationService::new();
    let _authority = authority(&service).await;
    let first = feeder(&service, "cl1").await;
    let second = feeder(&service, "cl1").await;
    let (first_shipper, mut first_callbacks) =
        Shipper::new(&[r#"{"global":{"source":"A"}}"#], "solr", "service");
    let (second_shipper, mut second_callbacks) =
        Shipper::new(&[r#"{"global":{"source":"B","only_b":1}}"#], "solr", "service");

    first
        .monitor_input_config_changes(first_shipper.clone(), first_shipper, "cl1")
        .await
        .unwrap();
    // Overwrites the cluster's published templates
    second
        .monitor_input_config_changes(second_shipper.clone(), second_shipper, "cl1")
        .await
        .unwrap();

    first
        .create_input_config("cl1", "yarn", r#"{"input":[{"type":"yarn"}]}"#)
        .await
        .unwrap();

    match first_callbacks.next().await {
        Callback::Loaded(service, config) => {
            assert_eq!(service, "yarn");
            assert_eq!(config.input[0]["source"], json!("A"));
            assert!(config.input[0].get("only_b").is_none());
        }
        other => panic!("unexpected callback: {other:?}"),
    }
    match second_callbacks.next().await {
        Callback::Loaded(_, config) => {
            assert_eq!(config.input[0]["source"], json!("B"));
            assert_eq!(config.input[0]["only_b"], json!(1));
        }
        other => panic!("unexpected callback: {other:?}"),
    }
}

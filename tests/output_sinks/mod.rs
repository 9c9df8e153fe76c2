use std::sync::Arc;

use logsearch_config::MemoryCoordinationService;
use logsearch_config::OutputConfigMonitor;
use logsearch_config::OutputSinkProperties;

use crate::common::authority;
use crate::common::eventually;
use crate::common::feeder;
use crate::common::Callback;
use crate::common::Shipper;

#[tokio::test]
async fn test_sink_properties_flow_from_authority_to_feeder() {
    let service = MemoryCoordinationService::new();
    let authority = authority(&service).await;
    let feeder = feeder(&service, "cl1").await;
    let (service_sink, mut service_callbacks) = Shipper::new(&[], "solr", "service");
    let (audit_sink, mut audit_callbacks) = Shipper::new(&[], "solr", "audit");
    let sinks: Vec<Arc<dyn OutputConfigMonitor>> = vec![service_sink, audit_sink];
    feeder.monitor_output_properties(sinks).unwrap();

    let initial = OutputSinkProperties::new("hadoop_logs", "15");
    authority
        .save_output_sink_properties("service", &initial)
        .await
        .unwrap();
    eventually("feeder mirrors the sink", || {
        feeder.get_output_sink_properties("service").unwrap() == Some(initial.clone())
    })
    .await;
    // Creation is read on demand, not pushed
    service_callbacks.assert_quiet().await;

    let resized = OutputSinkProperties::new("hadoop_logs", "60");
    authority
        .save_output_sink_properties("service", &resized)
        .await
        .unwrap();

    assert_eq!(
        service_callbacks.next().await,
        Callback::Output("service".to_string(), resized)
    );
    audit_callbacks.assert_quiet().await;
}

#[tokio::test]
async fn test_sink_properties_for_other_destinations_are_separate() {
    let service = MemoryCoordinationService::new();
    let authority = authority(&service).await;

    authority
        .save_output_sink_properties_for("kafka", "service", &OutputSinkProperties::new("logs", "none"))
        .await
        .unwrap();

    assert!(service.data("/logsearch/output/kafka/service").is_some());
    assert!(service.data("/logsearch/output/solr/service").is_none());
    eventually("authority mirrors the sink", || {
        authority
            .get_output_sink_properties_for("kafka", "service")
            .unwrap()
            .is_some()
    })
    .await;
    assert_eq!(authority.get_output_sink_properties("service").unwrap(), None);
}

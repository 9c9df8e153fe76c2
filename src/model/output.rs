use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

/// Properties of one output sink, e.g. the collection a sink writes to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSinkProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,

    /// Interval, in minutes, after which the sink rolls to a new shard
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_interval_mins: Option<String>,

    /// Sink specific properties this crate does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OutputSinkProperties {
    pub fn new(
        collection: impl Into<String>,
        split_interval_mins: impl Into<String>,
    ) -> Self {
        Self {
            collection: Some(collection.into()),
            split_interval_mins: Some(split_interval_mins.into()),
            extra: Map::new(),
        }
    }
}

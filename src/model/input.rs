use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

/// Ingestion pipeline definition of one service
///
/// `input` and `filter` hold descriptor objects; any other top level member
/// is kept as-is in `other`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default)]
    pub input: Vec<Map<String, Value>>,

    #[serde(default)]
    pub filter: Vec<Map<String, Value>>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}


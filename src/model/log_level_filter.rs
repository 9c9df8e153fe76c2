use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Deserialize;
use serde::Serialize;

/// Per-log level filter, as edited by operators
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogLevelFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Hosts the override levels apply to
    #[serde(default)]
    pub hosts: Vec<String>,

    #[serde(default)]
    pub default_levels: Vec<String>,

    #[serde(default)]
    pub override_levels: Vec<String>,

    /// Until when the override levels apply, in local time
    #[serde(default, with = "expiry_format", skip_serializing_if = "Option::is_none")]
    pub expiry_time: Option<NaiveDateTime>,
}

/// Filters of one cluster keyed by log id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLevelFilterMap {
    #[serde(default)]
    pub filter: BTreeMap<String, LogLevelFilter>,
}

impl LogLevelFilterMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        log_id: impl Into<String>,
        filter: LogLevelFilter,
    ) -> Option<LogLevelFilter> {
        self.filter.insert(log_id.into(), filter)
    }

    pub fn get(
        &self,
        log_id: &str,
    ) -> Option<&LogLevelFilter> {
        self.filter.get(log_id)
    }

    pub fn len(&self) -> usize {
        self.filter.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filter.is_empty()
    }
}

/// `yyyy-MM-ddTHH:mm:ss.SSS`
mod expiry_format {
    use chrono::NaiveDateTime;
    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;

    use crate::constants::DATE_FORMAT;

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDateTime>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(time) => s.serialize_str(&time.format(DATE_FORMAT).to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDateTime>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|raw| NaiveDateTime::parse_from_str(&raw, DATE_FORMAT))
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}

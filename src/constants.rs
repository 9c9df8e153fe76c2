// -
// Tree layout

/// Root node every path is relative to when no root is configured
pub const DEFAULT_ROOT: &str = "/logsearch";

/// Authority-managed sink configuration subtree
pub const OUTPUT_NODE: &str = "output";

/// Per-cluster node names
pub(crate) const GLOBAL_NODE: &str = "global";
pub(crate) const INPUT_NODE: &str = "input";
pub(crate) const LOG_LEVEL_FILTER_NODE: &str = "loglevelfilter";

/// Destination used by the sink property shortcuts
pub const DEFAULT_OUTPUT_DESTINATION: &str = "solr";

// -
// Session defaults (milliseconds)

pub(crate) const DEFAULT_SESSION_TIMEOUT_MS: u64 = 15_000;
pub(crate) const DEFAULT_CONNECTION_TIMEOUT_MS: u64 = 30_000;
pub(crate) const DEFAULT_WAIT_FOR_ROOT_INTERVAL_MS: u64 = 10_000;

// -
// Legacy property keys

pub const ZK_CONNECT_STRING_PROPERTY: &str = "logsearch.config.zk_connect_string";
pub const ZK_ACLS_PROPERTY: &str = "logsearch.config.zk_acls";
pub const ZK_ROOT_NODE_PROPERTY: &str = "logsearch.config.zk_root";

/// Timestamp layout of `expiryTime` in log level filter documents
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// API path prefix
pub const API_PREFIX: &str = "/v1";

/// Prepared query collection path, relative to the API prefix
pub const QUERY_PATH: &str = "/query";

/// Path suffixes for per-query actions
pub const EXECUTE_SUFFIX: &str = "execute";
pub const EXPLAIN_SUFFIX: &str = "explain";

/// Request headers
pub const HEADER_TOKEN: &str = "X-Consul-Token";

/// Response headers carrying blocking-query metadata
pub const HEADER_INDEX: &str = "X-Consul-Index";
pub const HEADER_LAST_CONTACT: &str = "X-Consul-LastContact";
pub const HEADER_KNOWN_LEADER: &str = "X-Consul-KnownLeader";

/// Query-string parameter names shared by read and write requests
pub const PARAM_DATACENTER: &str = "dc";
pub const PARAM_CONSISTENT: &str = "consistent";
pub const PARAM_STALE: &str = "stale";
pub const PARAM_INDEX: &str = "index";
pub const PARAM_WAIT: &str = "wait";
pub const PARAM_NEAR: &str = "near";

/// How long the server holds a blocking read that names an index but no wait
pub const DEFAULT_BLOCKING_WAIT_SECS: u64 = 300;

/// Template type understood by the server for name-prefix matching
pub const TEMPLATE_NAME_PREFIX_MATCH: &str = "name_prefix_match";

//! Prepared query definitions and execution results.
//!
//! Every optional field is an `Option` (or an empty collection) that is
//! skipped on the wire when unset. The server echoes unset strings back as
//! `""`, so those decode to `None` again.

use std::collections::HashMap;
use std::time::Duration;
use serde::{Deserialize, Deserializer, Serialize};
use crate::duration;
use crate::types::ServiceEntry;

/// How to pick remote datacenters when the local one has no healthy nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryFailoverOptions {
    /// Try this many of the nearest datacenters by round-trip time
    #[serde(default)]
    pub nearest_n: u32,

    /// Fixed list of datacenters to try, in order, after the nearest ones.
    /// Always sent, as `[]` when empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub datacenters: Vec<String>,
}

/// Serving hints used when results are exposed over DNS.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryDnsOptions {
    #[serde(
        rename = "TTL",
        default,
        with = "duration::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub ttl: Option<Duration>,
}

/// Criteria selecting healthy instances of a service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceQuery {
    /// Service name; may be left unset for templates that fill it in
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,

    /// Sort results by round-trip time from this node ("_agent" for the
    /// serving agent)
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub near: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failover: Option<QueryFailoverOptions>,

    /// Check IDs whose failure should not exclude a node
    #[serde(
        rename = "IgnoreCheckIDs",
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub ignore_check_ids: Vec<String>,

    /// Exclude instances whose checks are in the warning state
    #[serde(default)]
    pub only_passing: bool,

    /// Required tags; a leading `!` means the tag must be absent.
    /// Passed through verbatim and in order.
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "HashMap::is_empty")]
    pub node_meta: HashMap<String, String>,

    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "HashMap::is_empty")]
    pub service_meta: HashMap<String, String>,

    /// Resolve to mesh-capable endpoints instead of plain instances
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub connect: bool,
}

/// Turns a query into a template matched against names by prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryTemplate {
    /// Only "name_prefix_match" is defined by the server
    #[serde(rename = "Type")]
    pub template_type: String,

    /// Applied to the requested name; capture groups become `${match(N)}`
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub regexp: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub remove_empty_tags: bool,
}

impl QueryTemplate {
    pub fn name_prefix_match() -> Self {
        Self {
            template_type: crate::protocol::TEMPLATE_NAME_PREFIX_MATCH.to_string(),
            regexp: None,
            remove_empty_tags: false,
        }
    }
}

/// A complete stored query.
///
/// Ownership is enforced server-side: only the token recorded at creation,
/// or a management token, may update or delete it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PreparedQueryDefinition {
    /// Assigned by the server on create; immutable afterwards
    #[serde(rename = "ID", default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Friendly name usable in place of the ID. Named queries can be
    /// discovered by anyone able to guess the name.
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Session whose invalidation deletes this query
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,

    /// ACL token captured at creation and used when the query executes
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default)]
    pub service: ServiceQuery,

    #[serde(rename = "DNS", default)]
    pub dns: QueryDnsOptions,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<QueryTemplate>,
}

impl PreparedQueryDefinition {
    /// Minimal definition selecting instances of `service`
    pub fn for_service(service: impl Into<String>) -> Self {
        Self {
            service: ServiceQuery {
                service: Some(service.into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Body returned by a create request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateResponse {
    #[serde(rename = "ID")]
    pub id: String,
}

/// Outcome of executing a query. Never sent to the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PreparedQueryExecuteResponse {
    /// Name of the service that was queried
    #[serde(default)]
    pub service: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub nodes: Vec<ServiceEntry>,

    #[serde(rename = "DNS", default)]
    pub dns: QueryDnsOptions,

    /// Datacenter that answered
    #[serde(default)]
    pub datacenter: String,

    /// Remote datacenters tried before an answer; 0 means local
    #[serde(default)]
    pub failovers: u32,
}

/// Rendered form of a (possibly templated) query for a given name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PreparedQueryExplainResponse {
    pub query: PreparedQueryDefinition,
}

fn non_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_unset_fields_are_omitted() {
        let def = PreparedQueryDefinition::default();
        let value = serde_json::to_value(&def).unwrap();

        assert_eq!(value, json!({"Service": {"OnlyPassing": false}, "DNS": {}}));
    }

    #[test]
    fn test_empty_datacenters_serialized_but_absent_failover_omitted() {
        let mut def = PreparedQueryDefinition::for_service("web");
        let value = serde_json::to_value(&def).unwrap();
        assert!(value["Service"].get("Failover").is_none(), "unset failover must be omitted");

        def.service.failover = Some(QueryFailoverOptions::default());
        let value = serde_json::to_value(&def).unwrap();
        assert_eq!(value["Service"]["Failover"], json!({"NearestN": 0, "Datacenters": []}));
    }

    #[test]
    fn test_server_echo_keeps_unset_fields_absent() {
        // shape the server returns for a definition created with nothing but a service
        let echo = json!({
            "ID": "8f246b77-f3e1-ff88-5b48-8ec93abf3e05",
            "Name": "",
            "Session": "",
            "Token": "",
            "Template": null,
            "Service": {
                "Service": "web",
                "Failover": {"NearestN": 0, "Datacenters": null},
                "OnlyPassing": false,
                "IgnoreCheckIDs": null,
                "Near": "",
                "Tags": null,
                "NodeMeta": null,
                "ServiceMeta": null,
                "Connect": false
            },
            "DNS": {"TTL": ""},
            "CreateIndex": 23,
            "ModifyIndex": 23
        });

        let def: PreparedQueryDefinition = serde_json::from_value(echo).unwrap();
        assert_eq!(def.id.as_deref(), Some("8f246b77-f3e1-ff88-5b48-8ec93abf3e05"));
        assert_eq!(def.name, None);
        assert_eq!(def.session, None);
        assert_eq!(def.token, None);
        assert_eq!(def.template, None);
        assert_eq!(def.service.near, None);
        assert!(def.service.tags.is_empty());
        assert_eq!(def.dns.ttl, None);
        assert_eq!(def.service.failover, Some(QueryFailoverOptions::default()));
    }

    #[test]
    fn test_definition_survives_encoding() {
        let mut def = PreparedQueryDefinition::for_service("db");
        def.name = Some("db-primary".to_string());
        def.service.only_passing = true;
        def.service.tags = vec!["primary".to_string(), "!legacy".to_string()];
        def.service.failover = Some(QueryFailoverOptions {
            nearest_n: 2,
            datacenters: vec!["dc2".to_string(), "dc3".to_string()],
        });
        def.dns.ttl = Some(Duration::from_secs(10));

        let encoded = serde_json::to_string(&def).unwrap();
        let decoded: PreparedQueryDefinition = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, def);
    }

    #[test]
    fn test_tags_passed_through_in_order() {
        let mut def = PreparedQueryDefinition::for_service("web");
        def.service.tags = vec!["v2".to_string(), "!canary".to_string()];

        let value = serde_json::to_value(&def).unwrap();
        assert_eq!(value["Service"]["Tags"], json!(["v2", "!canary"]));
    }

    #[test]
    fn test_ttl_encoded_as_duration_string() {
        let mut def = PreparedQueryDefinition::default();
        def.dns.ttl = Some(Duration::from_secs(10));
        let value = serde_json::to_value(&def).unwrap();
        assert_eq!(value["DNS"], json!({"TTL": "10s"}));

        let from_nanos: QueryDnsOptions = serde_json::from_value(json!({"TTL": 10_000_000_000u64})).unwrap();
        assert_eq!(from_nanos.ttl, Some(Duration::from_secs(10)));

        let bad: Result<QueryDnsOptions, _> = serde_json::from_value(json!({"TTL": "ten seconds"}));
        assert!(bad.is_err());
    }

    #[test]
    fn test_template_wire_shape() {
        let mut def = PreparedQueryDefinition::default();
        def.name = Some("geo-".to_string());
        def.template = Some(QueryTemplate {
            regexp: Some("^geo-(.+)$".to_string()),
            ..QueryTemplate::name_prefix_match()
        });

        let value = serde_json::to_value(&def).unwrap();
        assert_eq!(value["Template"], json!({"Type": "name_prefix_match", "Regexp": "^geo-(.+)$"}));
    }

    #[test]
    fn test_decode_execute_response() {
        let body = json!({
            "Service": "web",
            "Nodes": [{
                "Node": {"ID": "n1", "Node": "web-01", "Address": "10.0.0.5", "Datacenter": "dc1"},
                "Service": {"ID": "web-1", "Service": "web", "Tags": ["primary"], "Port": 8080},
                "Checks": []
            }],
            "DNS": {"TTL": "10s"},
            "Datacenter": "dc1",
            "Failovers": 0
        });

        let result: PreparedQueryExecuteResponse = serde_json::from_value(body).unwrap();
        assert_eq!(result.service, "web");
        assert_eq!(result.nodes.len(), 1);
        assert_eq!(result.dns.ttl, Some(Duration::from_secs(10)));
        assert_eq!(result.failovers, 0);

        let empty: Value = json!({"Service": "web", "Nodes": null, "DNS": {}, "Datacenter": "dc2", "Failovers": 1});
        let result: PreparedQueryExecuteResponse = serde_json::from_value(empty).unwrap();
        assert!(result.nodes.is_empty());
        assert_eq!(result.failovers, 1);
    }
}

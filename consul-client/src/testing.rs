//! In-memory stand-in for the server's prepared query routes. It stores
//! definitions, enforces creator-token ownership and answers execute with
//! whatever instances were registered for the service. No health filtering,
//! tag matching or failover is attempted.

use std::collections::BTreeMap;
use std::sync::Mutex;
use async_trait::async_trait;
use serde::Serialize;
use shared::protocol::{
    EXECUTE_SUFFIX, EXPLAIN_SUFFIX, HEADER_INDEX, HEADER_KNOWN_LEADER, HEADER_LAST_CONTACT,
    HEADER_TOKEN, PARAM_DATACENTER, QUERY_PATH,
};
use shared::query::{
    CreateResponse, PreparedQueryDefinition, PreparedQueryExecuteResponse,
    PreparedQueryExplainResponse,
};
use shared::types::ServiceEntry;
use crate::error::Result;
use crate::transport::{ApiRequest, ApiResponse, HttpExecutor, Method};

const LOCAL_DATACENTER: &str = "dc1";
const MANAGEMENT_TOKEN: &str = "root";

#[derive(Default)]
struct State {
    queries: BTreeMap<String, StoredQuery>,
    instances: Vec<ServiceEntry>,
    requests: Vec<ApiRequest>,
    next_id: u64,
    index: u64,
}

struct StoredQuery {
    definition: PreparedQueryDefinition,
    owner: Option<String>,
}

#[derive(Default)]
pub(crate) struct FakeServer {
    state: Mutex<State>,
}

impl FakeServer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Make an instance visible to execute
    pub(crate) fn register(&self, entry: ServiceEntry) {
        self.state.lock().unwrap().instances.push(entry);
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub(crate) fn last_request(&self) -> Option<ApiRequest> {
        self.state.lock().unwrap().requests.last().cloned()
    }
}

#[async_trait]
impl HttpExecutor for FakeServer {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(request.clone());
        Ok(state.route(&request))
    }
}

impl State {
    fn route(&mut self, request: &ApiRequest) -> ApiResponse {
        let Some(rest) = request.path.strip_prefix(QUERY_PATH) else {
            return text(404, "Unknown route");
        };
        let segments: Vec<String> = rest
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| urlencoding::decode(s).map(|d| d.into_owned()).unwrap_or_else(|_| s.to_string()))
            .collect();
        let token = request.header(HEADER_TOKEN).map(str::to_string);

        match (request.method, segments.as_slice()) {
            (Method::Post, []) => self.create(request, token),
            (Method::Get, []) => {
                let all: Vec<_> = self.queries.values().map(|q| q.definition.clone()).collect();
                self.json(&all)
            }
            (Method::Get, [id]) => match self.queries.get(id.as_str()) {
                Some(q) => {
                    let found = vec![q.definition.clone()];
                    self.json(&found)
                }
                None => text(404, "Query not found"),
            },
            (Method::Put, [id]) => self.update(id, request, token),
            (Method::Delete, [id]) => self.delete(id, token),
            (Method::Get, [name, action]) if action == EXECUTE_SUFFIX => self.run(name, request),
            (Method::Get, [name, action]) if action == EXPLAIN_SUFFIX => match self.resolve(name) {
                Some(query) => {
                    let body = PreparedQueryExplainResponse { query };
                    self.json(&body)
                }
                None => text(404, "Query not found"),
            },
            _ => text(405, "Method not allowed"),
        }
    }

    fn create(&mut self, request: &ApiRequest, token: Option<String>) -> ApiResponse {
        let mut definition = match decode(request) {
            Ok(d) => d,
            Err(resp) => return resp,
        };
        if definition.id.is_some() {
            return text(400, "ID must be empty");
        }
        if definition.service.service.is_none() {
            return text(400, "Must provide a Service name to query");
        }

        self.next_id += 1;
        let id = format!("{:08x}-0000-4000-8000-{:012x}", self.next_id, self.next_id);
        definition.id = Some(id.clone());
        self.queries.insert(id.clone(), StoredQuery { definition, owner: token });
        self.index += 1;
        self.json(&CreateResponse { id })
    }

    fn update(&mut self, id: &str, request: &ApiRequest, token: Option<String>) -> ApiResponse {
        let mut definition = match decode(request) {
            Ok(d) => d,
            Err(resp) => return resp,
        };
        let Some(stored) = self.queries.get_mut(id) else {
            return text(404, "Query not found");
        };
        if !may_modify(stored, token.as_deref()) {
            return text(403, "Permission denied");
        }

        definition.id = Some(id.to_string());
        stored.definition = definition;
        self.index += 1;
        text(200, "")
    }

    fn delete(&mut self, id: &str, token: Option<String>) -> ApiResponse {
        if let Some(stored) = self.queries.get(id) {
            if !may_modify(stored, token.as_deref()) {
                return text(403, "Permission denied");
            }
            self.queries.remove(id);
            self.index += 1;
        }
        text(200, "")
    }

    fn run(&self, id_or_name: &str, request: &ApiRequest) -> ApiResponse {
        let Some(query) = self.resolve(id_or_name) else {
            return text(404, "Query not found");
        };
        let service = query.service.service.clone().unwrap_or_default();
        let nodes = self
            .instances
            .iter()
            .filter(|e| e.service.service == service)
            .cloned()
            .collect();

        let body = PreparedQueryExecuteResponse {
            service,
            nodes,
            dns: query.dns.clone(),
            datacenter: request.param(PARAM_DATACENTER).unwrap_or(LOCAL_DATACENTER).to_string(),
            failovers: 0,
        };
        self.json(&body)
    }

    /// ID first, then exact name, then the longest template name prefix
    fn resolve(&self, id_or_name: &str) -> Option<PreparedQueryDefinition> {
        if let Some(q) = self.queries.get(id_or_name) {
            return Some(q.definition.clone());
        }
        let by_name = self
            .queries
            .values()
            .find(|q| q.definition.name.as_deref() == Some(id_or_name));
        let by_template = || {
            self.queries
                .values()
                .filter(|q| q.definition.template.is_some())
                .filter(|q| q.definition.name.as_deref().is_some_and(|n| id_or_name.starts_with(n)))
                .max_by_key(|q| q.definition.name.as_ref().map(String::len))
        };
        by_name.or_else(by_template).map(|q| q.definition.clone())
    }

    fn json<T: Serialize>(&self, body: &T) -> ApiResponse {
        ApiResponse {
            status: 200,
            headers: vec![
                (HEADER_INDEX.to_string(), self.index.max(1).to_string()),
                (HEADER_LAST_CONTACT.to_string(), "0".to_string()),
                (HEADER_KNOWN_LEADER.to_string(), "true".to_string()),
            ],
            body: serde_json::to_vec(body).unwrap(),
        }
    }
}

fn may_modify(stored: &StoredQuery, token: Option<&str>) -> bool {
    match (&stored.owner, token) {
        (None, _) => true,
        (Some(_), Some(MANAGEMENT_TOKEN)) => true,
        (Some(owner), Some(token)) => owner == token,
        (Some(_), None) => false,
    }
}

fn decode(request: &ApiRequest) -> std::result::Result<PreparedQueryDefinition, ApiResponse> {
    let body = request.body.as_deref().unwrap_or_default();
    serde_json::from_slice(body).map_err(|e| text(400, &format!("Request decode failed: {}", e)))
}

fn text(status: u16, message: &str) -> ApiResponse {
    ApiResponse {
        status,
        headers: Vec::new(),
        body: message.as_bytes().to_vec(),
    }
}

//! Per-call read/write options and the metadata wrapped around responses.
//!
//! Options are forwarded to the transport untouched; nothing here
//! interprets consistency modes or blocking semantics.

use std::time::Duration;
use shared::duration;
use shared::protocol::{
    HEADER_INDEX, HEADER_KNOWN_LEADER, HEADER_LAST_CONTACT, PARAM_CONSISTENT, PARAM_DATACENTER,
    PARAM_INDEX, PARAM_NEAR, PARAM_STALE, PARAM_WAIT,
};
use crate::error::{ClientError, Result};
use crate::transport::ApiResponse;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConsistencyMode {
    /// Leader answers, with a small window for stale reads on leadership change
    #[default]
    Default,
    /// Leader verifies it still holds leadership before answering
    Consistent,
    /// Any server may answer
    Stale,
}

/// Options for read requests (get, list, execute, explain)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub datacenter: Option<String>,
    pub consistency: ConsistencyMode,
    /// Block until the result index moves past this value
    pub wait_index: Option<u64>,
    /// Upper bound on how long a blocking query may wait
    pub wait_time: Option<Duration>,
    /// Sort results by distance from this node
    pub near: Option<String>,
    pub token: Option<String>,
}

/// Options for write requests (create, update, delete)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    pub datacenter: Option<String>,
    pub token: Option<String>,
}

impl QueryOptions {
    pub(crate) fn query_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(dc) = &self.datacenter {
            params.push((PARAM_DATACENTER.to_string(), dc.clone()));
        }
        match self.consistency {
            ConsistencyMode::Default => {}
            ConsistencyMode::Consistent => params.push((PARAM_CONSISTENT.to_string(), String::new())),
            ConsistencyMode::Stale => params.push((PARAM_STALE.to_string(), String::new())),
        }
        if let Some(index) = self.wait_index {
            params.push((PARAM_INDEX.to_string(), index.to_string()));
        }
        if let Some(wait) = self.wait_time {
            params.push((PARAM_WAIT.to_string(), duration::format(wait)));
        }
        if let Some(near) = &self.near {
            params.push((PARAM_NEAR.to_string(), near.clone()));
        }
        params
    }
}

impl WriteOptions {
    pub(crate) fn query_params(&self) -> Vec<(String, String)> {
        self.datacenter
            .iter()
            .map(|dc| (PARAM_DATACENTER.to_string(), dc.clone()))
            .collect()
    }
}

/// Metadata returned with every read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryMeta {
    /// Pass back as `wait_index` to block for changes
    pub last_index: u64,
    /// Time since the answering server last heard from the leader
    pub last_contact: Duration,
    pub known_leader: bool,
    /// Wall-clock time of the round trip, measured locally
    pub request_time: Duration,
}

/// Metadata returned with every write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteMeta {
    pub request_time: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<T> {
    pub meta: QueryMeta,
    pub response: T,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WriteResult<T> {
    pub meta: WriteMeta,
    pub response: T,
}

impl QueryMeta {
    pub(crate) fn from_response(response: &ApiResponse, request_time: Duration) -> Result<Self> {
        let last_index = match response.header(HEADER_INDEX) {
            Some(v) => v.parse().map_err(|_| invalid_header(HEADER_INDEX, v))?,
            None => 0,
        };
        let last_contact = match response.header(HEADER_LAST_CONTACT) {
            Some(v) => Duration::from_millis(v.parse().map_err(|_| invalid_header(HEADER_LAST_CONTACT, v))?),
            None => Duration::ZERO,
        };
        let known_leader = match response.header(HEADER_KNOWN_LEADER) {
            Some("true") => true,
            Some("false") | None => false,
            Some(v) => return Err(invalid_header(HEADER_KNOWN_LEADER, v)),
        };

        Ok(Self { last_index, last_contact, known_leader, request_time })
    }
}

fn invalid_header(name: &'static str, value: &str) -> ClientError {
    ClientError::InvalidHeader { name, value: value.to_string() }
}

//! Prepared query endpoint: stored queries that resolve to healthy service
//! instances on the server, with optional datacenter failover.
//!
//! Resolution happens entirely server-side. Each method here is a single
//! HTTP round trip; nothing is cached or retried.

use std::sync::Arc;
use shared::protocol::{EXECUTE_SUFFIX, EXPLAIN_SUFFIX, QUERY_PATH};
use shared::query::{
    CreateResponse, PreparedQueryDefinition, PreparedQueryExecuteResponse,
    PreparedQueryExplainResponse,
};
use crate::client::{encode, ClientInner};
use crate::error::{ClientError, Result};
use crate::options::{QueryOptions, QueryResult, WriteOptions, WriteResult};
use crate::transport::Method;

/// Obtained through [`crate::Client::prepared_query`]
pub struct PreparedQuery {
    client: Arc<ClientInner>,
}

impl PreparedQuery {
    pub(crate) fn new(client: Arc<ClientInner>) -> Self {
        Self { client }
    }

    /// Store a new query, returning its server-assigned ID
    pub async fn create(&self, query: &PreparedQueryDefinition) -> Result<WriteResult<String>> {
        self.create_with(query, &WriteOptions::default()).await
    }

    pub async fn create_with(
        &self,
        query: &PreparedQueryDefinition,
        opts: &WriteOptions,
    ) -> Result<WriteResult<String>> {
        // the server assigns the ID
        let body = PreparedQueryDefinition { id: None, ..query.clone() };
        let result: WriteResult<CreateResponse> = self
            .client
            .write(Method::Post, QUERY_PATH.to_string(), Some(encode(&body)?), opts)
            .await?;

        tracing::debug!("Created prepared query {}", result.response.id);
        Ok(WriteResult { meta: result.meta, response: result.response.id })
    }

    /// Replace an existing query wholesale. `query.id` must be set.
    pub async fn update(&self, query: &PreparedQueryDefinition) -> Result<WriteResult<()>> {
        self.update_with(query, &WriteOptions::default()).await
    }

    pub async fn update_with(
        &self,
        query: &PreparedQueryDefinition,
        opts: &WriteOptions,
    ) -> Result<WriteResult<()>> {
        let id = query.id.as_deref().unwrap_or_default();
        let path = query_path(id, None)?;
        self.client
            .write_no_content(Method::Put, path, Some(encode(query)?), opts)
            .await
    }

    /// Definitions matching `id`. At most one ever matches; an unknown ID
    /// yields an empty list rather than an error.
    pub async fn get(&self, id: &str) -> Result<QueryResult<Vec<PreparedQueryDefinition>>> {
        self.get_with(id, &QueryOptions::default()).await
    }

    pub async fn get_with(
        &self,
        id: &str,
        opts: &QueryOptions,
    ) -> Result<QueryResult<Vec<PreparedQueryDefinition>>> {
        let result = self
            .client
            .query_optional::<Vec<PreparedQueryDefinition>>(query_path(id, None)?, opts)
            .await?;

        Ok(QueryResult { meta: result.meta, response: result.response.unwrap_or_default() })
    }

    /// Every query the caller's token can see
    pub async fn list(&self) -> Result<QueryResult<Vec<PreparedQueryDefinition>>> {
        self.list_with(&QueryOptions::default()).await
    }

    pub async fn list_with(&self, opts: &QueryOptions) -> Result<QueryResult<Vec<PreparedQueryDefinition>>> {
        let result = self
            .client
            .query::<Option<Vec<PreparedQueryDefinition>>>(QUERY_PATH.to_string(), opts)
            .await?;

        Ok(QueryResult { meta: result.meta, response: result.response.unwrap_or_default() })
    }

    pub async fn delete(&self, id: &str) -> Result<WriteResult<()>> {
        self.delete_with(id, &WriteOptions::default()).await
    }

    pub async fn delete_with(&self, id: &str, opts: &WriteOptions) -> Result<WriteResult<()>> {
        self.client
            .write_no_content(Method::Delete, query_path(id, None)?, None, opts)
            .await
    }

    /// Run a stored query by ID or name
    pub async fn execute(&self, id_or_name: &str) -> Result<QueryResult<PreparedQueryExecuteResponse>> {
        self.execute_with(id_or_name, &QueryOptions::default()).await
    }

    pub async fn execute_with(
        &self,
        id_or_name: &str,
        opts: &QueryOptions,
    ) -> Result<QueryResult<PreparedQueryExecuteResponse>> {
        self.client
            .query(query_path(id_or_name, Some(EXECUTE_SUFFIX))?, opts)
            .await
    }

    /// The definition the server would run for `id_or_name`, with any
    /// template already rendered
    pub async fn explain(&self, id_or_name: &str) -> Result<QueryResult<PreparedQueryDefinition>> {
        self.explain_with(id_or_name, &QueryOptions::default()).await
    }

    pub async fn explain_with(
        &self,
        id_or_name: &str,
        opts: &QueryOptions,
    ) -> Result<QueryResult<PreparedQueryDefinition>> {
        let result = self
            .client
            .query::<PreparedQueryExplainResponse>(query_path(id_or_name, Some(EXPLAIN_SUFFIX))?, opts)
            .await?;

        Ok(QueryResult { meta: result.meta, response: result.response.query })
    }
}

/// "/query/{id}" or "/query/{id}/{action}". An empty ID would collapse to
/// the collection path, so it is refused before anything is sent.
fn query_path(id: &str, action: Option<&str>) -> Result<String> {
    if id.trim().is_empty() {
        return Err(ClientError::InvalidArgument(
            "prepared query ID or name must not be empty".to_string(),
        ));
    }

    let id = urlencoding::encode(id);
    Ok(match action {
        Some(action) => format!("{}/{}/{}", QUERY_PATH, id, action),
        None => format!("{}/{}", QUERY_PATH, id),
    })
}

use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared::protocol::{DEFAULT_BLOCKING_WAIT_SECS, HEADER_TOKEN};
use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::options::{QueryMeta, QueryOptions, QueryResult, WriteMeta, WriteOptions, WriteResult};
use crate::prepared_query::PreparedQuery;
use crate::transport::{ApiRequest, ApiResponse, HttpExecutor, Method, ReqwestExecutor};

/// Entry point to the HTTP API. Cheap to share behind an `Arc`; endpoint
/// handles are built on first use and reused afterwards.
pub struct Client {
    inner: Arc<ClientInner>,
    prepared_query: OnceLock<PreparedQuery>,
    #[cfg(test)]
    endpoint_builds: std::sync::atomic::AtomicUsize,
}

/// State every endpoint shares: configuration plus the executor
pub(crate) struct ClientInner {
    config: Config,
    executor: Arc<dyn HttpExecutor>,
}

impl Client {
    pub fn new(config: Config) -> Result<Self> {
        let executor = ReqwestExecutor::new(&config)?;
        Ok(Self::with_executor(config, Arc::new(executor)))
    }

    /// Build a client over any executor, e.g. a fake in tests
    pub fn with_executor(config: Config, executor: Arc<dyn HttpExecutor>) -> Self {
        Self {
            inner: Arc::new(ClientInner { config, executor }),
            prepared_query: OnceLock::new(),
            #[cfg(test)]
            endpoint_builds: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Prepared query endpoint, constructed once on first access
    pub fn prepared_query(&self) -> &PreparedQuery {
        self.prepared_query.get_or_init(|| {
            tracing::debug!("Constructing prepared query endpoint");
            #[cfg(test)]
            self.endpoint_builds.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            PreparedQuery::new(Arc::clone(&self.inner))
        })
    }
}

/// Serialize a request body up front so executors only see bytes
pub(crate) fn encode<B: Serialize>(body: &B) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(body)?)
}

impl ClientInner {
    fn read_request(&self, path: String, opts: &QueryOptions) -> ApiRequest {
        let mut opts = opts.clone();
        if opts.datacenter.is_none() {
            opts.datacenter = self.config.datacenter.clone();
        }

        let mut request = ApiRequest::new(Method::Get, path);
        request.params = opts.query_params();
        request.headers = self.token_header(opts.token.as_deref());
        request.timeout = blocking_wait(&opts).map(|wait| self.config.timeout() + wait);
        request
    }

    fn write_request(&self, method: Method, path: String, body: Option<Vec<u8>>, opts: &WriteOptions) -> ApiRequest {
        let mut opts = opts.clone();
        if opts.datacenter.is_none() {
            opts.datacenter = self.config.datacenter.clone();
        }

        let mut request = ApiRequest::new(method, path);
        request.params = opts.query_params();
        request.headers = self.token_header(opts.token.as_deref());
        request.body = body;
        request
    }

    fn token_header(&self, token: Option<&str>) -> Vec<(String, String)> {
        token
            .filter(|t| !t.is_empty())
            .or(self.config.token.as_deref())
            .filter(|t| !t.is_empty())
            .map(|t| vec![(HEADER_TOKEN.to_string(), t.to_string())])
            .unwrap_or_default()
    }

    async fn round_trip(&self, request: ApiRequest) -> Result<(ApiResponse, Duration)> {
        tracing::debug!(method = %request.method, path = %request.path, "Sending request");
        let started = Instant::now();
        let response = self.executor.execute(request).await?;
        Ok((response, started.elapsed()))
    }

    async fn fetch(&self, path: String, opts: &QueryOptions) -> Result<(String, ApiResponse, Duration)> {
        let request = self.read_request(path, opts);
        let path = request.path.clone();
        let (response, request_time) = self.round_trip(request).await?;
        Ok((path, response, request_time))
    }

    /// GET and decode the body
    pub(crate) async fn query<T: DeserializeOwned>(&self, path: String, opts: &QueryOptions) -> Result<QueryResult<T>> {
        let (path, response, request_time) = self.fetch(path, opts).await?;
        let response = check_status(&path, response)?;

        let meta = QueryMeta::from_response(&response, request_time)?;
        let decoded = serde_json::from_slice(&response.body)?;
        Ok(QueryResult { meta, response: decoded })
    }

    /// GET where a 404 means "nothing there" rather than a failure
    pub(crate) async fn query_optional<T: DeserializeOwned>(
        &self,
        path: String,
        opts: &QueryOptions,
    ) -> Result<QueryResult<Option<T>>> {
        let (path, response, request_time) = self.fetch(path, opts).await?;
        if response.status == 404 {
            tracing::debug!("{} not found", path);
            let meta = QueryMeta::from_response(&response, request_time)?;
            return Ok(QueryResult { meta, response: None });
        }

        let response = check_status(&path, response)?;
        let meta = QueryMeta::from_response(&response, request_time)?;
        let decoded = serde_json::from_slice(&response.body)?;
        Ok(QueryResult { meta, response: Some(decoded) })
    }

    /// Write expecting a JSON body back
    pub(crate) async fn write<T: DeserializeOwned>(
        &self,
        method: Method,
        path: String,
        body: Option<Vec<u8>>,
        opts: &WriteOptions,
    ) -> Result<WriteResult<T>> {
        let request = self.write_request(method, path, body, opts);
        let path = request.path.clone();
        let (response, request_time) = self.round_trip(request).await?;
        let response = check_status(&path, response)?;

        let decoded = serde_json::from_slice(&response.body)?;
        Ok(WriteResult { meta: WriteMeta { request_time }, response: decoded })
    }

    /// Write whose response body, if any, carries nothing of interest
    pub(crate) async fn write_no_content(
        &self,
        method: Method,
        path: String,
        body: Option<Vec<u8>>,
        opts: &WriteOptions,
    ) -> Result<WriteResult<()>> {
        let request = self.write_request(method, path, body, opts);
        let path = request.path.clone();
        let (response, request_time) = self.round_trip(request).await?;
        check_status(&path, response)?;

        Ok(WriteResult { meta: WriteMeta { request_time }, response: () })
    }
}

/// How long the server may hold this read. An index without an explicit
/// wait is held for the server's default.
fn blocking_wait(opts: &QueryOptions) -> Option<Duration> {
    match (opts.wait_index, opts.wait_time) {
        (_, Some(wait)) => Some(wait),
        (Some(_), None) => Some(Duration::from_secs(DEFAULT_BLOCKING_WAIT_SECS)),
        (None, None) => None,
    }
}

fn check_status(path: &str, response: ApiResponse) -> Result<ApiResponse> {
    if response.is_success() {
        return Ok(response);
    }

    let message = String::from_utf8_lossy(&response.body).trim().to_string();
    tracing::warn!(status = response.status, "Request to {} failed: {}", path, message);
    Err(ClientError::Request { status: response.status, message })
}

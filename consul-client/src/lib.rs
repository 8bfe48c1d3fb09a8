//! Typed client for the prepared query endpoints of a Consul-compatible
//! service-discovery HTTP API.
//!
//! ```no_run
//! # async fn demo() -> consul_client::Result<()> {
//! use consul_client::{Client, Config, PreparedQueryDefinition};
//!
//! let client = Client::new(Config::default().with_env_overrides())?;
//! let id = client
//!     .prepared_query()
//!     .create(&PreparedQueryDefinition::for_service("web"))
//!     .await?
//!     .response;
//! let result = client.prepared_query().execute(&id).await?;
//! println!("{} healthy instances", result.response.nodes.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod options;
pub mod prepared_query;
pub mod transport;

#[cfg(test)]
mod testing;

pub use client::Client;
pub use config::Config;
pub use error::{ClientError, Result};
pub use options::{ConsistencyMode, QueryMeta, QueryOptions, QueryResult, WriteMeta, WriteOptions, WriteResult};
pub use prepared_query::PreparedQuery;
pub use shared::query::{
    PreparedQueryDefinition, PreparedQueryExecuteResponse, QueryDnsOptions, QueryFailoverOptions,
    QueryTemplate, ServiceQuery,
};
pub use shared::types::ServiceEntry;
pub use transport::{ApiRequest, ApiResponse, HttpExecutor, Method, ReqwestExecutor};

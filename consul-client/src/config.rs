use std::path::Path;
use std::time::Duration;
use serde::Deserialize;
use anyhow::{Context, Result};

pub const ENV_HTTP_ADDR: &str = "CONSUL_HTTP_ADDR";
pub const ENV_HTTP_TOKEN: &str = "CONSUL_HTTP_TOKEN";
pub const ENV_HTTP_SSL: &str = "CONSUL_HTTP_SSL";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// host:port of the agent's HTTP API
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// Datacenter used when per-call options leave it unset
    #[serde(default)]
    pub datacenter: Option<String>,
    /// ACL token used when per-call options leave it unset
    #[serde(default)]
    pub token: Option<String>,
    /// Per-request timeout; blocking queries extend it by their wait time
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_address() -> String {
    "127.0.0.1:8500".to_string()
}

fn default_scheme() -> String {
    "http".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: default_address(),
            scheme: default_scheme(),
            datacenter: None,
            token: None,
            timeout_secs: default_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Apply the standard CONSUL_HTTP_* environment variables on top
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(addr) = lookup(ENV_HTTP_ADDR).filter(|s| !s.is_empty()) {
            if let Some(rest) = addr.strip_prefix("https://") {
                self.scheme = "https".to_string();
                self.address = rest.to_string();
            } else if let Some(rest) = addr.strip_prefix("http://") {
                self.scheme = "http".to_string();
                self.address = rest.to_string();
            } else {
                self.address = addr;
            }
        }

        if let Some(token) = lookup(ENV_HTTP_TOKEN).filter(|s| !s.is_empty()) {
            self.token = Some(token);
        }

        if let Some(ssl) = lookup(ENV_HTTP_SSL) {
            match ssl.to_ascii_lowercase().as_str() {
                "1" | "true" => self.scheme = "https".to_string(),
                "0" | "false" => self.scheme = "http".to_string(),
                other => tracing::warn!("Ignoring unrecognised {} value: {}", ENV_HTTP_SSL, other),
            }
        }

        self
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.address.trim_end_matches('/'))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

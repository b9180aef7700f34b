//! Connection settings for both backends.
//!
//! Settings come from an optional TOML file and are then overridden by
//! environment variables (`PGX_URL`, `MEMGRAPH_URI`, ...).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};
use crate::translator::DEFAULT_GRAPH_NAME;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub pgx: PgxConfig,
    pub memgraph: MemgraphConfig,
}

/// REST graph service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PgxConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// `GRAPH_SERVER_PGX`, `PGQL_IN_DATABASE` or `SQL_IN_DATABASE`.
    pub driver: String,
    pub graph_name: String,
    pub formatter: String,
    pub page_size: u64,
    /// The service commonly runs with a self-signed certificate.
    pub accept_invalid_certs: bool,
    pub request_timeout_secs: u64,
    /// Route statements through the async submit/poll endpoints.
    pub async_mode: bool,
    pub async_max_wait_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for PgxConfig {
    fn default() -> Self {
        Self {
            base_url: "https://localhost:7007".to_string(),
            username: "graphuser".to_string(),
            password: String::new(),
            driver: "GRAPH_SERVER_PGX".to_string(),
            graph_name: DEFAULT_GRAPH_NAME.to_string(),
            formatter: "DATASTUDIO".to_string(),
            page_size: 100,
            accept_invalid_certs: true,
            request_timeout_secs: 30,
            async_mode: false,
            async_max_wait_ms: 60_000,
            poll_interval_ms: 2_000,
        }
    }
}

/// Native graph store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemgraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: Option<String>,
    pub max_connections: usize,
    pub fetch_size: usize,
}

impl Default for MemgraphConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: String::new(),
            password: String::new(),
            database: None,
            max_connections: 4,
            fetch_size: 200,
        }
    }
}

impl BridgeConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml(text: &str) -> BridgeResult<Self> {
        toml::from_str(text).map_err(|e| BridgeError::Config(e.to_string()))
    }

    /// Load from an optional file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> BridgeResult<Self> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| BridgeError::Config(format!("{}: {}", path.display(), e)))?;
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in `load`).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |target: &mut String, key: &str| {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *target = value;
            }
        };
        set(&mut self.pgx.base_url, "PGX_URL");
        set(&mut self.pgx.username, "PGX_USER");
        set(&mut self.pgx.password, "PGX_PASS");
        set(&mut self.pgx.driver, "PGX_DRIVER");
        set(&mut self.pgx.graph_name, "GRAPH_NAME");
        set(&mut self.memgraph.uri, "MEMGRAPH_URI");
        set(&mut self.memgraph.user, "MEMGRAPH_USER");
        set(&mut self.memgraph.password, "MEMGRAPH_PASSWORD");
    }

    pub fn validate(&self) -> BridgeResult<()> {
        const DRIVERS: [&str; 3] = ["GRAPH_SERVER_PGX", "PGQL_IN_DATABASE", "SQL_IN_DATABASE"];
        if !DRIVERS.contains(&self.pgx.driver.as_str()) {
            return Err(BridgeError::Config(format!("unknown PGX driver '{}'", self.pgx.driver)));
        }
        if self.pgx.poll_interval_ms == 0 {
            return Err(BridgeError::Config("poll_interval_ms must be positive".to_string()));
        }
        if self.memgraph.max_connections == 0 {
            return Err(BridgeError::Config("max_connections must be positive".to_string()));
        }
        Ok(())
    }
}

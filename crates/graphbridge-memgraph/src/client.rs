//! Bolt connection to the native graph store.

use async_trait::async_trait;
use graphbridge_core::{BackendKind, BridgeError, BridgeResult, MemgraphConfig, QueryExecutor, Row};
use neo4rs::{Config, ConfigBuilder, Graph, Query};
use serde_json::Value;
use tracing::debug;

/// Client for the native store. Cheap to clone; the pool is shared.
#[derive(Clone)]
pub struct MemgraphClient {
    graph: Graph,
}

/// Build the driver configuration. The database name is only sent when set.
pub fn driver_config(config: &MemgraphConfig) -> BridgeResult<Config> {
    let mut builder = ConfigBuilder::default()
        .uri(config.uri.as_str())
        .user(config.user.as_str())
        .password(config.password.as_str())
        .max_connections(config.max_connections)
        .fetch_size(config.fetch_size);
    if let Some(database) = config.database.as_deref().filter(|d| !d.is_empty()) {
        builder = builder.db(database);
    }
    builder
        .build()
        .map_err(|e| BridgeError::Config(format!("invalid Bolt settings: {}", e)))
}

impl MemgraphClient {
    /// Connect and ping.
    ///
    /// The driver pool is lazy, so `RETURN 1` forces a real handshake and an
    /// unreachable server fails here rather than on the first query.
    pub async fn connect(config: &MemgraphConfig) -> BridgeResult<Self> {
        let graph = Graph::connect(driver_config(config)?)
            .await
            .map_err(|e| BridgeError::transport(format!("failed to open Bolt pool: {}", e)))?;

        graph
            .run(Query::new("RETURN 1".to_string()))
            .await
            .map_err(|e| BridgeError::transport(format!("{} is not responding: {}", config.uri, e)))?;

        debug!(uri = %config.uri, "Connected to native graph store");
        Ok(Self { graph })
    }

    pub fn inner(&self) -> &Graph {
        &self.graph
    }
}

#[async_trait]
impl QueryExecutor for MemgraphClient {
    fn backend(&self) -> BackendKind {
        BackendKind::Memgraph
    }

    async fn run(&self, query: &str) -> BridgeResult<Vec<Row>> {
        let mut stream = self
            .graph
            .execute(Query::new(query.to_string()))
            .await
            .map_err(|e| BridgeError::QueryFailed(e.to_string()))?;

        let mut rows = Vec::new();
        while let Some(row) = stream
            .next()
            .await
            .map_err(|e| BridgeError::QueryFailed(e.to_string()))?
        {
            let value = row
                .to::<Value>()
                .map_err(|e| BridgeError::QueryFailed(format!("unreadable row: {}", e)))?;
            rows.push(into_row(value)?);
        }
        debug!(rows = rows.len(), "Cypher query returned");
        Ok(rows)
    }
}

/// A deserialized record must be a column → value map.
fn into_row(value: Value) -> BridgeResult<Row> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(BridgeError::QueryFailed(format!(
            "expected a record, got {}",
            other
        ))),
    }
}

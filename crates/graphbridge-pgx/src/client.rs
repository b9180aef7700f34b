//! [`QueryExecutor`] over the REST graph service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use graphbridge_core::{BackendKind, BridgeError, BridgeResult, PgxConfig, QueryExecutor, Row};
use serde_json::{Number, Value};
use tracing::{debug, warn};

use crate::poller::AsyncJobPoller;
use crate::session::SessionManager;
use crate::transport::{GraphInfo, HttpTransport, QueryRequest, QueryResponse, RestTransport};

/// Key used for a statement result that is a bare scalar (e.g. a count).
pub const SCALAR_KEY: &str = "result";

/// Runs statements through the REST service, synchronously or via the
/// async submit/poll endpoints.
pub struct PgxClient {
    transport: Arc<dyn RestTransport>,
    session: Arc<SessionManager>,
    poller: AsyncJobPoller,
    config: PgxConfig,
}

impl PgxClient {
    pub fn new(transport: Arc<dyn RestTransport>, config: PgxConfig) -> Self {
        let session = Arc::new(SessionManager::new(
            transport.clone(),
            &config.username,
            &config.password,
        ));
        let poller = AsyncJobPoller::new(transport.clone(), session.clone(), &config);
        Self {
            transport,
            session,
            poller,
            config,
        }
    }

    /// Client over HTTP using the given settings.
    pub fn connect(config: PgxConfig) -> BridgeResult<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::new(Arc::new(transport), config))
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn poller(&self) -> &AsyncJobPoller {
        &self.poller
    }

    pub fn config(&self) -> &PgxConfig {
        &self.config
    }

    /// Run one statement and return the raw batch response.
    pub async fn execute(&self, statement: &str) -> BridgeResult<QueryResponse> {
        let statements = vec![statement.to_string()];
        if self.config.async_mode {
            let max_wait = Duration::from_millis(self.config.async_max_wait_ms);
            return self.poller.run(&statements, &self.config.driver, max_wait).await;
        }

        let request = QueryRequest::new(
            statements,
            &self.config.driver,
            &self.config.formatter,
            self.config.page_size,
        );
        let authorization = self.session.authorization_header().await?;
        match self.transport.run_query(&authorization, &request).await {
            Err(BridgeError::Authentication(message)) => {
                warn!(%message, "REST service rejected the session, logging in again");
                self.session.invalidate().await;
                let authorization = self.session.authorization_header().await?;
                self.transport.run_query(&authorization, &request).await
            }
            other => other,
        }
    }

    /// Graphs visible to the configured driver.
    pub async fn list_graphs(&self) -> BridgeResult<Vec<GraphInfo>> {
        let authorization = self.session.authorization_header().await?;
        self.transport.list_graphs(&authorization, &self.config.driver).await
    }
}

#[async_trait]
impl QueryExecutor for PgxClient {
    fn backend(&self) -> BackendKind {
        BackendKind::Oracle
    }

    async fn run(&self, query: &str) -> BridgeResult<Vec<Row>> {
        let response = self.execute(query).await?;
        let rows = decode_rows(&response)?;
        debug!(rows = rows.len(), "REST query returned");
        Ok(rows)
    }
}

/// Rows of the first statement result.
///
/// The `result` payload is usually a JSON document encoded as a string; it
/// may carry a tab-separated `table` with a header line, a list of row
/// objects, a single object or a bare scalar.
pub fn decode_rows(response: &QueryResponse) -> BridgeResult<Vec<Row>> {
    let Some(first) = response.results.first() else {
        return Ok(Vec::new());
    };
    if !first.success {
        let message = first.error.clone().unwrap_or_else(|| "statement failed".to_string());
        return Err(BridgeError::QueryFailed(message));
    }
    Ok(decode_value(&first.result))
}

fn decode_value(value: &Value) -> Vec<Row> {
    match value {
        Value::Null => Vec::new(),
        Value::String(text) if text.trim().is_empty() => Vec::new(),
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(parsed @ (Value::Object(_) | Value::Array(_))) => decode_value(&parsed),
            Ok(Value::Null) => Vec::new(),
            Ok(scalar) => vec![scalar_row(scalar)],
            Err(_) => vec![scalar_row(Value::String(text.clone()))],
        },
        Value::Object(map) => match map.get("table") {
            Some(Value::String(table)) => decode_table(table),
            _ => vec![map.clone()],
        },
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(map) => map.clone(),
                other => scalar_row(other.clone()),
            })
            .collect(),
        scalar => vec![scalar_row(scalar.clone())],
    }
}

fn scalar_row(value: Value) -> Row {
    let mut row = Row::new();
    row.insert(SCALAR_KEY.to_string(), value);
    row
}

/// Parse a tab-separated table. Column names are lower-cased.
fn decode_table(table: &str) -> Vec<Row> {
    let mut lines = table.lines().filter(|line| !line.trim().is_empty());
    let Some(header) = lines.next() else {
        return Vec::new();
    };
    let columns: Vec<String> = header.split('\t').map(|c| c.trim().to_lowercase()).collect();

    lines
        .map(|line| {
            columns
                .iter()
                .zip(line.split('\t').chain(std::iter::repeat("")))
                .map(|(column, cell)| (column.clone(), cell_value(cell)))
                .collect::<Row>()
        })
        .collect()
}

fn cell_value(cell: &str) -> Value {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("null") {
        return Value::Null;
    }
    if let Ok(n) = cell.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Some(n) = cell.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    Value::String(cell.to_string())
}

//! REST transport for the PGQL graph service.
//!
//! [`RestTransport`] is the narrow seam the session manager, poller and
//! client talk through; [`HttpTransport`] implements it over reqwest against
//! the `/auth/token` and `/v2/*` endpoints.

use std::time::Duration;

use async_trait::async_trait;
use graphbridge_core::{BridgeError, BridgeResult, PgxConfig};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Assumed token lifetime when a grant does not state one.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Token grant returned by `/auth/token`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    /// Lifetime in seconds from the moment of the grant.
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl TokenGrant {
    /// Stated lifetime, or [`DEFAULT_TOKEN_LIFETIME_SECS`] when absent.
    pub fn lifetime_secs(&self) -> i64 {
        match self.expires_in {
            Some(secs) => secs,
            None => {
                warn!(
                    default_secs = DEFAULT_TOKEN_LIFETIME_SECS,
                    "Token grant has no expires_in, assuming default lifetime"
                );
                DEFAULT_TOKEN_LIFETIME_SECS
            }
        }
    }
}

/// Paging window sent with every statement batch.
#[derive(Debug, Clone, Serialize)]
pub struct PageWindow {
    pub start: u64,
    pub size: u64,
}

/// Body of `/v2/runQuery` and `/v2/runQueryAsync`.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest {
    pub statements: Vec<String>,
    pub driver: String,
    pub formatter: String,
    pub parameters: PageWindow,
    pub visualize: bool,
}

impl QueryRequest {
    pub fn new(statements: Vec<String>, driver: &str, formatter: &str, page_size: u64) -> Self {
        Self {
            statements,
            driver: driver.to_string(),
            formatter: formatter.to_string(),
            parameters: PageWindow {
                start: 0,
                size: page_size,
            },
            visualize: false,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Outcome of one statement in a batch.
#[derive(Debug, Clone, Deserialize)]
pub struct StatementResult {
    #[serde(default)]
    pub statement: Option<String>,
    #[serde(default = "default_true")]
    pub success: bool,
    /// Usually a JSON document encoded as a string.
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<String>,
}

/// Response of a statement batch.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: Vec<StatementResult>,
}

/// One graph known to the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphInfo {
    #[serde(alias = "graphName", alias = "name")]
    pub graph_name: String,
    #[serde(default, alias = "vertexCount")]
    pub vertex_count: Option<u64>,
    #[serde(default, alias = "edgeCount")]
    pub edge_count: Option<u64>,
}

impl GraphInfo {
    /// Read graph entries from whatever shape the service returned: a list
    /// of objects, a list of names, or an object wrapping either.
    pub fn from_listing(listing: &Value) -> Vec<GraphInfo> {
        let items = match listing {
            Value::Array(items) => items.as_slice(),
            Value::Object(map) => match map.get("graphs").or_else(|| map.get("items")) {
                Some(Value::Array(items)) => items.as_slice(),
                _ => &[],
            },
            _ => &[],
        };
        items
            .iter()
            .filter_map(|item| match item {
                Value::String(name) => Some(GraphInfo {
                    graph_name: name.clone(),
                    vertex_count: None,
                    edge_count: None,
                }),
                other => serde_json::from_value(other.clone()).ok(),
            })
            .collect()
    }
}

/// Operations the core needs from the REST service.
///
/// `authorization` is the full header value (`Bearer <token>`).
#[async_trait]
pub trait RestTransport: Send + Sync {
    async fn authenticate(&self, username: &str, password: &str) -> BridgeResult<TokenGrant>;

    async fn refresh(&self, access_token: &str) -> BridgeResult<TokenGrant>;

    async fn run_query(&self, authorization: &str, request: &QueryRequest) -> BridgeResult<QueryResponse>;

    /// Start an async batch and return its result id.
    async fn submit_async(&self, authorization: &str, request: &QueryRequest) -> BridgeResult<String>;

    /// `true` once the batch has finished.
    async fn poll_async(&self, authorization: &str, result_id: &str) -> BridgeResult<bool>;

    async fn fetch_async_result(&self, authorization: &str, result_id: &str) -> BridgeResult<QueryResponse>;

    async fn list_graphs(&self, authorization: &str, driver: &str) -> BridgeResult<Vec<GraphInfo>>;
}

/// reqwest-backed [`RestTransport`].
#[derive(Clone)]
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct AsyncSubmission {
    result_id: Value,
}

impl HttpTransport {
    pub fn new(config: &PgxConfig) -> BridgeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| BridgeError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turn a non-success status into an error. 401 maps to
    /// `Authentication` so callers can drop the session and retry.
    async fn check(response: reqwest::Response, what: &str) -> BridgeResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED {
            return Err(BridgeError::Authentication(format!("{} rejected ({}): {}", what, status, body)));
        }
        Err(BridgeError::transport(format!("{} failed ({}): {}", what, status, body)))
    }

    async fn grant(&self, body: Value, refresh: bool) -> BridgeResult<TokenGrant> {
        let request = if refresh {
            self.client.put(self.url("/auth/token"))
        } else {
            self.client.post(self.url("/auth/token"))
        };
        let response = request
            .json(&body)
            .send()
            .await
            .map_err(|e| BridgeError::Authentication(format!("token endpoint unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::Authentication(format!("token request failed ({}): {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| BridgeError::Authentication(format!("malformed token response: {}", e)))
    }
}

#[async_trait]
impl RestTransport for HttpTransport {
    async fn authenticate(&self, username: &str, password: &str) -> BridgeResult<TokenGrant> {
        let body = serde_json::json!({
            "username": username,
            "password": password,
            "createSession": true,
        });
        self.grant(body, false).await
    }

    async fn refresh(&self, access_token: &str) -> BridgeResult<TokenGrant> {
        self.grant(serde_json::json!({ "token": access_token }), true).await
    }

    async fn run_query(&self, authorization: &str, request: &QueryRequest) -> BridgeResult<QueryResponse> {
        debug!(statements = request.statements.len(), driver = %request.driver, "POST /v2/runQuery");
        let response = self
            .client
            .post(self.url("/v2/runQuery"))
            .header(reqwest::header::AUTHORIZATION, authorization)
            .json(request)
            .send()
            .await
            .map_err(|e| BridgeError::transport(format!("runQuery: {}", e)))?;

        Self::check(response, "runQuery")
            .await?
            .json()
            .await
            .map_err(|e| BridgeError::transport(format!("malformed runQuery response: {}", e)))
    }

    async fn submit_async(&self, authorization: &str, request: &QueryRequest) -> BridgeResult<String> {
        let response = self
            .client
            .post(self.url("/v2/runQueryAsync"))
            .header(reqwest::header::AUTHORIZATION, authorization)
            .json(request)
            .send()
            .await
            .map_err(|e| BridgeError::Submission(e.to_string()))?;

        let submission: AsyncSubmission = Self::check(response, "runQueryAsync")
            .await
            .map_err(|e| BridgeError::Submission(e.to_string()))?
            .json()
            .await
            .map_err(|e| BridgeError::Submission(format!("malformed submission response: {}", e)))?;

        match submission.result_id {
            Value::String(id) if !id.is_empty() => Ok(id),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(BridgeError::Submission(format!("unusable result_id: {}", other))),
        }
    }

    async fn poll_async(&self, authorization: &str, result_id: &str) -> BridgeResult<bool> {
        let response = self
            .client
            .get(self.url(&format!("/v2/isAsyncQueryExecutionComplete/{}", result_id)))
            .header(reqwest::header::AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(|e| BridgeError::transport(format!("completion check: {}", e)))?;

        let value: Value = Self::check(response, "isAsyncQueryExecutionComplete")
            .await?
            .json()
            .await
            .map_err(|e| BridgeError::transport(format!("malformed completion response: {}", e)))?;

        Ok(matches!(value, Value::Bool(true)) || value.as_str() == Some("true"))
    }

    async fn fetch_async_result(&self, authorization: &str, result_id: &str) -> BridgeResult<QueryResponse> {
        let response = self
            .client
            .get(self.url(&format!("/v2/runQueryAsync/{}", result_id)))
            .header(reqwest::header::AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(|e| BridgeError::transport(format!("async result: {}", e)))?;

        Self::check(response, "runQueryAsync result")
            .await?
            .json()
            .await
            .map_err(|e| BridgeError::transport(format!("malformed async result: {}", e)))
    }

    async fn list_graphs(&self, authorization: &str, driver: &str) -> BridgeResult<Vec<GraphInfo>> {
        let response = self
            .client
            .get(self.url("/v2/graphs"))
            .query(&[("driver", driver)])
            .header(reqwest::header::AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(|e| BridgeError::transport(format!("graphs: {}", e)))?;

        let listing: Value = Self::check(response, "graphs")
            .await?
            .json()
            .await
            .map_err(|e| BridgeError::transport(format!("malformed graph listing: {}", e)))?;

        Ok(GraphInfo::from_listing(&listing))
    }
}

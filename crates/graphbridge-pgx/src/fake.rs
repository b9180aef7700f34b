//! In-memory [`RestTransport`] for unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use graphbridge_core::{BridgeError, BridgeResult};
use serde_json::Value;

use crate::transport::{GraphInfo, QueryRequest, QueryResponse, RestTransport, StatementResult, TokenGrant};

pub(crate) struct FakeTransport {
    expires_in: Option<i64>,
    reject_auth: bool,
    fail_refresh: bool,
    fail_submit: bool,
    fail_poll: bool,
    unauthorized_once: AtomicBool,
    polls_until_complete: usize,
    result: Mutex<Value>,
    pub auth_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub run_calls: AtomicUsize,
    pub poll_calls: AtomicUsize,
    pub statements: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            expires_in: Some(3600),
            reject_auth: false,
            fail_refresh: false,
            fail_submit: false,
            fail_poll: false,
            unauthorized_once: AtomicBool::new(false),
            polls_until_complete: 0,
            result: Mutex::new(Value::Null),
            auth_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            run_calls: AtomicUsize::new(0),
            poll_calls: AtomicUsize::new(0),
            statements: Mutex::new(Vec::new()),
        }
    }

    pub fn with_expires_in(mut self, secs: i64) -> Self {
        self.expires_in = Some(secs);
        self
    }

    pub fn without_expiry(mut self) -> Self {
        self.expires_in = None;
        self
    }

    pub fn rejecting_auth(mut self) -> Self {
        self.reject_auth = true;
        self
    }

    pub fn failing_refresh(mut self) -> Self {
        self.fail_refresh = true;
        self
    }

    pub fn failing_submit(mut self) -> Self {
        self.fail_submit = true;
        self
    }

    pub fn failing_poll(mut self) -> Self {
        self.fail_poll = true;
        self
    }

    pub fn unauthorized_once(self) -> Self {
        self.unauthorized_once.store(true, Ordering::SeqCst);
        self
    }

    /// Report "not complete" this many times before completing.
    pub fn completing_after(mut self, polls: usize) -> Self {
        self.polls_until_complete = polls;
        self
    }

    /// The `result` field of the first statement result.
    pub fn with_result(self, result: Value) -> Self {
        if let Ok(mut slot) = self.result.lock() {
            *slot = result;
        }
        self
    }

    fn response(&self) -> QueryResponse {
        let result = self.result.lock().map(|r| r.clone()).unwrap_or(Value::Null);
        QueryResponse {
            results: vec![StatementResult {
                statement: None,
                success: true,
                result,
                error: None,
            }],
        }
    }
}

#[async_trait]
impl RestTransport for FakeTransport {
    async fn authenticate(&self, _username: &str, _password: &str) -> BridgeResult<TokenGrant> {
        let n = self.auth_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.reject_auth {
            return Err(BridgeError::Authentication("invalid credentials".into()));
        }
        Ok(TokenGrant {
            access_token: format!("token-{}", n),
            expires_in: self.expires_in,
        })
    }

    async fn refresh(&self, _access_token: &str) -> BridgeResult<TokenGrant> {
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_refresh {
            return Err(BridgeError::Authentication("refresh rejected".into()));
        }
        Ok(TokenGrant {
            access_token: format!("refreshed-{}", n),
            expires_in: self.expires_in,
        })
    }

    async fn run_query(&self, _authorization: &str, request: &QueryRequest) -> BridgeResult<QueryResponse> {
        self.run_calls.fetch_add(1, Ordering::SeqCst);
        if self.unauthorized_once.swap(false, Ordering::SeqCst) {
            return Err(BridgeError::Authentication("401".into()));
        }
        if let Ok(mut seen) = self.statements.lock() {
            seen.extend(request.statements.iter().cloned());
        }
        Ok(self.response())
    }

    async fn submit_async(&self, _authorization: &str, request: &QueryRequest) -> BridgeResult<String> {
        if self.fail_submit {
            return Err(BridgeError::Submission("connection refused".into()));
        }
        if let Ok(mut seen) = self.statements.lock() {
            seen.extend(request.statements.iter().cloned());
        }
        Ok("job-1".to_string())
    }

    async fn poll_async(&self, _authorization: &str, _result_id: &str) -> BridgeResult<bool> {
        let n = self.poll_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_poll {
            return Err(BridgeError::transport("connection reset"));
        }
        Ok(n >= self.polls_until_complete)
    }

    async fn fetch_async_result(&self, _authorization: &str, _result_id: &str) -> BridgeResult<QueryResponse> {
        Ok(self.response())
    }

    async fn list_graphs(&self, _authorization: &str, _driver: &str) -> BridgeResult<Vec<GraphInfo>> {
        Ok(vec![GraphInfo {
            graph_name: "ALL_GRAPH".into(),
            vertex_count: Some(10),
            edge_count: Some(20),
        }])
    }
}

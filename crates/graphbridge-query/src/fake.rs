//! Scripted [`QueryExecutor`] for unit tests.

use std::sync::Mutex;

use async_trait::async_trait;
use graphbridge_core::{BackendKind, BridgeError, BridgeResult, QueryExecutor, Row};
use serde_json::Value;

pub(crate) struct FakeExecutor {
    backend: BackendKind,
    responses: Vec<(String, Vec<Row>)>,
    failures: Vec<String>,
    seen: Mutex<Vec<String>>,
}

impl FakeExecutor {
    pub fn new(backend: BackendKind) -> Self {
        Self {
            backend,
            responses: Vec::new(),
            failures: Vec::new(),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Return `rows` for the first query containing `fragment`.
    pub fn respond(mut self, fragment: &str, rows: Vec<Value>) -> Self {
        let rows = rows
            .into_iter()
            .filter_map(|row| match row {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        self.responses.push((fragment.to_string(), rows));
        self
    }

    /// Fail every query containing `fragment`.
    pub fn failing(mut self, fragment: &str) -> Self {
        self.failures.push(fragment.to_string());
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.seen.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl QueryExecutor for FakeExecutor {
    fn backend(&self) -> BackendKind {
        self.backend
    }

    async fn run(&self, query: &str) -> BridgeResult<Vec<Row>> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(query.to_string());
        }
        if self.failures.iter().any(|f| query.contains(f.as_str())) {
            return Err(BridgeError::transport(format!("{} unreachable", self.backend)));
        }
        Ok(self
            .responses
            .iter()
            .find(|(fragment, _)| query.contains(fragment.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }
}

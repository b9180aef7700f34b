//! The narrow "run a query, get rows" seam shared by both backends.

use async_trait::async_trait;

use crate::error::BridgeResult;
use crate::model::{BackendKind, Row};

/// A backend that executes query text and returns schemaless rows.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Which backend this executor talks to.
    fn backend(&self) -> BackendKind;

    /// Run one statement and collect every row it returns.
    async fn run(&self, query: &str) -> BridgeResult<Vec<Row>>;
}

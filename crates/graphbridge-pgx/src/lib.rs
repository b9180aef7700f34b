//! # GraphBridge PGX
//!
//! Client for the REST-mediated PGQL graph service: token session,
//! async job polling and a [`QueryExecutor`](graphbridge_core::QueryExecutor)
//! that decodes statement results into rows.

pub mod client;
pub mod poller;
pub mod session;
pub mod transport;

#[cfg(test)]
mod fake;

pub use client::{decode_rows, PgxClient};
pub use poller::{AsyncJob, AsyncJobPoller, JobState};
pub use session::SessionManager;
pub use transport::{GraphInfo, HttpTransport, QueryRequest, QueryResponse, RestTransport, TokenGrant};

//! Centralized error types for GraphBridge.

use thiserror::Error;

use crate::model::BackendKind;

/// Main error type for GraphBridge operations.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Async query submission failed: {0}")]
    Submission(String),

    #[error("Polling async result '{result_id}' failed: {message}")]
    Poll { result_id: String, message: String },

    #[error("Async result '{result_id}' did not complete within {waited_ms} ms")]
    Timeout { result_id: String, waited_ms: u64 },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("No {entity_label} named '{name}' found in {backend}")]
    EntityNotFound {
        backend: BackendKind,
        entity_label: String,
        name: String,
    },

    #[error("No {relationship_type} edge from '{source_id}' to '{target_id}' in {backend}")]
    EdgeNotFound {
        backend: BackendKind,
        relationship_type: String,
        source_id: String,
        target_id: String,
    },

    #[error("Could not extract a {entity_label} identifier from the {backend} result")]
    IdentifierExtraction {
        backend: BackendKind,
        entity_label: String,
    },

    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    #[error("Unknown entity type: {0}")]
    UnknownEntityType(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("{backend} repository for '{entity_label}': {source}")]
    Backend {
        backend: BackendKind,
        entity_label: String,
        #[source]
        source: Box<BridgeError>,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for GraphBridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

impl BridgeError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Wrap an error with the backend and entity label it occurred on.
    ///
    /// Errors that already carry a backend scope are returned unchanged.
    pub fn scoped(self, backend: BackendKind, entity_label: &str) -> Self {
        match self {
            Self::Backend { .. }
            | Self::EntityNotFound { .. }
            | Self::EdgeNotFound { .. }
            | Self::IdentifierExtraction { .. } => self,
            other => Self::Backend {
                backend,
                entity_label: entity_label.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, skipping backend scope wrappers.
    pub fn root(&self) -> &BridgeError {
        match self {
            Self::Backend { source, .. } => source.root(),
            other => other,
        }
    }

    /// Stable machine-readable code for serialized error slots.
    pub fn code(&self) -> &'static str {
        match self.root() {
            Self::Authentication(_) => "authentication_error",
            Self::Submission(_) => "submission_error",
            Self::Poll { .. } => "poll_error",
            Self::Timeout { .. } => "timeout_error",
            Self::UnsupportedOperation(_) => "unsupported_operation",
            Self::EntityNotFound { .. } => "entity_not_found",
            Self::EdgeNotFound { .. } => "edge_not_found",
            Self::IdentifierExtraction { .. } => "identifier_extraction_error",
            Self::UnknownBackend(_) => "unknown_backend",
            Self::UnknownEntityType(_) => "unknown_entity_type",
            Self::Validation(_) => "validation_error",
            Self::Transport(_) => "transport_error",
            Self::QueryFailed(_) => "query_failed",
            Self::Backend { .. } => "backend_error",
            Self::Json(_) => "json_error",
            Self::Config(_) => "config_error",
        }
    }
}

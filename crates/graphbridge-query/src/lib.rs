//! # GraphBridge Query
//!
//! Repositories over the backend executors and the structured query
//! resolver that fans a name-based lookup out to both backends.

pub mod factory;
pub mod repository;
pub mod resolver;

#[cfg(test)]
mod fake;

pub use factory::RepositoryFactory;
pub use repository::{
    BulkDeleteReport, CreatedNode, EdgeDeletion, EntityStats, FailedDeletion, HealthStatus, NodeDeletion, Repository,
    RowSet,
};
pub use resolver::{
    BackendResolution, RelationshipResult, StructuredQuery, StructuredQueryResolver, StructuredQueryResult,
};

//! GraphBridge Core Library
//!
//! Error taxonomy, query descriptors, the entity/edge catalog and the
//! backend-agnostic query translator shared by every GraphBridge crate.

pub mod catalog;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod executor;
pub mod model;
pub mod translator;

pub use config::{BridgeConfig, MemgraphConfig, PgxConfig};
pub use descriptor::{
    AggregateFunction, AggregateSpec, Operation, Operator, OrderBy, QueryDescriptor, QueryParameters,
    RelationMode, RelationshipSpec, WhereValue,
};
pub use error::{BridgeError, BridgeResult};
pub use executor::QueryExecutor;
pub use model::{BackendKind, Direction, Row};
pub use translator::Translator;

//! # GraphBridge Memgraph
//!
//! Bolt-protocol executor for the native property-graph store.

pub mod client;

pub use client::{driver_config, MemgraphClient};

//! Query command: structured name-based lookup on one or both backends.

use anyhow::Result;
use clap::Args;
use graphbridge_core::BridgeConfig;
use graphbridge_query::{StructuredQuery, StructuredQueryResolver};
use tracing::info;

use super::{build_factory, parse_backends};
use crate::output;

#[derive(Args)]
pub struct QueryArgs {
    /// Entity label of the named entity
    #[arg(long)]
    pub entity: String,

    /// Entity name to look up
    #[arg(long)]
    pub name: String,

    /// Relationship type to follow (all types when omitted)
    #[arg(long)]
    pub relationship: Option<String>,

    /// Keep only relationships whose target has this label
    #[arg(long)]
    pub target: Option<String>,

    /// Backend: oracle, memgraph or both
    #[arg(long, default_value = "both")]
    pub db: String,
}

pub async fn execute(args: QueryArgs, config: &BridgeConfig, json: bool) -> Result<()> {
    let backends = parse_backends(&args.db)?;

    let mut query = StructuredQuery::new(&args.entity, &args.name).with_backends(backends.clone());
    if let Some(rel) = args.relationship.as_deref() {
        query = query.with_relationship(rel);
    }
    if let Some(target) = args.target.as_deref() {
        query = query.with_target(target);
    }

    let resolver = StructuredQueryResolver::new(build_factory(config, &backends).await);
    let result = resolver.resolve(query).await?;
    info!(success = result.success(), "Structured query resolved");

    if json {
        output::print_json(&result)?;
    } else {
        output::print_resolution(&result);
    }

    if !result.success() {
        anyhow::bail!("query failed on every backend");
    }
    Ok(())
}

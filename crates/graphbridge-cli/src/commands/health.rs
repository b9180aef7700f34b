//! Health command: check every entity type on every selected backend.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use graphbridge_core::BridgeConfig;
use tracing::info;

use super::{build_factory, parse_backends};
use crate::output;

#[derive(Args)]
pub struct HealthArgs {
    /// Backends to check: oracle, memgraph or both
    #[arg(long, default_value = "both")]
    pub db: String,
}

pub async fn execute(args: HealthArgs, config: &BridgeConfig, json: bool) -> Result<()> {
    let backends = parse_backends(&args.db)?;
    let factory = build_factory(config, &backends).await;
    let statuses = factory.health_check_all().await;

    let healthy = statuses.iter().filter(|s| s.healthy).count();
    info!(healthy, total = statuses.len(), "Health check finished");

    if json {
        return output::print_json(&statuses);
    }
    output::print_health(&statuses);
    println!();
    let summary = format!("{}/{} healthy", healthy, statuses.len());
    if healthy == statuses.len() {
        println!("{}", summary.green());
    } else {
        println!("{}", summary.yellow());
    }
    Ok(())
}

//! Graphs command: list graphs on the REST service.

use anyhow::{Context, Result};
use graphbridge_core::BridgeConfig;
use graphbridge_pgx::PgxClient;

use crate::output;

pub async fn execute(config: &BridgeConfig, json: bool) -> Result<()> {
    let client = PgxClient::connect(config.pgx.clone())?;
    let graphs = client
        .list_graphs()
        .await
        .with_context(|| format!("Failed to list graphs on {}", config.pgx.base_url))?;

    if json {
        return output::print_json(&graphs);
    }
    output::print_graphs(&graphs);
    Ok(())
}

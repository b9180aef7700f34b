//! Translate command: show generated query text without touching a backend.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use clap::Args;
use graphbridge_core::{BridgeConfig, QueryParameters, Translator};

use super::parse_backends;
use crate::output;

#[derive(Args)]
pub struct TranslateArgs {
    /// Target backend: oracle, memgraph or both
    #[arg(long, default_value = "both")]
    pub db: String,

    /// Entity label (person, field, workplace, ...)
    #[arg(long)]
    pub entity: String,

    /// Operation: find, aggregate, join or relation
    #[arg(long, default_value = "find")]
    pub operation: String,

    /// Operation parameters as a JSON object
    #[arg(long)]
    pub params: Option<String>,
}

pub fn execute(args: TranslateArgs, config: &BridgeConfig, json: bool) -> Result<()> {
    let backends = parse_backends(&args.db)?;
    let params: QueryParameters = match args.params.as_deref() {
        Some(text) => serde_json::from_str(text).context("Invalid --params JSON")?,
        None => QueryParameters::default(),
    };

    let translator = Translator::new(&config.pgx.graph_name);
    let mut queries = BTreeMap::new();
    for backend in backends {
        let query = translator.translate(backend, &args.entity, &args.operation, &params)?;
        queries.insert(backend, query);
    }

    if json {
        return output::print_json(&queries);
    }
    for (backend, query) in &queries {
        output::print_query(*backend, query);
    }
    Ok(())
}

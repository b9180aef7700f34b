//! Entity commands: repository operations on one entity type.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use clap::Subcommand;
use graphbridge_core::{BackendKind, BridgeConfig, BridgeResult, Direction};
use graphbridge_query::{Repository, RepositoryFactory, RowSet};
use serde::Serialize;
use serde_json::Value;

use super::{build_factory, parse_backends};
use crate::output;

#[derive(Subcommand)]
pub enum EntityCommands {
    /// List entities of a type
    List {
        /// Entity label
        entity: String,

        /// Maximum rows per backend
        #[arg(short, long, default_value = "20")]
        limit: u64,

        /// Backend: oracle, memgraph or both
        #[arg(long, default_value = "both")]
        db: String,
    },

    /// Search entities by name (case-insensitive substring)
    Search {
        /// Entity label
        entity: String,

        /// Search term
        term: String,

        /// Maximum rows per backend
        #[arg(short, long, default_value = "5")]
        limit: u64,

        /// Backend: oracle, memgraph or both
        #[arg(long, default_value = "both")]
        db: String,
    },

    /// Get one entity by its business id
    Get {
        /// Entity label
        entity: String,

        /// Business id (e.g. Q7251)
        id: String,

        /// Backend: oracle, memgraph or both
        #[arg(long, default_value = "both")]
        db: String,
    },

    /// Show relationships of one entity
    Relationships {
        /// Entity label
        entity: String,

        /// Backend identifier of the entity (vertex id or business id)
        id: String,

        /// Only this relationship type
        #[arg(short = 't', long = "type")]
        relationship_type: Option<String>,

        /// Follow incoming edges instead of outgoing ones
        #[arg(long)]
        incoming: bool,

        /// Backend: oracle, memgraph or both
        #[arg(long, default_value = "both")]
        db: String,
    },

    /// Count entities of a type
    Stats {
        /// Entity label
        entity: String,

        /// Backend: oracle, memgraph or both
        #[arg(long, default_value = "both")]
        db: String,
    },

    /// Create an outgoing edge between two entities
    Link {
        /// Source entity label
        entity: String,

        /// Source identifier
        source_id: String,

        /// Relationship type (e.g. WORKED_AT)
        relationship: String,

        /// Target entity label
        target_entity: String,

        /// Target identifier
        target_id: String,

        /// Edge properties as a JSON object
        #[arg(long)]
        props: Option<String>,

        /// Backend: oracle or memgraph
        #[arg(long, default_value = "memgraph")]
        db: String,
    },

    /// Create an entity from a JSON object of properties
    CreateNode {
        /// Entity label
        entity: String,

        /// Properties as a JSON object; `name` is required
        #[arg(long)]
        props: String,

        /// Backend: oracle, memgraph or both
        #[arg(long, default_value = "memgraph")]
        db: String,
    },

    /// Delete an entity and every edge attached to it
    DeleteNode {
        /// Entity label
        entity: String,

        /// Business id (e.g. Q7251)
        id: String,

        /// Backend: oracle, memgraph or both
        #[arg(long, default_value = "memgraph")]
        db: String,
    },

    /// Delete an outgoing edge between two entities
    DeleteEdge {
        /// Source entity label
        entity: String,

        /// Source identifier
        source_id: String,

        /// Relationship type (e.g. WORKED_AT)
        relationship: String,

        /// Target entity label
        target_entity: String,

        /// Target identifier
        target_id: String,

        /// Backend: oracle, memgraph or both
        #[arg(long, default_value = "memgraph")]
        db: String,
    },

    /// Delete several entities, continuing past failures
    BulkDelete {
        /// Entity label
        entity: String,

        /// Business ids
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,

        /// Backend: oracle, memgraph or both
        #[arg(long, default_value = "memgraph")]
        db: String,
    },
}

impl EntityCommands {
    fn target(&self) -> (&str, &str) {
        match self {
            Self::List { entity, db, .. }
            | Self::Search { entity, db, .. }
            | Self::Get { entity, db, .. }
            | Self::Relationships { entity, db, .. }
            | Self::Stats { entity, db }
            | Self::Link { entity, db, .. }
            | Self::CreateNode { entity, db, .. }
            | Self::DeleteNode { entity, db, .. }
            | Self::DeleteEdge { entity, db, .. }
            | Self::BulkDelete { entity, db, .. } => (entity.as_str(), db.as_str()),
        }
    }
}

pub async fn execute(cmd: EntityCommands, config: &BridgeConfig, json: bool) -> Result<()> {
    let (entity, db) = cmd.target();
    let backends = parse_backends(db)?;
    let factory = build_factory(config, &backends).await;
    let repositories = repositories(&factory, entity, &backends)?;

    match cmd {
        EntityCommands::Stats { .. } => cmd_stats(&repositories, json).await,
        EntityCommands::Link {
            source_id,
            relationship,
            target_entity,
            target_id,
            props,
            ..
        } => {
            let properties: BTreeMap<String, Value> = match props.as_deref() {
                Some(text) => serde_json::from_str(text).context("Invalid --props JSON")?,
                None => BTreeMap::new(),
            };
            let mut outcomes = BTreeMap::new();
            for repo in &repositories {
                let outcome = repo
                    .create_edge(&source_id, &relationship, &target_entity, &target_id, properties.clone())
                    .await;
                outcomes.insert(repo.backend(), outcome);
            }
            report(outcomes, json)
        }
        EntityCommands::CreateNode { props, .. } => {
            let properties: BTreeMap<String, Value> = serde_json::from_str(&props).context("Invalid --props JSON")?;
            let mut outcomes = BTreeMap::new();
            for repo in &repositories {
                outcomes.insert(repo.backend(), repo.create_node(properties.clone()).await);
            }
            report_with(&outcomes, json, output::print_created)
        }
        EntityCommands::DeleteNode { id, .. } => {
            let mut outcomes = BTreeMap::new();
            for repo in &repositories {
                outcomes.insert(repo.backend(), repo.delete_node(&id).await);
            }
            report_with(&outcomes, json, output::print_node_deletion)
        }
        EntityCommands::DeleteEdge {
            source_id,
            relationship,
            target_entity,
            target_id,
            ..
        } => {
            let mut outcomes = BTreeMap::new();
            for repo in &repositories {
                let outcome = repo
                    .delete_edge(&source_id, &relationship, &target_entity, &target_id)
                    .await;
                outcomes.insert(repo.backend(), outcome);
            }
            report_with(&outcomes, json, output::print_edge_deletion)
        }
        EntityCommands::BulkDelete { ids, .. } => {
            let mut reports = BTreeMap::new();
            for repo in &repositories {
                reports.insert(repo.backend(), repo.bulk_delete_nodes(&ids).await);
            }
            if json {
                return output::print_json(&reports);
            }
            for (backend, report) in &reports {
                output::print_backend_header(*backend);
                output::print_bulk_report(report);
            }
            Ok(())
        }
        EntityCommands::List { limit, .. } => {
            let mut outcomes = BTreeMap::new();
            for repo in &repositories {
                outcomes.insert(repo.backend(), repo.find_all(limit).await);
            }
            report(outcomes, json)
        }
        EntityCommands::Search { term, limit, .. } => {
            let mut outcomes = BTreeMap::new();
            for repo in &repositories {
                outcomes.insert(repo.backend(), repo.search_by_name(&term, limit).await);
            }
            report(outcomes, json)
        }
        EntityCommands::Get { id, .. } => {
            let mut outcomes = BTreeMap::new();
            for repo in &repositories {
                outcomes.insert(repo.backend(), repo.find_by_id(&id).await);
            }
            report(outcomes, json)
        }
        EntityCommands::Relationships {
            id,
            relationship_type,
            incoming,
            ..
        } => {
            let direction = if incoming { Direction::Incoming } else { Direction::Outgoing };
            let mut outcomes = BTreeMap::new();
            for repo in &repositories {
                let outcome = match relationship_type.as_deref() {
                    Some(rel) => repo.get_specific_relationships(&id, rel, direction).await,
                    None if incoming => repo.get_incoming_relationships(&id).await,
                    None => repo.get_relationships(&id).await,
                };
                outcomes.insert(repo.backend(), outcome);
            }
            report(outcomes, json)
        }
    }
}

fn repositories(factory: &RepositoryFactory, entity: &str, backends: &[BackendKind]) -> Result<Vec<Repository>> {
    backends
        .iter()
        .map(|&backend| factory.get_repository(entity, backend).map_err(Into::into))
        .collect()
}

fn report(outcomes: BTreeMap<BackendKind, BridgeResult<RowSet>>, json: bool) -> Result<()> {
    report_with(&outcomes, json, |set: &RowSet| {
        output::print_query_text(&set.query);
        output::print_rows(&set.rows);
    })
}

/// Print per-backend outcomes as JSON slots or through `print`.
fn report_with<T: Serialize>(
    outcomes: &BTreeMap<BackendKind, BridgeResult<T>>,
    json: bool,
    print: impl Fn(&T),
) -> Result<()> {
    if json {
        let value: BTreeMap<BackendKind, Value> = outcomes
            .iter()
            .map(|(backend, outcome)| (*backend, output::outcome_json(outcome)))
            .collect();
        return output::print_json(&value);
    }

    for (backend, outcome) in outcomes {
        output::print_backend_header(*backend);
        match outcome {
            Ok(value) => print(value),
            Err(e) => output::print_backend_error(e),
        }
    }
    Ok(())
}

async fn cmd_stats(repositories: &[Repository], json: bool) -> Result<()> {
    let mut outcomes = BTreeMap::new();
    for repo in repositories {
        outcomes.insert(repo.backend(), repo.get_stats().await);
    }
    report_with(&outcomes, json, output::print_stats)
}

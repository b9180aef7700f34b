//! CLI command definitions and handlers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use graphbridge_core::{BackendKind, BridgeConfig, BridgeError, BridgeResult, QueryExecutor, Row, Translator};
use graphbridge_memgraph::MemgraphClient;
use graphbridge_pgx::PgxClient;
use graphbridge_query::RepositoryFactory;
use tracing::warn;

pub mod entity;
pub mod graphs;
pub mod health;
pub mod query;
pub mod translate;

/// Upper bound on the Bolt handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "graphbridge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// TOML configuration file (environment variables override it)
    #[arg(short, long, global = true, env = "GRAPHBRIDGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the query a descriptor translates to
    Translate(translate::TranslateArgs),

    /// Repository operations on one entity type
    #[command(subcommand)]
    Entity(entity::EntityCommands),

    /// Resolve an entity by name and fetch its relationships
    Query(query::QueryArgs),

    /// List graphs on the REST graph service
    Graphs,

    /// Check every entity type on every backend
    Health(health::HealthArgs),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = BridgeConfig::load(self.config.as_deref()).context("Failed to load configuration")?;
        let json = self.json;

        match self.command {
            Commands::Translate(args) => translate::execute(args, &config, json),
            Commands::Entity(cmd) => entity::execute(cmd, &config, json).await,
            Commands::Query(args) => query::execute(args, &config, json).await,
            Commands::Graphs => graphs::execute(&config, json).await,
            Commands::Health(args) => health::execute(args, &config, json).await,
        }
    }
}

/// Parse a `--db` value (`oracle`, `memgraph`, `both`).
pub fn parse_backends(value: &str) -> Result<Vec<BackendKind>> {
    let backends = BackendKind::parse_set(value)?;
    if backends.is_empty() {
        anyhow::bail!("no backend selected");
    }
    Ok(backends)
}

/// Build a factory with an executor for each requested backend.
///
/// A backend that cannot be reached gets an [`UnavailableExecutor`], so its
/// failure shows up in that backend's results instead of aborting the command.
pub async fn build_factory(config: &BridgeConfig, backends: &[BackendKind]) -> RepositoryFactory {
    let mut factory = RepositoryFactory::new(Translator::new(&config.pgx.graph_name));
    for &backend in backends {
        factory = factory.with_executor(connect(config, backend).await);
    }
    factory
}

async fn connect(config: &BridgeConfig, backend: BackendKind) -> Arc<dyn QueryExecutor> {
    let connected: BridgeResult<Arc<dyn QueryExecutor>> = match backend {
        BackendKind::Oracle => PgxClient::connect(config.pgx.clone()).map(|c| Arc::new(c) as Arc<dyn QueryExecutor>),
        BackendKind::Memgraph => {
            match tokio::time::timeout(CONNECT_TIMEOUT, MemgraphClient::connect(&config.memgraph)).await {
                Ok(result) => result.map(|c| Arc::new(c) as Arc<dyn QueryExecutor>),
                Err(_) => Err(BridgeError::transport(format!(
                    "timed out connecting to {}",
                    config.memgraph.uri
                ))),
            }
        }
    };

    connected.unwrap_or_else(|e| {
        warn!(%backend, error = %e, "Backend unavailable");
        Arc::new(UnavailableExecutor {
            backend,
            reason: e.to_string(),
        })
    })
}

/// Stands in for a backend whose client could not be created.
struct UnavailableExecutor {
    backend: BackendKind,
    reason: String,
}

#[async_trait]
impl QueryExecutor for UnavailableExecutor {
    fn backend(&self) -> BackendKind {
        self.backend
    }

    async fn run(&self, _query: &str) -> BridgeResult<Vec<Row>> {
        Err(BridgeError::transport(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_command() {
        let cli = Cli::try_parse_from([
            "graphbridge",
            "query",
            "--entity",
            "person",
            "--name",
            "Alan Turing",
            "--relationship",
            "WORKS_IN",
            "--json",
        ])
        .unwrap();

        assert!(cli.json);
        match cli.command {
            Commands::Query(args) => {
                assert_eq!(args.entity, "person");
                assert_eq!(args.name, "Alan Turing");
                assert_eq!(args.relationship.as_deref(), Some("WORKS_IN"));
                assert_eq!(args.db, "both");
            }
            _ => panic!("expected query command"),
        }
    }

    #[test]
    fn test_parse_entity_subcommand() {
        let cli = Cli::try_parse_from(["graphbridge", "entity", "get", "person", "Q7251", "--db", "memgraph"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Entity(entity::EntityCommands::Get { entity: ref label, ref id, ref db })
                if label == "person" && id == "Q7251" && db == "memgraph"
        ));
    }

    #[test]
    fn test_parse_mutation_subcommands() {
        let cli = Cli::try_parse_from([
            "graphbridge",
            "entity",
            "delete-edge",
            "person",
            "Q7251",
            "WORKED_AT",
            "workplace",
            "Q35794",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Entity(entity::EntityCommands::DeleteEdge { ref relationship, ref db, .. })
                if relationship == "WORKED_AT" && db == "memgraph"
        ));

        let cli = Cli::try_parse_from(["graphbridge", "entity", "bulk-delete", "person", "Q1", "Q2", "--db", "both"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Entity(entity::EntityCommands::BulkDelete { ref ids, .. }) if ids == &["Q1", "Q2"]
        ));

        let cli = Cli::try_parse_from([
            "graphbridge",
            "entity",
            "create-node",
            "field",
            "--props",
            r#"{"name": "Logic"}"#,
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Entity(entity::EntityCommands::CreateNode { .. })));

        assert!(Cli::try_parse_from(["graphbridge", "entity", "bulk-delete", "person"]).is_err());
    }

    #[test]
    fn test_parse_backends() {
        assert_eq!(parse_backends("both").unwrap(), BackendKind::ALL.to_vec());
        assert!(parse_backends("postgres").is_err());
    }

    #[tokio::test]
    async fn test_unavailable_executor_reports_transport_error() {
        let executor = UnavailableExecutor {
            backend: BackendKind::Memgraph,
            reason: "connection refused".to_string(),
        };
        assert_eq!(executor.backend(), BackendKind::Memgraph);
        let err = executor.run("MATCH (n) RETURN n").await.unwrap_err();
        assert!(matches!(err, BridgeError::Transport(ref m) if m == "connection refused"));
    }
}

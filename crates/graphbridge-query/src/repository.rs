//! Per-(entity, backend) data access.
//!
//! A repository turns each verb into a query descriptor, translates it for
//! its backend and runs it. Rows come back untouched; the generated query
//! text travels with them so callers can show what was executed.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use graphbridge_core::catalog::{decode_vertex_id, edge_config, encode_vertex_id, entity_config, label_names};
use graphbridge_core::model::value_to_string;
use graphbridge_core::translator::VERTEX_ID_KEY;
use graphbridge_core::{
    AggregateSpec, BackendKind, BridgeError, BridgeResult, Direction, Operation, QueryExecutor, QueryParameters, RelationMode,
    RelationshipSpec, Row, Translator, WhereValue,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Longest accepted entity name, in characters.
pub const MAX_NAME_LENGTH: usize = 200;

/// Column carrying the entity count in [`Repository::get_stats`].
pub const TOTAL_COUNT_KEY: &str = "total_count";

/// Rows plus the query that produced them.
#[derive(Debug, Clone, Serialize)]
pub struct RowSet {
    pub query: String,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntityStats {
    pub entity_label: String,
    pub backend: BackendKind,
    pub total_count: u64,
    pub query: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub entity_label: String,
    pub backend: BackendKind,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A vertex written by [`Repository::create_node`].
#[derive(Debug, Clone, Serialize)]
pub struct CreatedNode {
    pub id: String,
    pub entity_label: String,
    pub backend: BackendKind,
    pub query: String,
    pub rows: Vec<Row>,
}

/// Outcome of [`Repository::delete_node`].
#[derive(Debug, Clone, Serialize)]
pub struct NodeDeletion {
    pub id: String,
    pub entity_label: String,
    pub backend: BackendKind,
    /// Edges removed with the node, when the backend reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_edges: Option<u64>,
    pub queries: Vec<String>,
}

/// Outcome of [`Repository::delete_edge`].
#[derive(Debug, Clone, Serialize)]
pub struct EdgeDeletion {
    pub relationship_type: String,
    pub source_id: String,
    pub target_id: String,
    pub backend: BackendKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_count: Option<u64>,
    pub query: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedDeletion {
    pub id: String,
    pub code: &'static str,
    pub message: String,
}

/// Per-id outcomes of [`Repository::bulk_delete_nodes`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkDeleteReport {
    pub requested: usize,
    pub deleted: Vec<NodeDeletion>,
    pub failed: Vec<FailedDeletion>,
}

impl BulkDeleteReport {
    pub fn success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Data access for one entity type on one backend.
#[derive(Clone)]
pub struct Repository {
    entity_label: String,
    backend: BackendKind,
    executor: Arc<dyn QueryExecutor>,
    translator: Arc<Translator>,
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("entity_label", &self.entity_label)
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl Repository {
    pub fn new(entity_label: &str, executor: Arc<dyn QueryExecutor>, translator: Arc<Translator>) -> Self {
        Self {
            entity_label: entity_label.to_string(),
            backend: executor.backend(),
            executor,
            translator,
        }
    }

    pub fn entity_label(&self) -> &str {
        &self.entity_label
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    async fn execute(&self, operation: Operation, params: &QueryParameters) -> BridgeResult<RowSet> {
        let query = self
            .translator
            .translate_operation(self.backend, &self.entity_label, operation, params);
        let rows = self.run(&query).await?;
        Ok(RowSet { query, rows })
    }

    async fn run(&self, query: &str) -> BridgeResult<Vec<Row>> {
        debug!(backend = %self.backend, entity = %self.entity_label, query = %query, "Executing");
        self.executor
            .run(query)
            .await
            .map_err(|e| e.scoped(self.backend, &self.entity_label))
    }

    fn search_field(&self) -> &'static str {
        entity_config(&self.entity_label)
            .map(|e| e.search_field)
            .unwrap_or("name")
    }

    pub async fn find_all(&self, limit: u64) -> BridgeResult<RowSet> {
        let params = QueryParameters::default().with_limit(limit);
        self.execute(Operation::Find, &params).await
    }

    /// Look up one entity by its backend identifier.
    ///
    /// The REST backend matches on the composite vertex id, the native
    /// store on the `id` property. Either id form is accepted.
    pub async fn find_by_id(&self, id: &str) -> BridgeResult<RowSet> {
        let filter = match self.backend {
            BackendKind::Oracle => {
                let vertex_id = match decode_vertex_id(id) {
                    Some(_) => id.to_string(),
                    None => encode_vertex_id(&label_names(&self.entity_label).oracle_table, id),
                };
                (VERTEX_ID_KEY, vertex_id)
            }
            BackendKind::Memgraph => {
                let plain = decode_vertex_id(id).map(|(_, inner)| inner).unwrap_or(id);
                ("id", plain.to_string())
            }
        };
        let params = QueryParameters::default()
            .with_filter(filter.0, WhereValue::eq(filter.1))
            .with_limit(1);
        self.execute(Operation::Find, &params).await
    }

    /// Case-insensitive substring search on the entity's search field.
    /// An empty term lists entities instead.
    pub async fn search_by_name(&self, term: &str, limit: u64) -> BridgeResult<RowSet> {
        let term = term.trim();
        if term.is_empty() {
            return self.find_all(limit).await;
        }
        let field = self.search_field();
        let params = QueryParameters::default()
            .with_filter(field, WhereValue::op("icontains", term))
            .with_limit(limit);
        self.execute(Operation::Find, &params).await
    }

    pub async fn get_relationships(&self, id: &str) -> BridgeResult<RowSet> {
        self.traverse(id, None, Direction::Outgoing).await
    }

    pub async fn get_incoming_relationships(&self, id: &str) -> BridgeResult<RowSet> {
        self.traverse(id, None, Direction::Incoming).await
    }

    pub async fn get_specific_relationships(
        &self,
        id: &str,
        relationship_type: &str,
        direction: Direction,
    ) -> BridgeResult<RowSet> {
        self.traverse(id, Some(relationship_type), direction).await
    }

    async fn traverse(&self, id: &str, relationship_type: Option<&str>, direction: Direction) -> BridgeResult<RowSet> {
        let params = QueryParameters::default().with_relationship(RelationshipSpec {
            relationship_type: relationship_type.map(str::to_string),
            direction,
            anchor_id: Some(id.to_string()),
            ..Default::default()
        });
        self.execute(Operation::Relation, &params).await
    }

    /// Entity count for the label.
    pub async fn get_stats(&self) -> BridgeResult<EntityStats> {
        let params = QueryParameters::default().with_aggregate(AggregateSpec::count_all(TOTAL_COUNT_KEY));
        let result = self.execute(Operation::Aggregate, &params).await?;
        let total_count = result.rows.first().and_then(count_of).unwrap_or(0);

        Ok(EntityStats {
            entity_label: self.entity_label.clone(),
            backend: self.backend,
            total_count,
            query: result.query,
        })
    }

    /// Check the backend with a one-row read. Never fails; the outcome is
    /// reported in the status.
    pub async fn health_check(&self) -> HealthStatus {
        let error = match self.find_all(1).await {
            Ok(_) => None,
            Err(e) => {
                warn!(backend = %self.backend, entity = %self.entity_label, error = %e, "Health check failed");
                Some(e.to_string())
            }
        };
        HealthStatus {
            entity_label: self.entity_label.clone(),
            backend: self.backend,
            healthy: error.is_none(),
            error,
        }
    }

    /// Create an outgoing edge from `source_id` to `target_id`.
    pub async fn create_edge(
        &self,
        source_id: &str,
        relationship_type: &str,
        target_label: &str,
        target_id: &str,
        properties: BTreeMap<String, Value>,
    ) -> BridgeResult<RowSet> {
        let params = QueryParameters::default().with_relationship(RelationshipSpec {
            relationship_type: Some(relationship_type.to_string()),
            direction: Direction::Outgoing,
            anchor_id: Some(source_id.to_string()),
            target_label: Some(target_label.to_string()),
            target_id: Some(target_id.to_string()),
            properties,
            mode: RelationMode::Create,
        });
        self.execute(Operation::Relation, &params).await
    }

    /// Create one entity vertex.
    ///
    /// Properties outside the catalog's fields are dropped. A missing `id`
    /// gets a generated `Q`-prefixed ten-digit id.
    pub async fn create_node(&self, properties: BTreeMap<String, Value>) -> BridgeResult<CreatedNode> {
        let mut properties = self.node_properties(properties);
        validate_node(&self.entity_label, &properties)?;

        let id = match properties.get("id").and_then(value_to_string) {
            Some(id) if !id.trim().is_empty() => id.trim().to_string(),
            _ => generate_id(),
        };
        properties.insert("id".to_string(), Value::String(id.clone()));

        let query = self.translator.create_node(self.backend, &self.entity_label, &properties);
        let rows = self.run(&query).await?;
        info!(backend = %self.backend, entity = %self.entity_label, %id, "Created node");

        Ok(CreatedNode {
            id,
            entity_label: self.entity_label.clone(),
            backend: self.backend,
            query,
            rows,
        })
    }

    fn node_properties(&self, properties: BTreeMap<String, Value>) -> BTreeMap<String, Value> {
        let Some(entity) = entity_config(&self.entity_label) else {
            return properties;
        };
        properties
            .into_iter()
            .filter(|(key, _)| {
                let known = key == "id"
                    || entity.oracle_fields.contains(&key.as_str())
                    || entity.memgraph_fields.contains(&key.as_str());
                if !known {
                    debug!(entity = %self.entity_label, property = %key, "Dropping unknown property");
                }
                known
            })
            .collect()
    }

    /// Delete one entity and every edge attached to it.
    pub async fn delete_node(&self, id: &str) -> BridgeResult<NodeDeletion> {
        let existing = self.find_by_id(id).await?;
        if existing.rows.is_empty() {
            return Err(BridgeError::EntityNotFound {
                backend: self.backend,
                entity_label: self.entity_label.clone(),
                name: id.to_string(),
            });
        }

        let statements = self.translator.delete_node(self.backend, &self.entity_label, id);
        let mut deleted_edges = None;
        for statement in &statements {
            let rows = self.run(statement).await?;
            if let Some(count) = rows.first().and_then(|row| count_column(row, "deleted_edges")) {
                deleted_edges = Some(count);
            }
        }
        info!(backend = %self.backend, entity = %self.entity_label, %id, "Deleted node");

        Ok(NodeDeletion {
            id: plain_id(id).to_string(),
            entity_label: self.entity_label.clone(),
            backend: self.backend,
            deleted_edges,
            queries: statements,
        })
    }

    /// Delete the outgoing `relationship_type` edge between two entities.
    ///
    /// The native store reports how many edges matched; zero is an
    /// [`BridgeError::EdgeNotFound`].
    pub async fn delete_edge(
        &self,
        source_id: &str,
        relationship_type: &str,
        target_label: &str,
        target_id: &str,
    ) -> BridgeResult<EdgeDeletion> {
        let edge = edge_config(relationship_type)
            .ok_or_else(|| BridgeError::validation(format!("unknown relationship type '{}'", relationship_type)))?;

        let params = QueryParameters::default().with_relationship(RelationshipSpec {
            relationship_type: Some(edge.relationship_type.to_string()),
            direction: Direction::Outgoing,
            anchor_id: Some(source_id.to_string()),
            target_label: Some(target_label.to_string()),
            target_id: Some(target_id.to_string()),
            mode: RelationMode::Delete,
            ..Default::default()
        });
        let result = self.execute(Operation::Relation, &params).await?;

        let deleted_count = match self.backend {
            BackendKind::Memgraph => Some(
                result
                    .rows
                    .first()
                    .and_then(|row| count_column(row, "deleted_count"))
                    .unwrap_or(0),
            ),
            BackendKind::Oracle => None,
        };
        if deleted_count == Some(0) {
            return Err(BridgeError::EdgeNotFound {
                backend: self.backend,
                relationship_type: edge.relationship_type.to_string(),
                source_id: plain_id(source_id).to_string(),
                target_id: plain_id(target_id).to_string(),
            });
        }

        Ok(EdgeDeletion {
            relationship_type: edge.relationship_type.to_string(),
            source_id: plain_id(source_id).to_string(),
            target_id: plain_id(target_id).to_string(),
            backend: self.backend,
            deleted_count,
            query: result.query,
        })
    }

    /// Delete each id in turn. A failure is recorded and the rest still run.
    pub async fn bulk_delete_nodes(&self, ids: &[String]) -> BulkDeleteReport {
        let mut report = BulkDeleteReport {
            requested: ids.len(),
            ..Default::default()
        };
        for id in ids {
            match self.delete_node(id).await {
                Ok(deletion) => report.deleted.push(deletion),
                Err(e) => {
                    warn!(backend = %self.backend, entity = %self.entity_label, %id, error = %e, "Delete failed");
                    report.failed.push(FailedDeletion {
                        id: id.clone(),
                        code: e.code(),
                        message: e.to_string(),
                    });
                }
            }
        }
        report
    }
}

fn plain_id(id: &str) -> &str {
    decode_vertex_id(id).map(|(_, inner)| inner).unwrap_or(id)
}

/// `Q` followed by ten digits, derived from the current time.
fn generate_id() -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default().unsigned_abs();
    format!("Q{}", 1_000_000_000 + nanos % 9_000_000_000)
}

fn parse_date(field: &str, properties: &BTreeMap<String, Value>) -> BridgeResult<Option<NaiveDate>> {
    match properties.get(field).and_then(value_to_string) {
        Some(text) => NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| BridgeError::validation(format!("{} must be a YYYY-MM-DD date, got '{}'", field, text))),
        None => Ok(None),
    }
}

fn validate_node(entity_label: &str, properties: &BTreeMap<String, Value>) -> BridgeResult<()> {
    let name = properties.get("name").and_then(value_to_string).unwrap_or_default();
    let name = name.trim();
    if name.is_empty() {
        return Err(BridgeError::validation("name is required"));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(BridgeError::validation(format!(
            "name must be at most {} characters",
            MAX_NAME_LENGTH
        )));
    }

    if entity_label == "person" {
        let birth = parse_date("birth_date", properties)?;
        let death = parse_date("death_date", properties)?;
        if let (Some(birth), Some(death)) = (birth, death) {
            if death <= birth {
                return Err(BridgeError::validation("death_date must be after birth_date"));
            }
        }
    }
    Ok(())
}

/// Count from an aggregate row: the named column, else the only numeric
/// value (the REST service returns bare scalars for single aggregates).
fn count_of(row: &Row) -> Option<u64> {
    count_column(row, TOTAL_COUNT_KEY).or_else(|| row.values().find_map(as_count))
}

fn count_column(row: &Row, key: &str) -> Option<u64> {
    row.iter()
        .find(|(column, _)| column.eq_ignore_ascii_case(key))
        .and_then(|(_, value)| as_count(value))
}

fn as_count(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_f64().map(|f| f as u64))
        .or_else(|| value_to_string(value).and_then(|s| s.parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeExecutor;
    use serde_json::json;

    fn repository(executor: &Arc<FakeExecutor>, entity_label: &str) -> Repository {
        Repository::new(entity_label, executor.clone(), Arc::new(Translator::default()))
    }

    #[tokio::test]
    async fn test_search_keeps_backend_order() {
        let oracle = Arc::new(FakeExecutor::new(BackendKind::Oracle));
        let memgraph = Arc::new(FakeExecutor::new(BackendKind::Memgraph));

        let rest = repository(&oracle, "person").search_by_name("turing", 5).await.unwrap();
        let native = repository(&memgraph, "person").search_by_name("turing", 5).await.unwrap();
        assert!(!rest.query.contains("ORDER BY"), "{}", rest.query);
        assert!(!native.query.contains("ORDER BY"), "{}", native.query);
    }

    #[tokio::test]
    async fn test_relationships_are_not_capped() {
        for backend in BackendKind::ALL {
            let executor = Arc::new(FakeExecutor::new(backend));
            let repo = repository(&executor, "person");

            let all = repo.get_relationships("Q7251").await.unwrap();
            let typed = repo
                .get_specific_relationships("Q7251", "WORKS_IN", Direction::Incoming)
                .await
                .unwrap();
            assert!(!all.query.contains("LIMIT"), "{}", all.query);
            assert!(!typed.query.contains("LIMIT"), "{}", typed.query);
        }
    }

    #[test]
    fn test_debug_shows_label_and_backend() {
        let executor = Arc::new(FakeExecutor::new(BackendKind::Oracle));
        let text = format!("{:?}", repository(&executor, "award"));
        assert!(text.contains("\"award\""));
        assert!(text.contains("Oracle"));
    }

    #[tokio::test]
    async fn test_create_node_generates_id_and_drops_unknown_properties() {
        let executor = Arc::new(FakeExecutor::new(BackendKind::Memgraph));
        let repo = repository(&executor, "person");
        let mut properties = BTreeMap::new();
        properties.insert("name".to_string(), json!("Ada Lovelace"));
        properties.insert("birth_date".to_string(), json!("1815-12-10"));
        properties.insert("shoe_size".to_string(), json!(38));

        let created = repo.create_node(properties).await.unwrap();
        assert!(created.id.starts_with('Q'));
        assert_eq!(created.id.len(), 11);
        assert!(created.id[1..].chars().all(|c| c.is_ascii_digit()));
        assert!(created.query.starts_with("CREATE (n:person {birth_date: '1815-12-10'"));
        assert!(created.query.contains(&format!("id: '{}'", created.id)));
        assert!(!created.query.contains("shoe_size"));
    }

    #[tokio::test]
    async fn test_create_node_keeps_given_id() {
        let executor = Arc::new(FakeExecutor::new(BackendKind::Oracle));
        let repo = repository(&executor, "field");
        let mut properties = BTreeMap::new();
        properties.insert("id".to_string(), json!("Q395"));
        properties.insert("name".to_string(), json!("Mathematics"));

        let created = repo.create_node(properties).await.unwrap();
        assert_eq!(created.id, "Q395");
        assert_eq!(created.query, "INSERT INTO FIELDS (id, name) VALUES ('Q395', 'Mathematics')");
    }

    #[tokio::test]
    async fn test_create_node_validation() {
        let executor = Arc::new(FakeExecutor::new(BackendKind::Memgraph));
        let repo = repository(&executor, "person");
        let node = |pairs: &[(&str, Value)]| -> BTreeMap<String, Value> {
            pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
        };

        let cases = [
            node(&[("name", json!("   "))]),
            node(&[("name", json!("x".repeat(MAX_NAME_LENGTH + 1)))]),
            node(&[("name", json!("Ada")), ("birth_date", json!("1852-11-27")), ("death_date", json!("1815-12-10"))]),
            node(&[("name", json!("Ada")), ("birth_date", json!("10/12/1815"))]),
        ];
        for properties in cases {
            let err = repo.create_node(properties).await.unwrap_err();
            assert_eq!(err.code(), "validation_error", "{err}");
        }
        assert!(executor.queries().is_empty());
    }

    #[tokio::test]
    async fn test_delete_node_requires_existing_entity() {
        let executor = Arc::new(FakeExecutor::new(BackendKind::Memgraph));
        let repo = repository(&executor, "person");

        let err = repo.delete_node("Q404").await.unwrap_err();
        assert!(matches!(err, BridgeError::EntityNotFound { ref name, .. } if name == "Q404"));
        assert_eq!(executor.queries().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_node_reports_detached_edges() {
        let executor = Arc::new(
            FakeExecutor::new(BackendKind::Memgraph)
                .respond("e.id = 'Q7251'", vec![json!({"name": "Alan Turing"})])
                .respond("DETACH DELETE", vec![json!({"deleted_edges": 4})]),
        );
        let repo = repository(&executor, "person");

        let deletion = repo.delete_node("PERSONS(Q7251)").await.unwrap();
        assert_eq!(deletion.id, "Q7251");
        assert_eq!(deletion.deleted_edges, Some(4));
        assert_eq!(deletion.queries.len(), 1);
        assert_eq!(executor.queries().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_node_clears_edge_tables_before_vertex() {
        let executor = Arc::new(
            FakeExecutor::new(BackendKind::Oracle).respond("id(e) = 'FIELDS(Q395)'", vec![json!({"name": "Mathematics"})]),
        );
        let repo = repository(&executor, "field");

        let deletion = repo.delete_node("Q395").await.unwrap();
        assert_eq!(deletion.deleted_edges, None);
        let queries = executor.queries();
        assert_eq!(
            &queries[1..],
            &[
                "DELETE FROM WORKS_IN_EDGES WHERE field_id = 'Q395'".to_string(),
                "DELETE FROM FIELDS WHERE id = 'Q395'".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_edge() {
        let executor = Arc::new(
            FakeExecutor::new(BackendKind::Memgraph)
                .respond("{id: 'Q35794'}", vec![json!({"deleted_count": 1})])
                .respond("DELETE e", vec![json!({"deleted_count": 0})]),
        );
        let repo = repository(&executor, "person");

        let deletion = repo.delete_edge("Q7251", "worked_at", "workplace", "Q35794").await.unwrap();
        assert_eq!(deletion.relationship_type, "WORKED_AT");
        assert_eq!(deletion.deleted_count, Some(1));
        assert!(deletion.query.contains("DELETE e"));

        let missing = repo.delete_edge("Q7251", "WORKED_AT", "workplace", "Q1").await.unwrap_err();
        assert_eq!(missing.code(), "edge_not_found");

        let unknown = repo.delete_edge("Q7251", "ORBITS", "planet", "Q2").await.unwrap_err();
        assert_eq!(unknown.code(), "validation_error");
        assert_eq!(executor.queries().len(), 2);
    }

    #[tokio::test]
    async fn test_bulk_delete_continues_past_failures() {
        let executor = Arc::new(
            FakeExecutor::new(BackendKind::Memgraph)
                .respond("e.id = 'Q7251'", vec![json!({"name": "Alan Turing"})])
                .respond("e.id = 'Q937'", vec![json!({"name": "Albert Einstein"})]),
        );
        let repo = repository(&executor, "person");
        let ids = vec!["Q7251".to_string(), "Q404".to_string(), "Q937".to_string()];

        let report = repo.bulk_delete_nodes(&ids).await;
        assert!(!report.success());
        assert_eq!(report.requested, 3);
        let deleted: Vec<_> = report.deleted.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(deleted, vec!["Q7251", "Q937"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].id, "Q404");
        assert_eq!(report.failed[0].code, "entity_not_found");
    }
}

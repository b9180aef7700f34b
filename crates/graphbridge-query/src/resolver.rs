//! Name-based relationship lookup across both backends.
//!
//! Each requested backend runs its own pipeline: find the entity by name,
//! pull its backend identifier out of the first row, fetch its outgoing
//! relationships and optionally filter them by target type. Pipelines run
//! concurrently and one backend failing never hides the other's answer.

use std::collections::BTreeMap;

use futures::future::join_all;
use graphbridge_core::catalog::{decode_vertex_id, entity_config, entity_for_table};
use graphbridge_core::model::row_str;
use graphbridge_core::translator::VERTEX_ID_KEY;
use graphbridge_core::{BackendKind, BridgeError, BridgeResult, Direction, Row};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use tracing::{info, warn};

use crate::factory::RepositoryFactory;
use crate::repository::Repository;

/// Candidates fetched when searching the source entity by name.
pub const CANDIDATE_LIMIT: u64 = 5;

fn all_backends() -> Vec<BackendKind> {
    BackendKind::ALL.to_vec()
}

/// A structured query as received from a caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredQuery {
    pub entity_label: String,
    pub entity_name: String,
    #[serde(default)]
    pub relationship_type: Option<String>,
    #[serde(default)]
    pub target_entity_label: Option<String>,
    #[serde(default = "all_backends")]
    pub backends: Vec<BackendKind>,
}

impl StructuredQuery {
    pub fn new(entity_label: &str, entity_name: &str) -> Self {
        Self {
            entity_label: entity_label.to_string(),
            entity_name: entity_name.to_string(),
            relationship_type: None,
            target_entity_label: None,
            backends: all_backends(),
        }
    }

    pub fn with_relationship(mut self, relationship_type: &str) -> Self {
        self.relationship_type = Some(relationship_type.to_string());
        self
    }

    pub fn with_target(mut self, target_entity_label: &str) -> Self {
        self.target_entity_label = Some(target_entity_label.to_string());
        self
    }

    pub fn with_backends(mut self, backends: Vec<BackendKind>) -> Self {
        self.backends = backends;
        self
    }
}

/// One relationship normalized across backends.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipResult {
    pub relationship_type: String,
    pub target_identifier: Option<String>,
    pub target_name: Option<String>,
    /// Native store only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_labels: Option<Vec<String>>,
    /// REST only: the entity type derived from the target vertex id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_descriptor: Option<String>,
}

impl RelationshipResult {
    pub fn from_row(backend: BackendKind, row: &Row) -> Self {
        let relationship_type = row_str(row, &["relationship_type"]).unwrap_or_default();
        let target_name = row_str(row, &["target_name"]);

        match backend {
            BackendKind::Oracle => {
                let vertex_id = row_str(row, &["target_vertex_id"]);
                let decoded = vertex_id.as_deref().and_then(decode_vertex_id);
                Self {
                    relationship_type,
                    target_identifier: decoded.map(|(_, id)| id.to_string()).or_else(|| vertex_id.clone()),
                    target_name,
                    target_labels: None,
                    target_descriptor: decoded.map(|(table, _)| match entity_for_table(table) {
                        Some(entity) => entity.key.to_string(),
                        None => table.to_lowercase(),
                    }),
                }
            }
            BackendKind::Memgraph => {
                let labels = row
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case("target_labels"))
                    .and_then(|(_, value)| value.as_array())
                    .map(|labels| labels.iter().filter_map(Value::as_str).map(str::to_string).collect());
                Self {
                    relationship_type,
                    target_identifier: row_str(row, &["target_entity_id", "target_vertex_id"]),
                    target_name,
                    target_labels: labels,
                    target_descriptor: None,
                }
            }
        }
    }

    /// Case-insensitive match of the target type against any of the
    /// catalog's names for `label`.
    pub fn matches_target(&self, label: &str) -> bool {
        let wanted: Vec<&str> = match entity_config(label) {
            Some(entity) => vec![entity.key, entity.oracle_label, entity.memgraph_label],
            None => vec![label.trim()],
        };
        self.target_labels
            .iter()
            .flatten()
            .map(String::as_str)
            .chain(self.target_descriptor.as_deref())
            .any(|candidate| wanted.iter().any(|w| w.eq_ignore_ascii_case(candidate)))
    }
}

/// Successful pipeline result for one backend.
#[derive(Debug, Clone, Serialize)]
pub struct BackendResolution {
    pub source_entity: Row,
    pub source_identifier: String,
    pub relationships: Vec<RelationshipResult>,
    pub count: usize,
    /// Query text of the relationship fetch.
    pub query: String,
}

/// Per-backend outcomes. `success` is false only when every slot failed.
#[derive(Debug)]
pub struct StructuredQueryResult {
    pub query: StructuredQuery,
    pub results: BTreeMap<BackendKind, BridgeResult<BackendResolution>>,
}

impl StructuredQueryResult {
    pub fn success(&self) -> bool {
        self.results.values().any(Result::is_ok)
    }

    pub fn get(&self, backend: BackendKind) -> Option<&BridgeResult<BackendResolution>> {
        self.results.get(&backend)
    }
}

struct ErrorSlot<'a>(&'a BridgeError);

impl Serialize for ErrorSlot<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ErrorSlot", 2)?;
        state.serialize_field("code", self.0.code())?;
        state.serialize_field("message", &self.0.to_string())?;
        state.end()
    }
}

struct Slots<'a>(&'a BTreeMap<BackendKind, BridgeResult<BackendResolution>>);

impl Serialize for Slots<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (backend, outcome) in self.0 {
            match outcome {
                Ok(resolution) => map.serialize_entry(backend.as_str(), resolution)?,
                Err(e) => {
                    let mut slot = BTreeMap::new();
                    slot.insert("error", ErrorSlot(e));
                    map.serialize_entry(backend.as_str(), &slot)?
                }
            }
        }
        map.end()
    }
}

impl Serialize for StructuredQueryResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("StructuredQueryResult", 3)?;
        state.serialize_field("success", &self.success())?;
        state.serialize_field("query", &self.query)?;
        state.serialize_field("results", &Slots(&self.results))?;
        state.end()
    }
}

/// Resolves structured queries through a [`RepositoryFactory`].
pub struct StructuredQueryResolver {
    factory: RepositoryFactory,
}

impl StructuredQueryResolver {
    pub fn new(factory: RepositoryFactory) -> Self {
        Self { factory }
    }

    pub fn factory(&self) -> &RepositoryFactory {
        &self.factory
    }

    /// Run the query on every requested backend.
    ///
    /// Fails only when the query itself is unusable (empty name, no
    /// backends or unknown entity type). Backend failures, including a
    /// requested backend with no configured executor, are reported in that
    /// backend's result slot.
    pub async fn resolve(&self, query: StructuredQuery) -> BridgeResult<StructuredQueryResult> {
        let name = query.entity_name.trim();
        if name.is_empty() {
            return Err(BridgeError::validation("entity name must not be empty"));
        }
        if query.backends.is_empty() {
            return Err(BridgeError::validation("at least one backend is required"));
        }
        if entity_config(&query.entity_label).is_none() {
            return Err(BridgeError::UnknownEntityType(query.entity_label.clone()));
        }

        let mut backends = query.backends.clone();
        backends.sort();
        backends.dedup();
        let outcomes = join_all(backends.iter().map(|&backend| {
            let query = &query;
            async move {
                let repo = self.factory.get_repository(&query.entity_label, backend)?;
                self.resolve_on(&repo, query, name).await
            }
        }))
        .await;

        let results: BTreeMap<_, _> = backends.into_iter().zip(outcomes).collect();
        for (backend, outcome) in &results {
            match outcome {
                Ok(resolution) => info!(%backend, count = resolution.count, "Resolved structured query"),
                Err(e) => warn!(%backend, code = e.code(), error = %e, "Structured query failed on backend"),
            }
        }

        Ok(StructuredQueryResult { query, results })
    }

    async fn resolve_on(&self, repo: &Repository, query: &StructuredQuery, name: &str) -> BridgeResult<BackendResolution> {
        let backend = repo.backend();
        let candidates = repo.search_by_name(name, CANDIDATE_LIMIT).await?;
        let source = candidates
            .rows
            .into_iter()
            .next()
            .ok_or_else(|| BridgeError::EntityNotFound {
                backend,
                entity_label: repo.entity_label().to_string(),
                name: name.to_string(),
            })?;

        let identifier = extract_identifier(backend, &source).ok_or_else(|| BridgeError::IdentifierExtraction {
            backend,
            entity_label: repo.entity_label().to_string(),
        })?;

        let fetched = match query.relationship_type.as_deref() {
            Some(relationship_type) => {
                repo.get_specific_relationships(&identifier, relationship_type, Direction::Outgoing)
                    .await?
            }
            None => repo.get_relationships(&identifier).await?,
        };

        let mut relationships: Vec<RelationshipResult> = fetched
            .rows
            .iter()
            .map(|row| RelationshipResult::from_row(backend, row))
            .collect();
        if let Some(target) = query.target_entity_label.as_deref() {
            relationships.retain(|r| r.matches_target(target));
        }

        Ok(BackendResolution {
            source_entity: source,
            source_identifier: identifier,
            count: relationships.len(),
            relationships,
            query: fetched.query,
        })
    }
}

/// Backend identifier of a source row: the id inside the composite REST
/// vertex id, or the native `id` property.
pub fn extract_identifier(backend: BackendKind, row: &Row) -> Option<String> {
    match backend {
        BackendKind::Oracle => {
            let vertex_id = row_str(row, &[VERTEX_ID_KEY])?;
            decode_vertex_id(&vertex_id).map(|(_, id)| id.to_string())
        }
        BackendKind::Memgraph => row_str(row, &["id"]).or_else(|| {
            row.get("all_properties")
                .and_then(Value::as_object)
                .and_then(|properties| row_str(properties, &["id"]))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeExecutor;
    use graphbridge_core::Translator;
    use serde_json::json;
    use std::sync::Arc;

    fn turing_oracle() -> FakeExecutor {
        FakeExecutor::new(BackendKind::Oracle)
            .respond(
                "UPPER(e.name) LIKE UPPER('%Alan Turing%')",
                vec![json!({"vertex_id": "PERSONS(Q7251)", "name": "Alan Turing"})],
            )
            .respond(
                "id(source) = 'PERSONS(Q7251)'",
                vec![
                    json!({"relationship_type": "WORKS_IN", "target_vertex_id": "FIELDS(Q395)", "target_name": "Mathematics"}),
                    json!({"relationship_type": "WORKS_IN", "target_vertex_id": "FIELDS(Q21198)", "target_name": "Computer Science"}),
                ],
            )
    }

    fn turing_memgraph() -> FakeExecutor {
        FakeExecutor::new(BackendKind::Memgraph)
            .respond(
                "toUpper(e.name) CONTAINS toUpper('Alan Turing')",
                vec![json!({"vertex_id": 17, "labels": ["person"], "id": "Q7251", "name": "Alan Turing"})],
            )
            .respond(
                "(source:person {id: 'Q7251'})",
                vec![
                    json!({"relationship_type": "WORKS_IN", "target_vertex_id": 40, "target_labels": ["field"], "target_entity_id": "Q395", "target_name": "Mathematics"}),
                    json!({"relationship_type": "WORKS_IN", "target_vertex_id": 41, "target_labels": ["Field"], "target_entity_id": "Q21198", "target_name": "Computer Science"}),
                ],
            )
    }

    fn resolver(oracle: FakeExecutor, memgraph: FakeExecutor) -> StructuredQueryResolver {
        StructuredQueryResolver::new(
            RepositoryFactory::new(Translator::default())
                .with_executor(Arc::new(oracle))
                .with_executor(Arc::new(memgraph)),
        )
    }

    #[tokio::test]
    async fn test_turing_works_in_on_both_backends() {
        let resolver = resolver(turing_oracle(), turing_memgraph());
        let query = StructuredQuery::new("person", "Alan Turing")
            .with_relationship("WORKS_IN")
            .with_target("field");

        let result = resolver.resolve(query).await.unwrap();
        assert!(result.success());

        let oracle = result.get(BackendKind::Oracle).unwrap().as_ref().unwrap();
        let memgraph = result.get(BackendKind::Memgraph).unwrap().as_ref().unwrap();
        assert_eq!(oracle.source_identifier, "Q7251");
        assert_eq!(memgraph.source_identifier, "Q7251");

        let names = |r: &BackendResolution| -> Vec<Option<String>> {
            r.relationships.iter().map(|rel| rel.target_name.clone()).collect()
        };
        assert_eq!(oracle.count, 2);
        assert_eq!(names(oracle), names(memgraph));
        assert!(names(oracle).contains(&Some("Mathematics".to_string())));
        assert_eq!(oracle.relationships[0].target_descriptor.as_deref(), Some("field"));
        assert_ne!(oracle.query, memgraph.query);
    }

    #[tokio::test]
    async fn test_target_filter_excludes_other_types() {
        let resolver = resolver(turing_oracle(), turing_memgraph());
        let query = StructuredQuery::new("person", "Alan Turing").with_target("AWARD");

        let result = resolver.resolve(query).await.unwrap();
        for backend in BackendKind::ALL {
            let resolution = result.get(backend).unwrap().as_ref().unwrap();
            assert_eq!(resolution.count, 0);
        }
    }

    #[tokio::test]
    async fn test_one_backend_down_keeps_the_other() {
        let memgraph_down = FakeExecutor::new(BackendKind::Memgraph).failing("MATCH");
        let resolver = resolver(turing_oracle(), memgraph_down);

        let result = resolver
            .resolve(StructuredQuery::new("person", "Alan Turing").with_relationship("WORKS_IN"))
            .await
            .unwrap();
        assert!(result.success());
        assert!(result.get(BackendKind::Oracle).unwrap().is_ok());

        let err = result.get(BackendKind::Memgraph).unwrap().as_ref().unwrap_err();
        assert_eq!(err.code(), "transport_error");

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], json!(true));
        assert_eq!(json["results"]["memgraph"]["error"]["code"], json!("transport_error"));
        assert_eq!(json["results"]["oracle"]["count"], json!(2));
    }

    #[tokio::test]
    async fn test_worked_in_field_yields_mathematics_on_both() {
        let oracle = FakeExecutor::new(BackendKind::Oracle)
            .respond(
                "UPPER(e.name) LIKE UPPER('%Alan Turing%')",
                vec![json!({"vertex_id": "PERSONS(Q7251)", "name": "Alan Turing"})],
            )
            .respond(
                "id(source) = 'PERSONS(Q7251)'",
                vec![
                    json!({"relationship_type": "worked_in", "target_vertex_id": "FIELDS(Q395)", "target_name": "Mathematics"}),
                    json!({"relationship_type": "worked_in", "target_vertex_id": "WORKPLACES(Q35794)", "target_name": "University of Cambridge"}),
                ],
            );
        let memgraph = FakeExecutor::new(BackendKind::Memgraph)
            .respond(
                "toUpper(e.name) CONTAINS toUpper('Alan Turing')",
                vec![json!({"vertex_id": 17, "labels": ["person"], "id": "Q7251", "name": "Alan Turing"})],
            )
            .respond(
                "(source:person {id: 'Q7251'})",
                vec![
                    json!({"relationship_type": "worked_in", "target_vertex_id": 40, "target_labels": ["field"], "target_entity_id": "Q395", "target_name": "Mathematics"}),
                    json!({"relationship_type": "worked_in", "target_vertex_id": 52, "target_labels": ["workplace"], "target_entity_id": "Q35794", "target_name": "University of Cambridge"}),
                ],
            );

        let query = StructuredQuery::new("person", "Alan Turing")
            .with_relationship("worked_in")
            .with_target("field");
        let result = resolver(oracle, memgraph).resolve(query).await.unwrap();

        let oracle = result.get(BackendKind::Oracle).unwrap().as_ref().unwrap();
        let memgraph = result.get(BackendKind::Memgraph).unwrap().as_ref().unwrap();
        for resolution in [oracle, memgraph] {
            assert_eq!(resolution.count, 1);
            assert_eq!(resolution.relationships[0].target_name.as_deref(), Some("Mathematics"));
        }
        assert!(oracle.query.contains("ON ALL_GRAPH"));
        assert!(memgraph.query.contains("RETURN"));
        assert_ne!(oracle.query, memgraph.query);
    }

    #[tokio::test]
    async fn test_not_found_is_scoped_to_backend() {
        let resolver = resolver(turing_oracle(), turing_memgraph());
        let result = resolver
            .resolve(StructuredQuery::new("person", "Nobody").with_backends(vec![BackendKind::Memgraph]))
            .await
            .unwrap();

        assert!(!result.success());
        assert!(result.get(BackendKind::Oracle).is_none());
        let err = result.get(BackendKind::Memgraph).unwrap().as_ref().unwrap_err();
        assert!(matches!(err, BridgeError::EntityNotFound { backend: BackendKind::Memgraph, .. }));
    }

    #[tokio::test]
    async fn test_unparseable_vertex_id() {
        let oracle = FakeExecutor::new(BackendKind::Oracle)
            .respond("UPPER(e.name)", vec![json!({"vertex_id": "17", "name": "Alan Turing"})]);
        let resolver = resolver(oracle, turing_memgraph());

        let result = resolver
            .resolve(StructuredQuery::new("person", "Alan Turing").with_backends(vec![BackendKind::Oracle]))
            .await
            .unwrap();
        let err = result.get(BackendKind::Oracle).unwrap().as_ref().unwrap_err();
        assert_eq!(err.code(), "identifier_extraction_error");
    }

    #[tokio::test]
    async fn test_preconditions_fail_before_backend_calls() {
        let resolver = resolver(turing_oracle(), turing_memgraph());

        let empty_name = resolver.resolve(StructuredQuery::new("person", "  ")).await;
        assert!(matches!(empty_name, Err(BridgeError::Validation(_))));

        let no_backends = resolver
            .resolve(StructuredQuery::new("person", "Alan Turing").with_backends(Vec::new()))
            .await;
        assert!(matches!(no_backends, Err(BridgeError::Validation(_))));

        let unknown = resolver.resolve(StructuredQuery::new("starship", "Enterprise")).await;
        assert!(matches!(unknown, Err(BridgeError::UnknownEntityType(_))));
    }

    #[tokio::test]
    async fn test_empty_search_on_one_backend_is_entity_not_found_in_its_slot() {
        let resolver = resolver(turing_oracle(), FakeExecutor::new(BackendKind::Memgraph));

        let result = resolver
            .resolve(StructuredQuery::new("person", "Alan Turing").with_relationship("WORKS_IN"))
            .await
            .unwrap();
        assert!(result.success());
        assert!(result.get(BackendKind::Oracle).unwrap().is_ok());

        let err = result.get(BackendKind::Memgraph).unwrap().as_ref().unwrap_err();
        assert!(matches!(
            err,
            BridgeError::EntityNotFound { backend: BackendKind::Memgraph, name, .. } if name == "Alan Turing"
        ));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["results"]["memgraph"]["error"]["code"], json!("entity_not_found"));
        assert_eq!(json["results"]["oracle"]["count"], json!(2));
    }

    #[tokio::test]
    async fn test_unconfigured_backend_fills_its_own_slot() {
        let only_rest = StructuredQueryResolver::new(
            RepositoryFactory::new(Translator::default()).with_executor(Arc::new(turing_oracle())),
        );

        let result = only_rest
            .resolve(StructuredQuery::new("person", "Alan Turing").with_relationship("WORKS_IN"))
            .await
            .unwrap();
        assert!(result.success());
        assert_eq!(result.get(BackendKind::Oracle).unwrap().as_ref().unwrap().count, 2);

        let err = result.get(BackendKind::Memgraph).unwrap().as_ref().unwrap_err();
        assert!(matches!(err, BridgeError::UnknownBackend(_)));
        assert_eq!(err.code(), "unknown_backend");
    }

    #[test]
    fn test_query_from_json_defaults_to_both_backends() {
        let query: StructuredQuery = serde_json::from_value(json!({
            "entityLabel": "person",
            "entityName": "Ada Lovelace",
            "relationshipType": "STUDENT_OF"
        }))
        .unwrap();
        assert_eq!(query.backends, BackendKind::ALL.to_vec());
        assert!(query.target_entity_label.is_none());
    }
}

//! Validated construction of repositories.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use graphbridge_core::catalog::{entity_config, entity_types, relationship_types};
use graphbridge_core::{BackendKind, BridgeError, BridgeResult, QueryExecutor, Translator};
use tracing::info;

use crate::repository::{HealthStatus, Repository};

/// Hands out repositories for catalog entity types on configured backends.
#[derive(Clone)]
pub struct RepositoryFactory {
    executors: BTreeMap<BackendKind, Arc<dyn QueryExecutor>>,
    translator: Arc<Translator>,
}

impl RepositoryFactory {
    pub fn new(translator: Translator) -> Self {
        Self {
            executors: BTreeMap::new(),
            translator: Arc::new(translator),
        }
    }

    /// Register an executor under the backend it reports. A later executor
    /// for the same backend replaces the earlier one.
    pub fn with_executor(mut self, executor: Arc<dyn QueryExecutor>) -> Self {
        self.executors.insert(executor.backend(), executor);
        self
    }

    /// Backends with a registered executor, in fan-out order.
    pub fn backends(&self) -> Vec<BackendKind> {
        self.executors.keys().copied().collect()
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    pub fn get_repository(&self, entity_label: &str, backend: BackendKind) -> BridgeResult<Repository> {
        let entity = entity_config(entity_label)
            .ok_or_else(|| BridgeError::UnknownEntityType(entity_label.to_string()))?;
        let executor = self
            .executors
            .get(&backend)
            .ok_or_else(|| BridgeError::UnknownBackend(backend.to_string()))?;
        Ok(Repository::new(entity.key, executor.clone(), self.translator.clone()))
    }

    /// Same as [`get_repository`](Self::get_repository) with the backend given by name.
    pub fn get_repository_by_name(&self, entity_label: &str, backend: &str) -> BridgeResult<Repository> {
        let backend: BackendKind = backend.parse()?;
        self.get_repository(entity_label, backend)
    }

    pub fn available_entity_types(&self) -> Vec<&'static str> {
        entity_types()
    }

    pub fn available_relationship_types(&self) -> Vec<&'static str> {
        relationship_types()
    }

    /// Check every entity type on every configured backend concurrently.
    pub async fn health_check_all(&self) -> Vec<HealthStatus> {
        let repositories: Vec<Repository> = entity_types()
            .into_iter()
            .flat_map(|label| {
                self.executors
                    .values()
                    .map(move |executor| Repository::new(label, executor.clone(), self.translator.clone()))
            })
            .collect();

        let statuses = join_all(repositories.iter().map(|repo| repo.health_check())).await;
        let healthy = statuses.iter().filter(|s| s.healthy).count();
        info!(healthy, total = statuses.len(), "Health check finished");
        statuses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeExecutor;

    fn factory() -> RepositoryFactory {
        RepositoryFactory::new(Translator::default())
            .with_executor(Arc::new(FakeExecutor::new(BackendKind::Oracle)))
            .with_executor(Arc::new(FakeExecutor::new(BackendKind::Memgraph).failing("workplace")))
    }

    #[test]
    fn test_get_repository_normalizes_label() {
        let repo = factory().get_repository("PERSON", BackendKind::Memgraph).unwrap();
        assert_eq!(repo.entity_label(), "person");
        assert_eq!(repo.backend(), BackendKind::Memgraph);
    }

    #[test]
    fn test_unknown_entity_type() {
        let err = factory().get_repository("spaceship", BackendKind::Oracle).unwrap_err();
        assert!(matches!(err, BridgeError::UnknownEntityType(label) if label == "spaceship"));
    }

    #[test]
    fn test_unknown_backend() {
        let only_rest = RepositoryFactory::new(Translator::default())
            .with_executor(Arc::new(FakeExecutor::new(BackendKind::Oracle)));
        assert!(matches!(
            only_rest.get_repository("person", BackendKind::Memgraph),
            Err(BridgeError::UnknownBackend(_))
        ));
        assert!(matches!(
            only_rest.get_repository_by_name("person", "neo"),
            Err(BridgeError::UnknownBackend(_))
        ));
    }

    #[test]
    fn test_catalog_listings() {
        let factory = factory();
        assert_eq!(factory.backends(), vec![BackendKind::Oracle, BackendKind::Memgraph]);
        assert!(factory.available_entity_types().contains(&"occupation"));
        assert!(factory.available_relationship_types().contains(&"WORKS_IN"));
    }

    #[tokio::test]
    async fn test_health_check_all_reports_each_pair() {
        let statuses = factory().health_check_all().await;
        assert_eq!(statuses.len(), 14);

        let failed: Vec<_> = statuses.iter().filter(|s| !s.healthy).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].entity_label, "workplace");
        assert_eq!(failed[0].backend, BackendKind::Memgraph);
    }
}

//! Per-type query entry points

use crate::core::{Criteria, Result, Value};
use crate::entity::EntityRef;
use crate::facade::EntityManager;
use crate::persister::{EntityPersister, OrderBy};
use crate::unit_of_work::UnitOfWork;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

/// Finder methods for one entity type.
pub struct EntityRepository {
    type_id: String,
    unit_of_work: Arc<UnitOfWork>,
}

impl EntityRepository {
    pub fn new(type_id: impl Into<String>, unit_of_work: Arc<UnitOfWork>) -> Self {
        Self {
            type_id: type_id.into(),
            unit_of_work,
        }
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    /// Finds by the first identifier field. `None` when the server answers 404.
    pub async fn find(&self, id: impl Into<Value>) -> Result<Option<EntityRef>> {
        let id = id.into();
        self.persister()?.load_by_id(id).await
    }

    pub async fn find_all(&self) -> Result<Vec<EntityRef>> {
        self.find_by(&Criteria::new(), None, None, None).await
    }

    pub async fn find_by(
        &self,
        criteria: &Criteria,
        order_by: Option<&OrderBy>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<EntityRef>> {
        self.persister()?
            .load_all(criteria, order_by, limit, offset)
            .await
    }

    pub async fn find_one_by(&self, criteria: &Criteria) -> Result<Option<EntityRef>> {
        self.persister()?.load(criteria).await
    }

    fn persister(&self) -> Result<Arc<dyn EntityPersister>> {
        self.unit_of_work.get_persister(&self.type_id)
    }
}

/// Creates the repository handed out for a type.
pub trait RepositoryFactory: Send + Sync {
    fn get_repository(&self, manager: &EntityManager, name: &str) -> Result<Arc<EntityRepository>>;
}

/// Builds plain `EntityRepository` instances, one per manager and type.
///
/// Only weak handles are cached, so a factory shared between managers never
/// keeps a finished session alive.
#[derive(Default)]
pub struct DefaultRepositoryFactory {
    repositories: Mutex<HashMap<(usize, String), Weak<EntityRepository>>>,
}

impl DefaultRepositoryFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached repositories still in use.
    pub fn len(&self) -> usize {
        self.repositories
            .lock()
            .map(|r| r.values().filter(|w| w.strong_count() > 0).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RepositoryFactory for DefaultRepositoryFactory {
    fn get_repository(&self, manager: &EntityManager, name: &str) -> Result<Arc<EntityRepository>> {
        let metadata = manager.get_class_metadata(name)?;
        let unit_of_work = manager.unit_of_work();
        let key = (
            Arc::as_ptr(unit_of_work) as usize,
            metadata.type_id().to_string(),
        );

        let mut repositories = self.repositories.lock()?;
        repositories.retain(|_, repository| repository.strong_count() > 0);
        if let Some(repository) = repositories.get(&key).and_then(Weak::upgrade) {
            return Ok(repository);
        }

        let repository = Arc::new(EntityRepository::new(
            metadata.type_id(),
            unit_of_work.clone(),
        ));
        repositories.insert(key, Arc::downgrade(&repository));
        Ok(repository)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::Configuration;
    use crate::connection::InMemoryConnection;
    use crate::mapping::StaticDriver;

    fn manager(factory: Arc<DefaultRepositoryFactory>) -> EntityManager {
        let driver = StaticDriver::from_json(
            r#"{
                "app::Book": {
                    "resource": { "route": "books/{id}.json" },
                    "identifiers": { "id": { "type": "integer" } }
                }
            }"#,
        )
        .unwrap();
        let config = Configuration::new()
            .with_metadata_driver(Arc::new(driver))
            .with_repository_factory(factory);
        EntityManager::new(Arc::new(InMemoryConnection::new()), config).unwrap()
    }

    #[test]
    fn test_shared_factory_keeps_sessions_apart() {
        let factory = Arc::new(DefaultRepositoryFactory::new());
        let first = manager(factory.clone());
        let second = manager(factory.clone());

        let a = first.get_repository("app::Book").unwrap();
        let b = second.get_repository("app::Book").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &first.get_repository("app::Book").unwrap()));
        assert_eq!(factory.len(), 2);
    }

    #[test]
    fn test_factory_does_not_keep_sessions_alive() {
        let factory = Arc::new(DefaultRepositoryFactory::new());
        let manager = manager(factory.clone());
        let session = Arc::downgrade(manager.unit_of_work());

        let repository = manager.get_repository("app::Book").unwrap();
        drop(repository);
        drop(manager);

        assert!(session.upgrade().is_none());
        assert!(factory.is_empty());
    }
}

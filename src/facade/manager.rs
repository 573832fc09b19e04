use crate::configuration::{Configuration, resolve_namespace};
use crate::connection::Connection;
use crate::core::{RaplError, Result, Value};
use crate::entity::EntityRef;
use crate::mapping::{AliasResolver, MetadataRegistry, TypeMetadata};
use crate::repository::EntityRepository;
use crate::unit_of_work::UnitOfWork;
use std::sync::Arc;

/// Entry point tying the configuration, the metadata registry, the
/// connection and the unit of work together.
///
/// Type names are either full identifiers (`app::Book`) or use a registered
/// namespace alias (`App:Book`).
///
/// # Examples
///
/// ```ignore
/// let config = Configuration::new()
///     .with_metadata_driver(Arc::new(FileDriver::new(vec!["config".into()])))
///     .with_entity_namespace("App", "app");
/// let connection = Arc::new(HttpConnection::from_url("https://api.example.com")?);
/// let manager = EntityManager::new(connection, config)?;
///
/// let book = manager.find("App:Book", 4).await?;
/// ```
pub struct EntityManager {
    configuration: Configuration,
    connection: Arc<dyn Connection>,
    registry: Arc<MetadataRegistry>,
    unit_of_work: Arc<UnitOfWork>,
}

impl EntityManager {
    /// Fails with `Configuration` when no mapping driver is set.
    pub fn new(connection: Arc<dyn Connection>, configuration: Configuration) -> Result<Self> {
        let driver = configuration.metadata_driver().cloned().ok_or_else(|| {
            RaplError::Configuration("No metadata driver configured".to_string())
        })?;

        let namespaces = configuration.entity_namespaces().clone();
        let aliases: AliasResolver =
            Arc::new(move |alias: &str| resolve_namespace(&namespaces, alias));

        let registry = Arc::new(MetadataRegistry::new(driver, aliases));
        let unit_of_work = Arc::new(UnitOfWork::new(registry.clone(), connection.clone()));

        Ok(Self {
            configuration,
            connection,
            registry,
            unit_of_work,
        })
    }

    pub fn get_class_metadata(&self, name: &str) -> Result<Arc<TypeMetadata>> {
        self.registry.get_metadata_for(name)
    }

    pub fn get_repository(&self, name: &str) -> Result<Arc<EntityRepository>> {
        self.configuration
            .repository_factory()
            .get_repository(self, name)
    }

    /// Finds an entity by identifier; `None` when the server answers 404.
    pub async fn find(&self, name: &str, id: impl Into<Value>) -> Result<Option<EntityRef>> {
        let id = id.into();
        self.unit_of_work.get_persister(name)?.load_by_id(id).await
    }

    /// Whether `entity` is the managed instance for its identity.
    pub fn contains(&self, entity: &EntityRef) -> Result<bool> {
        self.unit_of_work.is_in_identity_map(entity)
    }

    /// Detaches all managed entities, or only those of one type.
    pub fn clear(&self, name: Option<&str>) -> Result<()> {
        self.unit_of_work.clear(name)
    }

    pub fn unit_of_work(&self) -> &Arc<UnitOfWork> {
        &self.unit_of_work
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn metadata_registry(&self) -> &Arc<MetadataRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::InMemoryConnection;
    use crate::mapping::StaticDriver;

    fn manager(connection: InMemoryConnection) -> EntityManager {
        let driver = StaticDriver::from_json(
            r#"{
                "app::Book": {
                    "resource": { "route": "books/{id}.json" },
                    "collection": { "route": "books.json" },
                    "identifiers": { "id": { "type": "integer" } },
                    "fields": { "title": {} }
                }
            }"#,
        )
        .unwrap();
        let config = Configuration::new()
            .with_metadata_driver(Arc::new(driver))
            .with_entity_namespace("App", "app");
        EntityManager::new(Arc::new(connection), config).unwrap()
    }

    #[test]
    fn test_requires_metadata_driver() {
        let result = EntityManager::new(Arc::new(InMemoryConnection::new()), Configuration::new());
        assert!(matches!(result, Err(RaplError::Configuration(_))));
    }

    #[test]
    fn test_class_metadata_by_alias() {
        let manager = manager(InMemoryConnection::new());
        let metadata = manager.get_class_metadata("App:Book").unwrap();
        assert_eq!(metadata.type_id(), "app::Book");
        assert!(Arc::ptr_eq(
            &metadata,
            &manager.get_class_metadata("app::Book").unwrap()
        ));
    }

    #[test]
    fn test_repository_is_shared() {
        let manager = manager(InMemoryConnection::new());
        let first = manager.get_repository("App:Book").unwrap();
        let second = manager.get_repository("app::Book").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.type_id(), "app::Book");
    }

    #[tokio::test]
    async fn test_find_and_contains() {
        let manager = manager(
            InMemoryConnection::new().with_json("books/4.json", r#"{"id":4,"title":"Dune"}"#),
        );

        let book = manager.find("App:Book", 4i64).await.unwrap().unwrap();
        assert!(manager.contains(&book).unwrap());

        manager.clear(None).unwrap();
        assert!(!manager.contains(&book).unwrap());
        assert!(manager.find("app::Book", 5i64).await.unwrap().is_none());
    }
}

use crate::core::{RaplError, Result};
use crate::mapping::MappingDriver;
use crate::repository::{DefaultRepositoryFactory, RepositoryFactory};
use std::collections::HashMap;
use std::sync::Arc;

/// Entity manager configuration
pub struct Configuration {
    entity_namespaces: HashMap<String, String>,
    metadata_driver: Option<Arc<dyn MappingDriver>>,
    repository_factory: Arc<dyn RepositoryFactory>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            entity_namespaces: HashMap::new(),
            metadata_driver: None,
            repository_factory: Arc::new(DefaultRepositoryFactory::new()),
        }
    }
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the mapping driver
    pub fn with_metadata_driver(mut self, driver: Arc<dyn MappingDriver>) -> Self {
        self.metadata_driver = Some(driver);
        self
    }

    /// Register `alias` for `namespace`, so `Alias:Book` names `namespace::Book`
    pub fn with_entity_namespace(mut self, alias: &str, namespace: &str) -> Self {
        self.add_entity_namespace(alias, namespace);
        self
    }

    pub fn with_repository_factory(mut self, factory: Arc<dyn RepositoryFactory>) -> Self {
        self.repository_factory = factory;
        self
    }

    pub fn add_entity_namespace(&mut self, alias: &str, namespace: &str) {
        self.entity_namespaces
            .insert(alias.to_string(), namespace.to_string());
    }

    pub fn set_entity_namespaces(&mut self, namespaces: HashMap<String, String>) {
        self.entity_namespaces = namespaces;
    }

    pub fn entity_namespaces(&self) -> &HashMap<String, String> {
        &self.entity_namespaces
    }

    /// Namespace registered for `alias`, without trailing separators.
    pub fn entity_namespace(&self, alias: &str) -> Result<String> {
        resolve_namespace(&self.entity_namespaces, alias)
    }

    pub fn set_metadata_driver(&mut self, driver: Arc<dyn MappingDriver>) {
        self.metadata_driver = Some(driver);
    }

    pub fn metadata_driver(&self) -> Option<&Arc<dyn MappingDriver>> {
        self.metadata_driver.as_ref()
    }

    pub fn set_repository_factory(&mut self, factory: Arc<dyn RepositoryFactory>) {
        self.repository_factory = factory;
    }

    pub fn repository_factory(&self) -> &Arc<dyn RepositoryFactory> {
        &self.repository_factory
    }
}

pub(crate) fn resolve_namespace(namespaces: &HashMap<String, String>, alias: &str) -> Result<String> {
    namespaces
        .get(alias)
        .map(|namespace| namespace.trim_end_matches(':').to_string())
        .ok_or_else(|| RaplError::UnknownNamespace(alias.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::StaticDriver;

    #[test]
    fn test_entity_namespace() {
        let config = Configuration::new()
            .with_entity_namespace("App", "app::")
            .with_entity_namespace("Shop", "shop::catalog");

        assert_eq!(config.entity_namespace("App").unwrap(), "app");
        assert_eq!(config.entity_namespace("Shop").unwrap(), "shop::catalog");
        assert!(matches!(
            config.entity_namespace("Nope"),
            Err(RaplError::UnknownNamespace(alias)) if alias == "Nope"
        ));
    }

    #[test]
    fn test_metadata_driver() {
        let mut config = Configuration::new();
        assert!(config.metadata_driver().is_none());
        config.set_metadata_driver(Arc::new(StaticDriver::new()));
        assert!(config.metadata_driver().is_some());
    }
}

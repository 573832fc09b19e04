//! Session state: the identity map and the per-type persister cache.

mod identity_map;

pub use identity_map::{FieldData, ID_HASH_SEPARATOR, IdentityMap};

use crate::connection::Connection;
use crate::core::Result;
use crate::entity::EntityRef;
use crate::mapping::MetadataRegistry;
use crate::persister::{BasicEntityPersister, EntityPersister};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub struct UnitOfWork {
    identity_map: Arc<IdentityMap>,
    connection: Arc<dyn Connection>,
    persisters: Mutex<HashMap<String, Arc<dyn EntityPersister>>>,
}

impl UnitOfWork {
    pub fn new(registry: Arc<MetadataRegistry>, connection: Arc<dyn Connection>) -> Self {
        Self {
            identity_map: Arc::new(IdentityMap::new(registry)),
            connection,
            persisters: Mutex::new(HashMap::new()),
        }
    }

    pub fn identity_map(&self) -> &Arc<IdentityMap> {
        &self.identity_map
    }

    /// Persister for `name` (full type id or `Alias:Simple`), built on first use.
    pub fn get_persister(&self, name: &str) -> Result<Arc<dyn EntityPersister>> {
        let metadata = self.identity_map.metadata_for(name)?;

        let mut persisters = self.persisters.lock()?;
        let persister = persisters
            .entry(metadata.type_id().to_string())
            .or_insert_with(|| {
                let persister: Arc<dyn EntityPersister> = Arc::new(BasicEntityPersister::new(
                    metadata.clone(),
                    self.connection.clone(),
                    self.identity_map.clone(),
                ));
                persister
            });
        Ok(persister.clone())
    }

    pub fn create_entity(&self, type_id: &str, data: FieldData) -> Result<EntityRef> {
        self.identity_map.create_entity(type_id, data)
    }

    pub fn try_get_by_id_hash(&self, type_id: &str, id_hash: &str) -> Result<Option<EntityRef>> {
        self.identity_map.try_get_by_id_hash(type_id, id_hash)
    }

    pub fn is_in_identity_map(&self, entity: &EntityRef) -> Result<bool> {
        self.identity_map.is_in_identity_map(entity)
    }

    pub fn add_to_identity_map(&self, entity: &EntityRef) -> Result<bool> {
        self.identity_map.add_to_identity_map(entity)
    }

    pub fn remove_from_identity_map(&self, entity: &EntityRef) -> Result<bool> {
        self.identity_map.remove_from_identity_map(entity)
    }

    /// Detaches every managed entity, or only those of one type. Persisters
    /// stay cached.
    pub fn clear(&self, type_id: Option<&str>) -> Result<()> {
        self.identity_map.clear(type_id)
    }
}

use crate::core::{RaplError, Result, Value};
use crate::entity::EntityRef;
use crate::mapping::{MetadataRegistry, TypeMetadata};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

/// Field name to hydrated value, as produced by the serializer.
pub type FieldData = BTreeMap<String, Value>;

/// Joins identifier values into an identity hash.
pub const ID_HASH_SEPARATOR: &str = " ";

const ID_HASH_ESCAPE: char = '\\';

/// Escapes the separator and the escape character so distinct value lists
/// never join to the same hash.
fn escape_id_part(part: &str) -> String {
    let mut escaped = String::with_capacity(part.len());
    for c in part.chars() {
        if c == ID_HASH_ESCAPE || ID_HASH_SEPARATOR.contains(c) {
            escaped.push(ID_HASH_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// One canonical live instance per `(type, identity hash)`.
pub struct IdentityMap {
    registry: Arc<MetadataRegistry>,
    entries: Mutex<HashMap<String, HashMap<String, EntityRef>>>,
}

impl IdentityMap {
    pub fn new(registry: Arc<MetadataRegistry>) -> Self {
        Self {
            registry,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<MetadataRegistry> {
        &self.registry
    }

    pub fn metadata_for(&self, type_id: &str) -> Result<Arc<TypeMetadata>> {
        self.registry.get_metadata_for(type_id)
    }

    /// Identity hash of `values`, or `None` when the type declares no
    /// identifier or an identifier value is missing.
    pub fn id_hash<'a>(
        metadata: &TypeMetadata,
        mut values: impl FnMut(&str) -> Option<&'a Value>,
    ) -> Option<String> {
        let identifier = metadata.identifier_field_names();
        if identifier.is_empty() {
            return None;
        }
        let mut parts = Vec::with_capacity(identifier.len());
        for field in identifier {
            match values(field) {
                Some(value) if !value.is_null() => parts.push(escape_id_part(&value.to_string())),
                _ => return None,
            }
        }
        Some(parts.join(ID_HASH_SEPARATOR))
    }

    /// Returns the canonical instance for the identity in `data`, allocating
    /// and registering it on first sight, then writes every declared field.
    pub fn create_entity(&self, type_id: &str, data: FieldData) -> Result<EntityRef> {
        let metadata = self.metadata_for(type_id)?;

        let entity = match Self::id_hash(&metadata, |field| data.get(field)) {
            Some(hash) => {
                let mut entries = self.entries.lock()?;
                let table = entries.entry(metadata.type_id().to_string()).or_default();
                match table.get(&hash) {
                    Some(existing) => existing.clone(),
                    None => {
                        let entity = metadata.new_instance();
                        entity.write()?.set_identity(hash.clone());
                        table.insert(hash, entity.clone());
                        entity
                    }
                }
            }
            None => metadata.new_instance(),
        };

        for (field, value) in data {
            if metadata.has_field(&field) {
                metadata.set_field_value(&entity, &field, value)?;
            }
        }

        Ok(entity)
    }

    pub fn try_get_by_id_hash(&self, type_id: &str, id_hash: &str) -> Result<Option<EntityRef>> {
        let metadata = self.metadata_for(type_id)?;
        let entries = self.entries.lock()?;
        Ok(entries
            .get(metadata.type_id())
            .and_then(|table| table.get(id_hash))
            .cloned())
    }

    pub fn is_in_identity_map(&self, entity: &EntityRef) -> Result<bool> {
        let (type_id, identity) = Self::snapshot(entity)?;
        let Some(identity) = identity else {
            return Ok(false);
        };
        let entries = self.entries.lock()?;
        Ok(entries
            .get(&type_id)
            .and_then(|table| table.get(&identity))
            .is_some_and(|registered| registered.ptr_eq(entity)))
    }

    /// Registers `entity`; `false` when its identity is already taken.
    ///
    /// An entity that was never registered has its identity captured from
    /// its current identifier values.
    pub fn add_to_identity_map(&self, entity: &EntityRef) -> Result<bool> {
        let (type_id, identity) = Self::snapshot(entity)?;
        let metadata = self.metadata_for(&type_id)?;

        let identity = match identity {
            Some(identity) => identity,
            None => {
                let hash = {
                    let record = entity.read()?;
                    Self::id_hash(&metadata, |field| record.get(field))
                };
                let hash = hash.ok_or_else(|| {
                    RaplError::InvalidArgument(format!(
                        "Entity of type '{}' has no identity",
                        type_id
                    ))
                })?;
                entity.write()?.set_identity(hash.clone());
                hash
            }
        };

        let mut entries = self.entries.lock()?;
        let table = entries.entry(type_id).or_default();
        if table.contains_key(&identity) {
            return Ok(false);
        }
        table.insert(identity, entity.clone());
        Ok(true)
    }

    /// Unregisters `entity`; `false` when it was not registered.
    pub fn remove_from_identity_map(&self, entity: &EntityRef) -> Result<bool> {
        let (type_id, identity) = Self::snapshot(entity)?;
        let Some(identity) = identity else {
            return Ok(false);
        };
        let mut entries = self.entries.lock()?;
        let Some(table) = entries.get_mut(&type_id) else {
            return Ok(false);
        };
        if table.get(&identity).is_some_and(|registered| registered.ptr_eq(entity)) {
            table.remove(&identity);
            return Ok(true);
        }
        Ok(false)
    }

    /// Drops every registered entity, or only those of one type.
    pub fn clear(&self, type_id: Option<&str>) -> Result<()> {
        match type_id {
            Some(name) => {
                let metadata = self.metadata_for(name)?;
                self.entries.lock()?.remove(metadata.type_id());
            }
            None => self.entries.lock()?.clear(),
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .map(|entries| entries.values().map(HashMap::len).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(entity: &EntityRef) -> Result<(String, Option<String>)> {
        let record = entity.read()?;
        Ok((
            record.type_id().to_string(),
            record.identity().map(str::to_string),
        ))
    }
}

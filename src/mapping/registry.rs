use super::driver::MappingDriver;
use super::{MappingError, TypeMetadata};
use crate::core::{RaplError, Result};
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Resolves a namespace alias to its full namespace.
pub type AliasResolver = Arc<dyn Fn(&str) -> Result<String> + Send + Sync>;

/// Separator between a namespace and a simple type name.
pub const NAMESPACE_SEPARATOR: &str = "::";

/// Splits `Alias:Simple` notation. Full identifiers (`app::Book`) and plain
/// names are returned as `None`.
pub fn split_alias(name: &str) -> Option<(&str, &str)> {
    if name.contains(NAMESPACE_SEPARATOR) {
        return None;
    }
    name.split_once(':')
        .filter(|(alias, simple)| !alias.is_empty() && !simple.is_empty())
}

/// Lazy, cached factory of `TypeMetadata`.
///
/// Alias resolution and the mapping driver are handed in at construction so
/// the registry never needs a handle on the manager that owns it.
pub struct MetadataRegistry {
    driver: Arc<dyn MappingDriver>,
    aliases: AliasResolver,
    loaded: Mutex<HashMap<String, Arc<TypeMetadata>>>,
}

impl MetadataRegistry {
    pub fn new(driver: Arc<dyn MappingDriver>, aliases: AliasResolver) -> Self {
        Self {
            driver,
            aliases,
            loaded: Mutex::new(HashMap::new()),
        }
    }

    /// Registry without namespace aliases; `Alias:Simple` names fail to resolve.
    pub fn without_aliases(driver: Arc<dyn MappingDriver>) -> Self {
        Self::new(
            driver,
            Arc::new(|alias: &str| Err(RaplError::UnknownNamespace(alias.to_string()))),
        )
    }

    pub fn get_metadata_for(&self, name: &str) -> Result<Arc<TypeMetadata>> {
        if let Some(metadata) = self.loaded.lock()?.get(name) {
            return Ok(metadata.clone());
        }

        let type_id = self.resolve_type_id(name)?;
        {
            let mut loaded = self.loaded.lock()?;
            if let Some(metadata) = loaded.get(&type_id).cloned() {
                loaded.insert(name.to_string(), metadata.clone());
                return Ok(metadata);
            }
        }

        let metadata = Arc::new(self.load(&type_id)?);

        let mut loaded = self.loaded.lock()?;
        // A reentrant load for the same type may have won the race.
        let metadata = loaded
            .entry(type_id.clone())
            .or_insert(metadata)
            .clone();
        if name != type_id {
            loaded.insert(name.to_string(), metadata.clone());
        }
        Ok(metadata)
    }

    pub fn has_metadata_for(&self, name: &str) -> bool {
        self.loaded
            .lock()
            .map(|loaded| loaded.contains_key(name))
            .unwrap_or(false)
    }

    /// Registers pre-built metadata, replacing any cached entry.
    pub fn set_metadata_for(&self, metadata: TypeMetadata) -> Result<Arc<TypeMetadata>> {
        let metadata = Arc::new(metadata);
        self.loaded
            .lock()?
            .insert(metadata.type_id().to_string(), metadata.clone());
        Ok(metadata)
    }

    pub fn loaded_metadata(&self) -> Result<Vec<Arc<TypeMetadata>>> {
        let loaded = self.loaded.lock()?;
        let mut all: Vec<Arc<TypeMetadata>> = Vec::new();
        for metadata in loaded.values() {
            if !all.iter().any(|m| Arc::ptr_eq(m, metadata)) {
                all.push(metadata.clone());
            }
        }
        Ok(all)
    }

    fn resolve_type_id(&self, name: &str) -> Result<String> {
        match split_alias(name) {
            Some((alias, simple)) => {
                let namespace = (self.aliases)(alias)?;
                Ok(format!(
                    "{}{}{}",
                    namespace.trim_matches(':'),
                    NAMESPACE_SEPARATOR,
                    simple
                ))
            }
            None => Ok(name.to_string()),
        }
    }

    fn load(&self, type_id: &str) -> Result<TypeMetadata> {
        debug!("Loading metadata for '{}'", type_id);

        let mut metadata = TypeMetadata::new(type_id);
        self.driver
            .load_metadata_for_type(type_id, &mut metadata)
            .map_err(|err| wrap_load_failure(type_id, err))?;
        metadata.validate()?;
        Ok(metadata)
    }
}

fn wrap_load_failure(type_id: &str, err: RaplError) -> RaplError {
    match err {
        RaplError::Mapping(_) => err,
        other => MappingError::LoadFailure {
            type_id: type_id.to_string(),
            source: anyhow::Error::new(other),
        }
        .into(),
    }
}

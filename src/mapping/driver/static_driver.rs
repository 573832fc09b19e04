use super::{MappingDocument, MappingDriver, MappingElement};
use crate::core::Result;
use crate::mapping::{MappingError, TypeMetadata};

/// Mapping records held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticDriver {
    elements: MappingDocument,
}

impl StaticDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a whole mapping document (`{ "<type id>": { ... } }`).
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self {
            elements: serde_json::from_str(json)?,
        })
    }

    pub fn with_element(mut self, type_id: impl Into<String>, element: MappingElement) -> Self {
        self.elements.insert(type_id.into(), element);
        self
    }

    pub fn add_element(&mut self, type_id: impl Into<String>, element: MappingElement) {
        self.elements.insert(type_id.into(), element);
    }
}

impl MappingDriver for StaticDriver {
    fn load_metadata_for_type(&self, type_id: &str, metadata: &mut TypeMetadata) -> Result<()> {
        let element = self
            .elements
            .get(type_id)
            .ok_or_else(|| MappingError::MissingElement {
                type_id: type_id.to_string(),
            })?;
        element.apply(metadata)
    }

    fn all_type_ids(&self) -> Result<Vec<String>> {
        Ok(self.elements.keys().cloned().collect())
    }
}

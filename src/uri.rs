//! Criteria to request URI resolution.

use crate::core::{Criteria, Operation, Result, Routes};
use crate::mapping::{MappingError, TypeMetadata};

/// Resolves `criteria` against a type's route templates.
///
/// A single criterion on the identifier field selects the `resource` route
/// with `{field}` replaced by the literal value. Anything else selects the
/// `collection` route verbatim; remaining criteria are not encoded.
pub fn resolve(criteria: &Criteria, routes: &Routes, identifier: &str) -> Option<String> {
    if criteria.len() == 1 {
        if let Some(value) = criteria.get(identifier) {
            let route = routes.get(&Operation::Resource)?;
            return Some(route.replace(&format!("{{{}}}", identifier), &value.to_string()));
        }
    }
    routes.get(&Operation::Collection).cloned()
}

/// Builds request URIs for one entity type.
pub struct UriResolver<'a> {
    metadata: &'a TypeMetadata,
}

impl<'a> UriResolver<'a> {
    pub fn new(metadata: &'a TypeMetadata) -> Self {
        Self { metadata }
    }

    /// Operation the criteria resolve to.
    pub fn operation_for(&self, criteria: &Criteria) -> Operation {
        match self.identifier() {
            Some(id) if criteria.len() == 1 && criteria.contains_key(id) => Operation::Resource,
            _ => Operation::Collection,
        }
    }

    pub fn create_uri(&self, criteria: &Criteria) -> Result<String> {
        let identifier = self.identifier().unwrap_or_default();
        resolve(criteria, self.metadata.routes(), identifier).ok_or_else(|| {
            MappingError::MissingRoute {
                type_id: self.metadata.type_id().to_string(),
                operation: self.operation_for(criteria),
            }
            .into()
        })
    }

    fn identifier(&self) -> Option<&str> {
        self.metadata
            .identifier_field_names()
            .first()
            .map(String::as_str)
    }
}

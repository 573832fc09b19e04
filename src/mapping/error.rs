//! Mapping errors
//!
//! Raised while describing entity types or loading their metadata. All of
//! them are fatal to the operation that triggered them.

use crate::core::Operation;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("No mapping found for field '{field}' on type '{type_id}'")]
    MappingNotFound { type_id: String, field: String },

    #[error("The field or association mapping misses the field name in type '{type_id}'")]
    MissingFieldName { type_id: String },

    #[error("The association mapping '{field}' misses the target type")]
    MissingTargetType { field: String },

    #[error("Type '{type_id}' has no '{operation}' route")]
    MissingRoute { type_id: String, operation: Operation },

    #[error("Route '{route}' of type '{type_id}' references '{placeholder}', which is not an identifier field")]
    InvalidRoutePlaceholder {
        type_id: String,
        route: String,
        placeholder: String,
    },

    #[error("No mapping element found for type '{type_id}'")]
    MissingElement { type_id: String },

    #[error("An error occurred in {type_id}")]
    LoadFailure {
        type_id: String,
        #[source]
        source: anyhow::Error,
    },
}

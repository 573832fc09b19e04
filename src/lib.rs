// ============================================================================
// Rapl Library
// ============================================================================

pub mod configuration;
pub mod connection;
pub mod core;
pub mod entity;
pub mod facade;
pub mod mapping;
pub mod persister;
pub mod repository;
pub mod serializer;
pub mod unit_of_work;
pub mod uri;

// Re-export main types for convenience
pub use configuration::Configuration;
pub use crate::core::{Criteria, EnvelopeKey, Operation, RaplError, Result, ScalarType, SortOrder, Value};
pub use entity::{EntityRecord, EntityRef};
pub use facade::EntityManager;

// Re-export mapping API
pub use mapping::{FieldSpec, FileDriver, MappingDriver, MappingError, StaticDriver, TypeMetadata};

// Re-export connection API
pub use connection::{
    Connection, ConnectionConfig, HttpConnection, InMemoryConnection, Request, RequestSubscriber,
    Response,
};

pub use persister::{EntityPersister, OrderBy};
pub use repository::{DefaultRepositoryFactory, EntityRepository, RepositoryFactory};
pub use unit_of_work::UnitOfWork;

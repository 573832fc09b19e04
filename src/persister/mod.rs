//! Single-request entity loading
//!
//! A persister turns criteria into one request, sends it through the
//! connection and hands the body to the serializer.

mod basic;

pub use basic::BasicEntityPersister;

use crate::core::{Criteria, RaplError, Result, SortOrder, Value};
use crate::entity::EntityRef;
use crate::mapping::TypeMetadata;
use async_trait::async_trait;
use std::sync::Arc;

/// Requested ordering, field name to direction.
pub type OrderBy = Vec<(String, SortOrder)>;

#[async_trait]
pub trait EntityPersister: Send + Sync {
    fn metadata(&self) -> &Arc<TypeMetadata>;

    /// Loads one entity. A `404 Not Found` answer yields `None`; every other
    /// error is returned unchanged.
    async fn load(&self, criteria: &Criteria) -> Result<Option<EntityRef>>;

    /// Loads by the value of the first identifier field.
    async fn load_by_id(&self, id: Value) -> Result<Option<EntityRef>> {
        let metadata = self.metadata();
        let field = metadata.identifier_field_names().first().ok_or_else(|| {
            RaplError::InvalidArgument(format!(
                "Entity '{}' declares no identifier",
                metadata.type_id()
            ))
        })?;

        let mut criteria = Criteria::new();
        criteria.insert(field.clone(), id);
        self.load(&criteria).await
    }

    /// Loads a collection. Ordering and paging are accepted but not sent.
    async fn load_all(
        &self,
        criteria: &Criteria,
        order_by: Option<&OrderBy>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<EntityRef>>;
}

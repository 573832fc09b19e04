use super::{EntityPersister, OrderBy};
use crate::connection::Connection;
use crate::core::{Criteria, Operation, Result};
use crate::entity::EntityRef;
use crate::mapping::TypeMetadata;
use crate::serializer::Serializer;
use crate::unit_of_work::IdentityMap;
use crate::uri::UriResolver;
use async_trait::async_trait;
use http::Method;
use log::warn;
use std::sync::Arc;

pub struct BasicEntityPersister {
    metadata: Arc<TypeMetadata>,
    connection: Arc<dyn Connection>,
    serializer: Serializer,
}

impl BasicEntityPersister {
    pub fn new(
        metadata: Arc<TypeMetadata>,
        connection: Arc<dyn Connection>,
        identity_map: Arc<IdentityMap>,
    ) -> Self {
        let serializer = Serializer::new(metadata.clone(), identity_map);
        Self {
            metadata,
            connection,
            serializer,
        }
    }

    async fn fetch(&self, criteria: &Criteria, operation: Operation) -> Result<String> {
        let uri = UriResolver::new(&self.metadata).create_uri(criteria)?;
        tracing::debug!(
            type_id = %self.metadata.type_id(),
            uri = %uri,
            operation = %operation,
            "Loading entities"
        );

        let request = self.connection.create_request(Method::GET, &uri);
        let response = self.connection.send_request(request).await?;
        Ok(response.into_body())
    }
}

#[async_trait]
impl EntityPersister for BasicEntityPersister {
    fn metadata(&self) -> &Arc<TypeMetadata> {
        &self.metadata
    }

    async fn load(&self, criteria: &Criteria) -> Result<Option<EntityRef>> {
        let body = match self.fetch(criteria, Operation::Resource).await {
            Ok(body) => body,
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(err),
        };

        let entities = self.serializer.deserialize(&body, Operation::Resource)?;
        Ok(entities.into_iter().next())
    }

    async fn load_all(
        &self,
        criteria: &Criteria,
        order_by: Option<&OrderBy>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<EntityRef>> {
        if order_by.is_some_and(|o| !o.is_empty()) || limit.is_some() || offset.is_some() {
            warn!(
                "Ordering and paging for '{}' are not sent to the server",
                self.metadata.type_id()
            );
        }

        let body = self.fetch(criteria, Operation::Collection).await?;
        self.serializer.deserialize(&body, Operation::Collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::InMemoryConnection;
    use crate::core::{RaplError, SortOrder, Value};
    use crate::mapping::{MetadataRegistry, StaticDriver};
    use http::StatusCode;

    const MAPPING: &str = r#"{
        "app::Book": {
            "resource": { "route": "books/{id}.json", "envelopes": ["book"] },
            "collection": { "route": "books.json", "envelopes": ["books"] },
            "identifiers": { "id": { "type": "integer" } },
            "fields": { "title": { "type": "string" } }
        }
    }"#;

    fn persister(connection: InMemoryConnection) -> (Arc<InMemoryConnection>, BasicEntityPersister) {
        let driver = Arc::new(StaticDriver::from_json(MAPPING).unwrap());
        let registry = Arc::new(MetadataRegistry::without_aliases(driver));
        let identity_map = Arc::new(IdentityMap::new(registry.clone()));
        let connection = Arc::new(connection);
        let persister = BasicEntityPersister::new(
            registry.get_metadata_for("app::Book").unwrap(),
            connection.clone(),
            identity_map,
        );
        (connection, persister)
    }

    fn by_id(id: i64) -> Criteria {
        let mut criteria = Criteria::new();
        criteria.insert("id".to_string(), Value::Integer(id));
        criteria
    }

    #[tokio::test]
    async fn test_load_resource() {
        let (connection, persister) = persister(
            InMemoryConnection::new()
                .with_json("books/4.json", r#"{"book":{"id":4,"title":"Dune"}}"#),
        );

        let book = persister.load(&by_id(4)).await.unwrap().unwrap();
        assert_eq!(book.text("title").as_deref(), Some("Dune"));
        assert_eq!(connection.requests().unwrap()[0].uri(), "books/4.json");
    }

    #[tokio::test]
    async fn test_load_not_found_is_none() {
        let (_, persister) = persister(InMemoryConnection::new());
        assert!(persister.load(&by_id(9)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_propagates_other_errors() {
        let (_, persister) = persister(
            InMemoryConnection::new().with_status("books/1.json", StatusCode::FORBIDDEN),
        );
        let err = persister.load(&by_id(1)).await.unwrap_err();
        assert!(matches!(err, RaplError::ClientError { status, .. } if status == StatusCode::FORBIDDEN));
    }

    #[tokio::test]
    async fn test_load_all_ignores_paging() {
        let (connection, persister) = persister(InMemoryConnection::new().with_json(
            "books.json",
            r#"{"books":[{"id":1,"title":"A"},{"id":2,"title":"B"}]}"#,
        ));

        let order = vec![("title".to_string(), SortOrder::Desc)];
        let books = persister
            .load_all(&Criteria::new(), Some(&order), Some(1), Some(5))
            .await
            .unwrap();
        assert_eq!(books.len(), 2);
        assert_eq!(books[0].integer("id"), Some(1));
        assert_eq!(connection.requests().unwrap()[0].uri(), "books.json");
    }

    #[tokio::test]
    async fn test_load_all_not_found_propagates() {
        let (_, persister) = persister(InMemoryConnection::new());
        let err = persister
            .load_all(&Criteria::new(), None, None, None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_load_by_id_returns_canonical_instance() {
        let (_, persister) = persister(
            InMemoryConnection::new()
                .with_json("books/4.json", r#"{"book":{"id":4,"title":"Dune"}}"#),
        );
        let first = persister.load_by_id(Value::Integer(4)).await.unwrap().unwrap();
        let second = persister.load_by_id(Value::Integer(4)).await.unwrap().unwrap();
        assert!(first.ptr_eq(&second));
    }
}

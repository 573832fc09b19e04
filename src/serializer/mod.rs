//! Wire decoding and entity hydration
//!
//! Turns a raw response body into canonical entities:
//!
//! 1. decode the body according to the type's wire format
//! 2. unwrap the configured envelopes for the operation
//! 3. remap wire keys to field names, coercing scalars and hydrating
//!    associations recursively
//! 4. hand each element to the identity map
//!
//! - `converter.rs` - scalar coercion rules

mod converter;

pub use converter::WireValueConverter;

use crate::core::{AssociationKind, EnvelopeKey, Operation, RaplError, Result, Value};
use crate::entity::EntityRef;
use crate::mapping::{Association, TypeMetadata};
use crate::unit_of_work::{FieldData, IdentityMap};
use log::{debug, warn};
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;

/// Descends through `envelopes` in order. A key that is not present leaves
/// the data unchanged at that step.
pub fn unwrap_envelopes(mut data: JsonValue, envelopes: &[EnvelopeKey]) -> JsonValue {
    for key in envelopes {
        let inner = match (&mut data, key) {
            (JsonValue::Object(map), EnvelopeKey::Key(k)) => map.remove(k),
            (JsonValue::Object(map), EnvelopeKey::Index(i)) => map.remove(&i.to_string()),
            (JsonValue::Array(items), EnvelopeKey::Index(i)) if *i < items.len() => {
                Some(items.swap_remove(*i))
            }
            (JsonValue::Array(items), EnvelopeKey::Key(k)) => match k.parse::<usize>() {
                Ok(i) if i < items.len() => Some(items.swap_remove(i)),
                _ => None,
            },
            _ => None,
        };

        match inner {
            Some(inner) => data = inner,
            None => debug!("Envelope '{}' not present, skipping", key),
        }
    }
    data
}

/// Decoder and hydrator bound to one entity type.
#[derive(Clone)]
pub struct Serializer {
    metadata: Arc<TypeMetadata>,
    identity_map: Arc<IdentityMap>,
}

impl Serializer {
    pub fn new(metadata: Arc<TypeMetadata>, identity_map: Arc<IdentityMap>) -> Self {
        Self {
            metadata,
            identity_map,
        }
    }

    pub fn metadata(&self) -> &Arc<TypeMetadata> {
        &self.metadata
    }

    /// Decodes `data` and hydrates its elements, preserving their order.
    pub fn deserialize(&self, data: &str, operation: Operation) -> Result<Vec<EntityRef>> {
        let decoded = self.decode(data)?;
        let unwrapped = self.unwrap(decoded, operation);

        let elements = match (operation, unwrapped) {
            (_, JsonValue::Null) => Vec::new(),
            (Operation::Collection, JsonValue::Array(items)) => items,
            (Operation::Collection, other) => {
                return Err(RaplError::Decode(format!(
                    "Expected a sequence of '{}' elements, got {}",
                    self.metadata.type_id(),
                    json_kind(&other)
                )));
            }
            (Operation::Resource, JsonValue::Array(items)) if items.is_empty() => Vec::new(),
            (Operation::Resource, element) => vec![element],
        };

        let mut entities = Vec::with_capacity(elements.len());
        for element in elements {
            match element {
                JsonValue::Object(map) => entities.push(self.hydrate_element(&map)?),
                other => {
                    return Err(RaplError::Decode(format!(
                        "Expected a '{}' object, got {}",
                        self.metadata.type_id(),
                        json_kind(&other)
                    )));
                }
            }
        }
        Ok(entities)
    }

    pub fn decode(&self, data: &str) -> Result<JsonValue> {
        match self.metadata.format() {
            "json" => Ok(serde_json::from_str(data)?),
            other => Err(RaplError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn unwrap(&self, data: JsonValue, operation: Operation) -> JsonValue {
        unwrap_envelopes(data, self.metadata.envelopes(operation))
    }

    /// Maps wire keys to field names and coerces their values.
    ///
    /// Keys that resolve to no declared field are dropped.
    pub fn remap(&self, element: &Map<String, JsonValue>) -> Result<FieldData> {
        let mut data = FieldData::new();

        for (wire_name, value) in element {
            let field_name = self.metadata.field_name(wire_name);
            if !self.metadata.has_field(field_name) {
                continue;
            }
            let mapping = self.metadata.get_field_mapping(field_name)?;

            let value = match &mapping.association {
                Some(association) => self.hydrate_association(association, value)?,
                None => WireValueConverter::convert(value, &mapping.scalar_type)?,
            };
            data.insert(field_name.to_string(), value);
        }

        Ok(data)
    }

    fn hydrate_element(&self, element: &Map<String, JsonValue>) -> Result<EntityRef> {
        let data = self.remap(element)?;
        self.identity_map.create_entity(self.metadata.type_id(), data)
    }

    fn hydrate_association(&self, association: &Association, value: &JsonValue) -> Result<Value> {
        let target = self.for_type(&association.target_type)?;

        let value = match (association.kind, value) {
            (AssociationKind::EmbedOne, JsonValue::Object(map)) => {
                Value::Entity(target.hydrate_element(map)?)
            }
            (AssociationKind::EmbedMany, JsonValue::Array(items)) => {
                let mut entities = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        JsonValue::Object(map) => entities.push(target.hydrate_element(map)?),
                        other => warn!(
                            "Skipping non-object '{}' element: {}",
                            association.target_type,
                            json_kind(other)
                        ),
                    }
                }
                Value::Collection(entities)
            }
            (AssociationKind::ReferenceOne, single) => target.reference(single)?.into(),
            (AssociationKind::ReferenceMany, JsonValue::Array(items)) => {
                let mut entities = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(entity) = target.reference(item)? {
                        entities.push(entity);
                    }
                }
                Value::Collection(entities)
            }
            _ => Value::Null,
        };
        Ok(value)
    }

    /// Resolves a reference given either as an object or as the target's
    /// identifier value.
    fn reference(&self, value: &JsonValue) -> Result<Option<EntityRef>> {
        match value {
            JsonValue::Null | JsonValue::Array(_) => Ok(None),
            JsonValue::Object(map) => self.hydrate_element(map).map(Some),
            scalar => {
                let Some(id_field) = self.metadata.identifier_field_names().first() else {
                    warn!(
                        "'{}' declares no identifier, cannot resolve reference {}",
                        self.metadata.type_id(),
                        scalar
                    );
                    return Ok(None);
                };
                let mapping = self.metadata.get_field_mapping(id_field)?;
                let id = WireValueConverter::convert(scalar, &mapping.scalar_type)?;
                if id.is_null() {
                    return Ok(None);
                }
                let data = FieldData::from([(id_field.clone(), id)]);
                self.identity_map
                    .create_entity(self.metadata.type_id(), data)
                    .map(Some)
            }
        }
    }

    fn for_type(&self, type_id: &str) -> Result<Serializer> {
        let metadata = self.identity_map.metadata_for(type_id)?;
        Ok(Serializer::new(metadata, self.identity_map.clone()))
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{MetadataRegistry, StaticDriver};
    use serde_json::json;

    const MAPPING: &str = r#"{
        "app::Book": {
            "format": "json",
            "resource": { "route": "books/{id}", "envelopes": ["results", 0] },
            "collection": { "route": "books", "envelopes": ["results"] },
            "identifiers": { "id": { "type": "integer" } },
            "fields": {
                "title": { "type": "string" },
                "isbn": { "type": "string", "serializedName": "isbn_13" },
                "available": { "type": "boolean" },
                "published": { "type": "datetime" },
                "unknown": { "type": "foobarbaz" }
            },
            "embedOne": { "author": { "targetEntity": "app::Author" } },
            "embedMany": { "reviews": { "targetEntity": "app::Review" } },
            "referenceOne": { "publisher": { "targetEntity": "app::Publisher" } },
            "referenceMany": { "related": { "targetEntity": "app::Book" } }
        },
        "app::Author": {
            "identifiers": { "id": { "type": "integer" } },
            "fields": { "name": { "type": "string" } }
        },
        "app::Review": {
            "fields": { "stars": { "type": "integer" } }
        },
        "app::Publisher": {
            "identifiers": { "code": { "type": "string" } },
            "fields": { "name": { "type": "string" } }
        },
        "app::Pamphlet": {
            "identifiers": { "id": { "type": "integer" } },
            "fields": {
                "pages": { "type": "int" },
                "flag": { "type": "Boolean" },
                "label": { "type": "text" }
            }
        },
        "app::Archive": {
            "format": "xml",
            "identifiers": { "id": { "type": "integer" } }
        }
    }"#;

    fn serializer(type_id: &str) -> Serializer {
        let driver = Arc::new(StaticDriver::from_json(MAPPING).unwrap());
        let registry = Arc::new(MetadataRegistry::without_aliases(driver));
        let identity_map = Arc::new(IdentityMap::new(registry.clone()));
        Serializer::new(registry.get_metadata_for(type_id).unwrap(), identity_map)
    }

    #[test]
    fn test_deserialize_collection() {
        let serializer = serializer("app::Book");
        let body = r#"{"results":[{"id":1,"title":"Winnie the Pooh","isbn_13":"1234567890123"}]}"#;

        let entities = serializer.deserialize(body, Operation::Collection).unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].text("title").as_deref(), Some("Winnie the Pooh"));
        assert_eq!(entities[0].text("isbn").as_deref(), Some("1234567890123"));
        assert_eq!(entities[0].integer("id"), Some(1));
    }

    #[test]
    fn test_deserialize_resource_descends_into_index() {
        let serializer = serializer("app::Book");
        let body = r#"{"results":[{"id":7,"title":"Emma"},{"id":8,"title":"Persuasion"}]}"#;

        let entities = serializer.deserialize(body, Operation::Resource).unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].integer("id"), Some(7));
    }

    #[test]
    fn test_deserialize_preserves_order() {
        let serializer = serializer("app::Book");
        let body = r#"{"results":[{"id":3},{"id":1},{"id":2}]}"#;
        let ids: Vec<_> = serializer
            .deserialize(body, Operation::Collection)
            .unwrap()
            .iter()
            .map(|e| e.integer("id").unwrap())
            .collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_deserialize_all_field_kinds() {
        let serializer = serializer("app::Book");
        let body = r#"{"results":[{
            "id": "5",
            "title": "Foo Bar",
            "available": false,
            "published": "2014-12-10 14:32:01",
            "author": { "id": 3, "name": "Bar" },
            "unknown": "adsf",
            "not_mapped": "dropped"
        }]}"#;

        let entities = serializer.deserialize(body, Operation::Collection).unwrap();
        let book = &entities[0];
        assert_eq!(book.integer("id"), Some(5));
        assert_eq!(book.boolean("available"), Some(false));
        assert!(book.datetime("published").is_some());
        assert_eq!(book.get("unknown"), Some(Value::Null));
        assert_eq!(book.get("not_mapped"), None);

        let author = book.entity("author").unwrap();
        assert_eq!(author.type_id(), "app::Author");
        assert_eq!(author.text("name").as_deref(), Some("Bar"));
    }

    #[test]
    fn test_embed_one_non_object_is_null() {
        let serializer = serializer("app::Book");
        let body = r#"{"results":[{"id":1,"author":"someone"}]}"#;
        let entities = serializer.deserialize(body, Operation::Collection).unwrap();
        assert_eq!(entities[0].get("author"), Some(Value::Null));
    }

    #[test]
    fn test_embed_many_hydrates_each_object() {
        let serializer = serializer("app::Book");
        let body = r#"{"results":[{"id":1,"reviews":[{"stars":5},"junk",{"stars":"3"}]}]}"#;
        let entities = serializer.deserialize(body, Operation::Collection).unwrap();
        let reviews = entities[0].collection("reviews").unwrap();
        let stars: Vec<_> = reviews.iter().map(|r| r.integer("stars").unwrap()).collect();
        assert_eq!(stars, vec![5, 3]);
    }

    #[test]
    fn test_references_resolve_to_canonical_instances() {
        let serializer = serializer("app::Book");
        let body = r#"{"results":[
            {"id":1,"publisher":"acme","related":[2]},
            {"id":2,"publisher":{"code":"acme","name":"Acme"},"related":[1, null]}
        ]}"#;
        let entities = serializer.deserialize(body, Operation::Collection).unwrap();

        let first_publisher = entities[0].entity("publisher").unwrap();
        let second_publisher = entities[1].entity("publisher").unwrap();
        assert!(first_publisher.ptr_eq(&second_publisher));
        assert_eq!(first_publisher.text("name").as_deref(), Some("Acme"));

        let related = entities[0].collection("related").unwrap();
        assert!(related[0].ptr_eq(&entities[1]));
        let back = entities[1].collection("related").unwrap();
        assert_eq!(back.len(), 1);
        assert!(back[0].ptr_eq(&entities[0]));
    }

    #[test]
    fn test_unwrap_is_order_sensitive() {
        let data = json!({"a": {"b": [10, 20]}});
        let keys = [EnvelopeKey::from("a"), EnvelopeKey::from("b"), EnvelopeKey::Index(1)];
        assert_eq!(unwrap_envelopes(data.clone(), &keys), json!(20));

        let reversed = [EnvelopeKey::from("b"), EnvelopeKey::from("a")];
        assert_eq!(unwrap_envelopes(data, &reversed), json!({"b": [10, 20]}));
    }

    #[test]
    fn test_unwrap_skips_missing_key() {
        let data = json!({"results": [1]});
        let keys = [EnvelopeKey::from("data"), EnvelopeKey::from("results")];
        assert_eq!(unwrap_envelopes(data, &keys), json!([1]));
    }

    #[test]
    fn test_resource_without_element_yields_nothing() {
        let serializer = serializer("app::Book");
        let entities = serializer
            .deserialize(r#"{"results":[]}"#, Operation::Resource)
            .unwrap();
        assert!(entities.is_empty());
    }

    #[test]
    fn test_collection_must_be_a_sequence() {
        let serializer = serializer("app::Book");
        let err = serializer
            .deserialize(r#"{"results":{"id":1}}"#, Operation::Collection)
            .unwrap_err();
        assert!(matches!(err, RaplError::Decode(_)));
    }

    #[test]
    fn test_unsupported_format() {
        let serializer = serializer("app::Archive");
        assert!(matches!(
            serializer.deserialize("<archive/>", Operation::Resource),
            Err(RaplError::UnsupportedFormat(format)) if format == "xml"
        ));
    }

    #[test]
    fn test_malformed_body_is_decode_error() {
        let serializer = serializer("app::Book");
        assert!(matches!(
            serializer.deserialize("{not json", Operation::Collection),
            Err(RaplError::Decode(_))
        ));
    }

    #[test]
    fn test_type_names_match_exactly() {
        let serializer = serializer("app::Pamphlet");
        let entities = serializer
            .deserialize(
                r#"[{"id":1,"pages":"5","flag":"1","label":"x"}]"#,
                Operation::Collection,
            )
            .unwrap();

        let pamphlet = &entities[0];
        assert_eq!(pamphlet.integer("id"), Some(1));
        assert_eq!(pamphlet.get("pages"), Some(Value::Null));
        assert_eq!(pamphlet.get("flag"), Some(Value::Null));
        assert_eq!(pamphlet.get("label"), Some(Value::Null));
    }
}

use crate::core::{EnvelopeKey, Operation, Result, ScalarType};
use crate::mapping::{FieldSpec, TypeMetadata};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;

/// A mapping document: type identifier to mapping record.
pub type MappingDocument = BTreeMap<String, MappingElement>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub envelopes: Option<Vec<EnvelopeKey>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldElement {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serialized_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociationElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_entity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serialized_name: Option<String>,
}

/// Mapping record of one entity type.
///
/// Field tables are kept as raw JSON objects so declaration order survives
/// deserialization; it decides field and identifier order in the metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<RouteElement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<RouteElement>,
    #[serde(default)]
    pub identifiers: Map<String, JsonValue>,
    #[serde(default)]
    pub fields: Map<String, JsonValue>,
    #[serde(default)]
    pub embed_one: Map<String, JsonValue>,
    #[serde(default)]
    pub embed_many: Map<String, JsonValue>,
    #[serde(default)]
    pub reference_one: Map<String, JsonValue>,
    #[serde(default)]
    pub reference_many: Map<String, JsonValue>,
}

impl MappingElement {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn apply(&self, metadata: &mut TypeMetadata) -> Result<()> {
        if let Some(format) = &self.format {
            metadata.set_format(format.clone());
        }

        for (operation, element) in [
            (Operation::Resource, &self.resource),
            (Operation::Collection, &self.collection),
        ] {
            if let Some(element) = element {
                if let Some(route) = &element.route {
                    metadata.set_route(operation, route.clone());
                }
                if let Some(envelopes) = &element.envelopes {
                    metadata.set_envelopes(operation, envelopes.clone());
                }
            }
        }

        for (field_name, field) in fields_of::<FieldElement>(&self.identifiers)? {
            metadata.map_field(field.into_spec(field_name).identifier())?;
        }
        for (field_name, field) in fields_of::<FieldElement>(&self.fields)? {
            metadata.map_field(field.into_spec(field_name))?;
        }

        for (field_name, assoc) in fields_of::<AssociationElement>(&self.embed_one)? {
            metadata.map_embed_one(assoc.into_spec(field_name))?;
        }
        for (field_name, assoc) in fields_of::<AssociationElement>(&self.embed_many)? {
            metadata.map_embed_many(assoc.into_spec(field_name))?;
        }
        for (field_name, assoc) in fields_of::<AssociationElement>(&self.reference_one)? {
            metadata.map_reference_one(assoc.into_spec(field_name))?;
        }
        for (field_name, assoc) in fields_of::<AssociationElement>(&self.reference_many)? {
            metadata.map_reference_many(assoc.into_spec(field_name))?;
        }

        Ok(())
    }
}

impl FieldElement {
    fn into_spec(self, field_name: String) -> FieldSpec {
        FieldSpec {
            field_name,
            wire_name: self.serialized_name,
            scalar_type: self.type_name.as_deref().map(ScalarType::from),
            ..FieldSpec::default()
        }
    }
}

impl AssociationElement {
    fn into_spec(self, field_name: String) -> FieldSpec {
        FieldSpec {
            field_name,
            wire_name: self.serialized_name,
            target_type: self.target_entity,
            ..FieldSpec::default()
        }
    }
}

// `null` entries (`title: ~` style) mean "all defaults".
fn fields_of<T>(table: &Map<String, JsonValue>) -> Result<Vec<(String, T)>>
where
    T: Default + for<'de> Deserialize<'de>,
{
    table
        .iter()
        .map(|(name, raw)| {
            let element = match raw {
                JsonValue::Null => T::default(),
                other => serde_json::from_value(other.clone())?,
            };
            Ok((name.clone(), element))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AssociationKind, EnvelopeKey, RaplError};
    use crate::mapping::MappingError;

    const BOOK: &str = r#"{
        "format": "json",
        "resource": { "route": "books/{id}", "envelopes": ["results", 0] },
        "collection": { "route": "books", "envelopes": ["results"] },
        "identifiers": { "id": { "type": "integer" } },
        "fields": {
            "title": { "type": "string" },
            "isbn": { "type": "string", "serializedName": "isbn_13" },
            "note": null
        },
        "embedOne": { "author": { "targetEntity": "app::Author" } },
        "embedMany": { "reviews": { "targetEntity": "app::Review" } }
    }"#;

    #[test]
    fn test_apply_populates_metadata() {
        let element = MappingElement::from_json(BOOK).unwrap();
        let mut metadata = TypeMetadata::new("app::Book");
        element.apply(&mut metadata).unwrap();

        assert_eq!(metadata.format(), "json");
        assert_eq!(metadata.route(Operation::Resource), Some("books/{id}"));
        assert_eq!(metadata.route(Operation::Collection), Some("books"));
        assert_eq!(
            metadata.envelopes(Operation::Resource),
            &[EnvelopeKey::from("results"), EnvelopeKey::Index(0)]
        );
        assert_eq!(metadata.identifier_field_names(), &["id".to_string()]);
        assert_eq!(
            metadata.field_names(),
            vec!["id", "title", "isbn", "note", "author", "reviews"]
        );
        assert_eq!(metadata.field_name("isbn_13"), "isbn");
        assert_eq!(metadata.type_of_field("note"), Some(&ScalarType::String));
        assert_eq!(
            metadata.association("reviews").map(|a| a.kind),
            Some(AssociationKind::EmbedMany)
        );
    }

    #[test]
    fn test_embed_without_target_fails() {
        let element =
            MappingElement::from_json(r#"{ "embedOne": { "author": {} } }"#).unwrap();
        let mut metadata = TypeMetadata::new("app::Book");
        assert!(matches!(
            element.apply(&mut metadata),
            Err(RaplError::Mapping(MappingError::MissingTargetType { .. }))
        ));
    }
}

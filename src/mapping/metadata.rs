use super::MappingError;
use crate::core::{
    AssociationKind, Cardinality, Criteria, EnvelopeKey, Operation, RaplError, Result, Routes,
    ScalarType, Value,
};
use crate::entity::{EntityRecord, EntityRef, FieldLayout};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

lazy_static! {
    static ref ROUTE_PLACEHOLDER: Regex = Regex::new(r"\{([^{}]+)\}").expect("valid placeholder pattern");
}

/// Names every `{placeholder}` in a route template, in order of appearance.
pub fn route_placeholders(route: &str) -> Vec<&str> {
    ROUTE_PLACEHOLDER
        .captures_iter(route)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

/// Input to `TypeMetadata::map_field` and the association variants.
#[derive(Debug, Clone, Default)]
pub struct FieldSpec {
    pub field_name: String,
    pub wire_name: Option<String>,
    pub scalar_type: Option<ScalarType>,
    pub identifier: bool,
    pub embedded: bool,
    pub reference: bool,
    pub cardinality: Option<Cardinality>,
    pub target_type: Option<String>,
}

impl FieldSpec {
    pub fn new(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            ..Self::default()
        }
    }

    pub fn wire_name(mut self, wire_name: impl Into<String>) -> Self {
        self.wire_name = Some(wire_name.into());
        self
    }

    pub fn scalar_type(mut self, scalar_type: impl Into<ScalarType>) -> Self {
        self.scalar_type = Some(scalar_type.into());
        self
    }

    pub fn identifier(mut self) -> Self {
        self.identifier = true;
        self
    }

    pub fn target_type(mut self, target_type: impl Into<String>) -> Self {
        self.target_type = Some(target_type.into());
        self
    }

    fn association_kind(&self) -> Option<AssociationKind> {
        match (self.embedded, self.reference, self.cardinality) {
            (true, _, Some(Cardinality::One)) => Some(AssociationKind::EmbedOne),
            (true, _, Some(Cardinality::Many)) => Some(AssociationKind::EmbedMany),
            (false, true, Some(Cardinality::One)) => Some(AssociationKind::ReferenceOne),
            (false, true, Some(Cardinality::Many)) => Some(AssociationKind::ReferenceMany),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
    pub kind: AssociationKind,
    pub target_type: String,
}

/// A completed field mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub field_name: String,
    pub wire_name: String,
    pub scalar_type: ScalarType,
    pub identifier: bool,
    pub association: Option<Association>,
}

/// Static description of one entity type.
///
/// Populated by a mapping driver, then shared read-only behind an `Arc` for
/// the lifetime of the registry that loaded it.
#[derive(Debug)]
pub struct TypeMetadata {
    type_id: String,
    fields: Vec<FieldMapping>,
    field_index: HashMap<String, usize>,
    // wire name -> field name
    wire_names: HashMap<String, String>,
    identifier: Vec<String>,
    format: Option<String>,
    routes: Routes,
    envelopes: HashMap<Operation, Vec<EnvelopeKey>>,
    prototype: OnceLock<EntityRecord>,
}

impl TypeMetadata {
    pub const DEFAULT_FORMAT: &'static str = "json";

    pub fn new(type_id: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            fields: Vec::new(),
            field_index: HashMap::new(),
            wire_names: HashMap::new(),
            identifier: Vec::new(),
            format: None,
            routes: Routes::new(),
            envelopes: HashMap::new(),
            prototype: OnceLock::new(),
        }
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    // ------------------------------------------------------------------
    // Field mapping
    // ------------------------------------------------------------------

    pub fn map_field(&mut self, spec: FieldSpec) -> Result<()> {
        if spec.field_name.is_empty() {
            return Err(MappingError::MissingFieldName {
                type_id: self.type_id.clone(),
            }
            .into());
        }

        let association = match spec.association_kind() {
            Some(kind) => {
                let target_type = spec.target_type.clone().ok_or_else(|| {
                    MappingError::MissingTargetType {
                        field: spec.field_name.clone(),
                    }
                })?;
                Some(Association { kind, target_type })
            }
            None => None,
        };

        let mapping = FieldMapping {
            wire_name: spec
                .wire_name
                .unwrap_or_else(|| spec.field_name.clone()),
            scalar_type: spec.scalar_type.unwrap_or_default(),
            identifier: spec.identifier,
            association,
            field_name: spec.field_name,
        };

        if mapping.identifier && !self.identifier.contains(&mapping.field_name) {
            self.identifier.push(mapping.field_name.clone());
        }

        match self.field_index.get(&mapping.field_name) {
            Some(&idx) => {
                let previous = &self.fields[idx];
                if previous.wire_name != mapping.wire_name {
                    self.wire_names.remove(&previous.wire_name);
                }
                self.wire_names
                    .insert(mapping.wire_name.clone(), mapping.field_name.clone());
                self.fields[idx] = mapping;
            }
            None => {
                self.wire_names
                    .insert(mapping.wire_name.clone(), mapping.field_name.clone());
                self.field_index
                    .insert(mapping.field_name.clone(), self.fields.len());
                self.fields.push(mapping);
            }
        }

        // The slot layout changed; rebuild the prototype on next use.
        self.prototype.take();
        Ok(())
    }

    pub fn map_embed_one(&mut self, spec: FieldSpec) -> Result<()> {
        self.map_association(spec, true, Cardinality::One)
    }

    pub fn map_embed_many(&mut self, spec: FieldSpec) -> Result<()> {
        self.map_association(spec, true, Cardinality::Many)
    }

    pub fn map_reference_one(&mut self, spec: FieldSpec) -> Result<()> {
        self.map_association(spec, false, Cardinality::One)
    }

    pub fn map_reference_many(&mut self, spec: FieldSpec) -> Result<()> {
        self.map_association(spec, false, Cardinality::Many)
    }

    fn map_association(
        &mut self,
        mut spec: FieldSpec,
        embedded: bool,
        cardinality: Cardinality,
    ) -> Result<()> {
        if spec.target_type.as_deref().is_none_or(str::is_empty) {
            return Err(MappingError::MissingTargetType {
                field: spec.field_name,
            }
            .into());
        }
        spec.embedded = embedded;
        spec.reference = !embedded;
        spec.cardinality = Some(cardinality);
        self.map_field(spec)
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    pub fn has_field(&self, field: &str) -> bool {
        self.field_index.contains_key(field)
    }

    pub fn fields(&self) -> &[FieldMapping] {
        &self.fields
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.field_name.as_str()).collect()
    }

    pub fn get_field_mapping(&self, field: &str) -> Result<&FieldMapping> {
        self.field_index
            .get(field)
            .map(|&idx| &self.fields[idx])
            .ok_or_else(|| {
                MappingError::MappingNotFound {
                    type_id: self.type_id.clone(),
                    field: field.to_string(),
                }
                .into()
            })
    }

    /// Field name for a wire name, or the wire name itself when unmapped.
    pub fn field_name<'a>(&'a self, wire_name: &'a str) -> &'a str {
        self.wire_names
            .get(wire_name)
            .map(String::as_str)
            .unwrap_or(wire_name)
    }

    pub fn type_of_field(&self, field: &str) -> Option<&ScalarType> {
        self.get_field_mapping(field).ok().map(|m| &m.scalar_type)
    }

    pub fn identifier_field_names(&self) -> &[String] {
        &self.identifier
    }

    pub fn is_identifier(&self, field: &str) -> bool {
        self.identifier.iter().any(|name| name == field)
    }

    pub fn association(&self, field: &str) -> Option<&Association> {
        self.get_field_mapping(field)
            .ok()
            .and_then(|m| m.association.as_ref())
    }

    pub fn has_association(&self, field: &str) -> bool {
        self.association(field).is_some()
    }

    pub fn has_embed(&self, field: &str) -> bool {
        self.association(field).is_some_and(|a| a.kind.is_embed())
    }

    pub fn is_single_valued_association(&self, field: &str) -> bool {
        self.association(field)
            .is_some_and(|a| a.kind.is_single_valued())
    }

    pub fn is_collection_valued_association(&self, field: &str) -> bool {
        self.association(field)
            .is_some_and(|a| a.kind.is_collection_valued())
    }

    pub fn association_names(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.association.is_some())
            .map(|f| f.field_name.as_str())
            .collect()
    }

    pub fn association_target_type(&self, field: &str) -> Result<&str> {
        self.association(field)
            .map(|a| a.target_type.as_str())
            .ok_or_else(|| {
                RaplError::InvalidArgument(format!(
                    "Association name expected, '{}' is not an association.",
                    field
                ))
            })
    }

    // ------------------------------------------------------------------
    // Wire format, routes and envelopes
    // ------------------------------------------------------------------

    pub fn format(&self) -> &str {
        self.format.as_deref().unwrap_or(Self::DEFAULT_FORMAT)
    }

    pub fn set_format(&mut self, format: impl Into<String>) {
        self.format = Some(format.into());
    }

    pub fn set_route(&mut self, operation: Operation, route: impl Into<String>) {
        self.routes.insert(operation, route.into());
    }

    pub fn has_route(&self, operation: Operation) -> bool {
        self.routes.contains_key(&operation)
    }

    pub fn route(&self, operation: Operation) -> Option<&str> {
        self.routes.get(&operation).map(String::as_str)
    }

    pub fn routes(&self) -> &Routes {
        &self.routes
    }

    pub fn set_envelopes(&mut self, operation: Operation, envelopes: Vec<EnvelopeKey>) {
        self.envelopes.insert(operation, envelopes);
    }

    pub fn has_envelope(&self, operation: Operation) -> bool {
        self.envelopes.contains_key(&operation)
    }

    pub fn envelopes(&self, operation: Operation) -> &[EnvelopeKey] {
        self.envelopes
            .get(&operation)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Checks that every route placeholder names an identifier field.
    pub fn validate(&self) -> Result<()> {
        for route in self.routes.values() {
            for placeholder in route_placeholders(route) {
                if !self.is_identifier(placeholder) {
                    return Err(MappingError::InvalidRoutePlaceholder {
                        type_id: self.type_id.clone(),
                        route: route.clone(),
                        placeholder: placeholder.to_string(),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Instances
    // ------------------------------------------------------------------

    pub fn layout(&self) -> Arc<FieldLayout> {
        self.prototype().layout().clone()
    }

    /// A new empty instance, cloned from the cached prototype.
    pub fn new_instance(&self) -> EntityRef {
        EntityRef::new(self.prototype().clone())
    }

    fn prototype(&self) -> &EntityRecord {
        self.prototype.get_or_init(|| {
            let names = self.fields.iter().map(|f| f.field_name.clone()).collect();
            EntityRecord::empty(Arc::new(FieldLayout::new(self.type_id.clone(), names)))
        })
    }

    pub fn set_field_value(&self, entity: &EntityRef, field: &str, value: Value) -> Result<()> {
        self.get_field_mapping(field)?;
        let mut record = entity.write()?;
        if record.type_id() != self.type_id {
            return Err(RaplError::InvalidArgument(format!(
                "Entity of type '{}' passed to metadata of '{}'",
                record.type_id(),
                self.type_id
            )));
        }
        record.set(field, value)
    }

    /// Current value of the first identifier field, keyed by its name.
    pub fn identifier_values(&self, entity: &EntityRef) -> Result<Criteria> {
        let mut values = Criteria::new();
        if let Some(field) = self.identifier.first() {
            let record = entity.read()?;
            let value = record.get(field).cloned().unwrap_or(Value::Null);
            values.insert(field.clone(), value);
        }
        Ok(values)
    }
}

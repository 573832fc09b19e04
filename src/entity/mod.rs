//! Entity records and shared entity handles.
//!
//! An entity is a slot vector laid out by its type's `FieldLayout`. Records
//! are produced by cloning a per-type prototype, so a freshly allocated
//! entity is structurally complete but holds `Value::Null` in every slot
//! until hydration writes into it.

use crate::core::{RaplError, Result, Value};
use chrono::{DateTime, FixedOffset};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Slot table for one entity type, built once from its metadata.
#[derive(Debug)]
pub struct FieldLayout {
    type_id: String,
    names: Vec<String>,
    slots: HashMap<String, usize>,
}

impl FieldLayout {
    pub fn new(type_id: impl Into<String>, names: Vec<String>) -> Self {
        let slots = names
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();
        Self {
            type_id: type_id.into(),
            names,
            slots,
        }
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    pub fn field_names(&self) -> &[String] {
        &self.names
    }

    pub fn slot(&self, field: &str) -> Option<usize> {
        self.slots.get(field).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Backing storage of one entity instance.
#[derive(Debug, Clone)]
pub struct EntityRecord {
    layout: Arc<FieldLayout>,
    values: Vec<Value>,
    /// Identity hash frozen when the entity first entered an identity map.
    identity: Option<String>,
}

impl EntityRecord {
    /// A record with every declared field set to `Value::Null`.
    pub fn empty(layout: Arc<FieldLayout>) -> Self {
        let values = vec![Value::Null; layout.len()];
        Self {
            layout,
            values,
            identity: None,
        }
    }

    pub fn type_id(&self) -> &str {
        self.layout.type_id()
    }

    pub fn layout(&self) -> &Arc<FieldLayout> {
        &self.layout
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.layout.slot(field).is_some()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.layout.slot(field).map(|idx| &self.values[idx])
    }

    /// Writes straight into the slot for `field`.
    pub fn set(&mut self, field: &str, value: Value) -> Result<()> {
        let idx = self.layout.slot(field).ok_or_else(|| {
            RaplError::InvalidArgument(format!(
                "Field '{}' is not declared on '{}'",
                field,
                self.layout.type_id()
            ))
        })?;
        self.values[idx] = value;
        Ok(())
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    pub fn integer(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(Value::as_i64)
    }

    pub fn boolean(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(Value::as_bool)
    }

    pub fn datetime(&self, field: &str) -> Option<DateTime<FixedOffset>> {
        self.get(field).and_then(Value::as_datetime).copied()
    }

    pub fn entity(&self, field: &str) -> Option<EntityRef> {
        self.get(field).and_then(Value::as_entity).cloned()
    }

    pub fn collection(&self, field: &str) -> Option<Vec<EntityRef>> {
        self.get(field)
            .and_then(Value::as_collection)
            .map(|items| items.to_vec())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.layout
            .field_names()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub(crate) fn set_identity(&mut self, identity: String) {
        self.identity = Some(identity);
    }
}

/// Shared handle to a live entity.
///
/// Cloning the handle never copies the entity; two handles are the same
/// entity when `ptr_eq` holds.
#[derive(Clone)]
pub struct EntityRef {
    inner: Arc<RwLock<EntityRecord>>,
}

impl EntityRef {
    pub fn new(record: EntityRecord) -> Self {
        Self {
            inner: Arc::new(RwLock::new(record)),
        }
    }

    pub fn read(&self) -> Result<RwLockReadGuard<'_, EntityRecord>> {
        Ok(self.inner.read()?)
    }

    pub fn write(&self) -> Result<RwLockWriteGuard<'_, EntityRecord>> {
        Ok(self.inner.write()?)
    }

    pub fn ptr_eq(&self, other: &EntityRef) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Snapshot of a single field.
    pub fn get(&self, field: &str) -> Option<Value> {
        self.snapshot().get(field).cloned()
    }

    pub fn type_id(&self) -> String {
        self.snapshot().type_id().to_string()
    }

    pub fn text(&self, field: &str) -> Option<String> {
        self.snapshot().text(field).map(str::to_string)
    }

    pub fn integer(&self, field: &str) -> Option<i64> {
        self.snapshot().integer(field)
    }

    pub fn boolean(&self, field: &str) -> Option<bool> {
        self.snapshot().boolean(field)
    }

    pub fn datetime(&self, field: &str) -> Option<DateTime<FixedOffset>> {
        self.snapshot().datetime(field)
    }

    pub fn entity(&self, field: &str) -> Option<EntityRef> {
        self.snapshot().entity(field)
    }

    pub fn collection(&self, field: &str) -> Option<Vec<EntityRef>> {
        self.snapshot().collection(field)
    }

    // Accessors stay usable after a panic elsewhere poisoned the lock.
    fn snapshot(&self) -> RwLockReadGuard<'_, EntityRecord> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Associations may form cycles, so only the head is printed.
        let record = self.snapshot();
        f.debug_struct("EntityRef")
            .field("type_id", &record.type_id())
            .field("identity", &record.identity())
            .field("ptr", &Arc::as_ptr(&self.inner))
            .finish()
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.snapshot();
        match record.identity() {
            Some(id) => write!(f, "{}#{}", record.type_id(), id),
            None => write!(f, "{}", record.type_id()),
        }
    }
}

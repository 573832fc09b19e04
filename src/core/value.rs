use crate::entity::EntityRef;
use chrono::{DateTime, FixedOffset};
use std::fmt;

/// A hydrated field value.
///
/// Scalars carry the type declared in the field mapping; associations carry
/// canonical entity handles from the identity map.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Integer(i64),
    Boolean(bool),
    Text(String),
    DateTime(DateTime<FixedOffset>),
    Entity(EntityRef),
    Collection(Vec<EntityRef>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Integer(_) => "INTEGER",
            Self::Boolean(_) => "BOOLEAN",
            Self::Text(_) => "TEXT",
            Self::DateTime(_) => "DATETIME",
            Self::Entity(_) => "ENTITY",
            Self::Collection(_) => "COLLECTION",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Self::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&EntityRef> {
        match self {
            Self::Entity(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&[EntityRef]> {
        match self {
            Self::Collection(items) => Some(items),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::DateTime(a), Self::DateTime(b)) => a == b,
            // Entities compare by identity, not by state.
            (Self::Entity(a), Self::Entity(b)) => a.ptr_eq(b),
            (Self::Collection(a), Self::Collection(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.ptr_eq(y))
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Text(s) => write!(f, "{}", s),
            Self::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Self::Entity(e) => write!(f, "{}", e),
            Self::Collection(items) => write!(f, "[{} entities]", items.len()),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i as i64)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Self::DateTime(dt)
    }
}

impl From<EntityRef> for Value {
    fn from(entity: EntityRef) -> Self {
        Self::Entity(entity)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_equality() {
        assert_eq!(Value::Integer(42), Value::Integer(42));
        assert_ne!(Value::Integer(1), Value::Text("1".into()));
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }

    #[test]
    fn test_display_renders_raw_literals() {
        assert_eq!(Value::from(4).to_string(), "4");
        assert_eq!(Value::from("abc").to_string(), "abc");
        assert_eq!(Value::Null.to_string(), "");
    }
}

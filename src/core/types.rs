use super::Value;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// Field name to value filter passed to loads.
pub type Criteria = BTreeMap<String, Value>;

/// Route templates keyed by operation.
pub type Routes = HashMap<Operation, String>;

/// Declared scalar type of a mapped field.
///
/// Type names outside the known set are preserved as `Unknown` so the
/// metadata stays faithful to the mapping document; values of such fields
/// always hydrate to `Value::Null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum ScalarType {
    #[default]
    String,
    Integer,
    Boolean,
    DateTime,
    Unknown(String),
}

impl ScalarType {
    pub fn name(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::DateTime => "datetime",
            Self::Unknown(name) => name,
        }
    }
}

impl From<&str> for ScalarType {
    fn from(name: &str) -> Self {
        match name {
            "string" => Self::String,
            "integer" => Self::Integer,
            "boolean" => Self::Boolean,
            "datetime" => Self::DateTime,
            _ => Self::Unknown(name.to_string()),
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssociationKind {
    EmbedOne,
    EmbedMany,
    ReferenceOne,
    ReferenceMany,
}

impl AssociationKind {
    pub fn is_single_valued(&self) -> bool {
        matches!(self, Self::EmbedOne | Self::ReferenceOne)
    }

    pub fn is_collection_valued(&self) -> bool {
        !self.is_single_valued()
    }

    pub fn is_embed(&self) -> bool {
        matches!(self, Self::EmbedOne | Self::EmbedMany)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    One,
    Many,
}

/// Request shape a route or envelope belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Resource,
    Collection,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::Collection => "collection",
        }
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "resource" => Ok(Self::Resource),
            "collection" => Ok(Self::Collection),
            other => Err(format!("unknown operation '{}'", other)),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of an envelope path: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvelopeKey {
    Index(usize),
    Key(String),
}

impl From<&str> for EnvelopeKey {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<usize> for EnvelopeKey {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl fmt::Display for EnvelopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{}", i),
            Self::Key(k) => write!(f, "{}", k),
        }
    }
}

/// Sort direction accepted by collection loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_type_from_name() {
        assert_eq!(ScalarType::from("integer"), ScalarType::Integer);
        assert_eq!(ScalarType::from("boolean"), ScalarType::Boolean);
        for name in ["Boolean", "int", "text", "bool", "DateTime"] {
            assert_eq!(ScalarType::from(name), ScalarType::Unknown(name.to_string()));
        }
        assert_eq!(
            ScalarType::from("foobarbaz"),
            ScalarType::Unknown("foobarbaz".to_string())
        );
        assert_eq!(ScalarType::default(), ScalarType::String);
    }

    #[test]
    fn test_envelope_keys_deserialize_mixed() {
        let keys: Vec<EnvelopeKey> = serde_json::from_str(r#"["results", 0]"#).unwrap();
        assert_eq!(keys, vec![EnvelopeKey::from("results"), EnvelopeKey::Index(0)]);
    }

    #[test]
    fn test_operation_round_trip_names() {
        assert_eq!("resource".parse::<Operation>().unwrap(), Operation::Resource);
        assert!("other".parse::<Operation>().is_err());
    }
}

pub mod error;
pub mod types;
pub mod value;

pub use error::{RaplError, Result};
pub use types::{
    AssociationKind, Cardinality, Criteria, EnvelopeKey, Operation, Routes, ScalarType, SortOrder,
};
pub use value::Value;

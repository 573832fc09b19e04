//! Entity type metadata
//!
//! - `metadata.rs` - `TypeMetadata`, the static description of one type
//! - `registry.rs` - lazy cache producing metadata through a driver
//! - `driver/` - sources of mapping records
//! - `error.rs` - mapping errors

pub mod driver;
mod error;
mod metadata;
pub mod registry;

pub use driver::{FileDriver, MappingDriver, MappingElement, StaticDriver};
pub use error::MappingError;
pub use metadata::{Association, FieldMapping, FieldSpec, TypeMetadata, route_placeholders};
pub use registry::{AliasResolver, MetadataRegistry};

//! Mapping drivers
//!
//! A driver knows where the schema of each entity type is described and
//! fills a blank `TypeMetadata` from it.
//!
//! - `element.rs` - serde shape of one type's mapping record
//! - `file.rs` - one JSON document per type, looked up in a list of directories
//! - `static_driver.rs` - records held in memory

mod element;
mod file;
mod static_driver;

pub use element::{AssociationElement, FieldElement, MappingDocument, MappingElement, RouteElement};
pub use file::FileDriver;
pub use static_driver::StaticDriver;

use super::TypeMetadata;
use crate::core::Result;

pub trait MappingDriver: Send + Sync {
    /// Populates `metadata` for `type_id`.
    fn load_metadata_for_type(&self, type_id: &str, metadata: &mut TypeMetadata) -> Result<()>;

    /// Every type identifier this driver can describe.
    fn all_type_ids(&self) -> Result<Vec<String>>;
}

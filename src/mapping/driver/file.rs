use super::{MappingDocument, MappingDriver, MappingElement};
use crate::core::{RaplError, Result};
use crate::mapping::{MappingError, TypeMetadata, registry::NAMESPACE_SEPARATOR};
use log::debug;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Reads one mapping document per type from a list of directories.
///
/// `app::library::Book` is looked up as `app.library.Book.rapl.json`; the
/// document maps type identifiers to their mapping records, so a file may
/// describe more than one type.
pub struct FileDriver {
    paths: Vec<PathBuf>,
    extension: String,
    elements: Mutex<HashMap<String, MappingElement>>,
}

impl FileDriver {
    pub const DEFAULT_FILE_EXTENSION: &'static str = ".rapl.json";

    pub fn new<P: Into<PathBuf>>(paths: impl IntoIterator<Item = P>) -> Self {
        Self::with_extension(paths, Self::DEFAULT_FILE_EXTENSION)
    }

    pub fn with_extension<P: Into<PathBuf>>(
        paths: impl IntoIterator<Item = P>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            extension: extension.into(),
            elements: Mutex::new(HashMap::new()),
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn file_name_for(&self, type_id: &str) -> String {
        format!("{}{}", type_id.replace(NAMESPACE_SEPARATOR, "."), self.extension)
    }

    fn locate(&self, type_id: &str) -> Option<PathBuf> {
        let file_name = self.file_name_for(type_id);
        self.paths
            .iter()
            .map(|dir| dir.join(&file_name))
            .find(|candidate| candidate.is_file())
    }

    fn load_document(&self, path: &Path) -> Result<MappingDocument> {
        debug!("Reading mapping file {}", path.display());
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| RaplError::Decode(format!("{}: {}", path.display(), e)))
    }

    fn element(&self, type_id: &str) -> Result<MappingElement> {
        if let Some(element) = self.elements.lock()?.get(type_id) {
            return Ok(element.clone());
        }

        let path = self.locate(type_id).ok_or_else(|| MappingError::MissingElement {
            type_id: type_id.to_string(),
        })?;
        let document = self.load_document(&path)?;

        let mut elements = self.elements.lock()?;
        elements.extend(document);
        elements.get(type_id).cloned().ok_or_else(|| {
            MappingError::MissingElement {
                type_id: type_id.to_string(),
            }
            .into()
        })
    }
}

impl MappingDriver for FileDriver {
    fn load_metadata_for_type(&self, type_id: &str, metadata: &mut TypeMetadata) -> Result<()> {
        self.element(type_id)?.apply(metadata)
    }

    fn all_type_ids(&self) -> Result<Vec<String>> {
        let mut type_ids = Vec::new();
        for dir in &self.paths {
            if !dir.is_dir() {
                return Err(RaplError::Configuration(format!(
                    "Mapping directory '{}' does not exist",
                    dir.display()
                )));
            }
            for entry in fs::read_dir(dir)? {
                let path = entry?.path();
                let matches = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.ends_with(&self.extension));
                if !matches {
                    continue;
                }
                for type_id in self.load_document(&path)?.into_keys() {
                    if !type_ids.contains(&type_id) {
                        type_ids.push(type_id);
                    }
                }
            }
        }
        type_ids.sort();
        Ok(type_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Operation;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn test_file_name_for_type() {
        let driver = FileDriver::new(["/tmp"]);
        assert_eq!(driver.file_name_for("app::Book"), "app.Book.rapl.json");
    }

    #[test]
    fn test_loads_from_first_matching_directory() {
        let empty = tempfile::tempdir().unwrap();
        let config = tempfile::tempdir().unwrap();
        write(
            config.path(),
            "app.Book.rapl.json",
            r#"{ "app::Book": {
                "collection": { "route": "books" },
                "identifiers": { "id": { "type": "integer" } }
            } }"#,
        );

        let driver = FileDriver::new([empty.path(), config.path()]);
        let mut metadata = TypeMetadata::new("app::Book");
        driver.load_metadata_for_type("app::Book", &mut metadata).unwrap();
        assert_eq!(metadata.route(Operation::Collection), Some("books"));
        assert!(metadata.is_identifier("id"));
    }

    #[test]
    fn test_missing_file_is_mapping_error() {
        let config = tempfile::tempdir().unwrap();
        let driver = FileDriver::new([config.path()]);
        let mut metadata = TypeMetadata::new("app::Ghost");
        assert!(matches!(
            driver.load_metadata_for_type("app::Ghost", &mut metadata),
            Err(RaplError::Mapping(MappingError::MissingElement { .. }))
        ));
    }

    #[test]
    fn test_all_type_ids_scans_documents() {
        let config = tempfile::tempdir().unwrap();
        write(config.path(), "app.Book.rapl.json", r#"{ "app::Book": {} }"#);
        write(
            config.path(),
            "app.Author.rapl.json",
            r#"{ "app::Author": {}, "app::Pseudonym": {} }"#,
        );
        write(config.path(), "notes.txt", "ignored");

        let driver = FileDriver::new([config.path()]);
        assert_eq!(
            driver.all_type_ids().unwrap(),
            vec!["app::Author", "app::Book", "app::Pseudonym"]
        );
    }
}

//! Metadata catalog: the registry of record types
//!
//! The catalog is built once from a fixed set of descriptors and is
//! read-only afterwards. Lookup by type name is case-insensitive.
//!
//! Descriptors can also be loaded from a directory holding one
//! `<type>.json` file per type; non-JSON files are skipped and malformed
//! files abort loading.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use super::errors::{SchemaError, SchemaResult};
use super::types::{FieldDescriptor, TypeDescriptor};

/// Read-only registry of type descriptors.
#[derive(Debug)]
pub struct MetadataCatalog {
    /// Descriptors in registration order
    descriptors: Vec<TypeDescriptor>,
    /// Lower-cased type name -> position in `descriptors`
    index: HashMap<String, usize>,
    /// Compiled field patterns keyed by (lower-cased type name, field name)
    patterns: HashMap<(String, String), Regex>,
}

impl MetadataCatalog {
    /// Builds a catalog, validating every descriptor and every reference.
    pub fn build(descriptors: Vec<TypeDescriptor>) -> SchemaResult<Self> {
        let mut index = HashMap::with_capacity(descriptors.len());

        for (position, descriptor) in descriptors.iter().enumerate() {
            descriptor
                .validate_structure()
                .map_err(|e| SchemaError::malformed(&descriptor.name, e))?;

            if index
                .insert(descriptor.name.to_lowercase(), position)
                .is_some()
            {
                return Err(SchemaError::duplicate_type(&descriptor.name));
            }
        }

        let mut patterns = HashMap::new();
        for descriptor in &descriptors {
            for field in &descriptor.fields {
                if let Some(target) = field.reference_type() {
                    if !index.contains_key(&target.to_lowercase()) {
                        return Err(SchemaError::unknown_reference_target(
                            &descriptor.name,
                            &field.name,
                            target,
                        ));
                    }
                }

                if let Some(pattern) = &field.pattern {
                    let anchored = format!("^(?:{})$", pattern);
                    let regex = Regex::new(&anchored).map_err(|e| {
                        SchemaError::malformed(
                            &descriptor.name,
                            format!("Field '{}': invalid pattern: {}", field.name, e),
                        )
                    })?;
                    patterns.insert(
                        (descriptor.name.to_lowercase(), field.name.clone()),
                        regex,
                    );
                }
            }
        }

        Ok(Self {
            descriptors,
            index,
            patterns,
        })
    }

    /// Loads every `*.json` descriptor file in `dir` and builds a catalog.
    ///
    /// Files are read in file-name order so registration order is stable.
    pub fn from_dir(dir: &Path) -> SchemaResult<Self> {
        let entries = fs::read_dir(dir).map_err(|e| {
            SchemaError::descriptor_io(
                dir.display().to_string(),
                format!("Failed to read descriptor directory: {}", e),
            )
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                SchemaError::descriptor_io(
                    dir.display().to_string(),
                    format!("Failed to read directory entry: {}", e),
                )
            })?;

            let path = entry.path();

            // Skip non-JSON files
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }

            paths.push(path);
        }
        paths.sort();

        let descriptors = paths
            .iter()
            .map(|path| Self::load_descriptor_file(path))
            .collect::<SchemaResult<Vec<_>>>()?;

        Self::build(descriptors)
    }

    /// Loads a single descriptor file.
    fn load_descriptor_file(path: &Path) -> SchemaResult<TypeDescriptor> {
        let content = fs::read_to_string(path).map_err(|e| {
            SchemaError::descriptor_io(
                path.display().to_string(),
                format!("Failed to read file: {}", e),
            )
        })?;

        serde_json::from_str(&content).map_err(|e| {
            SchemaError::descriptor_io(path.display().to_string(), format!("Invalid JSON: {}", e))
        })
    }

    /// Writes a descriptor to `<dir>/<type>.json`.
    ///
    /// Existing files are never overwritten.
    pub fn save_descriptor(dir: &Path, descriptor: &TypeDescriptor) -> SchemaResult<PathBuf> {
        let path = dir.join(format!("{}.json", descriptor.name.to_lowercase()));

        if path.exists() {
            return Err(SchemaError::duplicate_type(&descriptor.name));
        }

        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| {
                SchemaError::descriptor_io(
                    dir.display().to_string(),
                    format!("Failed to create descriptor directory: {}", e),
                )
            })?;
        }

        let content = serde_json::to_string_pretty(descriptor).map_err(|e| {
            SchemaError::descriptor_io(
                path.display().to_string(),
                format!("Failed to serialize descriptor: {}", e),
            )
        })?;

        fs::write(&path, content).map_err(|e| {
            SchemaError::descriptor_io(
                path.display().to_string(),
                format!("Failed to write file: {}", e),
            )
        })?;

        Ok(path)
    }

    /// Resolves a type name, ignoring case.
    pub fn resolve(&self, type_name: &str) -> Option<&TypeDescriptor> {
        self.index
            .get(&type_name.to_lowercase())
            .map(|&position| &self.descriptors[position])
    }

    /// Type names in registration order.
    pub fn list_types(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.name.as_str()).collect()
    }

    /// All descriptors in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.descriptors.iter()
    }

    /// Returns the number of registered types.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Reference fields, across all types, that point at `type_name`.
    pub fn dependents_of(&self, type_name: &str) -> Vec<(&TypeDescriptor, &FieldDescriptor)> {
        let wanted = type_name.to_lowercase();
        self.descriptors
            .iter()
            .flat_map(|descriptor| {
                descriptor
                    .reference_fields()
                    .map(move |field| (descriptor, field))
            })
            .filter(|(_, field)| {
                field
                    .reference_type()
                    .map_or(false, |target| target.to_lowercase() == wanted)
            })
            .collect()
    }

    /// Compiled pattern for a string field, if it declares one.
    pub fn pattern(&self, type_name: &str, field: &str) -> Option<&Regex> {
        self.patterns
            .get(&(type_name.to_lowercase(), field.to_string()))
    }
}

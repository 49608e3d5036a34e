// SPDX-License-Identifier: MIT OR Apache-2.0
//! Registry of block types loaded from a catalog.
//!
//! The catalog is JSON of the shape
//! `{ "blockCategories": [{ id, name, color, description, blocks: [...] }] }`.
//! Entries without an id are skipped; a catalog that is not valid JSON of
//! that shape fails the whole load and leaves the registry untouched.

use crate::block::{BlockId, BlockInstance, BlockTypeDefinition, CategoryInfo};
use crate::port::{Connector, PortDirection, PortSpec, PropertyKind, PropertySpec, PropertyValue};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

/// Default category color
pub const DEFAULT_CATEGORY_COLOR: &str = "#808080";

/// Error when loading a catalog
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The catalog file could not be read
    #[error("Failed to read catalog {path}: {source}")]
    Io {
        /// Path that failed
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// The catalog is not valid JSON of the expected shape
    #[error("Malformed catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogFile {
    #[serde(default)]
    block_categories: Vec<RawCategory>,
}

#[derive(Debug, Deserialize)]
struct RawCategory {
    id: Option<String>,
    name: Option<String>,
    color: Option<String>,
    description: Option<String>,
    #[serde(default)]
    blocks: Vec<RawBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBlock {
    id: Option<String>,
    name: Option<String>,
    #[serde(rename = "type")]
    class: Option<String>,
    description: Option<String>,
    #[serde(default)]
    inputs: Vec<RawPort>,
    #[serde(default)]
    outputs: Vec<RawPort>,
    #[serde(default)]
    properties: Vec<RawProperty>,
    #[serde(default)]
    code_template: String,
}

#[derive(Debug, Deserialize)]
struct RawPort {
    id: Option<String>,
    #[serde(rename = "type", default)]
    kind: crate::port::ConnectorKind,
    description: Option<String>,
    default: Option<PropertyValue>,
}

#[derive(Debug, Deserialize)]
struct RawProperty {
    id: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    default: Option<PropertyValue>,
}

fn convert_ports(raw: Vec<RawPort>, block_id: &str) -> Vec<PortSpec> {
    raw.into_iter()
        .filter_map(|port| {
            let Some(id) = port.id.filter(|id| !id.is_empty()) else {
                tracing::warn!(block_type = block_id, "Skipping port without id");
                return None;
            };
            Some(PortSpec {
                description: port.description.unwrap_or_else(|| id.clone()),
                id,
                kind: port.kind,
                default: port.default,
            })
        })
        .collect()
}

fn convert_properties(raw: Vec<RawProperty>, block_id: &str) -> Vec<PropertySpec> {
    raw.into_iter()
        .filter_map(|prop| {
            let Some(id) = prop.id.filter(|id| !id.is_empty()) else {
                tracing::warn!(block_type = block_id, "Skipping property without id");
                return None;
            };
            let mut spec = PropertySpec::new(id, prop.default);
            if let Some(kind) = prop.kind.as_deref().and_then(PropertyKind::from_catalog_name) {
                spec.kind = kind;
            }
            Some(spec)
        })
        .collect()
}

/// Registry of available block types
#[derive(Debug, Clone, Default)]
pub struct BlockRegistry {
    /// Categories in catalog order
    categories: IndexMap<String, CategoryInfo>,
    /// Registered block types by ID, in catalog order
    types: IndexMap<String, BlockTypeDefinition>,
}

impl BlockRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Load catalog text, merging it into the registry.
    ///
    /// On error the registry is left exactly as it was.
    pub fn load(&mut self, catalog: &str) -> Result<(), CatalogError> {
        let file: CatalogFile = serde_json::from_str(catalog)?;

        let mut categories = self.categories.clone();
        let mut types = self.types.clone();
        let mut loaded = 0usize;

        for category in file.block_categories {
            let Some(category_id) = category.id.filter(|id| !id.is_empty()) else {
                tracing::warn!("Skipping block category without id");
                continue;
            };

            categories.insert(
                category_id.clone(),
                CategoryInfo {
                    name: category.name.unwrap_or_else(|| category_id.clone()),
                    color: category
                        .color
                        .unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string()),
                    description: category.description.unwrap_or_default(),
                },
            );

            for block in category.blocks {
                let Some(block_id) = block.id.filter(|id| !id.is_empty()) else {
                    tracing::warn!(category = %category_id, "Skipping block type without id");
                    continue;
                };

                let mut definition =
                    BlockTypeDefinition::new(block_id.clone(), category_id.clone(), block.code_template);
                definition.name = block.name.unwrap_or_else(|| block_id.clone());
                definition.class = block.class.unwrap_or_else(|| "generic".to_string());
                definition.description = block.description.unwrap_or_default();
                definition.inputs = convert_ports(block.inputs, &block_id);
                definition.outputs = convert_ports(block.outputs, &block_id);
                definition.properties = convert_properties(block.properties, &block_id);

                types.insert(block_id, definition);
                loaded += 1;
            }
        }

        self.categories = categories;
        self.types = types;
        tracing::info!(
            "Loaded {} block types ({} categories total)",
            loaded,
            self.categories.len()
        );
        Ok(())
    }

    /// Load a catalog file
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<(), CatalogError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.load(&text)
    }

    /// Register a category
    pub fn register_category(&mut self, id: impl Into<String>, info: CategoryInfo) {
        self.categories.insert(id.into(), info);
    }

    /// Register a block type
    pub fn register(&mut self, definition: BlockTypeDefinition) {
        self.types.insert(definition.id.clone(), definition);
    }

    /// Categories in catalog order
    pub fn categories(&self) -> &IndexMap<String, CategoryInfo> {
        &self.categories
    }

    /// Type ids in a category, in catalog order
    pub fn types_in_category(&self, category_id: &str) -> Vec<&str> {
        self.types
            .values()
            .filter(|t| t.category == category_id)
            .map(|t| t.id.as_str())
            .collect()
    }

    /// Get a block type by ID
    pub fn type_info(&self, type_id: &str) -> Option<&BlockTypeDefinition> {
        self.types.get(type_id)
    }

    /// Get all registered types
    pub fn types(&self) -> impl Iterator<Item = &BlockTypeDefinition> {
        self.types.values()
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no types are registered
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Create a block instance of a type.
    ///
    /// Connectors follow the declared port order. Port defaults are applied
    /// first, then property defaults. Returns `None` for an unknown type.
    pub fn instantiate(&self, type_id: &str, explicit_id: Option<&str>) -> Option<BlockInstance> {
        let definition = self.type_info(type_id)?;

        let id = match explicit_id {
            Some(id) if !id.is_empty() => BlockId::from(id),
            _ => BlockId::generate(type_id),
        };

        let mut block = BlockInstance::new(id, type_id);
        block.inputs = definition
            .inputs
            .iter()
            .map(|spec| Connector::from_spec(spec, PortDirection::Input))
            .collect();
        block.outputs = definition
            .outputs
            .iter()
            .map(|spec| Connector::from_spec(spec, PortDirection::Output))
            .collect();

        for port in definition.inputs.iter().chain(&definition.outputs) {
            if let Some(default) = &port.default {
                block.set_property(port.id.clone(), default.clone());
            }
        }
        for property in &definition.properties {
            if let Some(default) = &property.default {
                block.set_property(property.id.clone(), default.clone());
            }
        }

        Some(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::ConnectorKind;

    const CATALOG: &str = r##"{
        "blockCategories": [
            {
                "id": "events",
                "name": "Events",
                "color": "#ff0000",
                "blocks": [
                    {
                        "id": "app_on_start",
                        "name": "On Start",
                        "outputs": [{"id": "next", "type": "flow"}],
                        "codeTemplate": "INIT ${next_code}"
                    }
                ]
            },
            {
                "name": "No id, skipped",
                "blocks": [{"id": "orphan"}]
            },
            {
                "id": "output",
                "blocks": [
                    {
                        "id": "log",
                        "inputs": [
                            {"id": "prev", "type": "flow"},
                            {"id": "level", "type": "int", "default": 1}
                        ],
                        "outputs": [{"id": "next", "type": "flow"}, {"type": "flow"}],
                        "properties": [
                            {"id": "msg", "default": "hello"},
                            {"id": "repeat", "type": "int"},
                            {"id": "label"},
                            {"default": 1}
                        ],
                        "codeTemplate": "LOG(${msg});${next_code}"
                    },
                    {"name": "missing id"}
                ]
            }
        ]
    }"##;

    fn registry() -> BlockRegistry {
        let mut registry = BlockRegistry::new();
        registry.load(CATALOG).unwrap();
        registry
    }

    #[test]
    fn test_load_categories_in_order() {
        let registry = registry();
        let ids: Vec<&str> = registry.categories().keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["events", "output"]);

        let output = &registry.categories()["output"];
        assert_eq!(output.name, "output");
        assert_eq!(output.color, DEFAULT_CATEGORY_COLOR);
        assert_eq!(output.description, "");
    }

    #[test]
    fn test_entries_without_id_are_skipped() {
        let registry = registry();
        assert_eq!(registry.len(), 2);
        assert!(registry.type_info("orphan").is_none());

        let log = registry.type_info("log").unwrap();
        assert_eq!(log.outputs.len(), 1);
        assert_eq!(log.properties.len(), 3);
        assert_eq!(log.property("repeat").unwrap().kind, PropertyKind::Number);
        assert_eq!(log.property("msg").unwrap().kind, PropertyKind::String);
        assert_eq!(log.property("label").unwrap().kind, PropertyKind::String);
        assert_eq!(log.class, "generic");
    }

    #[test]
    fn test_types_in_category() {
        let registry = registry();
        assert_eq!(registry.types_in_category("events"), vec!["app_on_start"]);
        assert_eq!(registry.types_in_category("output"), vec!["log"]);
        assert!(registry.types_in_category("nope").is_empty());
    }

    #[test]
    fn test_malformed_catalog_keeps_state() {
        let mut registry = registry();
        assert!(registry.load("{ not json").is_err());
        assert!(registry.load(r#"{"blockCategories": 5}"#).is_err());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.categories().len(), 2);
    }

    #[test]
    fn test_load_merges() {
        let mut registry = registry();
        registry
            .load(r#"{"blockCategories": [{"id": "extra", "blocks": [{"id": "beep", "codeTemplate": "BEEP;"}]}]}"#)
            .unwrap();
        assert_eq!(registry.len(), 3);
        assert!(registry.type_info("log").is_some());
    }

    #[test]
    fn test_instantiate() {
        let registry = registry();
        let block = registry.instantiate("log", Some("b1")).unwrap();

        assert_eq!(block.id.as_str(), "b1");
        let inputs: Vec<(&str, ConnectorKind)> =
            block.inputs.iter().map(|c| (c.id.as_str(), c.kind)).collect();
        assert_eq!(inputs, vec![("prev", ConnectorKind::Flow), ("level", ConnectorKind::Data)]);
        assert_eq!(block.outputs.len(), 1);
        assert_eq!(block.property("msg"), Some(&PropertyValue::from("hello")));
        assert_eq!(block.property("level"), Some(&PropertyValue::from(1)));
    }

    #[test]
    fn test_instantiate_generates_id() {
        let registry = registry();
        let block = registry.instantiate("app_on_start", None).unwrap();
        assert!(block.id.as_str().starts_with("app_on_start_"));
        assert!(registry.instantiate("unknown", None).is_none());
    }

    #[test]
    fn test_load_file_missing() {
        let mut registry = BlockRegistry::new();
        let err = registry.load_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }
}

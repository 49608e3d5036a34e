// SPDX-License-Identifier: MIT OR Apache-2.0
//! Block type definitions and block instances.

use crate::port::{Connector, PortDirection, PortSpec, PropertySpec, PropertyValue};
use crate::template::Template;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Block type id of the distinguished entry block
pub const ENTRY_BLOCK_TYPE: &str = "app_on_start";

/// Unique identifier for a block within a graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub String);

impl BlockId {
    /// Generate a fresh id of the form `<type>_<8 hex chars>`
    pub fn generate(type_id: &str) -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self(format!("{type_id}_{}", &hex[..8]))
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for BlockId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Display information for a block category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryInfo {
    /// Display name
    pub name: String,
    /// Color as `#rrggbb`
    pub color: String,
    /// Description
    pub description: String,
}

/// Block type definition, immutable once registered
#[derive(Debug, Clone, PartialEq)]
pub struct BlockTypeDefinition {
    /// Unique type identifier
    pub id: String,
    /// Owning category id
    pub category: String,
    /// Display name
    pub name: String,
    /// Free-form block class from the catalog (`generic` when absent)
    pub class: String,
    /// Description
    pub description: String,
    /// Input ports in declared order
    pub inputs: Vec<PortSpec>,
    /// Output ports in declared order
    pub outputs: Vec<PortSpec>,
    /// Property schema in declared order
    pub properties: Vec<PropertySpec>,
    code_template: String,
    template: Template,
}

impl BlockTypeDefinition {
    /// Create a definition; the template is parsed here and cached
    pub fn new(
        id: impl Into<String>,
        category: impl Into<String>,
        code_template: impl Into<String>,
    ) -> Self {
        let id = id.into();
        let code_template = code_template.into();
        Self {
            name: id.clone(),
            id,
            category: category.into(),
            class: "generic".to_string(),
            description: String::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            properties: Vec::new(),
            template: Template::parse(&code_template),
            code_template,
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add an input port
    pub fn with_input(mut self, port: PortSpec) -> Self {
        self.inputs.push(port);
        self
    }

    /// Add an output port
    pub fn with_output(mut self, port: PortSpec) -> Self {
        self.outputs.push(port);
        self
    }

    /// Add a property
    pub fn with_property(mut self, property: PropertySpec) -> Self {
        self.properties.push(property);
        self
    }

    /// Template source text
    pub fn code_template(&self) -> &str {
        &self.code_template
    }

    /// The parsed template
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Get a property spec by name
    pub fn property(&self, name: &str) -> Option<&PropertySpec> {
        self.properties.iter().find(|p| p.id == name)
    }

    /// Get a port spec by id and direction
    pub fn port(&self, id: &str, direction: PortDirection) -> Option<&PortSpec> {
        let ports = match direction {
            PortDirection::Input => &self.inputs,
            PortDirection::Output => &self.outputs,
        };
        ports.iter().find(|p| p.id == id)
    }
}

/// A block instance in the graph
#[derive(Debug, Clone, PartialEq)]
pub struct BlockInstance {
    /// Unique instance ID
    pub id: BlockId,
    /// Block type ID
    pub block_type: String,
    /// Property values in assignment order
    pub properties: IndexMap<String, PropertyValue>,
    /// Position on the canvas, opaque to the core
    pub position: [f32; 2],
    /// Input connectors
    pub inputs: Vec<Connector>,
    /// Output connectors
    pub outputs: Vec<Connector>,
}

impl BlockInstance {
    /// Create a bare instance with no connectors
    pub fn new(id: impl Into<BlockId>, block_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            block_type: block_type.into(),
            properties: IndexMap::new(),
            position: [0.0, 0.0],
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Set the position
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = [x, y];
        self
    }

    /// Set a property value, returning whether the stored value changed
    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> bool {
        let name = name.into();
        let value = value.into();
        if self.properties.get(&name) == Some(&value) {
            return false;
        }
        self.properties.insert(name, value);
        true
    }

    /// Get a property value
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// Get a connector by id and direction
    pub fn connector(&self, id: &str, direction: PortDirection) -> Option<&Connector> {
        let connectors = match direction {
            PortDirection::Input => &self.inputs,
            PortDirection::Output => &self.outputs,
        };
        connectors.iter().find(|c| c.id == id)
    }

    /// Get all connectors
    pub fn connectors(&self) -> impl Iterator<Item = &Connector> {
        self.inputs.iter().chain(self.outputs.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_id_shape() {
        let id = BlockId::generate("log");
        let suffix = id.as_str().strip_prefix("log_").unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(BlockId::generate("log"), BlockId::generate("log"));
    }

    #[test]
    fn test_set_property_reports_change() {
        let mut block = BlockInstance::new("a", "log");
        assert!(block.set_property("msg", "hi"));
        assert!(!block.set_property("msg", "hi"));
        assert!(block.set_property("msg", "bye"));
        assert_eq!(block.property("msg"), Some(&PropertyValue::from("bye")));
    }

    #[test]
    fn test_definition_caches_template() {
        let def = BlockTypeDefinition::new("log", "output", "LOG(${msg});${next_code}")
            .with_input(PortSpec::flow("prev"))
            .with_output(PortSpec::flow("next"));
        assert!(def.template().references_continuation());
        assert!(def.port("next", PortDirection::Output).is_some());
        assert!(def.port("next", PortDirection::Input).is_none());
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connector and property definitions for block inputs/outputs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Port id conventionally used for the outgoing flow connector.
pub const FLOW_NEXT: &str = "next";

/// Connector direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    /// Input connector
    Input,
    /// Output connector
    Output,
}

impl PortDirection {
    /// The direction a partner connector must have
    pub fn opposite(self) -> Self {
        match self {
            Self::Input => Self::Output,
            Self::Output => Self::Input,
        }
    }
}

/// Connector family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorKind {
    /// Control transfer, drives traversal order
    Flow,
    /// Value carrying, validated but never resolved by the generator
    #[default]
    Data,
}

impl<'de> Deserialize<'de> for ConnectorKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // Catalogs use free-form type names for data ports ("string", "int", ...)
        let raw = String::deserialize(deserializer)?;
        Ok(if raw.eq_ignore_ascii_case("flow") {
            Self::Flow
        } else {
            Self::Data
        })
    }
}

impl fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flow => f.write_str("flow"),
            Self::Data => f.write_str("data"),
        }
    }
}

/// Literal value carried by a block property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Boolean
    Bool(bool),
    /// Number, kept exactly as written
    Number(serde_json::Number),
    /// String
    String(String),
}

impl PropertyValue {
    /// Render this value as a literal in generated source.
    ///
    /// Strings are wrapped in double quotes without escaping, booleans become
    /// `true`/`false`, numbers keep their plain text form.
    pub fn render(&self) -> String {
        match self {
            Self::String(s) => format!("\"{s}\""),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
        }
    }

    /// The kind of this value
    pub fn kind(&self) -> PropertyKind {
        match self {
            Self::Bool(_) => PropertyKind::Bool,
            Self::Number(_) => PropertyKind::Number,
            Self::String(_) => PropertyKind::String,
        }
    }

    /// Get the string payload, if any
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

impl From<u32> for PropertyValue {
    fn from(value: u32) -> Self {
        Self::Number(value.into())
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Declared kind of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    /// Text
    #[default]
    String,
    /// true/false
    Bool,
    /// Integer or float
    Number,
}

impl PropertyKind {
    /// Map a catalog type name to a kind; unknown names are untyped
    pub fn from_catalog_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "string" | "text" => Some(Self::String),
            "bool" | "boolean" => Some(Self::Bool),
            "number" | "int" | "integer" | "float" => Some(Self::Number),
            _ => None,
        }
    }
}

/// A connector declared on a block type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortSpec {
    /// Port id, unique per direction within a block type
    pub id: String,
    /// Connector family
    #[serde(rename = "type", default)]
    pub kind: ConnectorKind,
    /// Human readable description
    #[serde(default)]
    pub description: String,
    /// Value applied as a property when a block is instantiated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<PropertyValue>,
}

impl PortSpec {
    /// Create a flow port
    pub fn flow(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ConnectorKind::Flow,
            description: String::new(),
            default: None,
        }
    }

    /// Create a data port
    pub fn data(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ConnectorKind::Data,
            description: String::new(),
            default: None,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the default value
    pub fn with_default(mut self, value: impl Into<PropertyValue>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// A property declared on a block type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySpec {
    /// Property name, also the template placeholder name
    pub id: String,
    /// Declared kind
    #[serde(default)]
    pub kind: PropertyKind,
    /// Value applied when a block is instantiated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<PropertyValue>,
}

impl PropertySpec {
    /// Create a property spec; the kind follows the default literal, `String` without one
    pub fn new(id: impl Into<String>, default: Option<PropertyValue>) -> Self {
        let kind = default
            .as_ref()
            .map(PropertyValue::kind)
            .unwrap_or_default();
        Self {
            id: id.into(),
            kind,
            default,
        }
    }

    /// Convert a literal to this property's declared kind.
    ///
    /// Conversions are lossless only; anything else is returned unchanged.
    pub fn coerce(&self, value: PropertyValue) -> PropertyValue {
        match (self.kind, value) {
            (PropertyKind::String, PropertyValue::String(s)) => PropertyValue::String(s),
            (PropertyKind::String, other) => PropertyValue::String(other.to_string()),
            (PropertyKind::Bool, PropertyValue::String(s)) => match s.as_str() {
                "true" => PropertyValue::Bool(true),
                "false" => PropertyValue::Bool(false),
                _ => {
                    tracing::warn!(property = %self.id, value = %s, "Cannot read value as bool");
                    PropertyValue::String(s)
                }
            },
            (PropertyKind::Number, PropertyValue::String(s)) => {
                match serde_json::from_str::<serde_json::Number>(s.trim()) {
                    Ok(n) => PropertyValue::Number(n),
                    Err(_) => {
                        tracing::warn!(property = %self.id, value = %s, "Cannot read value as number");
                        PropertyValue::String(s)
                    }
                }
            }
            (_, other) => other,
        }
    }
}

/// A typed attachment point on a block instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connector {
    /// Port id
    pub id: String,
    /// Direction
    pub direction: PortDirection,
    /// Connector family
    pub kind: ConnectorKind,
}

impl Connector {
    /// Build a connector from a port spec
    pub fn from_spec(spec: &PortSpec, direction: PortDirection) -> Self {
        Self {
            id: spec.id.clone(),
            direction,
            kind: spec.kind,
        }
    }

    /// Check if a connection to another connector is valid
    pub fn can_connect(&self, other: &Connector) -> bool {
        // Must be opposite directions
        if self.direction == other.direction {
            return false;
        }

        self.kind == other.kind
    }
}

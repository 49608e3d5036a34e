// SPDX-License-Identifier: MIT OR Apache-2.0
//! Serialized graph snapshot exchanged with the editor.
//!
//! Shape: `{ blocks: [{id, type, x, y, properties}], connections: [{from: {block, port}, to: {block, port}}] }`

use crate::block::BlockId;
use crate::connection::{Connection, Endpoint};
use crate::port::PropertyValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Error when reading a snapshot
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Snapshot text is not valid JSON of the snapshot shape
    #[error("Malformed graph snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A serialized block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    /// Block id
    #[serde(default)]
    pub id: BlockId,
    /// Block type id
    #[serde(rename = "type", default)]
    pub block_type: String,
    /// Canvas X position
    #[serde(default)]
    pub x: f32,
    /// Canvas Y position
    #[serde(default)]
    pub y: f32,
    /// Property values
    #[serde(default)]
    pub properties: IndexMap<String, PropertyValue>,
}

impl BlockRecord {
    /// Create a record at the origin with no properties
    pub fn new(id: impl Into<BlockId>, block_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            block_type: block_type.into(),
            ..Self::default()
        }
    }

    /// Set a property value
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}

/// Immutable view of a block graph, the only input the generator reads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Blocks in canvas order
    #[serde(default)]
    pub blocks: Vec<BlockRecord>,
    /// Connections, output to input
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl GraphSnapshot {
    /// Parse snapshot JSON
    pub fn from_json(text: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize to pretty JSON
    pub fn to_json_pretty(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Blocks of a given type, in snapshot order
    pub fn blocks_of_type<'a>(&'a self, block_type: &'a str) -> impl Iterator<Item = &'a BlockRecord> + 'a {
        self.blocks.iter().filter(move |b| b.block_type == block_type)
    }

    /// Index of blocks by id; a repeated id resolves to the last record
    pub fn blocks_by_id(&self) -> HashMap<&BlockId, &BlockRecord> {
        self.blocks.iter().map(|b| (&b.id, b)).collect()
    }

    /// Index from each source (block, port) to its single target.
    ///
    /// When two connections leave the same output port the later one wins.
    pub fn outgoing_index(&self) -> HashMap<&Endpoint, &Endpoint> {
        let mut index: HashMap<&Endpoint, &Endpoint> = HashMap::new();
        for connection in &self.connections {
            if let Some(previous) = index.insert(&connection.from, &connection.to) {
                tracing::warn!(
                    source = %connection.from,
                    replaced = %previous,
                    target = %connection.to,
                    "Output port has more than one connection, keeping the last"
                );
            }
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "blocks": [
            {"id": "a", "type": "app_on_start", "x": 10, "y": 20.5, "properties": {}},
            {"id": "b", "type": "log", "x": 0, "y": 0, "properties": {"msg": "hi", "loud": true, "times": 2}}
        ],
        "connections": [
            {"from": {"block": "a", "port": "next"}, "to": {"block": "b", "port": "prev"}}
        ]
    }"#;

    #[test]
    fn test_parse_snapshot() {
        let snapshot = GraphSnapshot::from_json(SNAPSHOT).unwrap();
        assert_eq!(snapshot.blocks.len(), 2);
        assert_eq!(snapshot.blocks[0].x, 10.0);
        assert_eq!(snapshot.blocks[1].properties["msg"], PropertyValue::from("hi"));
        assert_eq!(snapshot.blocks[1].properties["loud"], PropertyValue::Bool(true));
        assert_eq!(snapshot.blocks[1].properties["times"], PropertyValue::from(2));
        assert_eq!(snapshot.connections[0].to, Endpoint::new("b", "prev"));
    }

    #[test]
    fn test_json_round_trip_keeps_property_order() {
        let snapshot = GraphSnapshot::from_json(SNAPSHOT).unwrap();
        let text = snapshot.to_json_pretty().unwrap();
        let again = GraphSnapshot::from_json(&text).unwrap();
        assert_eq!(snapshot, again);
        let keys: Vec<&str> = again.blocks[1].properties.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["msg", "loud", "times"]);
    }

    #[test]
    fn test_malformed_snapshot() {
        assert!(GraphSnapshot::from_json("[1, 2]").is_err());
        assert!(GraphSnapshot::from_json("{}").unwrap().blocks.is_empty());
    }

    #[test]
    fn test_outgoing_index_last_wins() {
        let snapshot = GraphSnapshot {
            blocks: Vec::new(),
            connections: vec![
                Connection::new(Endpoint::new("a", "next"), Endpoint::new("b", "prev")),
                Connection::new(Endpoint::new("a", "next"), Endpoint::new("c", "prev")),
            ],
        };
        let index = snapshot.outgoing_index();
        assert_eq!(index.len(), 1);
        assert_eq!(index[&Endpoint::new("a", "next")], &Endpoint::new("c", "prev"));
    }

    #[test]
    fn test_blocks_of_type() {
        let snapshot = GraphSnapshot::from_json(SNAPSHOT).unwrap();
        let ids: Vec<&str> = snapshot.blocks_of_type("log").map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Block graph containing block instances and connections.

use crate::block::{BlockId, BlockInstance};
use crate::connection::{Connection, ConnectionId, ConnectorRef, Endpoint};
use crate::port::{Connector, PortDirection, PropertyValue};
use crate::registry::BlockRegistry;
use crate::snapshot::{BlockRecord, GraphSnapshot, SnapshotError};
use indexmap::IndexMap;
use std::collections::HashMap;

/// A block graph.
///
/// Every connector holds at most one connection. Connecting a connector that
/// is already connected severs its previous connection first.
#[derive(Debug, Clone, Default)]
pub struct BlockGraph {
    /// Blocks in insertion order
    blocks: IndexMap<BlockId, BlockInstance>,
    /// Connections by canonical id
    connections: IndexMap<ConnectionId, Connection>,
    /// Partner of each connected connector
    links: HashMap<ConnectorRef, ConnectorRef>,
}

impl BlockGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a block; a block with the same id is replaced along with its connections
    pub fn add_block(&mut self, block: BlockInstance) -> BlockId {
        let id = block.id.clone();
        if self.blocks.contains_key(&id) {
            self.remove_block(&id);
        }
        self.blocks.insert(id.clone(), block);
        id
    }

    /// Remove a block and every connection touching it
    pub fn remove_block(&mut self, id: &BlockId) -> Option<BlockInstance> {
        let block = self.blocks.get(id)?;
        let refs: Vec<ConnectorRef> = block
            .connectors()
            .map(|c| ConnectorRef {
                block: id.clone(),
                port: c.id.clone(),
                direction: c.direction,
            })
            .collect();
        for connector in &refs {
            self.sever(connector);
        }
        self.blocks.shift_remove(id)
    }

    /// Get a block by ID
    pub fn block(&self, id: &BlockId) -> Option<&BlockInstance> {
        self.blocks.get(id)
    }

    /// Get all blocks
    pub fn blocks(&self) -> impl Iterator<Item = &BlockInstance> {
        self.blocks.values()
    }

    /// Get the number of blocks
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Assign a property on a block, returning whether anything changed
    pub fn set_property(
        &mut self,
        id: &BlockId,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> bool {
        match self.blocks.get_mut(id) {
            Some(block) => block.set_property(name, value),
            None => false,
        }
    }

    /// Connect two connectors.
    ///
    /// Returns `false` without touching the graph when either connector does
    /// not exist, both have the same direction, or their kinds differ.
    pub fn connect(&mut self, a: &ConnectorRef, b: &ConnectorRef) -> bool {
        let (Some(first), Some(second)) = (self.resolve(a), self.resolve(b)) else {
            return false;
        };
        if !first.can_connect(second) {
            return false;
        }

        // Disconnect any existing connections
        self.sever(a);
        self.sever(b);

        let (output, input) = if a.direction == PortDirection::Output {
            (a, b)
        } else {
            (b, a)
        };
        let connection = Connection::new(output.endpoint(), input.endpoint());
        tracing::debug!("Connected {}", connection.id());
        self.connections.insert(connection.id(), connection);
        self.links.insert(a.clone(), b.clone());
        self.links.insert(b.clone(), a.clone());
        true
    }

    /// Remove the connection between two connectors, if present
    pub fn disconnect(&mut self, a: &ConnectorRef, b: &ConnectorRef) {
        if self.links.get(a) == Some(b) {
            self.sever(a);
        }
    }

    /// The connector linked to a connector
    pub fn connection_for(&self, connector: &ConnectorRef) -> Option<&ConnectorRef> {
        self.links.get(connector)
    }

    /// Target of the connection leaving an output port
    pub fn outgoing(&self, block: &BlockId, port: &str) -> Option<Endpoint> {
        self.links
            .get(&ConnectorRef::output(block.clone(), port))
            .map(ConnectorRef::endpoint)
    }

    /// Get a connection by ID
    pub fn connection(&self, id: &ConnectionId) -> Option<&Connection> {
        self.connections.get(id)
    }

    /// Get all connections
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Get the number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Take an immutable snapshot of the graph
    pub fn to_snapshot(&self) -> GraphSnapshot {
        let blocks = self
            .blocks
            .values()
            .map(|block| BlockRecord {
                id: block.id.clone(),
                block_type: block.block_type.clone(),
                x: block.position[0],
                y: block.position[1],
                properties: block.properties.clone(),
            })
            .collect();

        GraphSnapshot {
            blocks,
            connections: self.connections.values().cloned().collect(),
        }
    }

    /// Rebuild a graph from a snapshot.
    ///
    /// Blocks of unknown type and connections that cannot be resolved or are
    /// not valid are skipped with a warning.
    pub fn from_snapshot(snapshot: &GraphSnapshot, registry: &BlockRegistry) -> Self {
        let mut graph = Self::new();

        for record in &snapshot.blocks {
            if record.id.as_str().is_empty() || record.block_type.is_empty() {
                tracing::warn!("Skipping block record without id or type");
                continue;
            }
            let Some(mut block) = registry.instantiate(&record.block_type, Some(record.id.as_str()))
            else {
                tracing::warn!(block = %record.id, block_type = %record.block_type, "Skipping block of unknown type");
                continue;
            };
            block.position = [record.x, record.y];

            let definition = registry.type_info(&record.block_type);
            for (name, value) in &record.properties {
                let value = match definition.and_then(|d| d.property(name)) {
                    Some(spec) => spec.coerce(value.clone()),
                    None => value.clone(),
                };
                block.set_property(name.clone(), value);
            }
            graph.add_block(block);
        }

        for connection in &snapshot.connections {
            let from = ConnectorRef::output(connection.from.block.clone(), connection.from.port.clone());
            let to = ConnectorRef::input(connection.to.block.clone(), connection.to.port.clone());
            if !graph.connect(&from, &to) {
                tracing::warn!(
                    from = %connection.from,
                    to = %connection.to,
                    "Skipping unresolvable connection"
                );
            }
        }

        graph
    }

    /// Parse snapshot JSON and rebuild a graph from it
    pub fn from_snapshot_str(text: &str, registry: &BlockRegistry) -> Result<Self, SnapshotError> {
        let snapshot = GraphSnapshot::from_json(text)?;
        Ok(Self::from_snapshot(&snapshot, registry))
    }

    fn resolve(&self, connector: &ConnectorRef) -> Option<&Connector> {
        self.blocks
            .get(&connector.block)?
            .connector(&connector.port, connector.direction)
    }

    fn sever(&mut self, connector: &ConnectorRef) {
        let Some(partner) = self.links.remove(connector) else {
            return;
        };
        self.links.remove(&partner);
        let (output, input) = if connector.direction == PortDirection::Output {
            (connector, &partner)
        } else {
            (&partner, connector)
        };
        let id = ConnectionId::new(&output.endpoint(), &input.endpoint());
        self.connections.shift_remove(&id);
    }
}

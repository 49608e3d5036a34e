// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) definitions for the graph.

use crate::block::BlockId;
use crate::port::PortDirection;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One end of a connection: a port on a block
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Endpoint {
    /// Block id
    #[serde(default)]
    pub block: BlockId,
    /// Port id
    #[serde(default)]
    pub port: String,
}

impl Endpoint {
    /// Create a new endpoint
    pub fn new(block: impl Into<BlockId>, port: impl Into<String>) -> Self {
        Self {
            block: block.into(),
            port: port.into(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.block, self.port)
    }
}

/// Address of a connector: block, port id and direction
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectorRef {
    /// Block id
    pub block: BlockId,
    /// Port id
    pub port: String,
    /// Direction; input and output ports may share an id
    pub direction: PortDirection,
}

impl ConnectorRef {
    /// Address an input connector
    pub fn input(block: impl Into<BlockId>, port: impl Into<String>) -> Self {
        Self {
            block: block.into(),
            port: port.into(),
            direction: PortDirection::Input,
        }
    }

    /// Address an output connector
    pub fn output(block: impl Into<BlockId>, port: impl Into<String>) -> Self {
        Self {
            block: block.into(),
            port: port.into(),
            direction: PortDirection::Output,
        }
    }

    /// The endpoint part of this address
    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            block: self.block.clone(),
            port: self.port.clone(),
        }
    }
}

/// Canonical identifier of a connection.
///
/// Always written output end first, so the same physical connection maps to
/// one id whichever end it was declared from, while two connections running
/// opposite ways between the same port ids stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    /// Compute the id for an output endpoint and the input endpoint it feeds
    pub fn new(output: &Endpoint, input: &Endpoint) -> Self {
        Self(format!("{output}->{input}"))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A connection from an output connector to an input connector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Source (output) endpoint
    pub from: Endpoint,
    /// Target (input) endpoint
    pub to: Endpoint,
}

impl Connection {
    /// Create a new connection
    pub fn new(from: Endpoint, to: Endpoint) -> Self {
        Self { from, to }
    }

    /// Canonical id of this connection
    pub fn id(&self) -> ConnectionId {
        ConnectionId::new(&self.from, &self.to)
    }

    /// Check if this connection involves a specific block
    pub fn involves_block(&self, block: &BlockId) -> bool {
        self.from.block == *block || self.to.block == *block
    }
}

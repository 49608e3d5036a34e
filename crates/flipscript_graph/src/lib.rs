// SPDX-License-Identifier: MIT OR Apache-2.0
//! Block graph model for `FlipScript`.
//!
//! This crate provides the data side of the visual editor:
//! - Block type catalog and registry
//! - Block instances with typed flow/data connectors
//! - Connection validation with one connection per connector
//! - Code templates and graph snapshots consumed by the code generator

pub mod block;
pub mod builtin;
pub mod connection;
pub mod graph;
pub mod port;
pub mod registry;
pub mod snapshot;
pub mod template;

pub use block::{BlockId, BlockInstance, BlockTypeDefinition, CategoryInfo, ENTRY_BLOCK_TYPE};
pub use builtin::create_flipper_registry;
pub use connection::{Connection, ConnectionId, ConnectorRef, Endpoint};
pub use graph::BlockGraph;
pub use port::{Connector, ConnectorKind, PortDirection, PortSpec, PropertyKind, PropertySpec, PropertyValue, FLOW_NEXT};
pub use registry::{BlockRegistry, CatalogError};
pub use snapshot::{BlockRecord, GraphSnapshot, SnapshotError};
pub use template::Template;

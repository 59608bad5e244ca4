//! Broadcast link resolution for node-based visual editors
//!
//! Certain "broadcaster" nodes implicitly supply values to any compatible
//! unconnected input elsewhere in the graph, removing the need for explicit
//! wires. This crate decides deterministically which inputs receive which
//! broadcast, detects cycles the implicit links would introduce before they
//! reach the execution backend, and keeps the derived result cheap to query
//! while the graph mutates under interactive editing.

// Host-side graph model
pub mod graph;
pub mod node;
pub mod port;

// Resolution engine
pub mod cache;
pub mod loop_detect;
pub mod registry;
pub mod render;
pub mod resolver;
pub mod snapshot;

// Surrounding pieces
pub mod config;
pub mod error;
pub mod payload;

// Re-export core types
pub use cache::{ControllerStats, ResolutionController, ResolutionResult};
pub use config::BroadcastSettings;
pub use error::BroadcastError;
pub use graph::{Connection, NodeGraph};
pub use loop_detect::{detect_cycle, CycleReport};
pub use node::{BroadcastProperties, Node, NodeId};
pub use payload::{build_raw_payload, ExecutionPayload, PayloadInput};
pub use port::{DataType, Port, PortId, PortType};
pub use registry::{build_broadcast_rules, BroadcastRule};
pub use render::{project, RenderLink, RenderOverlay};
pub use resolver::{resolve, MatchConflict, Resolution, VirtualLink};
pub use snapshot::{read_snapshot, GraphSnapshot, NodeDescriptor, NodeRole};

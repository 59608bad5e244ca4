//! Port types and functionality for node connections

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a port within a node's input or output list
pub type PortId = usize;

/// Type of port (input or output)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortType {
    Input,
    Output,
}

/// Data type tag carried by a port.
///
/// The set of types is open (it is owned by the host editor), so this is a
/// plain string tag rather than a closed enum. The tag `"*"` is the wildcard
/// and connects to anything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataType(String);

impl DataType {
    /// The wildcard tag
    pub const WILDCARD: &'static str = "*";

    /// Create a data type from a host type tag
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// The wildcard type that connects to anything
    pub fn any() -> Self {
        Self(Self::WILDCARD.to_string())
    }

    /// Check if this is the wildcard type
    pub fn is_any(&self) -> bool {
        self.0 == Self::WILDCARD
    }

    /// Check if this data type can connect to another
    pub fn can_connect_to(&self, other: &DataType) -> bool {
        self == other || self.is_any() || other.is_any()
    }

    /// Get the underlying type tag
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DataType {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

/// Represents a connection point on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub id: PortId,
    pub name: String,
    pub port_type: PortType,
    pub data_type: DataType,
}

impl Port {
    /// Creates a new port
    pub fn new(
        id: PortId,
        name: impl Into<String>,
        port_type: PortType,
        data_type: impl Into<DataType>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            port_type,
            data_type: data_type.into(),
        }
    }

    /// Checks if this port is an input
    pub fn is_input(&self) -> bool {
        matches!(self.port_type, PortType::Input)
    }

    /// Checks if this port is an output
    pub fn is_output(&self) -> bool {
        matches!(self.port_type, PortType::Output)
    }
}

impl From<String> for DataType {
    fn from(tag: String) -> Self {
        Self::new(tag)
    }
}

//! Core types for workflow graphs
//!
//! These types define the structure of a workflow: nodes, the
//! connections between their ports, and the graph that owns both.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;

/// Unique identifier for a node
pub type NodeId = String;

/// Unique identifier for a connection
pub type ConnectionId = String;

/// Name of a port, scoped to the node that declares it
pub type PortName = String;

/// Kind of work a node performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Entry point, has no inputs
    Trigger,
    /// Does some work
    Action,
    /// Branch point
    Condition,
    /// Terminal sink, has no outputs
    Output,
}

impl NodeKind {
    /// Every kind, in palette order
    pub const ALL: [NodeKind; 4] = [
        NodeKind::Trigger,
        NodeKind::Action,
        NodeKind::Condition,
        NodeKind::Output,
    ];

    /// Lowercase identifier used in documents and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Trigger => "trigger",
            NodeKind::Action => "action",
            NodeKind::Condition => "condition",
            NodeKind::Output => "output",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Trigger => "Trigger",
            NodeKind::Action => "Action",
            NodeKind::Condition => "Condition",
            NodeKind::Output => "Output",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trigger" => Ok(NodeKind::Trigger),
            "action" => Ok(NodeKind::Action),
            "condition" => Ok(NodeKind::Condition),
            "output" => Ok(NodeKind::Output),
            _ => Err(WorkflowError::InvalidKind(s.to_string())),
        }
    }
}

/// Execution status of a single node
///
/// `idle -> running -> {completed, error}`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Error,
}

/// A point in graph space
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Position {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// A node instance in a workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowNode {
    /// Unique identifier for this node instance
    pub id: NodeId,
    /// What kind of work the node does
    pub kind: NodeKind,
    /// Display name
    pub name: String,
    pub description: String,
    /// Icon/category tag from the node registry
    pub icon: String,
    /// Position in graph space
    pub position: Position,
    /// Opaque payload, e.g. `{ "tool": <catalog record> }`
    #[serde(default)]
    pub data: serde_json::Value,
    /// Ordered input port names
    pub inputs: Vec<PortName>,
    /// Ordered output port names
    pub outputs: Vec<PortName>,
    #[serde(default)]
    pub status: NodeStatus,
    /// Duration of the last execution in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
}

impl WorkflowNode {
    /// Whether `port` is one of this node's inputs
    pub fn has_input(&self, port: &str) -> bool {
        self.inputs.iter().any(|p| p == port)
    }

    /// Whether `port` is one of this node's outputs
    pub fn has_output(&self, port: &str) -> bool {
        self.outputs.iter().any(|p| p == port)
    }

    /// Put the node back into its pre-run state
    pub fn reset(&mut self) {
        self.status = NodeStatus::Idle;
        self.execution_time_ms = None;
    }
}

/// A directed connection from an output port to an input port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Unique identifier for this connection
    pub id: ConnectionId,
    /// Source node ID
    pub source: NodeId,
    /// Output port on the source node
    pub source_handle: PortName,
    /// Target node ID
    pub target: NodeId,
    /// Input port on the target node
    pub target_handle: PortName,
}

impl Connection {
    /// Whether either end of this connection is `node_id`
    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

/// The nodes and connections of a workflow
///
/// Node order is insertion order, which is also the execution order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowGraph {
    pub nodes: Vec<WorkflowNode>,
    pub connections: Vec<Connection>,
}

impl WorkflowGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a node by ID
    pub fn find_node(&self, id: &str) -> Option<&WorkflowNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Find a node by ID (mutable)
    pub fn find_node_mut(&mut self, id: &str) -> Option<&mut WorkflowNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

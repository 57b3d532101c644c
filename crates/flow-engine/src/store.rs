//! Graph store
//!
//! Owns the workflow being edited: its nodes and connections, the record
//! of the current run, and a bounded history of finished runs. The store
//! is a plain struct; the session and the execution engine share it as a
//! [`SharedGraphStore`].
//!
//! Invariants kept by every mutation:
//!
//! - no connection references a node that is not in the store
//! - every connection goes from a declared output port to a declared
//!   input port
//! - structural edits that would pull the graph out from under a run
//!   (`clear`, `replace`, removing the running node) are rejected while
//!   a run is active

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::catalog::ToolRecord;
use crate::constants::{execution::MAX_HISTORY, stats};
use crate::error::{Result, WorkflowError};
use crate::execution::{LogEntry, RunRecord, RunState, RunSummary};
use crate::registry::describe_kind;
use crate::types::{
    Connection, ConnectionId, NodeId, NodeKind, NodeStatus, PortName, Position, WorkflowGraph,
    WorkflowNode,
};

/// Graph store shared between the session and the execution engine
pub type SharedGraphStore = Arc<RwLock<GraphStore>>;

/// Derived statistics, always consistent with the current graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStats {
    pub total_nodes: usize,
    pub total_connections: usize,
    /// `max(1, nodes * 2)` seconds
    pub estimated_time_secs: u64,
    /// `clamp(100 - connections * 5, 0, 100)`
    pub efficiency: u32,
    /// When the last run started
    pub last_run: Option<DateTime<Utc>>,
}

impl WorkflowStats {
    /// Compute statistics for a graph
    pub fn compute(graph: &WorkflowGraph, last_run: Option<DateTime<Utc>>) -> Self {
        let nodes = graph.nodes.len();
        let connections = graph.connections.len();
        let estimated_time_secs = (nodes as u64)
            .saturating_mul(stats::SECONDS_PER_NODE)
            .max(stats::MIN_ESTIMATED_SECS);
        let penalty = u32::try_from(connections)
            .unwrap_or(u32::MAX)
            .saturating_mul(stats::EFFICIENCY_PENALTY_PER_CONNECTION);
        Self {
            total_nodes: nodes,
            total_connections: connections,
            estimated_time_secs,
            efficiency: stats::MAX_EFFICIENCY.saturating_sub(penalty),
            last_run,
        }
    }

    /// Estimated time as shown to the user, e.g. `"6s"`
    pub fn estimated_time_label(&self) -> String {
        format!("{}s", self.estimated_time_secs)
    }
}

/// A node removed from the store along with the connections it took
#[derive(Debug, Clone)]
pub struct RemovedNode {
    pub node: WorkflowNode,
    pub connections: Vec<Connection>,
}

/// In-memory store for one workflow
#[derive(Debug)]
pub struct GraphStore {
    graph: WorkflowGraph,
    run: RunRecord,
    history: VecDeque<RunSummary>,
    max_history: usize,
    last_run: Option<DateTime<Utc>>,
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            graph: WorkflowGraph::new(),
            run: RunRecord::default(),
            history: VecDeque::new(),
            max_history: MAX_HISTORY,
            last_run: None,
        }
    }

    /// Set how many finished runs are kept
    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    /// Wrap the store for sharing with an execution engine
    pub fn into_shared(self) -> SharedGraphStore {
        Arc::new(RwLock::new(self))
    }

    // =========================================================================
    // Read access
    // =========================================================================

    pub fn graph(&self) -> &WorkflowGraph {
        &self.graph
    }

    pub fn nodes(&self) -> &[WorkflowNode] {
        &self.graph.nodes
    }

    pub fn connections(&self) -> &[Connection] {
        &self.graph.connections
    }

    pub fn node(&self, id: &str) -> Option<&WorkflowNode> {
        self.graph.find_node(id)
    }

    /// The current or most recent run
    pub fn run(&self) -> &RunRecord {
        &self.run
    }

    /// Log of the current or most recent run
    pub fn log(&self) -> &[LogEntry] {
        &self.run.log
    }

    /// Finished runs, oldest first
    pub fn history(&self) -> impl Iterator<Item = &RunSummary> {
        self.history.iter()
    }

    pub fn find_run(&self, execution_id: &str) -> Option<&RunSummary> {
        self.history.iter().find(|r| r.execution_id == execution_id)
    }

    pub fn is_running(&self) -> bool {
        self.run.is_running()
    }

    /// Derived statistics for the current graph
    pub fn stats(&self) -> WorkflowStats {
        WorkflowStats::compute(&self.graph, self.last_run)
    }

    // =========================================================================
    // Node operations
    // =========================================================================

    /// Add a node with the registry defaults for `kind`
    pub fn add_node(
        &mut self,
        kind: NodeKind,
        position: Position,
        payload: Option<serde_json::Value>,
    ) -> NodeId {
        let descriptor = describe_kind(kind);
        let node = WorkflowNode {
            id: new_node_id(),
            kind,
            name: descriptor.default_name,
            description: descriptor.default_description,
            icon: descriptor.icon.to_string(),
            position,
            data: payload.unwrap_or_else(|| serde_json::json!({})),
            inputs: descriptor.inputs,
            outputs: descriptor.outputs,
            status: NodeStatus::Idle,
            execution_time_ms: None,
        };
        let id = node.id.clone();
        log::debug!("Added {} node '{}'", kind, id);
        self.graph.nodes.push(node);
        id
    }

    /// Add a node whose kind is given by name
    pub fn add_node_named(
        &mut self,
        kind: &str,
        position: Position,
        payload: Option<serde_json::Value>,
    ) -> Result<NodeId> {
        Ok(self.add_node(kind.parse()?, position, payload))
    }

    /// Add an action node built from a catalog tool
    ///
    /// The node takes the tool's name and description and carries the
    /// record as `{ "tool": ... }`.
    pub fn add_tool_node(&mut self, tool: &ToolRecord, position: Position) -> Result<NodeId> {
        let payload = serde_json::json!({ "tool": serde_json::to_value(tool)? });
        let id = self.add_node(NodeKind::Action, position, Some(payload));
        if let Some(node) = self.graph.find_node_mut(&id) {
            node.name = tool.name.clone();
            node.description = tool.description.clone();
        }
        Ok(id)
    }

    /// Remove a node and every connection that references it
    ///
    /// Allowed during a run unless the node is the one currently running;
    /// the engine skips removed nodes.
    pub fn remove_node(&mut self, id: &str) -> Result<RemovedNode> {
        let index = self
            .graph
            .nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| WorkflowError::NodeNotFound(id.to_string()))?;
        if self.run.is_running() && self.graph.nodes[index].status == NodeStatus::Running {
            return Err(WorkflowError::RunInProgress);
        }

        let node = self.graph.nodes.remove(index);
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.graph.connections)
            .into_iter()
            .partition(|c| c.touches(id));
        self.graph.connections = kept;

        log::debug!(
            "Removed node '{}' and {} connection(s)",
            id,
            removed.len()
        );
        Ok(RemovedNode {
            node,
            connections: removed,
        })
    }

    /// Move a node to a new graph-space position
    pub fn move_node(&mut self, id: &str, position: Position) -> Result<()> {
        let node = self
            .graph
            .find_node_mut(id)
            .ok_or_else(|| WorkflowError::NodeNotFound(id.to_string()))?;
        node.position = position;
        Ok(())
    }

    /// Change a node's display name
    ///
    /// Log entries already written keep the old name.
    pub fn rename_node(&mut self, id: &str, name: impl Into<String>) -> Result<()> {
        let node = self
            .graph
            .find_node_mut(id)
            .ok_or_else(|| WorkflowError::NodeNotFound(id.to_string()))?;
        node.name = name.into();
        Ok(())
    }

    // =========================================================================
    // Connection operations
    // =========================================================================

    /// Connect an output port of one node to an input port of another
    ///
    /// Duplicates, self-loops and cycles are accepted; only the ports are
    /// checked.
    pub fn connect(
        &mut self,
        source: &str,
        source_port: &str,
        target: &str,
        target_port: &str,
    ) -> Result<ConnectionId> {
        let source_node = self
            .graph
            .find_node(source)
            .ok_or_else(|| WorkflowError::NodeNotFound(source.to_string()))?;
        if !source_node.has_output(source_port) {
            return Err(WorkflowError::invalid_port(source, source_port));
        }
        let target_node = self
            .graph
            .find_node(target)
            .ok_or_else(|| WorkflowError::NodeNotFound(target.to_string()))?;
        if !target_node.has_input(target_port) {
            return Err(WorkflowError::invalid_port(target, target_port));
        }

        let id = new_connection_id();
        self.graph.connections.push(Connection {
            id: id.clone(),
            source: source.to_string(),
            source_handle: source_port.to_string(),
            target: target.to_string(),
            target_handle: target_port.to_string(),
        });
        Ok(id)
    }

    /// Remove a connection by id
    ///
    /// Fails with `ConnectionNotFound` when the id is unknown, so a second
    /// disconnect of the same id is reported rather than ignored.
    pub fn disconnect(&mut self, id: &str) -> Result<Connection> {
        let index = self
            .graph
            .connections
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| WorkflowError::ConnectionNotFound(id.to_string()))?;
        Ok(self.graph.connections.remove(index))
    }

    // =========================================================================
    // Whole-graph operations
    // =========================================================================

    /// Discard nodes, connections, the run log, metrics and history
    pub fn clear(&mut self) -> Result<()> {
        if self.run.is_running() {
            return Err(WorkflowError::RunInProgress);
        }
        self.graph = WorkflowGraph::new();
        self.run = RunRecord::default();
        self.history.clear();
        log::debug!("Cleared workflow");
        Ok(())
    }

    /// Replace the whole graph
    ///
    /// `graph` must have unique ids, registry ports on every node, and
    /// connections that reference its own nodes and ports. The current run
    /// record is discarded.
    pub fn replace(&mut self, graph: WorkflowGraph) -> Result<()> {
        if self.run.is_running() {
            return Err(WorkflowError::RunInProgress);
        }
        validate_graph(&graph)?;
        self.graph = graph;
        self.run = RunRecord::default();
        Ok(())
    }

    // =========================================================================
    // Run bookkeeping (driven by the execution engine)
    // =========================================================================

    /// Start a run: reset node statuses, log and metrics
    ///
    /// Returns the run order as `(id, name)` pairs.
    pub(crate) fn begin_run(&mut self, execution_id: &str) -> Result<Vec<(NodeId, String)>> {
        if self.graph.is_empty() {
            return Err(WorkflowError::EmptyGraph);
        }
        if self.run.is_running() {
            return Err(WorkflowError::RunInProgress);
        }

        for node in &mut self.graph.nodes {
            node.reset();
        }
        self.run = RunRecord::start(execution_id);
        self.last_run = self.run.started_at;

        Ok(self
            .graph
            .nodes
            .iter()
            .map(|n| (n.id.clone(), n.name.clone()))
            .collect())
    }

    pub(crate) fn graph_mut(&mut self) -> &mut WorkflowGraph {
        &mut self.graph
    }

    pub(crate) fn run_mut(&mut self) -> &mut RunRecord {
        &mut self.run
    }

    /// End the active run in `state` and freeze it into history
    pub(crate) fn finish_run(&mut self, state: RunState) -> RunSummary {
        self.run.state = state;
        let summary = self.run.summary();
        self.push_history(summary.clone());
        summary
    }

    /// Stop the active run and reset every node to idle
    ///
    /// Returns `None` when nothing is running.
    pub(crate) fn stop_run(&mut self) -> Option<RunSummary> {
        if !self.run.is_running() {
            return None;
        }
        for node in &mut self.graph.nodes {
            node.status = NodeStatus::Idle;
        }
        Some(self.finish_run(RunState::Stopped))
    }

    fn push_history(&mut self, summary: RunSummary) {
        if self.max_history == 0 {
            return;
        }
        while self.history.len() >= self.max_history {
            self.history.pop_front();
        }
        self.history.push_back(summary);
    }
}

/// Generate a fresh node id
pub(crate) fn new_node_id() -> NodeId {
    format!("node-{}", Uuid::new_v4())
}

/// Generate a fresh connection id
pub(crate) fn new_connection_id() -> ConnectionId {
    format!("conn-{}", Uuid::new_v4())
}

/// Check that a whole graph upholds the store invariants
///
/// Node and connection ids are unique, every node declares exactly the
/// registry ports for its kind, and every connection references existing
/// nodes and declared ports.
pub(crate) fn validate_graph(graph: &WorkflowGraph) -> Result<()> {
    let mut node_ids = HashSet::with_capacity(graph.nodes.len());
    for node in &graph.nodes {
        if !node_ids.insert(node.id.as_str()) {
            return Err(WorkflowError::DuplicateNodeId(node.id.clone()));
        }
        let descriptor = describe_kind(node.kind);
        if let Some(port) = mismatched_port(&node.inputs, &descriptor.inputs) {
            return Err(WorkflowError::invalid_port(&node.id, port));
        }
        if let Some(port) = mismatched_port(&node.outputs, &descriptor.outputs) {
            return Err(WorkflowError::invalid_port(&node.id, port));
        }
    }

    let mut connection_ids = HashSet::with_capacity(graph.connections.len());
    for connection in &graph.connections {
        if !connection_ids.insert(connection.id.as_str()) {
            return Err(WorkflowError::DuplicateConnectionId(connection.id.clone()));
        }
        let source = graph.find_node(&connection.source).ok_or_else(|| {
            WorkflowError::DanglingConnection {
                connection_id: connection.id.clone(),
                node_id: connection.source.clone(),
            }
        })?;
        if !source.has_output(&connection.source_handle) {
            return Err(WorkflowError::invalid_port(
                &connection.source,
                &connection.source_handle,
            ));
        }
        let target = graph.find_node(&connection.target).ok_or_else(|| {
            WorkflowError::DanglingConnection {
                connection_id: connection.id.clone(),
                node_id: connection.target.clone(),
            }
        })?;
        if !target.has_input(&connection.target_handle) {
            return Err(WorkflowError::invalid_port(
                &connection.target,
                &connection.target_handle,
            ));
        }
    }
    Ok(())
}

/// First port that differs between a node's ports and the registry's
fn mismatched_port<'a>(actual: &'a [PortName], expected: &'a [PortName]) -> Option<&'a str> {
    if actual == expected {
        return None;
    }
    actual
        .iter()
        .find(|p| !expected.contains(*p))
        .or_else(|| expected.iter().find(|p| !actual.contains(*p)))
        .or_else(|| actual.first())
        .map(String::as_str)
}

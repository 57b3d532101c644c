//! Flow Engine - Visual workflow builder core
//!
//! This crate holds the data model and behavior behind a node-graph
//! workflow builder. It supports:
//!
//! - Typed nodes (trigger, action, condition, output) with fixed ports
//! - A graph store that keeps connections consistent with their nodes
//! - A simulated sequential executor with per-node status, timing and logs
//! - Canned templates, a tool catalog, and JSON export/import
//!
//! # Architecture
//!
//! - `GraphStore`: owns nodes, connections, run record and run history
//! - `ExecutionEngine`: runs the store's nodes in insertion order,
//!   writing status changes back under the store lock
//! - `OutcomeSource`: decides each node's simulated success and duration
//! - `EventSink`: generic event streaming (not tied to any UI)
//! - `WorkflowSession`: editor-facing façade with viewport and selection
//!
//! # Example
//!
//! ```ignore
//! use flow_engine::{EngineConfig, LogEventSink, WorkflowSession};
//! use std::sync::Arc;
//!
//! let mut session = WorkflowSession::new(&EngineConfig::default(), Arc::new(LogEventSink));
//! session.load_template("1").await?;
//! let summary = session.run().await?;
//! ```

pub mod canvas;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod execution;
pub mod export;
pub mod outcome;
pub mod registry;
pub mod session;
pub mod store;
pub mod templates;
pub mod types;

// Re-export key types
pub use canvas::Viewport;
pub use catalog::{
    CatalogProvider, JsonFileCatalog, StaticCatalog, ToolCatalog, ToolQuery, ToolRecord,
};
pub use config::{CanvasConfig, CatalogConfig, EngineConfig, ExecutionConfig};
pub use error::{Result, WorkflowError};
pub use events::{EventError, EventSink, LogEventSink, NullEventSink, VecEventSink, WorkflowEvent};
pub use execution::{
    ExecutionEngine, LogEntry, LogStatus, RunMetrics, RunRecord, RunState, RunSummary,
};
pub use export::WorkflowDocument;
pub use outcome::{NodeOutcome, OutcomeSource, RandomOutcomes, ScriptedOutcomes};
pub use registry::{describe_kind, describe_kind_named, palette, KindDescriptor};
pub use session::WorkflowSession;
pub use store::{GraphStore, RemovedNode, SharedGraphStore, WorkflowStats};
pub use templates::{Complexity, Template, TemplateBuilder, TemplateCatalog};
pub use types::{
    Connection, ConnectionId, NodeId, NodeKind, NodeStatus, PortName, Position, WorkflowGraph,
    WorkflowNode,
};

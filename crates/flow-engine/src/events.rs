//! Event types for streaming workflow changes
//!
//! Events are sent from the engine to the frontend (or any consumer)
//! to report edits, run progress, metrics and outcomes.

use serde::{Deserialize, Serialize};

use crate::execution::{RunMetrics, RunState};
use crate::types::NodeStatus;

/// Trait for sending workflow events
///
/// This abstracts over the transport mechanism (UI channel, mpsc, log, etc.)
/// allowing the engine to be used in different contexts.
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be sent (e.g., channel closed)
    fn send(&self, event: WorkflowEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

/// Events emitted while editing and running a workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkflowEvent {
    /// A node was added
    #[serde(rename_all = "camelCase")]
    NodeAdded { node_id: String, name: String },

    /// A node (and its connections) was removed
    #[serde(rename_all = "camelCase")]
    NodeRemoved {
        node_id: String,
        name: String,
        connections_removed: usize,
    },

    /// Two ports were connected
    #[serde(rename_all = "camelCase")]
    Connected {
        connection_id: String,
        source: String,
        target: String,
    },

    /// A connection was removed
    #[serde(rename_all = "camelCase")]
    Disconnected { connection_id: String },

    /// A template replaced the workflow
    #[serde(rename_all = "camelCase")]
    TemplateLoaded {
        template_id: String,
        name: String,
        node_count: usize,
    },

    /// All nodes, connections and run data were discarded
    WorkflowCleared,

    /// The workflow was exported to a document
    #[serde(rename_all = "camelCase")]
    WorkflowSaved { node_count: usize },

    /// A run started
    #[serde(rename_all = "camelCase")]
    RunStarted {
        execution_id: String,
        node_count: usize,
    },

    /// A node changed status during a run
    #[serde(rename_all = "camelCase")]
    NodeStatusChanged {
        execution_id: String,
        node_id: String,
        status: NodeStatus,
    },

    /// A node was skipped because it disappeared mid-run
    #[serde(rename_all = "camelCase")]
    NodeSkipped {
        execution_id: String,
        node_id: String,
        name: String,
    },

    /// Metrics after a node finished
    #[serde(rename_all = "camelCase")]
    MetricsUpdated {
        execution_id: String,
        metrics: RunMetrics,
    },

    /// A run ended
    #[serde(rename_all = "camelCase")]
    RunFinished {
        execution_id: String,
        state: RunState,
        /// Name of the node that failed, for failed runs
        failed_node_name: Option<String>,
    },
}

impl WorkflowEvent {
    /// Human-readable notification text
    ///
    /// Presentational only; consumers should match on the variant.
    pub fn message(&self) -> String {
        match self {
            Self::NodeAdded { name, .. } => format!("{} added to workflow", name),
            Self::NodeRemoved { name, .. } => format!("{} removed from workflow", name),
            Self::Connected { source, target, .. } => {
                format!("Connected {} to {}", source, target)
            }
            Self::Disconnected { connection_id } => format!("Removed connection {}", connection_id),
            Self::TemplateLoaded { name, .. } => format!("Template \"{}\" loaded", name),
            Self::WorkflowCleared => "Workflow cleared".to_string(),
            Self::WorkflowSaved { .. } => "Workflow saved successfully".to_string(),
            Self::RunStarted { node_count, .. } => {
                format!("Executing workflow ({} nodes)", node_count)
            }
            Self::NodeStatusChanged {
                node_id, status, ..
            } => format!("{} is {:?}", node_id, status),
            Self::NodeSkipped { name, .. } => format!("{} was removed before it ran", name),
            Self::MetricsUpdated { metrics, .. } => format!(
                "{} nodes executed, {:.0}% success",
                metrics.nodes_executed, metrics.success_rate
            ),
            Self::RunFinished {
                state,
                failed_node_name,
                ..
            } => match (state, failed_node_name) {
                (RunState::Failed, Some(name)) => format!("Workflow failed at {}", name),
                (RunState::Failed, None) => "Workflow execution failed".to_string(),
                (RunState::Stopped, _) => "Workflow execution stopped".to_string(),
                _ => "Workflow executed successfully!".to_string(),
            },
        }
    }
}

/// A no-op event sink that discards all events
///
/// Useful for testing or when events aren't needed.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: WorkflowEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// Event sink that forwards notifications to the `log` facade
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn send(&self, event: WorkflowEvent) -> Result<(), EventError> {
        match &event {
            WorkflowEvent::NodeStatusChanged { .. } | WorkflowEvent::MetricsUpdated { .. } => {
                log::debug!("{}", event.message())
            }
            WorkflowEvent::RunFinished {
                state: RunState::Failed,
                ..
            } => log::warn!("{}", event.message()),
            _ => log::info!("{}", event.message()),
        }
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
pub struct VecEventSink {
    events: std::sync::Mutex<Vec<WorkflowEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self {
            events: std::sync::Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<WorkflowEvent>> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<WorkflowEvent> {
        self.lock().clone()
    }

    /// Clear all collected events
    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Default for VecEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: WorkflowEvent) -> Result<(), EventError> {
        self.lock().push(event);
        Ok(())
    }
}

//! Error types for the flow engine

use thiserror::Error;

/// Result type alias using WorkflowError
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Errors that can occur while editing or running a workflow
///
/// A node failing during a run is not an error: it is recorded as a log
/// entry and an `error` node status.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Node kind outside the closed set
    #[error("Invalid node kind: {0}")]
    InvalidKind(String),

    /// Node id did not resolve
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Connection id did not resolve
    #[error("Connection not found: {0}")]
    ConnectionNotFound(String),

    /// Template id did not resolve
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// Port name is not declared on the node
    #[error("Invalid port '{port}' on node '{node_id}'")]
    InvalidPort { node_id: String, port: String },

    /// Run requested on a graph without nodes
    #[error("Workflow has no nodes to execute")]
    EmptyGraph,

    /// Operation conflicts with the active run
    #[error("A workflow run is in progress")]
    RunInProgress,

    /// Imported connection references a node that does not exist
    #[error("Connection '{connection_id}' references unknown node '{node_id}'")]
    DanglingConnection {
        connection_id: String,
        node_id: String,
    },

    /// Two nodes share an id
    #[error("Duplicate node id: {0}")]
    DuplicateNodeId(String),

    /// Two connections share an id
    #[error("Duplicate connection id: {0}")]
    DuplicateConnectionId(String),

    /// Document written by a newer schema
    #[error("Unsupported workflow schema version: {0}")]
    UnsupportedSchema(u32),

    /// Invalid engine configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkflowError {
    /// Create an invalid port error
    pub fn invalid_port(node_id: impl Into<String>, port: impl Into<String>) -> Self {
        Self::InvalidPort {
            node_id: node_id.into(),
            port: port.into(),
        }
    }

    /// Whether this error is an unresolved node, connection or template id
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NodeNotFound(_) | Self::ConnectionNotFound(_) | Self::TemplateNotFound(_)
        )
    }
}

//! Workflow documents
//!
//! A [`WorkflowDocument`] is a portable snapshot of the graph store: nodes,
//! connections, the stats at export time and a timestamp. Documents carry
//! a schema version so older readers can refuse newer files.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::constants::export::SCHEMA_VERSION;
use crate::error::{Result, WorkflowError};
use crate::store::{GraphStore, WorkflowStats};
use crate::types::{Connection, WorkflowGraph, WorkflowNode};

/// Exported workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDocument {
    /// Documents written before versioning are treated as version 1
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub nodes: Vec<WorkflowNode>,
    pub connections: Vec<Connection>,
    pub stats: WorkflowStats,
    pub created_at: DateTime<Utc>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl WorkflowDocument {
    /// Snapshot the store
    pub fn export(store: &GraphStore) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            nodes: store.nodes().to_vec(),
            connections: store.connections().to_vec(),
            stats: store.stats(),
            created_at: Utc::now(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the document as pretty JSON, creating parent directories
    pub async fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        fs::write(path, self.to_json_pretty()?).await?;
        log::info!("Exported {} node(s) to {:?}", self.nodes.len(), path);
        Ok(())
    }

    pub async fn read_from(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).await?;
        Self::from_json(&content)
    }

    /// The graph held by the document
    ///
    /// Fails with `UnsupportedSchema` for documents newer than this build.
    pub fn into_graph(self) -> Result<WorkflowGraph> {
        if self.schema_version > SCHEMA_VERSION {
            return Err(WorkflowError::UnsupportedSchema(self.schema_version));
        }
        Ok(WorkflowGraph {
            nodes: self.nodes,
            connections: self.connections,
        })
    }
}

impl GraphStore {
    /// Replace the graph with the contents of a document
    ///
    /// The document is rejected as a whole when its schema is too new, an
    /// id is used twice, a node's ports differ from the registry ports for
    /// its kind, a connection references a missing node or undeclared port,
    /// or a run is active. Imported nodes start idle.
    pub fn import(&mut self, document: WorkflowDocument) -> Result<()> {
        let mut graph = document.into_graph()?;
        for node in &mut graph.nodes {
            node.reset();
        }
        let (nodes, connections) = (graph.nodes.len(), graph.connections.len());
        self.replace(graph)?;
        log::info!("Imported {} node(s), {} connection(s)", nodes, connections);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    use crate::constants::ports::{INPUT, OUTPUT};
    use crate::types::{NodeKind, NodeStatus, Position};

    fn sample_store() -> GraphStore {
        let mut store = GraphStore::new();
        let a = store.add_node(NodeKind::Trigger, Position::new(0.0, 0.0), None);
        let b = store.add_node(NodeKind::Output, Position::new(250.0, 0.0), None);
        store.connect(&a, OUTPUT, &b, INPUT).unwrap();
        store
    }

    #[test]
    fn test_export_fields() {
        let store = sample_store();
        let document = WorkflowDocument::export(&store);
        let json: serde_json::Value =
            serde_json::from_str(&document.to_json_pretty().unwrap()).unwrap();

        assert_eq!(json["schemaVersion"], 1);
        assert_eq!(json["nodes"].as_array().unwrap().len(), 2);
        assert_eq!(json["connections"][0]["sourceHandle"], "output");
        assert_eq!(json["stats"]["totalNodes"], 2);
        assert_eq!(json["stats"]["efficiency"], 95);
        assert!(json["createdAt"].is_string());
    }

    #[test]
    fn test_export_is_a_snapshot() {
        let mut store = sample_store();
        let document = WorkflowDocument::export(&store);
        store.clear().unwrap();
        assert_eq!(document.nodes.len(), 2);
        assert_eq!(document.stats.total_connections, 1);
    }

    #[tokio::test]
    async fn test_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("workflow.json");
        let store = sample_store();
        WorkflowDocument::export(&store).write_to(&path).await.unwrap();

        let mut restored = GraphStore::new();
        restored
            .import(WorkflowDocument::read_from(&path).await.unwrap())
            .unwrap();
        assert_eq!(restored.stats().total_nodes, 2);
        assert_eq!(restored.connections(), store.connections());
    }

    #[test]
    fn test_import_resets_status() {
        let store = sample_store();
        let mut document = WorkflowDocument::export(&store);
        document.nodes[0].status = NodeStatus::Completed;
        document.nodes[0].execution_time_ms = Some(1200);

        let mut restored = GraphStore::new();
        restored.import(document).unwrap();
        assert_eq!(restored.nodes()[0].status, NodeStatus::Idle);
        assert_eq!(restored.nodes()[0].execution_time_ms, None);
    }

    #[test]
    fn test_import_rejects_newer_schema() {
        let mut document = WorkflowDocument::export(&sample_store());
        document.schema_version = SCHEMA_VERSION + 1;
        let mut store = GraphStore::new();
        assert!(matches!(
            store.import(document),
            Err(WorkflowError::UnsupportedSchema(2))
        ));
    }

    #[test]
    fn test_import_rejects_dangling_connection() {
        let mut document = WorkflowDocument::export(&sample_store());
        document.nodes.remove(1);

        let mut store = GraphStore::new();
        let kept = store.add_node(NodeKind::Action, Position::default(), None);
        assert!(matches!(
            store.import(document),
            Err(WorkflowError::DanglingConnection { .. })
        ));
        assert!(store.node(&kept).is_some());
    }

    #[test]
    fn test_import_rejects_duplicate_node_ids() {
        let mut store = GraphStore::new();
        store.add_node(NodeKind::Action, Position::default(), None);
        store.add_node(NodeKind::Action, Position::new(250.0, 0.0), None);
        let mut document = WorkflowDocument::export(&store);
        document.nodes[1].id = document.nodes[0].id.clone();
        let duplicate = document.nodes[0].id.clone();

        let mut target = GraphStore::new();
        let kept = target.add_node(NodeKind::Trigger, Position::default(), None);
        assert!(matches!(
            target.import(document),
            Err(WorkflowError::DuplicateNodeId(id)) if id == duplicate
        ));
        assert_eq!(target.nodes().len(), 1);
        assert!(target.node(&kept).is_some());
    }

    #[test]
    fn test_import_rejects_duplicate_connection_ids() {
        let mut store = sample_store();
        let (a, b) = (store.nodes()[0].id.clone(), store.nodes()[1].id.clone());
        store.connect(&a, OUTPUT, &b, INPUT).unwrap();
        let mut document = WorkflowDocument::export(&store);
        document.connections[1].id = document.connections[0].id.clone();

        assert!(matches!(
            GraphStore::new().import(document),
            Err(WorkflowError::DuplicateConnectionId(_))
        ));
    }

    #[test]
    fn test_import_rejects_ports_outside_registry() {
        let store = sample_store();

        // trigger given an input port
        let mut document = WorkflowDocument::export(&store);
        document.nodes[0].inputs = vec![INPUT.to_string()];
        let trigger = document.nodes[0].id.clone();
        let mut target = GraphStore::new();
        assert!(matches!(
            target.import(document),
            Err(WorkflowError::InvalidPort { node_id, port }) if node_id == trigger && port == INPUT
        ));
        assert!(target.graph().is_empty());

        // output node given an output port
        let mut document = WorkflowDocument::export(&store);
        document.nodes[1].outputs = vec![OUTPUT.to_string()];
        assert!(matches!(
            target.import(document),
            Err(WorkflowError::InvalidPort { .. })
        ));

        // action node missing its input
        let mut document = WorkflowDocument::export(&store);
        let mut action = store.nodes()[1].clone();
        action.id = "node-extra".to_string();
        action.kind = NodeKind::Action;
        action.inputs.clear();
        action.outputs = vec![OUTPUT.to_string()];
        document.nodes.push(action);
        assert!(matches!(
            target.import(document),
            Err(WorkflowError::InvalidPort { node_id, .. }) if node_id == "node-extra"
        ));
    }

    #[test]
    fn test_unversioned_document_reads_as_current() {
        let json = r#"{
            "nodes": [],
            "connections": [],
            "stats": {
                "totalNodes": 0,
                "totalConnections": 0,
                "estimatedTimeSecs": 1,
                "efficiency": 100,
                "lastRun": null
            },
            "createdAt": "2024-01-01T00:00:00Z"
        }"#;
        let document = WorkflowDocument::from_json(json).unwrap();
        assert_eq!(document.schema_version, SCHEMA_VERSION);
        assert!(document.into_graph().unwrap().is_empty());
    }
}

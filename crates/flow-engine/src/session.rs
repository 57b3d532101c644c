//! Editing session
//!
//! [`WorkflowSession`] is the state an editor works against: the shared
//! graph store, the execution engine over it, the canvas viewport, the
//! selected node and the template catalog. Edits made through the session
//! are announced on its event sink.

use std::path::Path;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::canvas::Viewport;
use crate::catalog::ToolRecord;
use crate::config::EngineConfig;
use crate::constants::canvas::DEFAULT_DROP;
use crate::error::{Result, WorkflowError};
use crate::events::{EventSink, WorkflowEvent};
use crate::execution::{ExecutionEngine, RunSummary};
use crate::export::WorkflowDocument;
use crate::outcome::{OutcomeSource, RandomOutcomes};
use crate::store::{GraphStore, RemovedNode, SharedGraphStore, WorkflowStats};
use crate::templates::{Template, TemplateCatalog};
use crate::types::{Connection, ConnectionId, NodeId, NodeKind, Position};

/// A workflow being edited and run
pub struct WorkflowSession {
    store: SharedGraphStore,
    engine: ExecutionEngine,
    viewport: Viewport,
    templates: TemplateCatalog,
    selected: Option<NodeId>,
    event_sink: Arc<dyn EventSink>,
}

impl WorkflowSession {
    /// Create a session with random outcomes drawn per the configuration
    pub fn new(config: &EngineConfig, event_sink: Arc<dyn EventSink>) -> Self {
        let outcomes = Arc::new(RandomOutcomes::new(&config.execution));
        Self::with_outcomes(config, outcomes, event_sink)
    }

    /// Create a session with an explicit outcome source
    pub fn with_outcomes(
        config: &EngineConfig,
        outcomes: Arc<dyn OutcomeSource>,
        event_sink: Arc<dyn EventSink>,
    ) -> Self {
        let store = GraphStore::new()
            .with_max_history(config.execution.max_history)
            .into_shared();
        let engine = ExecutionEngine::new(store.clone(), outcomes, event_sink.clone())
            .with_config(&config.execution);
        Self {
            store,
            engine,
            viewport: Viewport::new(&config.canvas),
            templates: TemplateCatalog::builtin(),
            selected: None,
            event_sink,
        }
    }

    /// Use a different template catalog
    pub fn with_templates(mut self, templates: TemplateCatalog) -> Self {
        self.templates = templates;
        self
    }

    pub fn store(&self) -> &SharedGraphStore {
        &self.store
    }

    pub fn engine(&self) -> &ExecutionEngine {
        &self.engine
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn templates(&self) -> &TemplateCatalog {
        &self.templates
    }

    pub async fn stats(&self) -> WorkflowStats {
        self.store.read().await.stats()
    }

    // =========================================================================
    // Selection
    // =========================================================================

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Select a node
    pub async fn select(&mut self, id: &str) -> Result<()> {
        if self.store.read().await.node(id).is_none() {
            return Err(WorkflowError::NodeNotFound(id.to_string()));
        }
        self.selected = Some(id.to_string());
        Ok(())
    }

    pub fn deselect(&mut self) {
        self.selected = None;
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Add a node with the defaults for its kind
    pub async fn add_node(
        &self,
        kind: NodeKind,
        position: Position,
        payload: Option<serde_json::Value>,
    ) -> NodeId {
        let (id, name) = {
            let mut store = self.store.write().await;
            let id = store.add_node(kind, position, payload);
            let name = store.node(&id).map(|n| n.name.clone()).unwrap_or_default();
            (id, name)
        };
        self.emit(WorkflowEvent::NodeAdded {
            node_id: id.clone(),
            name,
        });
        id
    }

    /// Add a node from the palette at the default drop point
    pub async fn add_from_palette(&self, kind: NodeKind) -> NodeId {
        self.add_node(kind, DEFAULT_DROP.into(), None).await
    }

    /// Drop a catalog tool onto the canvas
    ///
    /// `pointer` and `canvas_origin` are in pointer space; the node lands at
    /// the matching graph-space position under the current pan and zoom.
    pub async fn drop_tool(
        &self,
        tool: &ToolRecord,
        pointer: Position,
        canvas_origin: Position,
    ) -> Result<NodeId> {
        let position = self.viewport.to_graph(pointer, canvas_origin);
        let id = self.store.write().await.add_tool_node(tool, position)?;
        self.emit(WorkflowEvent::NodeAdded {
            node_id: id.clone(),
            name: tool.name.clone(),
        });
        Ok(id)
    }

    /// Remove a node and its connections
    pub async fn remove_node(&mut self, id: &str) -> Result<RemovedNode> {
        let removed = self.store.write().await.remove_node(id)?;
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        self.emit(WorkflowEvent::NodeRemoved {
            node_id: removed.node.id.clone(),
            name: removed.node.name.clone(),
            connections_removed: removed.connections.len(),
        });
        Ok(removed)
    }

    pub async fn move_node(&self, id: &str, position: Position) -> Result<()> {
        self.store.write().await.move_node(id, position)
    }

    pub async fn rename_node(&self, id: &str, name: impl Into<String>) -> Result<()> {
        self.store.write().await.rename_node(id, name)
    }

    /// Connect an output port to an input port
    pub async fn connect(
        &self,
        source: &str,
        source_port: &str,
        target: &str,
        target_port: &str,
    ) -> Result<ConnectionId> {
        let (id, source_name, target_name) = {
            let mut store = self.store.write().await;
            let id = store.connect(source, source_port, target, target_port)?;
            let name_of = |node: &str| {
                store
                    .node(node)
                    .map(|n| n.name.clone())
                    .unwrap_or_else(|| node.to_string())
            };
            (id, name_of(source), name_of(target))
        };
        self.emit(WorkflowEvent::Connected {
            connection_id: id.clone(),
            source: source_name,
            target: target_name,
        });
        Ok(id)
    }

    pub async fn disconnect(&self, id: &str) -> Result<Connection> {
        let connection = self.store.write().await.disconnect(id)?;
        self.emit(WorkflowEvent::Disconnected {
            connection_id: connection.id.clone(),
        });
        Ok(connection)
    }

    /// Discard the workflow, its run log and history
    pub async fn clear(&mut self) -> Result<()> {
        self.store.write().await.clear()?;
        self.selected = None;
        self.emit(WorkflowEvent::WorkflowCleared);
        Ok(())
    }

    /// Replace the workflow with a fresh copy of a template
    pub async fn load_template(&mut self, id: &str) -> Result<Template> {
        let template = {
            let mut store = self.store.write().await;
            self.templates.materialize(id, &mut store)?.clone()
        };
        self.selected = None;
        self.emit(WorkflowEvent::TemplateLoaded {
            template_id: template.id.clone(),
            name: template.name.clone(),
            node_count: template.nodes.len(),
        });
        Ok(template)
    }

    // =========================================================================
    // Documents
    // =========================================================================

    pub async fn export(&self) -> WorkflowDocument {
        WorkflowDocument::export(&*self.store.read().await)
    }

    /// Export the workflow and write it to `path`
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<WorkflowDocument> {
        let document = self.export().await;
        document.write_to(path).await?;
        self.emit(WorkflowEvent::WorkflowSaved {
            node_count: document.nodes.len(),
        });
        Ok(document)
    }

    /// Replace the workflow with a document's contents
    pub async fn import(&mut self, document: WorkflowDocument) -> Result<()> {
        self.store.write().await.import(document)?;
        self.selected = None;
        Ok(())
    }

    /// Read a document from `path` and import it
    pub async fn open(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let document = WorkflowDocument::read_from(path).await?;
        self.import(document).await
    }

    // =========================================================================
    // Running
    // =========================================================================

    /// Run the workflow and wait for it to end
    pub async fn run(&self) -> Result<RunSummary> {
        self.engine.run().await
    }

    /// Run the workflow in the background
    pub fn spawn_run(&self) -> JoinHandle<Result<RunSummary>> {
        self.engine.spawn()
    }

    /// Stop the active run, if any
    pub async fn stop(&self) -> Option<RunSummary> {
        self.engine.stop().await
    }

    fn emit(&self, event: WorkflowEvent) {
        if let Err(e) = self.event_sink.send(event) {
            log::debug!("Dropped workflow event: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    use crate::constants::ports::{INPUT, OUTPUT};
    use crate::events::VecEventSink;
    use crate::execution::{LogStatus, RunState};
    use crate::outcome::ScriptedOutcomes;
    use crate::types::NodeStatus;

    fn new_session(outcomes: ScriptedOutcomes) -> (WorkflowSession, Arc<VecEventSink>) {
        let sink = Arc::new(VecEventSink::new());
        let session =
            WorkflowSession::with_outcomes(&EngineConfig::default(), Arc::new(outcomes), sink.clone());
        (session, sink)
    }

    fn tool() -> ToolRecord {
        ToolRecord {
            id: "t1".to_string(),
            name: "Summarizer".to_string(),
            description: "Condenses long text".to_string(),
            category: "Content Creation".to_string(),
            image: String::new(),
            rating: 4.5,
        }
    }

    #[tokio::test]
    async fn test_edit_events() {
        let (mut session, sink) = new_session(ScriptedOutcomes::always_succeed());
        let a = session.add_from_palette(NodeKind::Trigger).await;
        let b = session
            .add_node(NodeKind::Output, Position::new(400.0, 200.0), None)
            .await;
        let conn = session.connect(&a, OUTPUT, &b, INPUT).await.unwrap();
        session.disconnect(&conn).await.unwrap();
        session.remove_node(&a).await.unwrap();

        let messages: Vec<_> = sink.events().iter().map(|e| e.message()).collect();
        assert_eq!(
            messages,
            vec![
                "Trigger Node added to workflow",
                "Output Node added to workflow",
                "Connected Trigger Node to Output Node",
                format!("Removed connection {}", conn).as_str(),
                "Trigger Node removed from workflow",
            ]
        );

        let store = session.store().read().await;
        assert_eq!(store.nodes().len(), 1);
        assert_eq!(store.nodes()[0].id, b);
    }

    #[tokio::test]
    async fn test_palette_drop_point() {
        let (session, _) = new_session(ScriptedOutcomes::always_succeed());
        let id = session.add_from_palette(NodeKind::Action).await;
        let store = session.store().read().await;
        assert_eq!(store.node(&id).unwrap().position, Position::new(200.0, 200.0));
    }

    #[tokio::test]
    async fn test_drop_tool_uses_viewport() {
        let (mut session, _) = new_session(ScriptedOutcomes::always_succeed());
        session.viewport_mut().set_zoom(2.0);
        session.viewport_mut().set_pan(Position::new(40.0, 0.0));

        let id = session
            .drop_tool(&tool(), Position::new(540.0, 300.0), Position::new(100.0, 100.0))
            .await
            .unwrap();

        let store = session.store().read().await;
        let node = store.node(&id).unwrap();
        assert_eq!(node.kind, NodeKind::Action);
        assert_eq!(node.name, "Summarizer");
        assert_eq!(node.position, Position::new(200.0, 100.0));
        assert_eq!(node.data["tool"]["id"], "t1");
    }

    #[tokio::test]
    async fn test_selection_follows_removal() {
        let (mut session, _) = new_session(ScriptedOutcomes::always_succeed());
        let a = session.add_from_palette(NodeKind::Action).await;
        let b = session.add_from_palette(NodeKind::Action).await;

        session.select(&a).await.unwrap();
        session.remove_node(&b).await.unwrap();
        assert_eq!(session.selected(), Some(a.as_str()));

        session.remove_node(&a).await.unwrap();
        assert_eq!(session.selected(), None);

        assert!(session.select("node-missing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_template_then_run() {
        let (mut session, sink) = new_session(ScriptedOutcomes::always_succeed());
        let stray = session.add_from_palette(NodeKind::Condition).await;
        session.select(&stray).await.unwrap();

        let template = session.load_template("3").await.unwrap();
        assert_eq!(template.name, "Customer Support Automation");
        assert_eq!(session.selected(), None);

        let stats = session.stats().await;
        assert_eq!(stats.total_nodes, 3);
        assert_eq!(stats.total_connections, 2);
        assert_eq!(stats.estimated_time_label(), "6s");
        assert_eq!(stats.efficiency, 90);
        assert!(stats.last_run.is_none());

        let summary = session.run().await.unwrap();
        assert_eq!(summary.state, RunState::Completed);
        assert!(summary.log.iter().all(|e| e.status == LogStatus::Success));
        assert!(session.stats().await.last_run.is_some());

        let last = sink.events().last().map(|e| e.message());
        assert_eq!(last.as_deref(), Some("Workflow executed successfully!"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_structural_edits_blocked_during_run() {
        let (mut session, _) =
            new_session(ScriptedOutcomes::always_succeed_after(Duration::from_millis(100)));
        session.load_template("1").await.unwrap();

        let handle = session.spawn_run();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(matches!(session.clear().await, Err(WorkflowError::RunInProgress)));
        assert!(matches!(
            session.load_template("2").await,
            Err(WorkflowError::RunInProgress)
        ));
        let running = session.store().read().await.nodes()[0].id.clone();
        assert!(matches!(
            session.remove_node(&running).await,
            Err(WorkflowError::RunInProgress)
        ));

        let stopped = session.stop().await.unwrap();
        assert_eq!(stopped.state, RunState::Stopped);
        assert_eq!(handle.await.unwrap().unwrap().state, RunState::Stopped);

        session.clear().await.unwrap();
        assert!(session.store().read().await.graph().is_empty());
    }

    #[tokio::test]
    async fn test_run_empty_workflow() {
        let (session, _) = new_session(ScriptedOutcomes::always_succeed());
        assert!(matches!(session.run().await, Err(WorkflowError::EmptyGraph)));
    }

    #[tokio::test]
    async fn test_save_and_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("workflow.json");

        let (mut session, sink) = new_session(ScriptedOutcomes::fail_at(1));
        session.load_template("1").await.unwrap();
        session.run().await.unwrap();
        let saved = session.save(&path).await.unwrap();
        assert_eq!(saved.nodes[1].status, NodeStatus::Error);
        assert!(matches!(
            sink.events().last(),
            Some(WorkflowEvent::WorkflowSaved { node_count: 4 })
        ));

        let (mut restored, _) = new_session(ScriptedOutcomes::always_succeed());
        restored.open(&path).await.unwrap();
        let store = restored.store().read().await;
        assert_eq!(store.stats().total_nodes, 4);
        assert_eq!(store.stats().total_connections, 3);
        assert!(store.nodes().iter().all(|n| n.status == NodeStatus::Idle));
    }
}

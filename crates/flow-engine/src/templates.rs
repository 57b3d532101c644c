//! Template catalog
//!
//! Templates are immutable blueprints. Their nodes are addressed by local
//! keys; materializing a template mints fresh node and connection ids so a
//! template can be loaded any number of times without collisions.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::catalog::ALL_CATEGORIES;
use crate::constants::ports::{INPUT, OUTPUT};
use crate::error::{Result, WorkflowError};
use crate::registry::describe_kind;
use crate::store::{new_connection_id, new_node_id, GraphStore};
use crate::types::{
    Connection, NodeKind, NodeStatus, PortName, Position, WorkflowGraph, WorkflowNode,
};

/// How demanding a template is to adopt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Complexity {
    Beginner,
    Intermediate,
    Advanced,
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Complexity::Beginner => "Beginner",
            Complexity::Intermediate => "Intermediate",
            Complexity::Advanced => "Advanced",
        };
        f.write_str(label)
    }
}

/// A node in a template, addressed by a key local to the template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateNode {
    pub key: String,
    pub kind: NodeKind,
    pub name: String,
    pub description: String,
    pub position: Position,
}

/// A connection between two template node keys
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateConnection {
    pub source: String,
    pub source_handle: PortName,
    pub target: String,
    pub target_handle: PortName,
}

/// A named, pre-built workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub complexity: Complexity,
    /// Human-readable setup time, e.g. `"5-10 min"`
    pub estimated_time: String,
    pub usage_count: u32,
    pub rating: f32,
    pub nodes: Vec<TemplateNode>,
    pub connections: Vec<TemplateConnection>,
}

impl Template {
    /// Build a graph from the blueprint with freshly minted ids
    pub fn instantiate(&self) -> Result<WorkflowGraph> {
        let mut ids = HashMap::with_capacity(self.nodes.len());
        let mut graph = WorkflowGraph::new();

        for blueprint in &self.nodes {
            let descriptor = describe_kind(blueprint.kind);
            let id = new_node_id();
            ids.insert(blueprint.key.as_str(), id.clone());
            graph.nodes.push(WorkflowNode {
                id,
                kind: blueprint.kind,
                name: blueprint.name.clone(),
                description: blueprint.description.clone(),
                icon: descriptor.icon.to_string(),
                position: blueprint.position,
                data: serde_json::json!({}),
                inputs: descriptor.inputs,
                outputs: descriptor.outputs,
                status: NodeStatus::Idle,
                execution_time_ms: None,
            });
        }

        for blueprint in &self.connections {
            let id = new_connection_id();
            let resolve = |key: &str| {
                ids.get(key)
                    .cloned()
                    .ok_or_else(|| WorkflowError::DanglingConnection {
                        connection_id: id.clone(),
                        node_id: key.to_string(),
                    })
            };
            let source = resolve(&blueprint.source)?;
            let target = resolve(&blueprint.target)?;
            graph.connections.push(Connection {
                id,
                source,
                source_handle: blueprint.source_handle.clone(),
                target,
                target_handle: blueprint.target_handle.clone(),
            });
        }

        Ok(graph)
    }
}

/// Fluent builder for templates
///
/// # Example
///
/// ```ignore
/// let template = TemplateBuilder::new("4", "Echo")
///     .add_node("in", NodeKind::Trigger, "Webhook Trigger", (100.0, 100.0))
///     .add_node("out", NodeKind::Output, "Send Result", (350.0, 100.0))
///     .connect("in", "out")
///     .build();
/// ```
pub struct TemplateBuilder {
    template: Template,
}

impl TemplateBuilder {
    /// Create a new template builder
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            template: Template {
                id: id.into(),
                name: name.into(),
                description: String::new(),
                category: String::new(),
                complexity: Complexity::Beginner,
                estimated_time: String::new(),
                usage_count: 0,
                rating: 0.0,
                nodes: Vec::new(),
                connections: Vec::new(),
            },
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.template.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.template.category = category.into();
        self
    }

    pub fn with_complexity(mut self, complexity: Complexity) -> Self {
        self.template.complexity = complexity;
        self
    }

    pub fn with_estimated_time(mut self, estimated_time: impl Into<String>) -> Self {
        self.template.estimated_time = estimated_time.into();
        self
    }

    /// Set usage count and rating
    pub fn with_popularity(mut self, usage_count: u32, rating: f32) -> Self {
        self.template.usage_count = usage_count;
        self.template.rating = rating;
        self
    }

    /// Add a node with the default description for its kind
    pub fn add_node(
        mut self,
        key: impl Into<String>,
        kind: NodeKind,
        name: impl Into<String>,
        position: (f64, f64),
    ) -> Self {
        self.template.nodes.push(TemplateNode {
            key: key.into(),
            kind,
            name: name.into(),
            description: describe_kind(kind).default_description,
            position: position.into(),
        });
        self
    }

    /// Set the description of the most recently added node
    ///
    /// Must be called immediately after `add_node`.
    pub fn with_node_description(mut self, description: impl Into<String>) -> Self {
        if let Some(node) = self.template.nodes.last_mut() {
            node.description = description.into();
        }
        self
    }

    /// Connect `source`'s output port to `target`'s input port
    pub fn connect(self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.connect_ports(source, OUTPUT, target, INPUT)
    }

    /// Connect explicit ports
    pub fn connect_ports(
        mut self,
        source: impl Into<String>,
        source_port: impl Into<String>,
        target: impl Into<String>,
        target_port: impl Into<String>,
    ) -> Self {
        self.template.connections.push(TemplateConnection {
            source: source.into(),
            source_handle: source_port.into(),
            target: target.into(),
            target_handle: target_port.into(),
        });
        self
    }

    /// Build the template without validation
    ///
    /// Unknown keys and undeclared ports surface when the template is
    /// materialized.
    pub fn build(self) -> Template {
        self.template
    }
}

/// The set of templates offered to the user
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: Vec<Template>,
}

impl TemplateCatalog {
    pub fn new(templates: Vec<Template>) -> Self {
        Self { templates }
    }

    /// The templates shipped with the builder
    pub fn builtin() -> Self {
        Self::new(vec![
            content_creation_pipeline(),
            data_analysis_workflow(),
            customer_support_automation(),
        ])
    }

    pub fn list(&self) -> &[Template] {
        &self.templates
    }

    pub fn get(&self, id: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Templates in `category`; `"All"` matches every template
    pub fn by_category(&self, category: &str) -> Vec<&Template> {
        self.templates
            .iter()
            .filter(|t| category == ALL_CATEGORIES || t.category == category)
            .collect()
    }

    /// Replace the store's graph with a fresh copy of template `id`
    ///
    /// Fails with `TemplateNotFound` for an unknown id and `RunInProgress`
    /// while a run is active. The previous run record is discarded.
    pub fn materialize(&self, id: &str, store: &mut GraphStore) -> Result<&Template> {
        let template = self
            .get(id)
            .ok_or_else(|| WorkflowError::TemplateNotFound(id.to_string()))?;
        store.replace(template.instantiate()?)?;
        log::info!(
            "Loaded template '{}' ({} nodes, {} connections)",
            template.name,
            template.nodes.len(),
            template.connections.len()
        );
        Ok(template)
    }
}

fn content_creation_pipeline() -> Template {
    TemplateBuilder::new("1", "Content Creation Pipeline")
        .with_description("Generate blog posts, create images, and publish to social media")
        .with_category("Content Creation")
        .with_complexity(Complexity::Intermediate)
        .with_estimated_time("5-10 min")
        .with_popularity(1247, 4.8)
        .add_node("schedule", NodeKind::Trigger, "Content Schedule", (100.0, 200.0))
        .with_node_description("Starts the pipeline on a publishing schedule")
        .add_node("draft", NodeKind::Action, "Generate Blog Post", (350.0, 200.0))
        .with_node_description("Drafts a post from the topic brief")
        .add_node("images", NodeKind::Action, "Create Images", (600.0, 200.0))
        .with_node_description("Renders header and social images for the post")
        .add_node("publish", NodeKind::Output, "Publish to Social Media", (850.0, 200.0))
        .with_node_description("Posts the article and images to connected accounts")
        .connect("schedule", "draft")
        .connect("draft", "images")
        .connect("images", "publish")
        .build()
}

fn data_analysis_workflow() -> Template {
    TemplateBuilder::new("2", "Data Analysis Workflow")
        .with_description("Process data, generate insights, and create visualizations")
        .with_category("Data Processing")
        .with_complexity(Complexity::Advanced)
        .with_estimated_time("15-20 min")
        .with_popularity(892, 4.6)
        .add_node("upload", NodeKind::Trigger, "Data Upload", (100.0, 200.0))
        .with_node_description("Fires when a new dataset arrives")
        .add_node("clean", NodeKind::Action, "Process Data", (350.0, 200.0))
        .with_node_description("Normalizes and cleans the raw rows")
        .add_node("quality", NodeKind::Condition, "Quality Check", (600.0, 200.0))
        .with_node_description("Routes the dataset on its completeness score")
        .add_node("insights", NodeKind::Action, "Generate Insights", (850.0, 100.0))
        .with_node_description("Summarizes trends and outliers")
        .add_node("charts", NodeKind::Output, "Create Visualizations", (1100.0, 100.0))
        .with_node_description("Publishes charts to the dashboard")
        .add_node("review", NodeKind::Output, "Flag for Review", (850.0, 300.0))
        .with_node_description("Sends incomplete datasets to an analyst")
        .connect("upload", "clean")
        .connect("clean", "quality")
        .connect("quality", "insights")
        .connect("insights", "charts")
        .connect("quality", "review")
        .build()
}

fn customer_support_automation() -> Template {
    TemplateBuilder::new("3", "Customer Support Automation")
        .with_description("Automate customer inquiries and generate responses")
        .with_category("Communication")
        .with_complexity(Complexity::Beginner)
        .with_estimated_time("2-5 min")
        .with_popularity(2156, 4.9)
        .add_node("inquiry", NodeKind::Trigger, "Webhook Trigger", (100.0, 200.0))
        .with_node_description("Receives an inquiry from the support inbox")
        .add_node("respond", NodeKind::Action, "Process Data", (350.0, 200.0))
        .with_node_description("Drafts a reply from the knowledge base")
        .add_node("reply", NodeKind::Output, "Send Result", (600.0, 200.0))
        .with_node_description("Sends the reply to the customer")
        .connect("inquiry", "respond")
        .connect("respond", "reply")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_catalog() {
        let catalog = TemplateCatalog::builtin();
        let names: Vec<_> = catalog.list().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Content Creation Pipeline",
                "Data Analysis Workflow",
                "Customer Support Automation",
            ]
        );

        let support = catalog.get("3").unwrap();
        assert_eq!(support.complexity, Complexity::Beginner);
        assert_eq!(support.usage_count, 2156);
        assert_eq!(support.estimated_time, "2-5 min");
    }

    #[test]
    fn test_builtin_templates_instantiate() {
        for template in TemplateCatalog::builtin().list() {
            let graph = template.instantiate().unwrap();
            crate::store::validate_graph(&graph).unwrap();
            assert_eq!(graph.nodes.len(), template.nodes.len());
            assert_eq!(graph.connections.len(), template.connections.len());
        }
    }

    #[test]
    fn test_by_category() {
        let catalog = TemplateCatalog::builtin();
        assert_eq!(catalog.by_category("All").len(), 3);
        let data = catalog.by_category("Data Processing");
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].id, "2");
        assert!(catalog.by_category("Analytics").is_empty());
    }

    #[test]
    fn test_materialize_replaces_graph() {
        let mut store = GraphStore::new();
        let stray = store.add_node(NodeKind::Condition, Position::default(), None);

        let catalog = TemplateCatalog::builtin();
        let template = catalog.materialize("2", &mut store).unwrap();
        assert_eq!(template.name, "Data Analysis Workflow");

        let stats = store.stats();
        assert_eq!(stats.total_nodes, 6);
        assert_eq!(stats.total_connections, 5);
        assert!(store.node(&stray).is_none());
        assert!(store.nodes().iter().all(|n| n.status == NodeStatus::Idle));
    }

    #[test]
    fn test_materialize_mints_fresh_ids() {
        let catalog = TemplateCatalog::builtin();
        let mut store = GraphStore::new();

        catalog.materialize("1", &mut store).unwrap();
        let first: HashSet<_> = store.nodes().iter().map(|n| n.id.clone()).collect();
        catalog.materialize("1", &mut store).unwrap();
        let second: HashSet<_> = store.nodes().iter().map(|n| n.id.clone()).collect();

        assert_eq!(first.len(), 4);
        assert!(first.is_disjoint(&second));
        assert!(store.nodes().iter().all(|n| n.id.starts_with("node-")));
        assert!(store.connections().iter().all(|c| c.id.starts_with("conn-")));
    }

    #[test]
    fn test_materialize_unknown_template() {
        let mut store = GraphStore::new();
        let kept = store.add_node(NodeKind::Action, Position::default(), None);
        let err = TemplateCatalog::builtin()
            .materialize("missing", &mut store)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::TemplateNotFound(_)));
        assert!(err.is_not_found());
        assert!(store.node(&kept).is_some());
    }

    #[test]
    fn test_unknown_key_in_builder() {
        let template = TemplateBuilder::new("x", "Broken")
            .add_node("a", NodeKind::Trigger, "A", (0.0, 0.0))
            .connect("a", "ghost")
            .build();
        assert!(matches!(
            template.instantiate(),
            Err(WorkflowError::DanglingConnection { node_id, .. }) if node_id == "ghost"
        ));
    }

    #[test]
    fn test_undeclared_port_rejected_on_materialize() {
        let template = TemplateBuilder::new("x", "Backwards")
            .add_node("out", NodeKind::Output, "Out", (0.0, 0.0))
            .add_node("in", NodeKind::Trigger, "In", (100.0, 0.0))
            .connect("out", "in")
            .build();
        let mut store = GraphStore::new();
        let err = TemplateCatalog::new(vec![template])
            .materialize("x", &mut store)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidPort { .. }));
        assert!(store.graph().is_empty());
    }
}

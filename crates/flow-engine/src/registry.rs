//! Node kind registry
//!
//! Maps each [`NodeKind`] to the default shape a new node of that kind
//! gets: display name, icon tag and port lists. Every node the crate
//! constructs goes through here, which is what keeps the port
//! cardinality rule in one place:
//!
//! - triggers have no inputs
//! - outputs have no outputs
//! - everything else has exactly one of each

use serde::Serialize;

use crate::constants::ports;
use crate::error::Result;
use crate::types::{NodeKind, PortName};

/// Default shape of a node kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KindDescriptor {
    pub kind: NodeKind,
    /// Name given to new nodes that do not come from a tool
    pub default_name: String,
    /// Description given to new nodes that do not come from a tool
    pub default_description: String,
    pub icon: &'static str,
    pub inputs: Vec<PortName>,
    pub outputs: Vec<PortName>,
}

/// Describe a node kind
pub fn describe_kind(kind: NodeKind) -> KindDescriptor {
    KindDescriptor {
        kind,
        default_name: format!("{} Node", kind.label()),
        default_description: format!("A {} node", kind.as_str()),
        icon: icon_tag(kind),
        inputs: input_ports(kind),
        outputs: output_ports(kind),
    }
}

/// Describe a node kind given by name
///
/// Fails with `InvalidKind` for anything outside the closed set.
pub fn describe_kind_named(kind: &str) -> Result<KindDescriptor> {
    Ok(describe_kind(kind.parse()?))
}

/// Descriptors for every kind, in palette order
pub fn palette() -> Vec<KindDescriptor> {
    NodeKind::ALL.into_iter().map(describe_kind).collect()
}

/// Get the icon tag for a kind
pub fn icon_tag(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Trigger => "zap",
        NodeKind::Action => "settings",
        NodeKind::Condition => "git-branch",
        NodeKind::Output => "target",
    }
}

/// Get the input port names for a kind
pub fn input_ports(kind: NodeKind) -> Vec<PortName> {
    match kind {
        NodeKind::Trigger => vec![],
        NodeKind::Action | NodeKind::Condition | NodeKind::Output => {
            vec![ports::INPUT.to_string()]
        }
    }
}

/// Get the output port names for a kind
pub fn output_ports(kind: NodeKind) -> Vec<PortName> {
    match kind {
        NodeKind::Output => vec![],
        NodeKind::Trigger | NodeKind::Action | NodeKind::Condition => {
            vec![ports::OUTPUT.to_string()]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkflowError;

    #[test]
    fn test_port_cardinality() {
        for kind in NodeKind::ALL {
            let d = describe_kind(kind);
            let expected_inputs = if kind == NodeKind::Trigger { 0 } else { 1 };
            let expected_outputs = if kind == NodeKind::Output { 0 } else { 1 };
            assert_eq!(d.inputs.len(), expected_inputs, "{kind} inputs");
            assert_eq!(d.outputs.len(), expected_outputs, "{kind} outputs");
        }
    }

    #[test]
    fn test_default_names() {
        let d = describe_kind(NodeKind::Condition);
        assert_eq!(d.default_name, "Condition Node");
        assert_eq!(d.default_description, "A condition node");
        assert_eq!(d.icon, "git-branch");
    }

    #[test]
    fn test_describe_by_name() {
        assert_eq!(
            describe_kind_named("trigger").unwrap().kind,
            NodeKind::Trigger
        );
        assert!(matches!(
            describe_kind_named("webhook"),
            Err(WorkflowError::InvalidKind(_))
        ));
    }

    #[test]
    fn test_palette_order() {
        let kinds: Vec<_> = palette().into_iter().map(|d| d.kind).collect();
        assert_eq!(kinds, NodeKind::ALL.to_vec());
    }
}

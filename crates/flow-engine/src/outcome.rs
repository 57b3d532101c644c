//! Outcome sources
//!
//! Execution is simulated: whether a node succeeds and how long it takes
//! is decided by an [`OutcomeSource`]. The reference behavior is random
//! ([`RandomOutcomes`]); tests plug in [`ScriptedOutcomes`] instead.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ExecutionConfig;
use crate::types::WorkflowNode;

/// Simulated result of executing one node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeOutcome {
    pub success: bool,
    /// How long the node takes before its result is known
    pub duration: Duration,
}

impl NodeOutcome {
    pub fn success(duration: Duration) -> Self {
        Self {
            success: true,
            duration,
        }
    }

    pub fn failure(duration: Duration) -> Self {
        Self {
            success: false,
            duration,
        }
    }
}

/// Policy deciding how a node's simulated execution turns out
pub trait OutcomeSource: Send + Sync {
    /// Decide the outcome for `node`, which is at `index` in run order
    fn next_outcome(&self, node: &WorkflowNode, index: usize) -> NodeOutcome;
}

/// Independent random outcome per node
///
/// Succeeds with a fixed probability and draws the duration uniformly
/// from an inclusive millisecond range.
pub struct RandomOutcomes {
    rng: Mutex<StdRng>,
    success_probability: f64,
    min_duration_ms: u64,
    max_duration_ms: u64,
}

impl RandomOutcomes {
    /// Create a source seeded from the operating system
    pub fn new(config: &ExecutionConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Create a reproducible source
    pub fn seeded(config: &ExecutionConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &ExecutionConfig, rng: StdRng) -> Self {
        let min = config.min_duration_ms.min(config.max_duration_ms);
        let max = config.min_duration_ms.max(config.max_duration_ms);
        Self {
            rng: Mutex::new(rng),
            success_probability: config.success_probability.clamp(0.0, 1.0),
            min_duration_ms: min,
            max_duration_ms: max,
        }
    }
}

impl OutcomeSource for RandomOutcomes {
    fn next_outcome(&self, _node: &WorkflowNode, _index: usize) -> NodeOutcome {
        let mut rng = self.rng.lock();
        let duration_ms = rng.random_range(self.min_duration_ms..=self.max_duration_ms);
        NodeOutcome {
            success: rng.random_bool(self.success_probability),
            duration: Duration::from_millis(duration_ms),
        }
    }
}

/// Outcomes replayed from a fixed script
///
/// Once the script runs out, every node succeeds after `fallback_duration`.
pub struct ScriptedOutcomes {
    script: Mutex<VecDeque<NodeOutcome>>,
    fallback_duration: Duration,
}

impl ScriptedOutcomes {
    pub fn new(script: impl IntoIterator<Item = NodeOutcome>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback_duration: Duration::ZERO,
        }
    }

    /// Every node succeeds immediately
    pub fn always_succeed() -> Self {
        Self::new([])
    }

    /// Every node succeeds after `duration`
    pub fn always_succeed_after(duration: Duration) -> Self {
        Self::new([]).with_fallback_duration(duration)
    }

    /// Nodes before `index` succeed, the node at `index` fails
    pub fn fail_at(index: usize) -> Self {
        let script = (0..=index).map(|i| {
            if i == index {
                NodeOutcome::failure(Duration::ZERO)
            } else {
                NodeOutcome::success(Duration::ZERO)
            }
        });
        Self::new(script)
    }

    pub fn with_fallback_duration(mut self, duration: Duration) -> Self {
        self.fallback_duration = duration;
        self
    }

    /// Outcomes left in the script
    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

impl OutcomeSource for ScriptedOutcomes {
    fn next_outcome(&self, _node: &WorkflowNode, _index: usize) -> NodeOutcome {
        self.script
            .lock()
            .pop_front()
            .unwrap_or(NodeOutcome::success(self.fallback_duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::describe_kind;
    use crate::types::{NodeKind, NodeStatus, Position};

    fn node() -> WorkflowNode {
        let d = describe_kind(NodeKind::Action);
        WorkflowNode {
            id: "node-1".to_string(),
            kind: NodeKind::Action,
            name: d.default_name,
            description: d.default_description,
            icon: d.icon.to_string(),
            position: Position::default(),
            data: serde_json::Value::Null,
            inputs: d.inputs,
            outputs: d.outputs,
            status: NodeStatus::Idle,
            execution_time_ms: None,
        }
    }

    #[test]
    fn test_random_durations_in_range() {
        let config = ExecutionConfig::default();
        let source = RandomOutcomes::seeded(&config, 7);
        let node = node();
        for i in 0..200 {
            let outcome = source.next_outcome(&node, i);
            let ms = outcome.duration.as_millis() as u64;
            assert!((config.min_duration_ms..=config.max_duration_ms).contains(&ms));
        }
    }

    #[test]
    fn test_random_probability_extremes() {
        let node = node();
        let always = ExecutionConfig {
            success_probability: 1.0,
            ..ExecutionConfig::default()
        };
        let never = ExecutionConfig {
            success_probability: 0.0,
            ..ExecutionConfig::default()
        };
        let a = RandomOutcomes::seeded(&always, 1);
        let n = RandomOutcomes::seeded(&never, 1);
        for i in 0..50 {
            assert!(a.next_outcome(&node, i).success);
            assert!(!n.next_outcome(&node, i).success);
        }
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let config = ExecutionConfig::default();
        let node = node();
        let a = RandomOutcomes::seeded(&config, 42);
        let b = RandomOutcomes::seeded(&config, 42);
        for i in 0..20 {
            assert_eq!(a.next_outcome(&node, i), b.next_outcome(&node, i));
        }
    }

    #[test]
    fn test_scripted_then_fallback() {
        let node = node();
        let source = ScriptedOutcomes::fail_at(1).with_fallback_duration(Duration::from_millis(5));
        assert!(source.next_outcome(&node, 0).success);
        assert!(!source.next_outcome(&node, 1).success);
        assert_eq!(source.remaining(), 0);
        assert_eq!(
            source.next_outcome(&node, 2),
            NodeOutcome::success(Duration::from_millis(5))
        );
    }
}

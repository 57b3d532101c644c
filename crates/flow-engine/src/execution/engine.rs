//! Sequential workflow executor.
//!
//! Runs the nodes of the shared graph store one at a time, in insertion
//! order. Connections are not consulted: this is a linear pipeline, not a
//! dependency scheduler. The first failing node ends the run.

use std::sync::Arc;

use tokio::task::JoinHandle;
use uuid::Uuid;

use super::run::{LogEntry, RunMetrics, RunState, RunSummary};
use crate::config::ExecutionConfig;
use crate::constants::execution::FAILURE_PENALTY;
use crate::error::Result;
use crate::events::{EventSink, WorkflowEvent};
use crate::outcome::OutcomeSource;
use crate::store::{GraphStore, SharedGraphStore};
use crate::types::NodeStatus;

/// Executor for the workflow held by a [`SharedGraphStore`].
///
/// Status changes are written to the store under its write lock at the
/// moment they happen, and announced on the event sink right after.
///
/// Stopping is cooperative. The run task checks that it is still the
/// active run before starting each node and again after each node's
/// simulated delay; a node's delay is never cut short.
#[derive(Clone)]
pub struct ExecutionEngine {
    store: SharedGraphStore,
    outcomes: Arc<dyn OutcomeSource>,
    event_sink: Arc<dyn EventSink>,
    failure_penalty: f64,
}

impl ExecutionEngine {
    /// Create a new execution engine.
    pub fn new(
        store: SharedGraphStore,
        outcomes: Arc<dyn OutcomeSource>,
        event_sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            store,
            outcomes,
            event_sink,
            failure_penalty: FAILURE_PENALTY,
        }
    }

    /// Apply execution settings from configuration.
    pub fn with_config(mut self, config: &ExecutionConfig) -> Self {
        self.failure_penalty = config.failure_penalty;
        self
    }

    /// Set the success-rate points lost per failed node.
    pub fn with_failure_penalty(mut self, failure_penalty: f64) -> Self {
        self.failure_penalty = failure_penalty;
        self
    }

    /// Replace the outcome source.
    pub fn with_outcomes(mut self, outcomes: Arc<dyn OutcomeSource>) -> Self {
        self.outcomes = outcomes;
        self
    }

    pub fn store(&self) -> &SharedGraphStore {
        &self.store
    }

    /// Run the workflow to completion, first failure, or stop.
    ///
    /// Fails with `EmptyGraph` when there is nothing to run and
    /// `RunInProgress` when another run is active. A failing node is not
    /// an error: the returned summary has state `Failed`.
    pub async fn run(&self) -> Result<RunSummary> {
        let execution_id = format!("run-{}", Uuid::new_v4());
        let order = {
            let mut store = self.store.write().await;
            store.begin_run(&execution_id)?
        };
        let total = order.len();

        log::info!("Starting run '{}' over {} node(s)", execution_id, total);
        self.emit(WorkflowEvent::RunStarted {
            execution_id: execution_id.clone(),
            node_count: total,
        });

        for (index, (node_id, node_name)) in order.into_iter().enumerate() {
            let processed = index + 1;

            // Mark running
            let node = {
                let mut store = self.store.write().await;
                if !store.run().is_active(&execution_id) {
                    return Ok(stopped_summary(&store, &execution_id));
                }
                match store.graph_mut().find_node_mut(&node_id) {
                    Some(node) => {
                        node.status = NodeStatus::Running;
                        Some(node.clone())
                    }
                    None => {
                        let run = store.run_mut();
                        run.log.push(LogEntry::skipped(&node_id, &node_name));
                        run.metrics.record_skip(processed, total);
                        None
                    }
                }
            };
            let Some(node) = node else {
                log::warn!("Node '{}' was removed before it ran, skipping", node_id);
                self.emit(WorkflowEvent::NodeSkipped {
                    execution_id: execution_id.clone(),
                    node_id,
                    name: node_name,
                });
                continue;
            };
            log::debug!("Node '{}' running", node.id);
            self.emit_status(&execution_id, &node.id, NodeStatus::Running);

            let outcome = self.outcomes.next_outcome(&node, index);
            tokio::time::sleep(outcome.duration).await;

            // Record the outcome
            let duration_ms = u64::try_from(outcome.duration.as_millis()).unwrap_or(u64::MAX);
            let status = if outcome.success {
                NodeStatus::Completed
            } else {
                NodeStatus::Error
            };
            let (metrics, failed) = {
                let mut store = self.store.write().await;
                if !store.run().is_active(&execution_id) {
                    return Ok(stopped_summary(&store, &execution_id));
                }
                if let Some(n) = store.graph_mut().find_node_mut(&node.id) {
                    n.status = status;
                    n.execution_time_ms = Some(duration_ms);
                }
                let run = store.run_mut();
                run.log.push(LogEntry::executed(
                    &node.id,
                    &node.name,
                    outcome.success,
                    duration_ms,
                ));
                run.metrics.record_execution(
                    outcome.success,
                    duration_ms,
                    self.failure_penalty,
                    processed,
                    total,
                );
                let metrics = run.metrics.clone();

                let failed = if outcome.success {
                    None
                } else {
                    run.failed_node = Some(node.id.clone());
                    Some(store.finish_run(RunState::Failed))
                };
                (metrics, failed)
            };

            log::debug!("Node '{}' {:?} after {}ms", node.id, status, duration_ms);
            self.emit_status(&execution_id, &node.id, status);
            self.emit_metrics(&execution_id, metrics);

            if let Some(summary) = failed {
                log::warn!("Run '{}' failed at '{}'", execution_id, node.name);
                self.emit(WorkflowEvent::RunFinished {
                    execution_id,
                    state: RunState::Failed,
                    failed_node_name: Some(node.name),
                });
                return Ok(summary);
            }
        }

        let summary = {
            let mut store = self.store.write().await;
            if !store.run().is_active(&execution_id) {
                return Ok(stopped_summary(&store, &execution_id));
            }
            store.finish_run(RunState::Completed)
        };

        log::info!(
            "Run '{}' completed: {} node(s) in {}ms",
            execution_id,
            summary.metrics.nodes_executed,
            summary.metrics.elapsed_ms
        );
        self.emit(WorkflowEvent::RunFinished {
            execution_id,
            state: RunState::Completed,
            failed_node_name: None,
        });
        Ok(summary)
    }

    /// Start a run on the current tokio runtime.
    pub fn spawn(&self) -> JoinHandle<Result<RunSummary>> {
        let engine = self.clone();
        tokio::spawn(async move { engine.run().await })
    }

    /// Stop the active run.
    ///
    /// Every node goes back to `idle`; log entries already written stay.
    /// Returns `None` when no run is active.
    pub async fn stop(&self) -> Option<RunSummary> {
        let summary = {
            let mut store = self.store.write().await;
            store.stop_run()?
        };

        log::info!("Run '{}' stopped", summary.execution_id);
        self.emit(WorkflowEvent::RunFinished {
            execution_id: summary.execution_id.clone(),
            state: RunState::Stopped,
            failed_node_name: None,
        });
        Some(summary)
    }

    fn emit(&self, event: WorkflowEvent) {
        if let Err(e) = self.event_sink.send(event) {
            log::debug!("Dropped workflow event: {}", e);
        }
    }

    fn emit_status(&self, execution_id: &str, node_id: &str, status: NodeStatus) {
        self.emit(WorkflowEvent::NodeStatusChanged {
            execution_id: execution_id.to_string(),
            node_id: node_id.to_string(),
            status,
        });
    }

    fn emit_metrics(&self, execution_id: &str, metrics: RunMetrics) {
        self.emit(WorkflowEvent::MetricsUpdated {
            execution_id: execution_id.to_string(),
            metrics,
        });
    }
}

/// Summary for a run that was stopped (or superseded) while in flight
fn stopped_summary(store: &GraphStore, execution_id: &str) -> RunSummary {
    log::debug!("Run '{}' no longer active, exiting", execution_id);
    store.find_run(execution_id).cloned().unwrap_or_else(|| RunSummary {
        execution_id: execution_id.to_string(),
        state: RunState::Stopped,
        started_at: None,
        finished_at: chrono::Utc::now(),
        log: Vec::new(),
        metrics: RunMetrics::default(),
        failed_node: None,
    })
}

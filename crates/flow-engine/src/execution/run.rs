//! Run bookkeeping: state, log entries and metrics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::execution::INITIAL_SUCCESS_RATE;
use crate::types::NodeId;

/// Global state of a run
///
/// `idle -> running -> {completed, stopped, failed}`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Completed,
    Stopped,
    Failed,
}

impl RunState {
    /// Whether the run has ended
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Stopped | RunState::Failed)
    }
}

/// Outcome recorded in a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Success,
    Error,
    /// The node was skipped
    Warning,
}

/// One line of the execution log
///
/// The node name is captured when the entry is written, so renaming the
/// node afterwards does not rewrite history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub node_id: NodeId,
    pub node_name: String,
    pub status: LogStatus,
    pub message: String,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl LogEntry {
    fn new(
        node_id: &str,
        node_name: &str,
        status: LogStatus,
        message: String,
        duration_ms: u64,
        data: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: format!("log-{}", Uuid::new_v4()),
            timestamp: Utc::now(),
            node_id: node_id.to_string(),
            node_name: node_name.to_string(),
            status,
            message,
            duration_ms,
            data,
        }
    }

    /// Entry for a node that finished executing
    pub fn executed(node_id: &str, node_name: &str, success: bool, duration_ms: u64) -> Self {
        if success {
            Self::new(
                node_id,
                node_name,
                LogStatus::Success,
                format!("{} executed successfully", node_name),
                duration_ms,
                Some(serde_json::json!({ "result": "Sample output data" })),
            )
        } else {
            Self::new(
                node_id,
                node_name,
                LogStatus::Error,
                format!("{} failed to execute", node_name),
                duration_ms,
                Some(serde_json::json!({ "error": "Sample error message" })),
            )
        }
    }

    /// Entry for a node removed from the graph before its turn
    pub fn skipped(node_id: &str, node_name: &str) -> Self {
        Self::new(
            node_id,
            node_name,
            LogStatus::Warning,
            format!("{} was removed before execution", node_name),
            0,
            None,
        )
    }
}

/// Live metrics for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetrics {
    pub nodes_executed: u32,
    /// Starts at 100 and only decreases, never below 0
    pub success_rate: f64,
    /// Sum of simulated node durations
    pub elapsed_ms: u64,
    /// Executed nodes per second of elapsed time
    pub throughput: f64,
    /// Percentage of the run order processed so far
    pub progress: f64,
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self {
            nodes_executed: 0,
            success_rate: INITIAL_SUCCESS_RATE,
            elapsed_ms: 0,
            throughput: 0.0,
            progress: 0.0,
        }
    }
}

impl RunMetrics {
    /// Account for one executed node
    pub fn record_execution(
        &mut self,
        success: bool,
        duration_ms: u64,
        failure_penalty: f64,
        processed: usize,
        total: usize,
    ) {
        self.nodes_executed += 1;
        if !success {
            self.success_rate = (self.success_rate - failure_penalty).max(0.0);
        }
        self.elapsed_ms += duration_ms;
        self.throughput = if self.elapsed_ms == 0 {
            0.0
        } else {
            self.nodes_executed as f64 / (self.elapsed_ms as f64 / 1000.0)
        };
        self.set_progress(processed, total);
    }

    /// Account for a skipped node
    pub fn record_skip(&mut self, processed: usize, total: usize) {
        self.set_progress(processed, total);
    }

    fn set_progress(&mut self, processed: usize, total: usize) {
        self.progress = if total == 0 {
            100.0
        } else {
            processed as f64 / total as f64 * 100.0
        };
    }
}

/// A run frozen after it ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub execution_id: String,
    pub state: RunState,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: DateTime<Utc>,
    pub log: Vec<LogEntry>,
    pub metrics: RunMetrics,
    /// Node that ended a failed run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_node: Option<NodeId>,
}

/// The current (or most recent) run held by the graph store
#[derive(Debug, Clone, Default)]
pub struct RunRecord {
    pub execution_id: Option<String>,
    pub state: RunState,
    pub started_at: Option<DateTime<Utc>>,
    pub log: Vec<LogEntry>,
    pub metrics: RunMetrics,
    pub failed_node: Option<NodeId>,
}

impl RunRecord {
    /// Fresh record for a run that is starting now
    pub fn start(execution_id: impl Into<String>) -> Self {
        Self {
            execution_id: Some(execution_id.into()),
            state: RunState::Running,
            started_at: Some(Utc::now()),
            log: Vec::new(),
            metrics: RunMetrics::default(),
            failed_node: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    /// Whether `execution_id` is the run currently in progress
    pub fn is_active(&self, execution_id: &str) -> bool {
        self.is_running() && self.execution_id.as_deref() == Some(execution_id)
    }

    /// Freeze the record as it stands
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            execution_id: self.execution_id.clone().unwrap_or_default(),
            state: self.state,
            started_at: self.started_at,
            finished_at: Utc::now(),
            log: self.log.clone(),
            metrics: self.metrics.clone(),
            failed_node: self.failed_node.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rate_floor() {
        let mut m = RunMetrics::default();
        for i in 0..15 {
            m.record_execution(false, 0, 10.0, i + 1, 15);
        }
        assert_eq!(m.success_rate, 0.0);
        assert_eq!(m.nodes_executed, 15);
        assert_eq!(m.throughput, 0.0);
    }

    #[test]
    fn test_throughput_and_progress() {
        let mut m = RunMetrics::default();
        m.record_execution(true, 1000, 10.0, 1, 4);
        m.record_execution(true, 1000, 10.0, 2, 4);
        assert_eq!(m.success_rate, 100.0);
        assert_eq!(m.elapsed_ms, 2000);
        assert_eq!(m.throughput, 1.0);
        assert_eq!(m.progress, 50.0);

        m.record_skip(3, 4);
        assert_eq!(m.nodes_executed, 2);
        assert_eq!(m.progress, 75.0);
    }

    #[test]
    fn test_log_messages() {
        let ok = LogEntry::executed("n1", "Fetch", true, 12);
        assert_eq!(ok.status, LogStatus::Success);
        assert_eq!(ok.message, "Fetch executed successfully");
        assert_eq!(ok.data.unwrap()["result"], "Sample output data");

        let bad = LogEntry::executed("n1", "Fetch", false, 12);
        assert_eq!(bad.status, LogStatus::Error);
        assert_eq!(bad.message, "Fetch failed to execute");

        let skipped = LogEntry::skipped("n2", "Gone");
        assert_eq!(skipped.status, LogStatus::Warning);
        assert!(skipped.data.is_none());
    }

    #[test]
    fn test_record_activity() {
        let record = RunRecord::start("run-1");
        assert!(record.is_active("run-1"));
        assert!(!record.is_active("run-2"));
        assert!(!RunRecord::default().is_running());
        assert!(RunState::Stopped.is_terminal());
        assert!(!RunState::Running.is_terminal());
    }
}

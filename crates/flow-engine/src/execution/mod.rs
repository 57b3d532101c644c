//! Workflow execution
//!
//! [`ExecutionEngine`] drives a run over the shared graph store; the
//! bookkeeping types it writes (log entries, metrics, summaries) live in
//! [`run`].

mod engine;
pub mod run;

pub use engine::ExecutionEngine;
pub use run::{LogEntry, LogStatus, RunMetrics, RunRecord, RunState, RunSummary};

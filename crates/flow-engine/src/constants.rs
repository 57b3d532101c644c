//! Engine-wide constants
//!
//! Single source of truth for the reference numbers the builder uses.

/// Port names shared by every node kind that has ports
pub mod ports {
    /// The single input port of action, condition and output nodes
    pub const INPUT: &str = "input";
    /// The single output port of trigger, action and condition nodes
    pub const OUTPUT: &str = "output";
}

/// Simulated execution defaults
pub mod execution {
    /// Probability that a node succeeds in the reference outcome source
    pub const SUCCESS_PROBABILITY: f64 = 0.9;
    /// Lower bound of the simulated node duration
    pub const MIN_DURATION_MS: u64 = 1000;
    /// Upper bound of the simulated node duration
    pub const MAX_DURATION_MS: u64 = 3000;
    /// Success rate a run starts with
    pub const INITIAL_SUCCESS_RATE: f64 = 100.0;
    /// Points removed from the success rate per failed node
    pub const FAILURE_PENALTY: f64 = 10.0;
    /// Finished runs kept as history
    pub const MAX_HISTORY: usize = 20;
}

/// Workflow statistics formula
pub mod stats {
    /// Estimated seconds contributed by each node
    pub const SECONDS_PER_NODE: u64 = 2;
    /// Lower bound of the estimated time
    pub const MIN_ESTIMATED_SECS: u64 = 1;
    /// Efficiency points lost per connection
    pub const EFFICIENCY_PENALTY_PER_CONNECTION: u32 = 5;
    /// Efficiency ceiling
    pub const MAX_EFFICIENCY: u32 = 100;
}

/// Canvas viewport bounds
pub mod canvas {
    pub const MIN_ZOOM: f64 = 0.5;
    pub const MAX_ZOOM: f64 = 2.0;
    pub const ZOOM_STEP: f64 = 0.1;
    /// Where nodes added from the palette land
    pub const DEFAULT_DROP: (f64, f64) = (200.0, 200.0);
}

/// Tool catalog browsing
pub mod catalog {
    /// Category value that matches every tool
    pub const ALL_CATEGORIES: &str = "All";
    /// Maximum tools returned by a filtered listing
    pub const MAX_RESULTS: usize = 10;
    /// Categories offered by the tool browser
    pub const CATEGORIES: &[&str] = &[
        ALL_CATEGORIES,
        "Content Creation",
        "Data Processing",
        "Communication",
        "Analytics",
        "Automation",
    ];
}

/// Export document format
pub mod export {
    /// Current workflow document schema version
    pub const SCHEMA_VERSION: u32 = 1;
}

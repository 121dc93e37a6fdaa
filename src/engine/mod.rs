//! Computation and orchestration engine
//!
//! Date windows, resilient remote-call executors and the grouping/metric
//! arithmetic every insight report is built from.

pub mod aggregator;
pub mod grouping;
pub mod metrics;
pub mod retry;
pub mod sequencer;
pub mod windows;

// Re-export commonly used items
pub use aggregator::{SourceFailure, SourceOutcome, settle};
pub use grouping::{Groups, RowKey, group_by};
pub use metrics::{
    CannibalizationAction, Metrics, classify_cannibalization_action, drop_percentage,
    expected_ctr, percentage_change, pick_winner, position_variance, round_to,
};
pub use retry::{RetryPolicy, retry};
pub use sequencer::{BatchEntry, OperationDescriptor, QuotaSpacing, RateLimitedSequencer};
pub use windows::{DateWindows, WindowSpec};

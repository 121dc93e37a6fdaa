//! Core types and foundational components
//!
//! This module contains the fundamental data types, error handling,
//! and constants used throughout the application.

pub mod constants;
pub mod error;
pub mod types;

// Re-export commonly used items for convenience
pub use error::{ErrorClass, RemoteError, Result, SerpwatchError};
pub use types::{
    ComparisonWindowPair, DateRange, Dimension, DimensionFilter, FieldExperience,
    FilterOperator, InspectionResult, MetricRow, Percent, PerformanceAudit, RowQuery, SearchType,
};

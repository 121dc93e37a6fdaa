//! serpwatch: search performance insights
//!
//! Derived reports over a search analytics API: period comparisons, content
//! decay, keyword cannibalization, quick wins, CTR gaps, SERP feature trends,
//! drop alerts and page/indexing health.

pub mod client;
pub mod config;
pub mod core;
pub mod engine;
pub mod insights;
pub mod logging;
pub mod ui;

// Re-export commonly used items
pub use client::{HttpPageSignals, HttpSearchConsole, PageSignals, SearchAnalytics};
pub use config::{CliConfig, Config};
pub use crate::core::constants;
pub use crate::core::{ErrorClass, RemoteError, Result, SerpwatchError};
pub use engine::{DateWindows, RetryPolicy, SourceOutcome};
pub use insights::Insights;

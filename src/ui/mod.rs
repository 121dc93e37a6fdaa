//! User interface and interaction
//!
//! CLI parsing, report rendering and progress reporting.

pub mod cli;
pub mod color;
pub mod output;
pub mod progress;

// Re-export commonly used items
pub use cli::{Cli, Commands, DimensionArg, WindowArgs, cli_to_config};
pub use output::{Tabular, display_report, render};
pub use progress::ProgressReporter;

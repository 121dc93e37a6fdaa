// Command-line interface definitions and parsing for serpwatch

use crate::config::CliConfig;
use crate::core::constants::{defaults, output_formats, thresholds};
use crate::core::types::Dimension;
use crate::engine::WindowSpec;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    // Core Options
    /// Property to report on, e.g. sc-domain:example.com
    #[arg(short = 's', long, global = true, value_name = "SITE", help_heading = "Core Options")]
    pub site: Option<String>,

    /// Request timeout in seconds (default: 30)
    #[arg(
        short = 't',
        long,
        global = true,
        value_name = "SECONDS",
        help_heading = "Core Options"
    )]
    pub timeout: Option<u64>,

    /// Rows requested per analytics query (default: 5000)
    #[arg(long, global = true, value_name = "COUNT", help_heading = "Core Options")]
    pub row_limit: Option<u32>,

    /// Query patterns to leave out of keyword reports (regex)
    #[arg(long, global = true, value_name = "REGEX", help_heading = "Core Options")]
    pub exclude_query: Vec<String>,

    // Retry & Rate Limiting
    /// Total attempts per remote call (default: 3)
    #[arg(long, global = true, value_name = "COUNT", help_heading = "Retry & Rate Limiting")]
    pub retry: Option<u32>,

    /// Base backoff delay in ms (default: 500)
    #[arg(long, global = true, value_name = "MS", help_heading = "Retry & Rate Limiting")]
    pub retry_delay: Option<u64>,

    /// Delay between URL inspections in ms (default: 1000)
    #[arg(long, global = true, value_name = "MS", help_heading = "Retry & Rate Limiting")]
    pub quota_spacing: Option<u64>,

    // Output & Verbosity
    /// Suppress progress output
    #[arg(short = 'q', long, global = true, help_heading = "Output & Verbosity")]
    pub quiet: bool,

    /// Enable verbose logging
    #[arg(short = 'v', long, global = true, help_heading = "Output & Verbosity")]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, value_name = "FORMAT", value_parser = output_formats::ALL, help_heading = "Output & Verbosity")]
    pub format: Option<String>,

    /// Disable progress bars
    #[arg(long, global = true, help_heading = "Output & Verbosity")]
    pub no_progress: bool,

    // Configuration
    /// Use specific config file
    #[arg(long, global = true, value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Ignore config files
    #[arg(long, global = true, help_heading = "Configuration")]
    pub no_config: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Compare a window with the equal-length period before it
    Compare {
        #[command(flatten)]
        window: WindowArgs,
        /// Dimensions to break the comparison down by
        #[arg(long = "dimension", value_enum, default_values_t = [DimensionArg::Page])]
        dimensions: Vec<DimensionArg>,
    },
    /// Pages losing clicks over the second half of the lookback
    Decay {
        #[arg(long, default_value_t = defaults::DECAY_LOOKBACK_DAYS)]
        lookback: u32,
        #[arg(long, default_value_t = thresholds::DECAY_MIN_CLICKS)]
        min_clicks: u64,
    },
    /// Queries with several pages competing for them
    Cannibalization {
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long, default_value_t = thresholds::CANNIBALIZATION_MIN_IMPRESSIONS)]
        min_impressions: u64,
        /// Recommend a winner and an action for every other page
        #[arg(long)]
        resolve: bool,
    },
    /// Queries gained and lost between two periods
    Keywords {
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long, default_value_t = thresholds::KEYWORD_MIN_IMPRESSIONS)]
        min_impressions: u64,
    },
    /// High-impression rows with a weak CTR at a reachable position
    #[command(name = "quick-wins")]
    QuickWins {
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long, default_value_t = thresholds::QUICK_WIN_MIN_IMPRESSIONS)]
        min_impressions: u64,
        #[arg(long, default_value_t = thresholds::QUICK_WIN_TARGET_CTR)]
        target_ctr: f64,
    },
    /// Query CTR against position benchmarks
    Ctr {
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long, default_value_t = thresholds::CTR_MIN_IMPRESSIONS)]
        min_impressions: u64,
    },
    /// Totals per search type (web, image, video, ...)
    #[command(name = "search-types")]
    SearchTypes {
        #[command(flatten)]
        window: WindowArgs,
    },
    /// SERP feature trends across rolling windows
    #[command(name = "serp-features")]
    SerpFeatures {
        #[arg(long, default_value_t = defaults::LOOKBACK_DAYS)]
        total_days: u32,
        #[arg(long, default_value_t = defaults::TREND_WINDOW_DAYS)]
        window_days: u32,
        /// Days between window starts (default: the window length)
        #[arg(long)]
        step: Option<u32>,
    },
    /// Pages whose clicks dropped by at least the threshold
    Alerts {
        #[arg(long, default_value_t = defaults::TREND_WINDOW_DAYS)]
        days: u32,
        /// Minimum drop in percent
        #[arg(long, default_value_t = thresholds::ALERT_DROP_PERCENT)]
        threshold: f64,
        #[arg(long, default_value_t = thresholds::ALERT_MIN_CLICKS)]
        min_clicks: u64,
    },
    /// Inspection, traffic and performance of a single page
    #[command(name = "page-health")]
    PageHealth {
        /// Page URL
        url: String,
    },
    /// Inspect many URLs and summarize their index status
    #[command(name = "indexing-health")]
    IndexingHealth {
        /// URLs to inspect
        urls: Vec<String>,
        /// File with one URL per line
        #[arg(long, value_name = "FILE")]
        urls_file: Option<String>,
    },
}

/// Reporting window: the last N days, or an explicit pair of dates
#[derive(Args, Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowArgs {
    /// Days ending yesterday
    #[arg(long, default_value_t = defaults::LOOKBACK_DAYS)]
    pub days: u32,

    /// First day of an explicit window (requires --end-date)
    #[arg(long, value_name = "YYYY-MM-DD", requires = "end_date", conflicts_with = "days")]
    pub start_date: Option<NaiveDate>,

    /// Last day of an explicit window (requires --start-date)
    #[arg(long, value_name = "YYYY-MM-DD", requires = "start_date", conflicts_with = "days")]
    pub end_date: Option<NaiveDate>,
}

impl WindowArgs {
    pub fn spec(&self) -> WindowSpec {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => WindowSpec::explicit(start, end),
            _ => WindowSpec::days(self.days),
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionArg {
    Query,
    Page,
    Device,
    Country,
    Date,
}

impl From<DimensionArg> for Dimension {
    fn from(arg: DimensionArg) -> Self {
        match arg {
            DimensionArg::Query => Dimension::Query,
            DimensionArg::Page => Dimension::Page,
            DimensionArg::Device => Dimension::Device,
            DimensionArg::Country => Dimension::Country,
            DimensionArg::Date => Dimension::Date,
        }
    }
}

/// Convert derive-based CLI to CliConfig
pub fn cli_to_config(cli: &Cli) -> CliConfig {
    let mut cli_config = CliConfig {
        site: cli.site.clone(),
        timeout: cli.timeout,
        retry_attempts: cli.retry,
        retry_base_delay: cli.retry_delay,
        quota_spacing: cli.quota_spacing,
        row_limit: cli.row_limit,
        ..Default::default()
    };

    if !cli.exclude_query.is_empty() {
        cli_config.exclude_queries = Some(cli.exclude_query.clone());
    }

    // Output & verbosity
    cli_config.quiet = cli.quiet;
    cli_config.verbose = cli.verbose;
    cli_config.output_format = cli.format.clone();
    cli_config.no_progress = cli.no_progress;

    // Configuration
    cli_config.config_file = cli.config.clone();
    cli_config.no_config = cli.no_config;

    cli_config
}

//! Application-wide constants to avoid magic values throughout the codebase.
//!
//! This module centralizes the benchmark tables, default thresholds and other
//! literal values used across the insight engine.

/// Output format constants
pub mod output_formats {
    /// Text output format - aligned table for terminals
    pub const TEXT: &str = "text";
    /// JSON output format - structured output for automation
    pub const JSON: &str = "json";

    /// Default output format
    pub const DEFAULT: &str = TEXT;

    /// All valid output formats
    pub const ALL: [&str; 2] = [TEXT, JSON];
}

/// Remote endpoint defaults
pub mod endpoints {
    /// Search analytics and URL inspection API root
    pub const API_BASE_URL: &str = "https://searchconsole.googleapis.com";
    /// Lab performance audit endpoint
    pub const PAGESPEED_URL: &str =
        "https://www.googleapis.com/pagespeedonline/v5/runPagespeed";
    /// Field experience (CrUX) endpoint
    pub const CRUX_URL: &str =
        "https://chromeuxreport.googleapis.com/v1/records:queryRecord";
    /// Environment variable consulted when no access token is configured
    pub const ACCESS_TOKEN_ENV: &str = "SERPWATCH_ACCESS_TOKEN";
}

/// Timeout and duration constants
pub mod timeouts {
    /// Default request timeout in seconds
    pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
    /// Default base delay for exponential backoff in milliseconds
    pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;
    /// Upper bound for a single backoff delay in milliseconds
    pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 8_000;
    /// Maximum random jitter added to each backoff delay in milliseconds
    pub const DEFAULT_RETRY_JITTER_MS: u64 = 250;
    /// Minimum spacing between sequential URL inspections in milliseconds
    pub const DEFAULT_QUOTA_SPACING_MS: u64 = 1_000;
}

/// Default configuration values
pub mod defaults {
    /// Total attempts (first call included) for a remote operation
    pub const RETRY_ATTEMPTS: u32 = 3;
    /// Rows requested per analytics query
    pub const ROW_LIMIT: u32 = 5_000;
    /// Largest row limit the remote API accepts in a single call
    pub const MAX_ROW_LIMIT: u32 = 25_000;
    /// Default lookback for single-window reports
    pub const LOOKBACK_DAYS: u32 = 28;
    /// Default lookback for content decay (split into two halves)
    pub const DECAY_LOOKBACK_DAYS: u32 = 56;
    /// Default rolling window length for SERP feature trends
    pub const TREND_WINDOW_DAYS: u32 = 7;
    /// Lookback used for the page analytics section of the health dashboard
    pub const DASHBOARD_LOOKBACK_DAYS: u32 = 28;
}

/// Default thresholds for derived insights
pub mod thresholds {
    /// Prior-period clicks a page needs before decay is reported
    pub const DECAY_MIN_CLICKS: u64 = 10;
    /// Prior-period clicks a page needs before a drop alert is considered
    pub const ALERT_MIN_CLICKS: u64 = 10;
    /// Drop percentage at or above which an alert fires
    pub const ALERT_DROP_PERCENT: f64 = 30.0;
    /// Total impressions a query must exceed to be reported as cannibalized
    pub const CANNIBALIZATION_MIN_IMPRESSIONS: u64 = 50;
    /// Impressions a new or lost keyword needs to be reported
    pub const KEYWORD_MIN_IMPRESSIONS: u64 = 10;
    /// Impressions a query needs to qualify as a quick win
    pub const QUICK_WIN_MIN_IMPRESSIONS: u64 = 100;
    /// Highest CTR (fraction) that still counts as a quick win
    pub const QUICK_WIN_MAX_CTR: f64 = 0.03;
    /// Best position considered for quick wins
    pub const QUICK_WIN_MIN_POSITION: f64 = 4.0;
    /// Worst position considered for quick wins
    pub const QUICK_WIN_MAX_POSITION: f64 = 20.0;
    /// CTR (fraction) used to estimate quick-win uplift
    pub const QUICK_WIN_TARGET_CTR: f64 = 0.05;
    /// Impressions a query needs to be included in CTR analysis
    pub const CTR_MIN_IMPRESSIONS: u64 = 50;
}

/// Cannibalization classification cut-offs
pub mod cannibalization {
    /// Loser/winner click ratio below which a redirect is considered
    pub const REDIRECT_CLICK_RATIO: f64 = 0.10;
    /// Position gap above which a low-ratio loser is redirected
    pub const REDIRECT_POSITION_GAP: f64 = 5.0;
    /// Loser/winner click ratio below which pages are consolidated
    pub const CONSOLIDATE_CLICK_RATIO: f64 = 0.30;
}

/// Organic click-through-rate benchmarks
pub mod ctr_benchmarks {
    /// Expected CTR by position 1..=10
    pub const BY_POSITION: [f64; 10] = [
        0.285, 0.157, 0.110, 0.080, 0.072, 0.051, 0.040, 0.032, 0.028, 0.025,
    ];
    /// Expected CTR for positions beyond the table
    pub const BEYOND_TABLE: f64 = 0.020;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_formats_constants() {
        assert_eq!(output_formats::TEXT, "text");
        assert_eq!(output_formats::JSON, "json");
        assert_eq!(output_formats::DEFAULT, "text");
        assert_eq!(output_formats::ALL.len(), 2);
    }

    #[test]
    fn test_ctr_benchmarks_are_declining() {
        let table = ctr_benchmarks::BY_POSITION;
        assert_eq!(table[0], 0.285);
        assert_eq!(table[9], 0.025);
        assert!(table.windows(2).all(|pair| pair[0] > pair[1]));
        assert!(ctr_benchmarks::BEYOND_TABLE < table[9]);
    }

    #[test]
    fn test_retry_defaults() {
        assert_eq!(defaults::RETRY_ATTEMPTS, 3);
        assert!(timeouts::DEFAULT_RETRY_BASE_DELAY_MS < timeouts::DEFAULT_RETRY_MAX_DELAY_MS);
    }

    #[test]
    fn test_cannibalization_cutoffs_ordered() {
        assert!(cannibalization::REDIRECT_CLICK_RATIO < cannibalization::CONSOLIDATE_CLICK_RATIO);
    }
}

//! Derived insight reports
//!
//! Every report is an async method on [`Insights`]. Single-source reports
//! fail as a whole when a remote call is unrecoverable; the page-health
//! dashboard and the indexing-health batch embed per-source errors instead.

pub mod alerts;
pub mod cannibalization;
pub mod comparison;
pub mod decay;
pub mod health;
pub mod keywords;
pub mod opportunities;
pub mod search_types;
pub mod serp_features;

#[cfg(test)]
pub(crate) mod testing;

use regex::Regex;
use std::sync::Arc;

use crate::client::{PageSignals, SearchAnalytics};
use crate::config::Config;
use crate::core::error::{Result, SerpwatchError};
use crate::core::types::{ComparisonWindowPair, MetricRow, RowQuery};
use crate::engine::{DateWindows, QuotaSpacing, RateLimitedSequencer, RetryPolicy, retry};

// Re-export commonly used items
pub use alerts::{DropAlert, DropAlertReport, DropAlertRequest};
pub use cannibalization::{
    CannibalizationReport, CannibalizationRequest, CompetingPage, GroupedQuery, LoserAction,
    Recommendation,
};
pub use comparison::{ComparisonRequest, ComparisonRow, PeriodComparison};
pub use decay::{DecayReport, DecayRequest, DecayingPage};
pub use health::{IndexingHealthReport, InspectionEntry, InspectionRequest, PageHealthDashboard};
pub use keywords::{KeywordDiff, KeywordDiffRequest, KeywordEntry};
pub use opportunities::{
    CtrAnalysis, CtrAnalysisRequest, CtrGapEntry, QuickWin, QuickWinReport, QuickWinRequest,
};
pub use search_types::{SearchTypeBreakdown, SearchTypeTotals};
pub use serp_features::{FeatureTrend, SerpFeatureRequest, SerpFeatureTrends, TrendPoint};

/// Entry point for every insight report.
pub struct Insights {
    analytics: Arc<dyn SearchAnalytics>,
    signals: Arc<dyn PageSignals>,
    policy: RetryPolicy,
    spacing: QuotaSpacing,
    windows: DateWindows,
    row_limit: u32,
    exclude_queries: Vec<Regex>,
}

impl Insights {
    pub fn new(analytics: Arc<dyn SearchAnalytics>, signals: Arc<dyn PageSignals>) -> Self {
        Self {
            analytics,
            signals,
            policy: RetryPolicy::default(),
            spacing: QuotaSpacing::default(),
            windows: DateWindows::today(),
            row_limit: crate::core::constants::defaults::ROW_LIMIT,
            exclude_queries: Vec::new(),
        }
    }

    pub fn from_config(
        config: &Config,
        analytics: Arc<dyn SearchAnalytics>,
        signals: Arc<dyn PageSignals>,
    ) -> Result<Self> {
        Ok(Self::new(analytics, signals)
            .with_policy(config.retry_policy())
            .with_spacing(config.quota_spacing())
            .with_row_limit(config.row_limit())
            .with_exclude_queries(config.compile_exclude_queries()?))
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_spacing(mut self, spacing: QuotaSpacing) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn with_windows(mut self, windows: DateWindows) -> Self {
        self.windows = windows;
        self
    }

    pub fn with_row_limit(mut self, row_limit: u32) -> Self {
        self.row_limit = row_limit;
        self
    }

    pub fn with_exclude_queries(mut self, patterns: Vec<Regex>) -> Self {
        self.exclude_queries = patterns;
        self
    }

    pub fn windows(&self) -> &DateWindows {
        &self.windows
    }

    fn sequencer(&self) -> RateLimitedSequencer {
        RateLimitedSequencer::new(self.spacing, self.policy)
    }

    /// Whether a query matches one of the configured exclusion patterns.
    fn is_excluded_query(&self, query: &str) -> bool {
        self.exclude_queries.iter().any(|re| re.is_match(query))
    }

    /// One row query through the retry executor; failures carry `operation`.
    async fn fetch(&self, site: &str, query: &RowQuery, operation: &str) -> Result<Vec<MetricRow>> {
        crate::logging::log_window(operation, "query", &query.range);
        retry(&self.policy, operation, || self.analytics.query_rows(site, query))
            .await
            .map_err(|err| SerpwatchError::remote(operation, err))
    }

    /// The same query over both periods of `pair`, issued concurrently.
    /// Returns `(period_a rows, period_b rows)`.
    async fn fetch_pair(
        &self,
        site: &str,
        query: &RowQuery,
        pair: &ComparisonWindowPair,
        insight: &str,
    ) -> Result<(Vec<MetricRow>, Vec<MetricRow>)> {
        let recent = query.for_range(pair.period_a);
        let prior = query.for_range(pair.period_b);
        let recent_op = format!("{insight} (recent period)");
        let prior_op = format!("{insight} (prior period)");

        futures::try_join!(
            self.fetch(site, &recent, &recent_op),
            self.fetch(site, &prior, &prior_op),
        )
    }
}

//! In-memory collaborators for insight tests

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::client::{PageSignals, SearchAnalytics};
use crate::core::error::RemoteError;
use crate::core::types::{FieldExperience, InspectionResult, MetricRow, PerformanceAudit, RowQuery};
use crate::engine::{DateWindows, QuotaSpacing, RetryPolicy};
use crate::insights::Insights;

type RowHandler = Box<dyn Fn(&RowQuery) -> Result<Vec<MetricRow>, RemoteError> + Send + Sync>;

/// Fixed reference date for every insight test.
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

pub fn windows() -> DateWindows {
    DateWindows::new(today())
}

pub struct FakeAnalytics {
    rows: RowHandler,
    inspections: HashMap<String, Result<InspectionResult, RemoteError>>,
    pub queries: Mutex<Vec<RowQuery>>,
    pub inspected: Mutex<Vec<String>>,
}

impl FakeAnalytics {
    pub fn new<F>(rows: F) -> Self
    where
        F: Fn(&RowQuery) -> Result<Vec<MetricRow>, RemoteError> + Send + Sync + 'static,
    {
        Self {
            rows: Box::new(rows),
            inspections: HashMap::new(),
            queries: Mutex::new(Vec::new()),
            inspected: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::new(|_| Ok(Vec::new()))
    }

    pub fn with_inspection(mut self, url: &str, result: Result<InspectionResult, RemoteError>) -> Self {
        self.inspections.insert(url.to_string(), result);
        self
    }
}

#[async_trait]
impl SearchAnalytics for FakeAnalytics {
    async fn query_rows(&self, _site: &str, query: &RowQuery) -> Result<Vec<MetricRow>, RemoteError> {
        self.queries.lock().unwrap().push(query.clone());
        (self.rows)(query)
    }

    async fn inspect_url(&self, _site: &str, url: &str) -> Result<InspectionResult, RemoteError> {
        self.inspected.lock().unwrap().push(url.to_string());
        self.inspections
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(RemoteError::fatal(format!("no inspection for {url}"))))
    }
}

pub struct FakeSignals {
    pub audit: Result<PerformanceAudit, RemoteError>,
    pub field: Result<FieldExperience, RemoteError>,
}

impl Default for FakeSignals {
    fn default() -> Self {
        Self {
            audit: Ok(PerformanceAudit {
                strategy: "mobile".to_string(),
                performance_score: Some(91.0),
                lcp_ms: Some(1800.0),
                cls: Some(0.01),
                tbt_ms: Some(90.0),
            }),
            field: Ok(FieldExperience {
                lcp_p75_ms: Some(2200.0),
                inp_p75_ms: Some(150.0),
                cls_p75: Some(0.03),
                overall_category: Some("FAST".to_string()),
            }),
        }
    }
}

#[async_trait]
impl PageSignals for FakeSignals {
    async fn performance_audit(&self, _url: &str) -> Result<PerformanceAudit, RemoteError> {
        self.audit.clone()
    }

    async fn field_experience(&self, _url: &str) -> Result<FieldExperience, RemoteError> {
        self.field.clone()
    }
}

pub fn inspection(verdict: &str, coverage_state: &str) -> InspectionResult {
    InspectionResult {
        verdict: verdict.to_string(),
        coverage_state: coverage_state.to_string(),
        indexing_state: None,
        last_crawl_time: None,
        google_canonical: None,
        user_canonical: None,
    }
}

/// Insights over the fakes, with no backoff waits and no quota spacing.
pub fn insights_with(analytics: Arc<FakeAnalytics>, signals: FakeSignals) -> Insights {
    Insights::new(analytics, Arc::new(signals))
        .with_windows(windows())
        .with_policy(RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
            jitter: Duration::ZERO,
        })
        .with_spacing(QuotaSpacing::from_millis(0))
}

pub fn insights(analytics: FakeAnalytics) -> Insights {
    insights_with(Arc::new(analytics), FakeSignals::default())
}

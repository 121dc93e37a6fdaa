//! Multi-source page health and batch indexing health

use rustc_hash::FxHashSet;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::core::constants::defaults;
use crate::core::types::{
    DateRange, Dimension, DimensionFilter, FieldExperience, InspectionResult, PerformanceAudit, RowQuery,
};
use crate::engine::{Metrics, OperationDescriptor, SourceFailure, SourceOutcome, settle};
use crate::engine::aggregator::count_ok;
use crate::insights::Insights;

/// Search traffic of a single page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageTraffic {
    pub range: DateRange,
    #[serde(flatten)]
    pub metrics: Metrics,
}

/// One field per source; a failed source carries its error in place.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageHealthDashboard {
    pub url: String,
    pub inspection: SourceOutcome<InspectionResult>,
    pub analytics: SourceOutcome<PageTraffic>,
    pub performance: SourceOutcome<PerformanceAudit>,
    pub field_experience: SourceOutcome<FieldExperience>,
    pub sources_ok: usize,
}

impl PageHealthDashboard {
    pub const SOURCES: usize = 4;
}

/// Queued URL inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectionRequest {
    pub site: String,
    pub url: String,
}

impl OperationDescriptor for InspectionRequest {
    fn describe(&self) -> String {
        format!("inspect {}", self.url)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InspectionEntry {
    pub url: String,
    pub inspection: SourceOutcome<InspectionResult>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexingHealthReport {
    pub total: usize,
    pub inspected: usize,
    pub failed: usize,
    pub by_verdict: BTreeMap<String, usize>,
    pub by_coverage_state: BTreeMap<String, usize>,
    /// Input order, one entry per distinct URL.
    pub entries: Vec<InspectionEntry>,
}

impl IndexingHealthReport {
    fn from_entries(entries: Vec<InspectionEntry>) -> Self {
        let mut by_verdict: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_coverage_state: BTreeMap<String, usize> = BTreeMap::new();

        for result in entries.iter().filter_map(|e| e.inspection.value()) {
            *by_verdict.entry(result.verdict.clone()).or_insert(0) += 1;
            *by_coverage_state.entry(result.coverage_state.clone()).or_insert(0) += 1;
        }

        let inspected: usize = by_verdict.values().sum();
        Self {
            total: entries.len(),
            inspected,
            failed: entries.len() - inspected,
            by_verdict,
            by_coverage_state,
            entries,
        }
    }
}

/// Distinct URLs in first-seen order.
fn dedup_urls(urls: &[String]) -> Vec<String> {
    let mut seen = FxHashSet::default();
    urls.iter()
        .filter(|url| seen.insert(url.as_str()))
        .cloned()
        .collect()
}

impl Insights {
    /// Inspection, traffic, lab performance and field data for one page,
    /// fetched concurrently. Never fails; broken sources are embedded.
    pub async fn page_health(&self, site: &str, url: &str) -> PageHealthDashboard {
        let remote = &self.analytics;
        let signals = &self.signals;
        let policy = &self.policy;

        let traffic = async {
            let range = match self.windows.relative(defaults::DASHBOARD_LOOKBACK_DAYS) {
                Ok(range) => range,
                Err(err) => {
                    return SourceOutcome::Failed(SourceFailure {
                        error: err.to_string(),
                        code: None,
                    });
                }
            };
            let query = RowQuery::new(range, vec![Dimension::Page], self.row_limit)
                .with_filters(vec![DimensionFilter::equals(Dimension::Page, url)]);
            let query = &query;

            settle(policy, "page analytics", move || async move {
                remote.query_rows(site, query).await.map(|rows| PageTraffic {
                    range,
                    metrics: Metrics::aggregate(&rows),
                })
            })
            .await
        };

        let (inspection, analytics, performance, field_experience) = futures::join!(
            settle(policy, "url inspection", || remote.inspect_url(site, url)),
            traffic,
            settle(policy, "performance audit", || signals.performance_audit(url)),
            settle(policy, "field experience", || signals.field_experience(url)),
        );

        let sources_ok = count_ok(&[
            inspection.is_ok(),
            analytics.is_ok(),
            performance.is_ok(),
            field_experience.is_ok(),
        ]);

        PageHealthDashboard {
            url: url.to_string(),
            inspection,
            analytics,
            performance,
            field_experience,
            sources_ok,
        }
    }

    /// Inspect every URL one at a time under the inspection quota.
    ///
    /// Duplicate URLs are inspected once. `on_progress(done, total)` fires
    /// after each inspection settles.
    pub async fn indexing_health<P>(&self, site: &str, urls: &[String], on_progress: P) -> IndexingHealthReport
    where
        P: FnMut(usize, usize),
    {
        let queue: Vec<InspectionRequest> = dedup_urls(urls)
            .into_iter()
            .map(|url| InspectionRequest {
                site: site.to_string(),
                url,
            })
            .collect();

        let batch = self
            .sequencer()
            .run(
                queue,
                |request| {
                    let request = request.clone();
                    let analytics = self.analytics.clone();
                    async move { analytics.inspect_url(&request.site, &request.url).await }
                },
                on_progress,
            )
            .await;

        IndexingHealthReport::from_entries(
            batch
                .into_iter()
                .map(|entry| InspectionEntry {
                    url: entry.descriptor.url,
                    inspection: entry.result.into(),
                })
                .collect(),
        )
    }
}

use serde::Serialize;
use std::cmp::Reverse;

use crate::core::constants::{defaults, thresholds};
use crate::core::error::Result;
use crate::core::types::{ComparisonWindowPair, Dimension, MetricRow, RowQuery};
use crate::engine::{Groups, Metrics, RowKey, WindowSpec, group_by};
use crate::insights::Insights;

#[derive(Debug, Clone)]
pub struct KeywordDiffRequest {
    pub window: WindowSpec,
    pub min_impressions: u64,
}

impl Default for KeywordDiffRequest {
    fn default() -> Self {
        Self {
            window: WindowSpec::days(defaults::LOOKBACK_DAYS),
            min_impressions: thresholds::KEYWORD_MIN_IMPRESSIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordEntry {
    pub query: String,
    pub clicks: u64,
    pub impressions: u64,
    pub position: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordDiff {
    pub windows: ComparisonWindowPair,
    /// Ranking in the recent period only.
    pub new_keywords: Vec<KeywordEntry>,
    /// Ranking in the prior period only.
    pub lost_keywords: Vec<KeywordEntry>,
}

/// Keys of `present` missing from `absent`, with at least `min_impressions`.
fn only_in(present: &Groups<'_>, absent: &Groups<'_>, min_impressions: u64) -> Vec<KeywordEntry> {
    let mut entries: Vec<KeywordEntry> = present
        .iter()
        .filter(|(key, _)| !absent.contains(key))
        .map(|(key, rows)| (key, Metrics::aggregate(rows.iter().copied())))
        .filter(|(_, metrics)| metrics.impressions >= min_impressions)
        .map(|(key, metrics)| KeywordEntry {
            query: key.to_string(),
            clicks: metrics.clicks,
            impressions: metrics.impressions,
            position: metrics.position,
        })
        .collect();

    entries.sort_by_key(|entry| Reverse(entry.impressions));
    entries
}

/// Queries that appeared or disappeared between two periods.
pub fn diff_keywords(
    recent: &[MetricRow],
    prior: &[MetricRow],
    min_impressions: u64,
) -> (Vec<KeywordEntry>, Vec<KeywordEntry>) {
    let recent_groups = group_by(recent, |row| RowKey::select(row, &[0]));
    let prior_groups = group_by(prior, |row| RowKey::select(row, &[0]));

    (
        only_in(&recent_groups, &prior_groups, min_impressions),
        only_in(&prior_groups, &recent_groups, min_impressions),
    )
}

impl Insights {
    pub async fn keyword_diff(&self, site: &str, request: &KeywordDiffRequest) -> Result<KeywordDiff> {
        let windows = self.windows.comparison_for(&request.window)?;
        let query = RowQuery::new(windows.period_a, vec![Dimension::Query], self.row_limit);
        let (recent, prior) = self.fetch_pair(site, &query, &windows, "keyword diff").await?;

        let (mut new_keywords, mut lost_keywords) = diff_keywords(&recent, &prior, request.min_impressions);
        new_keywords.retain(|k| !self.is_excluded_query(&k.query));
        lost_keywords.retain(|k| !self.is_excluded_query(&k.query));

        Ok(KeywordDiff {
            windows,
            new_keywords,
            lost_keywords,
        })
    }
}

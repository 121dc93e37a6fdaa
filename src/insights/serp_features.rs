use futures::future::try_join_all;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::core::constants::defaults;
use crate::core::error::Result;
use crate::core::types::{DateRange, Dimension, MetricRow, Percent, RowQuery};
use crate::engine::{Metrics, RowKey, group_by, percentage_change};
use crate::insights::Insights;

#[derive(Debug, Clone)]
pub struct SerpFeatureRequest {
    pub total_days: u32,
    pub window_days: u32,
    /// Defaults to `window_days` (non-overlapping windows).
    pub step_days: Option<u32>,
}

impl Default for SerpFeatureRequest {
    fn default() -> Self {
        Self {
            total_days: defaults::LOOKBACK_DAYS,
            window_days: defaults::TREND_WINDOW_DAYS,
            step_days: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub range: DateRange,
    #[serde(flatten)]
    pub metrics: Metrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureTrend {
    /// One point per window, oldest first.
    pub points: Vec<TrendPoint>,
    /// First window to last window.
    pub clicks_change: Percent,
    pub impressions_change: Percent,
}

#[derive(Debug, Clone, Serialize)]
pub struct SerpFeatureTrends {
    pub windows: Vec<DateRange>,
    pub features: BTreeMap<String, FeatureTrend>,
}

/// Pivot per-window `searchAppearance` rows into one series per feature.
///
/// A feature missing from a window gets a zeroed point there, so every
/// series has exactly one point per window.
pub fn pivot_features(per_window: &[(DateRange, Vec<MetricRow>)]) -> BTreeMap<String, FeatureTrend> {
    let grouped: Vec<_> = per_window
        .iter()
        .map(|(range, rows)| (range, group_by(rows, |row| RowKey::select(row, &[0]))))
        .collect();

    let mut names: Vec<RowKey> = grouped
        .iter()
        .flat_map(|(_, groups)| groups.keys().cloned())
        .collect();
    names.sort();
    names.dedup();

    names
        .into_iter()
        .map(|name| {
            let points: Vec<TrendPoint> = grouped
                .iter()
                .map(|(range, groups)| TrendPoint {
                    range: **range,
                    metrics: groups
                        .get(&name)
                        .map(|rows| Metrics::aggregate(rows.iter().copied()))
                        .unwrap_or_default(),
                })
                .collect();

            let (first, last) = match (points.first(), points.last()) {
                (Some(first), Some(last)) => (first.metrics, last.metrics),
                _ => (Metrics::default(), Metrics::default()),
            };

            let trend = FeatureTrend {
                clicks_change: percentage_change(last.clicks as f64, first.clicks as f64),
                impressions_change: percentage_change(last.impressions as f64, first.impressions as f64),
                points,
            };
            (name.to_string(), trend)
        })
        .collect()
}

impl Insights {
    /// Per-feature trend across rolling windows.
    ///
    /// The remote API refuses `searchAppearance` combined with other
    /// dimensions or a date split, so every window is its own request.
    pub async fn serp_feature_trends(&self, site: &str, request: &SerpFeatureRequest) -> Result<SerpFeatureTrends> {
        let step = request.step_days.unwrap_or(request.window_days);
        let windows = self.windows.rolling(request.total_days, request.window_days, step)?;

        let requests: Vec<(RowQuery, String)> = windows
            .iter()
            .map(|&range| {
                (
                    RowQuery::new(range, vec![Dimension::SearchAppearance], self.row_limit),
                    format!("serp features ({range})"),
                )
            })
            .collect();

        let results = try_join_all(
            requests
                .iter()
                .map(|(query, operation)| self.fetch(site, query, operation)),
        )
        .await?;

        let per_window: Vec<(DateRange, Vec<MetricRow>)> = windows.iter().copied().zip(results).collect();

        Ok(SerpFeatureTrends {
            features: pivot_features(&per_window),
            windows,
        })
    }
}

use serde::Serialize;
use std::cmp::Reverse;

use crate::core::constants::{defaults, thresholds};
use crate::core::error::Result;
use crate::core::types::{ComparisonWindowPair, Dimension, MetricRow, RowQuery};
use crate::engine::{Metrics, RowKey, drop_percentage, group_by};
use crate::insights::Insights;

#[derive(Debug, Clone)]
pub struct DropAlertRequest {
    pub days: u32,
    pub min_clicks: u64,
    /// Minimum drop, in percent, that raises an alert.
    pub threshold_percent: f64,
}

impl Default for DropAlertRequest {
    fn default() -> Self {
        Self {
            days: defaults::TREND_WINDOW_DAYS,
            min_clicks: thresholds::ALERT_MIN_CLICKS,
            threshold_percent: thresholds::ALERT_DROP_PERCENT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DropAlert {
    pub page: String,
    pub prior_clicks: u64,
    pub recent_clicks: u64,
    pub clicks_lost: u64,
    pub drop_percent: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DropAlertReport {
    pub windows: ComparisonWindowPair,
    pub threshold_percent: f64,
    pub alerts: Vec<DropAlert>,
}

pub fn find_drops(recent: &[MetricRow], prior: &[MetricRow], request: &DropAlertRequest) -> Vec<DropAlert> {
    let recent_groups = group_by(recent, |row| RowKey::select(row, &[0]));
    let prior_groups = group_by(prior, |row| RowKey::select(row, &[0]));

    let mut alerts: Vec<DropAlert> = prior_groups
        .iter()
        .map(|(key, rows)| {
            let prior_clicks = Metrics::aggregate(rows.iter().copied()).clicks;
            let recent_clicks = recent_groups
                .get(key)
                .map_or(0, |rows| Metrics::aggregate(rows.iter().copied()).clicks);
            (key, prior_clicks, recent_clicks)
        })
        .filter(|&(_, prior_clicks, _)| prior_clicks >= request.min_clicks)
        .filter_map(|(key, prior_clicks, recent_clicks)| {
            let drop_percent = drop_percentage(prior_clicks, recent_clicks);
            (drop_percent >= request.threshold_percent).then(|| DropAlert {
                page: key.to_string(),
                prior_clicks,
                recent_clicks,
                clicks_lost: prior_clicks.saturating_sub(recent_clicks),
                drop_percent,
            })
        })
        .collect();

    alerts.sort_by_key(|alert| Reverse(alert.clicks_lost));
    alerts
}

impl Insights {
    /// Pages whose clicks dropped by at least the threshold.
    pub async fn drop_alerts(&self, site: &str, request: &DropAlertRequest) -> Result<DropAlertReport> {
        let windows = self.windows.comparison(request.days)?;
        let query = RowQuery::new(windows.period_a, vec![Dimension::Page], self.row_limit);
        let (recent, prior) = self.fetch_pair(site, &query, &windows, "drop alerts").await?;

        Ok(DropAlertReport {
            windows,
            threshold_percent: request.threshold_percent,
            alerts: find_drops(&recent, &prior, request),
        })
    }
}

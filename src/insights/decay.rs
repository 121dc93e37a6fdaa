use serde::Serialize;
use std::cmp::Reverse;

use crate::core::constants::{defaults, thresholds};
use crate::core::error::{Result, SerpwatchError};
use crate::core::types::{ComparisonWindowPair, Dimension, MetricRow, RowQuery};
use crate::engine::{Metrics, RowKey, drop_percentage, group_by};
use crate::insights::Insights;

#[derive(Debug, Clone)]
pub struct DecayRequest {
    /// Total lookback, split into two equal halves.
    pub lookback_days: u32,
    pub min_clicks: u64,
}

impl Default for DecayRequest {
    fn default() -> Self {
        Self {
            lookback_days: defaults::DECAY_LOOKBACK_DAYS,
            min_clicks: thresholds::DECAY_MIN_CLICKS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecayingPage {
    pub page: String,
    pub prior_clicks: u64,
    pub recent_clicks: u64,
    pub clicks_lost: u64,
    pub decline_percent: f64,
    pub prior_position: f64,
    /// `None` when the page had no impressions at all in the recent half.
    pub recent_position: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecayReport {
    pub windows: ComparisonWindowPair,
    pub pages: Vec<DecayingPage>,
}

/// Pages whose clicks fell between the prior and the recent period.
pub fn find_decaying_pages(recent: &[MetricRow], prior: &[MetricRow], min_clicks: u64) -> Vec<DecayingPage> {
    let recent_groups = group_by(recent, |row| RowKey::select(row, &[0]));
    let prior_groups = group_by(prior, |row| RowKey::select(row, &[0]));

    let mut pages: Vec<DecayingPage> = prior_groups
        .iter()
        .filter_map(|(key, members)| {
            let before = Metrics::aggregate(members.iter().copied());
            if before.clicks < min_clicks {
                return None;
            }
            let after = recent_groups
                .get(key)
                .map(|rows| Metrics::aggregate(rows.iter().copied()));
            let recent_clicks = after.map_or(0, |m| m.clicks);
            if recent_clicks >= before.clicks {
                return None;
            }
            Some(DecayingPage {
                page: key.to_string(),
                prior_clicks: before.clicks,
                recent_clicks,
                clicks_lost: before.clicks - recent_clicks,
                decline_percent: drop_percentage(before.clicks, recent_clicks),
                prior_position: before.position,
                recent_position: after.map(|m| m.position),
            })
        })
        .collect();

    pages.sort_by_key(|page| Reverse(page.clicks_lost));
    pages
}

impl Insights {
    /// Pages losing clicks over the second half of the lookback.
    pub async fn content_decay(&self, site: &str, request: &DecayRequest) -> Result<DecayReport> {
        if request.lookback_days < 2 {
            return Err(SerpwatchError::InvalidArgument(format!(
                "decay lookback must be at least 2 days, got {}",
                request.lookback_days
            )));
        }

        let windows = self.windows.comparison(request.lookback_days / 2)?;
        let query = RowQuery::new(windows.period_a, vec![Dimension::Page], self.row_limit);
        let (recent, prior) = self.fetch_pair(site, &query, &windows, "content decay").await?;

        Ok(DecayReport {
            windows,
            pages: find_decaying_pages(&recent, &prior, request.min_clicks),
        })
    }
}

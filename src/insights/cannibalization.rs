use serde::Serialize;
use std::cmp::Reverse;

use crate::core::constants::{defaults, thresholds};
use crate::core::error::Result;
use crate::core::types::{DateRange, Dimension, MetricRow, RowQuery};
use crate::engine::{
    CannibalizationAction, RowKey, classify_cannibalization_action, group_by, pick_winner,
    WindowSpec, position_variance, round_to,
};
use crate::insights::Insights;

#[derive(Debug, Clone)]
pub struct CannibalizationRequest {
    pub window: WindowSpec,
    /// A query qualifies only when its pages together exceed this.
    pub min_impressions: u64,
    /// Attach a winner and per-loser actions to each query.
    pub recommend: bool,
}

impl Default for CannibalizationRequest {
    fn default() -> Self {
        Self {
            window: WindowSpec::days(defaults::LOOKBACK_DAYS),
            min_impressions: thresholds::CANNIBALIZATION_MIN_IMPRESSIONS,
            recommend: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompetingPage {
    pub page: String,
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: f64,
    pub position: f64,
}

impl From<&MetricRow> for CompetingPage {
    fn from(row: &MetricRow) -> Self {
        Self {
            page: row.key(1).to_string(),
            clicks: row.clicks,
            impressions: row.impressions,
            ctr: row.ctr,
            position: row.position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoserAction {
    pub page: String,
    pub action: CannibalizationAction,
    pub click_ratio: f64,
    pub position_gap: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub winner: String,
    pub losers: Vec<LoserAction>,
}

/// One query and the pages competing for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedQuery {
    pub query: String,
    pub pages: Vec<CompetingPage>,
    pub total_clicks: u64,
    pub total_impressions: u64,
    pub position_variance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<Recommendation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CannibalizationReport {
    pub range: DateRange,
    pub queries: Vec<GroupedQuery>,
}

fn recommend(pages: &[&MetricRow]) -> Option<Recommendation> {
    let winner_idx = pick_winner(pages)?;
    let winner = pages[winner_idx];

    let losers = pages
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != winner_idx)
        .map(|(_, loser)| {
            let click_ratio = if winner.clicks == 0 {
                0.0
            } else {
                loser.clicks as f64 / winner.clicks as f64
            };
            LoserAction {
                page: loser.key(1).to_string(),
                action: classify_cannibalization_action(
                    winner.clicks,
                    loser.clicks,
                    winner.position,
                    loser.position,
                ),
                click_ratio: round_to(click_ratio, 2),
                position_gap: round_to(loser.position - winner.position, 2),
            }
        })
        .collect();

    Some(Recommendation {
        winner: winner.key(1).to_string(),
        losers,
    })
}

/// Queries several pages rank for, from `[query, page]` rows.
pub fn detect_cannibalization(rows: &[MetricRow], min_impressions: u64, with_recommendation: bool) -> Vec<GroupedQuery> {
    let groups = group_by(rows, |row| RowKey::select(row, &[0]));

    let mut queries: Vec<GroupedQuery> = groups
        .iter()
        .filter(|(_, pages)| pages.len() >= 2)
        .filter_map(|(key, pages)| {
            let total_impressions: u64 = pages.iter().map(|p| p.impressions).sum();
            if total_impressions <= min_impressions {
                return None;
            }
            let positions: Vec<f64> = pages.iter().map(|p| p.position).collect();

            Some(GroupedQuery {
                query: key.to_string(),
                pages: pages.iter().map(|&p| CompetingPage::from(p)).collect(),
                total_clicks: pages.iter().map(|p| p.clicks).sum(),
                total_impressions,
                position_variance: position_variance(&positions),
                recommendation: if with_recommendation {
                    recommend(pages)
                } else {
                    None
                },
            })
        })
        .collect();

    queries.sort_by_key(|q| Reverse(q.total_impressions));
    queries
}

impl Insights {
    /// Queries with two or more of the site's pages competing for them.
    pub async fn cannibalization(&self, site: &str, request: &CannibalizationRequest) -> Result<CannibalizationReport> {
        let range = self.windows.resolve(&request.window)?;
        let query = RowQuery::new(range, vec![Dimension::Query, Dimension::Page], self.row_limit);
        let rows = self.fetch(site, &query, "cannibalization").await?;

        Ok(CannibalizationReport {
            range,
            queries: detect_cannibalization(&rows, request.min_impressions, request.recommend),
        })
    }

    /// Cannibalization with a winner and per-loser fix for every query.
    pub async fn resolve_cannibalization(
        &self,
        site: &str,
        request: &CannibalizationRequest,
    ) -> Result<CannibalizationReport> {
        let request = CannibalizationRequest {
            recommend: true,
            ..request.clone()
        };
        self.cannibalization(site, &request).await
    }
}

//! Quick-win and CTR-gap opportunities

use serde::Serialize;
use std::cmp::Reverse;

use crate::core::constants::{defaults, thresholds};
use crate::core::error::Result;
use crate::core::types::{DateRange, Dimension, MetricRow, RowQuery};
use crate::engine::{WindowSpec, expected_ctr, round_to};
use crate::insights::Insights;

#[derive(Debug, Clone)]
pub struct QuickWinRequest {
    pub window: WindowSpec,
    pub min_impressions: u64,
    pub max_ctr: f64,
    pub min_position: f64,
    pub max_position: f64,
    /// CTR the uplift estimate assumes the row could reach.
    pub target_ctr: f64,
}

impl Default for QuickWinRequest {
    fn default() -> Self {
        Self {
            window: WindowSpec::days(defaults::LOOKBACK_DAYS),
            min_impressions: thresholds::QUICK_WIN_MIN_IMPRESSIONS,
            max_ctr: thresholds::QUICK_WIN_MAX_CTR,
            min_position: thresholds::QUICK_WIN_MIN_POSITION,
            max_position: thresholds::QUICK_WIN_MAX_POSITION,
            target_ctr: thresholds::QUICK_WIN_TARGET_CTR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickWin {
    pub query: String,
    pub page: String,
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: f64,
    pub position: f64,
    pub potential_clicks: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickWinReport {
    pub range: DateRange,
    pub target_ctr: f64,
    pub wins: Vec<QuickWin>,
}

/// Extra clicks if `row` reached `target_ctr`, never negative.
pub fn click_uplift(row: &MetricRow, target_ctr: f64) -> u64 {
    let uplift = (row.impressions as f64 * target_ctr - row.clicks as f64).round();
    if uplift > 0.0 { uplift as u64 } else { 0 }
}

pub fn find_quick_wins(rows: &[MetricRow], request: &QuickWinRequest) -> Vec<QuickWin> {
    let mut wins: Vec<QuickWin> = rows
        .iter()
        .filter(|row| {
            row.impressions >= request.min_impressions
                && row.ctr <= request.max_ctr
                && row.position >= request.min_position
                && row.position <= request.max_position
        })
        .map(|row| QuickWin {
            query: row.key(0).to_string(),
            page: row.key(1).to_string(),
            clicks: row.clicks,
            impressions: row.impressions,
            ctr: row.ctr,
            position: row.position,
            potential_clicks: click_uplift(row, request.target_ctr),
        })
        .collect();

    wins.sort_by_key(|win| Reverse(win.potential_clicks));
    wins
}

#[derive(Debug, Clone)]
pub struct CtrAnalysisRequest {
    pub window: WindowSpec,
    pub min_impressions: u64,
}

impl Default for CtrAnalysisRequest {
    fn default() -> Self {
        Self {
            window: WindowSpec::days(defaults::LOOKBACK_DAYS),
            min_impressions: thresholds::CTR_MIN_IMPRESSIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CtrGapEntry {
    pub query: String,
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: f64,
    pub position: f64,
    pub expected_ctr: f64,
    /// Expected minus actual CTR.
    pub ctr_gap: f64,
    pub missed_clicks: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CtrAnalysis {
    pub range: DateRange,
    pub analyzed: usize,
    pub underperforming: usize,
    pub outperforming: usize,
    /// Underperforming queries, widest gap first.
    pub entries: Vec<CtrGapEntry>,
}

/// Queries whose CTR falls short of the benchmark for their position.
/// Returns the sorted gaps and the number of rows at or above benchmark.
pub fn ctr_gaps(rows: &[MetricRow], min_impressions: u64) -> (Vec<CtrGapEntry>, usize) {
    let mut outperforming = 0;
    let mut entries = Vec::new();

    for row in rows.iter().filter(|row| row.impressions >= min_impressions) {
        let expected = expected_ctr(row.position);
        let gap = round_to(expected - row.ctr, 4);
        if gap <= 0.0 {
            outperforming += 1;
            continue;
        }
        entries.push(CtrGapEntry {
            query: row.key(0).to_string(),
            clicks: row.clicks,
            impressions: row.impressions,
            ctr: row.ctr,
            position: row.position,
            expected_ctr: expected,
            ctr_gap: gap,
            missed_clicks: (row.impressions as f64 * gap).round() as u64,
        });
    }

    entries.sort_by(|a, b| b.ctr_gap.total_cmp(&a.ctr_gap));
    (entries, outperforming)
}

impl Insights {
    /// Rows with many impressions but a weak CTR at a reachable position.
    pub async fn quick_wins(&self, site: &str, request: &QuickWinRequest) -> Result<QuickWinReport> {
        let range = self.windows.resolve(&request.window)?;
        let query = RowQuery::new(range, vec![Dimension::Query, Dimension::Page], self.row_limit);
        let rows = self.fetch(site, &query, "quick wins").await?;

        let mut wins = find_quick_wins(&rows, request);
        wins.retain(|w| !self.is_excluded_query(&w.query));

        Ok(QuickWinReport {
            range,
            target_ctr: request.target_ctr,
            wins,
        })
    }

    /// Query CTR against the position benchmark table.
    pub async fn ctr_analysis(&self, site: &str, request: &CtrAnalysisRequest) -> Result<CtrAnalysis> {
        let range = self.windows.resolve(&request.window)?;
        let query = RowQuery::new(range, vec![Dimension::Query], self.row_limit);
        let rows: Vec<MetricRow> = self
            .fetch(site, &query, "ctr analysis")
            .await?
            .into_iter()
            .filter(|row| !self.is_excluded_query(row.key(0)))
            .collect();

        let (entries, outperforming) = ctr_gaps(&rows, request.min_impressions);

        Ok(CtrAnalysis {
            range,
            analyzed: entries.len() + outperforming,
            underperforming: entries.len(),
            outperforming,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use crate::insights::testing::{FakeAnalytics, insights};
    use regex::Regex;

    fn row(query: &str, clicks: u64, impressions: u64, ctr: f64, position: f64) -> MetricRow {
        MetricRow::new(&[query, "/page"], clicks, impressions, ctr, position)
    }

    #[test]
    fn test_click_uplift() {
        assert_eq!(click_uplift(&row("q", 10, 1000, 0.01, 8.0), 0.05), 40);
        assert_eq!(click_uplift(&row("q", 90, 1000, 0.09, 8.0), 0.05), 0);
    }

    #[test]
    fn test_find_quick_wins__thresholds() {
        let rows = vec![
            row("in range", 10, 1000, 0.01, 8.0),
            row("top spot", 10, 1000, 0.01, 2.0),
            row("page three", 1, 1000, 0.001, 25.0),
            row("good ctr", 80, 1000, 0.08, 8.0),
            row("few impressions", 0, 50, 0.0, 8.0),
            row("edge", 30, 100, 0.03, 4.0),
        ];

        let wins = find_quick_wins(&rows, &QuickWinRequest::default());
        let names: Vec<&str> = wins.iter().map(|w| w.query.as_str()).collect();

        assert_eq!(names, vec!["in range", "edge"]);
        assert_eq!(wins[0].potential_clicks, 40);
        assert_eq!(wins[0].page, "/page");
        assert_eq!(wins[1].potential_clicks, 0);
    }

    #[test]
    fn test_ctr_gaps__sorted_by_gap() {
        let rows = vec![
            row("slightly low", 100, 1000, 0.1, 3.0),
            row("far below", 50, 1000, 0.05, 1.0),
            row("beats benchmark", 400, 1000, 0.4, 1.0),
            row("ignored", 0, 10, 0.0, 1.0),
        ];

        let (entries, outperforming) = ctr_gaps(&rows, 50);

        assert_eq!(outperforming, 1);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].query, "far below");
        assert_eq!(entries[0].ctr_gap, 0.235);
        assert_eq!(entries[0].missed_clicks, 235);
        assert_eq!(entries[1].query, "slightly low");
        assert_eq!(entries[1].ctr_gap, 0.01);
    }

    #[tokio::test]
    async fn test_quick_wins__excludes_branded_queries() {
        let fake = FakeAnalytics::new(|_| {
            Ok(vec![
                row("acme widgets", 10, 2000, 0.005, 6.0),
                row("best widgets", 10, 1000, 0.01, 6.0),
            ])
        });

        let report = insights(fake)
            .with_exclude_queries(vec![Regex::new("acme").unwrap()])
            .quick_wins("sc-domain:example.com", &QuickWinRequest::default())
            .await
            .unwrap();

        assert_eq!(report.wins.len(), 1);
        assert_eq!(report.wins[0].query, "best widgets");
    }

    #[tokio::test]
    async fn test_ctr_analysis__counts() {
        let fake = FakeAnalytics::new(|_| {
            Ok(vec![
                MetricRow::new(&["under"], 10, 1000, 0.01, 2.0),
                MetricRow::new(&["over"], 500, 1000, 0.5, 2.0),
            ])
        });

        let report = insights(fake)
            .ctr_analysis("sc-domain:example.com", &CtrAnalysisRequest::default())
            .await
            .unwrap();

        assert_eq!(report.analyzed, 2);
        assert_eq!(report.underperforming, 1);
        assert_eq!(report.outperforming, 1);
        assert_eq!(report.entries[0].expected_ctr, 0.157);
    }

    #[tokio::test]
    async fn test_ctr_analysis__explicit_window() {
        let fake = std::sync::Arc::new(FakeAnalytics::new(|_| Ok(Vec::new())));
        let insights = crate::insights::testing::insights_with(fake.clone(), Default::default());
        let start = chrono::NaiveDate::from_ymd_opt(2023, 12, 1).unwrap();
        let end = chrono::NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();

        let report = insights
            .ctr_analysis("sc-domain:example.com", &CtrAnalysisRequest {
                window: WindowSpec::explicit(start, end),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(report.range, DateRange::new(start, end).unwrap());
        assert_eq!(fake.queries.lock().unwrap()[0].range, report.range);
    }
}

use futures::future::try_join_all;
use serde::Serialize;
use std::cmp::Reverse;

use crate::core::error::Result;
use crate::core::types::{DateRange, MetricRow, RowQuery, SearchType};
use crate::engine::{Metrics, WindowSpec, round_to};
use crate::insights::Insights;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchTypeTotals {
    pub search_type: SearchType,
    #[serde(flatten)]
    pub metrics: Metrics,
    /// Percent of all clicks across search types.
    pub click_share: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchTypeBreakdown {
    pub range: DateRange,
    pub total: Metrics,
    pub types: Vec<SearchTypeTotals>,
}

/// Per-type totals, most clicks first. Ties keep the input order.
pub fn breakdown(per_type: &[(SearchType, Vec<MetricRow>)]) -> (Metrics, Vec<SearchTypeTotals>) {
    let total = Metrics::aggregate(per_type.iter().flat_map(|(_, rows)| rows));

    let mut types: Vec<SearchTypeTotals> = per_type
        .iter()
        .map(|(search_type, rows)| {
            let metrics = Metrics::aggregate(rows);
            let click_share = if total.clicks == 0 {
                0.0
            } else {
                round_to(metrics.clicks as f64 / total.clicks as f64 * 100.0, 2)
            };
            SearchTypeTotals {
                search_type: *search_type,
                metrics,
                click_share,
            }
        })
        .collect();

    types.sort_by_key(|t| Reverse(t.metrics.clicks));
    (total, types)
}

impl Insights {
    /// Totals for every search surface over one window.
    pub async fn search_type_breakdown(
        &self,
        site: &str,
        window: &WindowSpec,
    ) -> Result<SearchTypeBreakdown> {
        let range = self.windows.resolve(window)?;
        let requests: Vec<(SearchType, RowQuery, String)> = SearchType::ALL
            .iter()
            .map(|&t| {
                (
                    t,
                    RowQuery::new(range, Vec::new(), self.row_limit).with_search_type(t),
                    format!("search type breakdown ({})", t.as_str()),
                )
            })
            .collect();

        let results = try_join_all(
            requests
                .iter()
                .map(|(_, query, operation)| self.fetch(site, query, operation)),
        )
        .await?;

        let per_type: Vec<(SearchType, Vec<MetricRow>)> = requests
            .iter()
            .map(|(t, _, _)| *t)
            .zip(results)
            .collect();
        let (total, types) = breakdown(&per_type);

        Ok(SearchTypeBreakdown { range, total, types })
    }
}

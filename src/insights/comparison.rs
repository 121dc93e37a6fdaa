use serde::Serialize;
use std::cmp::Reverse;

use crate::core::constants::defaults;
use crate::core::error::Result;
use crate::core::types::{ComparisonWindowPair, Dimension, DimensionFilter, MetricRow, Percent, RowQuery};
use crate::engine::{Metrics, RowKey, WindowSpec, group_by, percentage_change, round_to};
use crate::insights::Insights;

#[derive(Debug, Clone)]
pub struct ComparisonRequest {
    /// The recent period; the prior one is the same length right before it.
    pub window: WindowSpec,
    pub dimensions: Vec<Dimension>,
    pub filters: Vec<DimensionFilter>,
}

impl Default for ComparisonRequest {
    fn default() -> Self {
        Self {
            window: WindowSpec::days(defaults::LOOKBACK_DAYS),
            dimensions: vec![Dimension::Page],
            filters: Vec::new(),
        }
    }
}

/// Current minus previous.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricDelta {
    pub clicks: i64,
    pub impressions: i64,
    pub ctr: f64,
    pub position: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricChange {
    pub clicks: Percent,
    pub impressions: Percent,
    pub ctr: Percent,
    pub position: Percent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub keys: RowKey,
    pub current: Metrics,
    pub previous: Metrics,
    pub delta: MetricDelta,
    pub change: MetricChange,
}

impl ComparisonRow {
    fn new(keys: RowKey, current: Metrics, previous: Metrics) -> Self {
        let delta = MetricDelta {
            clicks: current.clicks as i64 - previous.clicks as i64,
            impressions: current.impressions as i64 - previous.impressions as i64,
            ctr: round_to(current.ctr - previous.ctr, 4),
            position: round_to(current.position - previous.position, 2),
        };
        let change = MetricChange {
            clicks: percentage_change(current.clicks as f64, previous.clicks as f64),
            impressions: percentage_change(current.impressions as f64, previous.impressions as f64),
            ctr: percentage_change(current.ctr, previous.ctr),
            position: percentage_change(current.position, previous.position),
        };
        Self {
            keys,
            current,
            previous,
            delta,
            change,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodComparison {
    pub windows: ComparisonWindowPair,
    pub dimensions: Vec<Dimension>,
    pub totals: ComparisonRow,
    pub rows: Vec<ComparisonRow>,
}

/// Align rows of two periods by key.
///
/// Keys of the current period come first in their original order, then
/// keys that only exist in the previous period with zeroed current metrics.
/// The result is sorted by absolute click delta, largest first; the sort
/// is stable so equal deltas keep that order.
pub fn compare_rows(current: &[MetricRow], previous: &[MetricRow]) -> Vec<ComparisonRow> {
    let current_groups = group_by(current, RowKey::of);
    let previous_groups = group_by(previous, RowKey::of);

    let mut rows: Vec<ComparisonRow> = current_groups
        .iter()
        .map(|(key, members)| {
            let prior = previous_groups
                .get(key)
                .map(|rows| Metrics::aggregate(rows.iter().copied()))
                .unwrap_or_default();
            ComparisonRow::new(key.clone(), Metrics::aggregate(members.iter().copied()), prior)
        })
        .collect();

    rows.extend(
        previous_groups
            .iter()
            .filter(|(key, _)| !current_groups.contains(key))
            .map(|(key, members)| {
                ComparisonRow::new(
                    key.clone(),
                    Metrics::default(),
                    Metrics::aggregate(members.iter().copied()),
                )
            }),
    );

    rows.sort_by_key(|row| Reverse(row.delta.clicks.unsigned_abs()));
    rows
}

impl Insights {
    /// Compare a window with the equal-length period before it.
    pub async fn compare_periods(&self, site: &str, request: &ComparisonRequest) -> Result<PeriodComparison> {
        let windows = self.windows.comparison_for(&request.window)?;
        let query = RowQuery::new(windows.period_a, request.dimensions.clone(), self.row_limit)
            .with_filters(request.filters.clone());

        let (current, previous) = self
            .fetch_pair(site, &query, &windows, "period comparison")
            .await?;

        let totals = ComparisonRow::new(
            RowKey::new(&["total"]),
            Metrics::aggregate(&current),
            Metrics::aggregate(&previous),
        );

        Ok(PeriodComparison {
            windows,
            dimensions: request.dimensions.clone(),
            totals,
            rows: compare_rows(&current, &previous),
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use crate::core::error::{ErrorClass, RemoteError, SerpwatchError};
    use crate::insights::testing::{FakeAnalytics, FakeSignals, insights, insights_with, windows};
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn row(page: &str, clicks: u64, impressions: u64, position: f64) -> MetricRow {
        let ctr = if impressions == 0 {
            0.0
        } else {
            clicks as f64 / impressions as f64
        };
        MetricRow::new(&[page], clicks, impressions, ctr, position)
    }

    #[test]
    fn test_compare_rows__key_only_in_prior_period_is_kept() {
        let current = vec![row("/a", 50, 500, 3.0)];
        let previous = vec![row("/a", 40, 400, 3.5), row("/gone", 30, 300, 5.0)];

        let rows = compare_rows(&current, &previous);
        let gone = rows
            .iter()
            .find(|r| r.keys == RowKey::new(&["/gone"]))
            .expect("vanished key must be reported");

        assert_eq!(gone.current, Metrics::default());
        assert_eq!(gone.delta.clicks, -30);
        assert_eq!(gone.delta.impressions, -300);
        assert_eq!(gone.change.clicks, Percent(-100.0));
    }

    #[test]
    fn test_compare_rows__new_key_has_infinite_change() {
        let rows = compare_rows(&[row("/new", 10, 100, 4.0)], &[]);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].previous, Metrics::default());
        assert_eq!(rows[0].delta.clicks, 10);
        assert_eq!(rows[0].change.clicks, Percent::INFINITY);
    }

    #[test]
    fn test_compare_rows__sorted_by_absolute_click_delta() {
        let current = vec![row("/small", 12, 100, 2.0), row("/big-gain", 90, 900, 2.0)];
        let previous = vec![
            row("/small", 10, 100, 2.0),
            row("/big-gain", 10, 100, 2.0),
            row("/big-loss", 50, 500, 2.0),
        ];

        let order: Vec<String> = compare_rows(&current, &previous)
            .iter()
            .map(|r| r.keys.to_string())
            .collect();

        assert_eq!(order, vec!["/big-gain", "/big-loss", "/small"]);
    }

    #[test]
    fn test_compare_rows__unchanged_key() {
        let rows = compare_rows(&[row("/same", 0, 0, 1.0)], &[row("/same", 0, 0, 1.0)]);

        assert_eq!(rows[0].delta.clicks, 0);
        assert_eq!(rows[0].change.clicks, Percent(0.0));
        assert_eq!(rows[0].change.position, Percent(0.0));
    }

    #[tokio::test]
    async fn test_compare_periods__queries_both_windows() {
        let pair = windows().comparison(7).unwrap();
        let fake = FakeAnalytics::new(move |q| {
            if q.range == pair.period_a {
                Ok(vec![row("/a", 20, 200, 2.0)])
            } else {
                Ok(vec![row("/a", 10, 100, 2.5), row("/b", 5, 50, 8.0)])
            }
        });

        let report = insights(fake)
            .compare_periods("sc-domain:example.com", &ComparisonRequest {
                window: WindowSpec::days(7),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(report.windows, pair);
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].keys, RowKey::new(&["/a"]));
        assert_eq!(report.rows[0].change.clicks, Percent(100.0));
        assert_eq!(report.totals.current.clicks, 20);
        assert_eq!(report.totals.previous.clicks, 15);
        assert_eq!(report.totals.delta.clicks, 5);
    }

    #[tokio::test]
    async fn test_compare_periods__explicit_window() {
        let date = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        let fake = Arc::new(FakeAnalytics::new(|_| Ok(vec![row("/a", 5, 50, 3.0)])));
        let insights = insights_with(fake.clone(), FakeSignals::default());

        let report = insights
            .compare_periods("sc-domain:example.com", &ComparisonRequest {
                window: WindowSpec::explicit(date("2024-01-08"), date("2024-01-14")),
                ..Default::default()
            })
            .await
            .unwrap();

        let ranges: Vec<_> = fake.queries.lock().unwrap().iter().map(|q| q.range).collect();
        assert_eq!(ranges.len(), 2);
        assert!(ranges.contains(&report.windows.period_a));
        assert!(ranges.contains(&report.windows.period_b));
        assert_eq!(report.windows.period_a.start_date, date("2024-01-08"));
        assert_eq!(report.windows.period_a.end_date, date("2024-01-14"));
        assert_eq!(report.windows.period_b.start_date, date("2024-01-01"));
        assert_eq!(report.windows.period_b.end_date, date("2024-01-07"));
    }

    #[tokio::test]
    async fn test_compare_periods__permission_failure_fails_request() {
        let fake = FakeAnalytics::new(|_| Err(RemoteError::permission_denied("no access")));

        let err = insights(fake)
            .compare_periods("sc-domain:example.com", &ComparisonRequest::default())
            .await
            .unwrap_err();

        match err {
            SerpwatchError::Remote { operation, source } => {
                assert!(operation.starts_with("period comparison"));
                assert_eq!(source.class, ErrorClass::PermissionDenied);
            }
            other => panic!("expected remote error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_compare_periods__serializes_infinite_change_as_text() {
        let pair = windows().comparison(28).unwrap();
        let fake = FakeAnalytics::new(move |q| {
            if q.range == pair.period_a {
                Ok(vec![row("/launch", 8, 80, 6.0)])
            } else {
                Ok(Vec::new())
            }
        });

        let report = insights(fake)
            .compare_periods("sc-domain:example.com", &ComparisonRequest::default())
            .await
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["rows"][0]["change"]["clicks"], "Infinity");
        assert_eq!(json["rows"][0]["keys"][0], "/launch");
    }
}

//! Metric arithmetic shared by the insight reports

use serde::Serialize;
use std::fmt;

use crate::core::constants::{cannibalization, ctr_benchmarks};
use crate::core::types::{MetricRow, Percent};

/// Round to `places` decimal places, halves away from zero.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Relative change from `previous` to `current`, in percent.
///
/// A zero baseline has no finite answer: growth from zero is infinite,
/// anything else from zero is reported as no change.
pub fn percentage_change(current: f64, previous: f64) -> Percent {
    if previous == 0.0 {
        if current > 0.0 {
            Percent::INFINITY
        } else {
            Percent(0.0)
        }
    } else {
        Percent(round_to((current - previous) / previous * 100.0, 2))
    }
}

/// Share of prior clicks that was lost, in percent (1 decimal).
/// Negative values mean the page grew.
pub fn drop_percentage(prior_clicks: u64, recent_clicks: u64) -> f64 {
    if prior_clicks == 0 {
        return 0.0;
    }
    let prior = prior_clicks as f64;
    round_to((prior - recent_clicks as f64) / prior * 100.0, 1)
}

/// Population variance of ranking positions (2 decimals).
pub fn position_variance(positions: &[f64]) -> f64 {
    if positions.is_empty() {
        return 0.0;
    }
    let n = positions.len() as f64;
    let mean = positions.iter().sum::<f64>() / n;
    let variance = positions.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;
    round_to(variance, 2)
}

/// Benchmark click-through rate for a ranking position.
pub fn expected_ctr(position: f64) -> f64 {
    let rounded = position.round();
    if rounded.is_nan() || rounded < 1.0 {
        return ctr_benchmarks::BY_POSITION[0];
    }
    if rounded > ctr_benchmarks::BY_POSITION.len() as f64 {
        return ctr_benchmarks::BEYOND_TABLE;
    }
    ctr_benchmarks::BY_POSITION[rounded as usize - 1]
}

/// Recommended fix for a page competing with the winner for one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CannibalizationAction {
    Redirect,
    Consolidate,
    Differentiate,
}

impl fmt::Display for CannibalizationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CannibalizationAction::Redirect => "redirect",
            CannibalizationAction::Consolidate => "consolidate",
            CannibalizationAction::Differentiate => "differentiate",
        })
    }
}

/// The position gap only decides between redirect and consolidate for
/// losers that already have a low click ratio.
pub fn classify_cannibalization_action(
    winner_clicks: u64,
    loser_clicks: u64,
    winner_position: f64,
    loser_position: f64,
) -> CannibalizationAction {
    let click_ratio = if winner_clicks == 0 {
        0.0
    } else {
        loser_clicks as f64 / winner_clicks as f64
    };
    let position_gap = loser_position - winner_position;

    if click_ratio < cannibalization::REDIRECT_CLICK_RATIO
        && position_gap > cannibalization::REDIRECT_POSITION_GAP
    {
        CannibalizationAction::Redirect
    } else if click_ratio < cannibalization::CONSOLIDATE_CLICK_RATIO {
        CannibalizationAction::Consolidate
    } else {
        CannibalizationAction::Differentiate
    }
}

/// Index of the strongest row: most clicks, then best (lowest) position.
pub fn pick_winner(rows: &[&MetricRow]) -> Option<usize> {
    rows.iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            b.clicks
                .cmp(&a.clicks)
                .then_with(|| a.position.total_cmp(&b.position))
        })
        .map(|(i, _)| i)
}

/// Summed metrics for one entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: f64,
    pub position: f64,
}

impl Metrics {
    /// Combine rows describing the same entity: clicks and impressions add
    /// up, CTR is recomputed and position is impression-weighted.
    pub fn aggregate<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a MetricRow>,
    {
        let mut clicks = 0u64;
        let mut impressions = 0u64;
        let mut weighted_position = 0.0;
        let mut plain_position = 0.0;
        let mut count = 0usize;

        for row in rows {
            clicks += row.clicks;
            impressions += row.impressions;
            weighted_position += row.position * row.impressions as f64;
            plain_position += row.position;
            count += 1;
        }

        if count == 0 {
            return Self::default();
        }

        let position = if impressions > 0 {
            weighted_position / impressions as f64
        } else {
            plain_position / count as f64
        };
        let ctr = if impressions > 0 {
            clicks as f64 / impressions as f64
        } else {
            0.0
        };

        Self {
            clicks,
            impressions,
            ctr: round_to(ctr, 4),
            position: round_to(position, 2),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use CannibalizationAction::*;

    #[test]
    fn test_percentage_change__zero_baseline() {
        assert_eq!(percentage_change(10.0, 0.0), Percent::INFINITY);
        assert_eq!(percentage_change(0.0, 0.0), Percent(0.0));
        assert_eq!(
            serde_json::to_string(&percentage_change(3.0, 0.0)).unwrap(),
            r#""Infinity""#
        );
    }

    #[test]
    fn test_percentage_change__rounds_to_two_places() {
        assert_eq!(percentage_change(150.0, 100.0), Percent(50.0));
        assert_eq!(percentage_change(0.0, 40.0), Percent(-100.0));
        assert_eq!(percentage_change(2.0, 3.0), Percent(-33.33));
    }

    #[test]
    fn test_drop_percentage() {
        assert_eq!(drop_percentage(100, 0), 100.0);
        assert_eq!(drop_percentage(100, 150), -50.0);
        assert_eq!(drop_percentage(3, 1), 66.7);
        assert_eq!(drop_percentage(0, 100), 0.0);
    }

    #[test]
    fn test_position_variance__population() {
        assert_eq!(position_variance(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 4.0);
        assert_eq!(position_variance(&[3.0]), 0.0);
        assert_eq!(position_variance(&[]), 0.0);
        assert_eq!(position_variance(&[1.0, 2.0]), 0.25);
    }

    #[test]
    fn test_expected_ctr__table_and_edges() {
        assert_eq!(expected_ctr(1.0), 0.285);
        assert_eq!(expected_ctr(1.4), 0.285);
        assert_eq!(expected_ctr(2.6), 0.110);
        assert_eq!(expected_ctr(10.0), 0.025);
        assert_eq!(expected_ctr(0.2), 0.285);
        assert_eq!(expected_ctr(10.6), 0.020);
        assert_eq!(expected_ctr(48.0), 0.020);
    }

    #[test]
    fn test_classify_cannibalization_action() {
        assert_eq!(classify_cannibalization_action(100, 5, 3.0, 15.0), Redirect);
        assert_eq!(classify_cannibalization_action(100, 5, 3.0, 8.0), Consolidate);
        assert_eq!(classify_cannibalization_action(100, 30, 3.0, 5.0), Differentiate);
        assert_eq!(classify_cannibalization_action(0, 0, 10.0, 20.0), Redirect);
        assert_eq!(classify_cannibalization_action(0, 0, 10.0, 12.0), Consolidate);
    }

    #[test]
    fn test_classify_cannibalization_action__boundaries() {
        // ratio exactly 0.10 is not below the redirect cut-off
        assert_eq!(classify_cannibalization_action(100, 10, 1.0, 20.0), Consolidate);
        // gap exactly 5 does not trigger a redirect
        assert_eq!(classify_cannibalization_action(100, 1, 1.0, 6.0), Consolidate);
        // ratio exactly 0.30 differentiates
        assert_eq!(classify_cannibalization_action(100, 30, 1.0, 20.0), Differentiate);
    }

    #[test]
    fn test_pick_winner__clicks_then_position() {
        let a = MetricRow::new(&["q", "/a"], 10, 100, 0.1, 6.0);
        let b = MetricRow::new(&["q", "/b"], 25, 100, 0.25, 8.0);
        let c = MetricRow::new(&["q", "/c"], 25, 100, 0.25, 3.0);

        assert_eq!(pick_winner(&[&a, &b, &c]), Some(2));
        assert_eq!(pick_winner(&[&a]), Some(0));
        assert_eq!(pick_winner(&[]), None);
    }

    #[test]
    fn test_metrics_aggregate__weights_position_by_impressions() {
        let rows = [
            MetricRow::new(&["/a"], 10, 100, 0.1, 2.0),
            MetricRow::new(&["/a"], 0, 300, 0.0, 10.0),
        ];
        let metrics = Metrics::aggregate(&rows);

        assert_eq!(metrics.clicks, 10);
        assert_eq!(metrics.impressions, 400);
        assert_eq!(metrics.ctr, 0.025);
        assert_eq!(metrics.position, 8.0);
    }

    #[test]
    fn test_metrics_aggregate__empty_is_zero() {
        assert_eq!(
            Metrics::aggregate(std::iter::empty::<&MetricRow>()),
            Metrics::default()
        );
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(66.666, 1), 66.7);
        assert_eq!(round_to(1.005, 0), 1.0);
        assert_eq!(round_to(-12.5, 0), -13.0);
    }
}

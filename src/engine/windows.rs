//! Calendar window arithmetic
//!
//! Every window ends yesterday at the latest: the analytics source reports
//! with a lag, so today is never complete.

use chrono::{Duration, Local, NaiveDate};
use serde::Deserialize;

use crate::core::error::{Result, SerpwatchError};
use crate::core::types::{ComparisonWindowPair, DateRange};

/// Either a relative lookback or an explicit pair of dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct WindowSpec {
    pub days: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl WindowSpec {
    pub fn days(days: u32) -> Self {
        Self {
            days: Some(days),
            ..Default::default()
        }
    }

    pub fn explicit(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            days: None,
            start_date: Some(start_date),
            end_date: Some(end_date),
        }
    }
}

/// Window calculator anchored on a reference "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindows {
    today: NaiveDate,
}

impl DateWindows {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    /// Calculator anchored on the local clock.
    pub fn today() -> Self {
        Self::new(Local::now().date_naive())
    }

    /// Most recent complete day.
    pub fn yesterday(&self) -> NaiveDate {
        self.today - Duration::days(1)
    }

    /// `days` days ending yesterday, both ends included.
    pub fn relative(&self, days: u32) -> Result<DateRange> {
        if days == 0 {
            return Err(SerpwatchError::InvalidArgument(
                "window length must be at least 1 day".to_string(),
            ));
        }
        let end_date = self.yesterday();
        DateRange::new(end_date - Duration::days(i64::from(days) - 1), end_date)
    }

    /// Resolve a `WindowSpec` into a concrete range. A relative lookback wins over
    /// explicit dates; explicit dates are only honoured as a complete pair.
    pub fn resolve(&self, spec: &WindowSpec) -> Result<DateRange> {
        match (spec.days, spec.start_date, spec.end_date) {
            (Some(days), _, _) => self.relative(days),
            (None, Some(start_date), Some(end_date)) => DateRange::new(start_date, end_date),
            _ => Err(SerpwatchError::Config(
                "either a day count or both a start and an end date are required".to_string(),
            )),
        }
    }

    /// The last `days` days and the equal-length period right before them.
    pub fn comparison(&self, days: u32) -> Result<ComparisonWindowPair> {
        self.comparison_for(&WindowSpec::days(days))
    }

    /// The resolved window and the equal-length period right before it.
    pub fn comparison_for(&self, spec: &WindowSpec) -> Result<ComparisonWindowPair> {
        let period_a = self.resolve(spec)?;
        Ok(ComparisonWindowPair {
            period_a,
            period_b: period_a.preceding(),
        })
    }

    /// Equal-length windows covering `total_days`, oldest first.
    ///
    /// Walks back from the window ending yesterday in increments of `step`
    /// for as long as a whole window still fits in the budget. A trailing
    /// window that would reach past the budget is dropped, never truncated.
    pub fn rolling(&self, total_days: u32, window_length: u32, step: u32) -> Result<Vec<DateRange>> {
        if window_length == 0 || step == 0 {
            return Err(SerpwatchError::InvalidArgument(format!(
                "rolling windows need a positive length and step (got length {window_length}, step {step})"
            )));
        }

        let yesterday = self.yesterday();
        let mut windows = Vec::new();
        let mut offset = 0u32;
        while offset
            .checked_add(window_length)
            .is_some_and(|used| used <= total_days)
        {
            let end_date = yesterday - Duration::days(i64::from(offset));
            let start_date = end_date - Duration::days(i64::from(window_length) - 1);
            windows.push(DateRange::new(start_date, end_date)?);
            offset = match offset.checked_add(step) {
                Some(next) => next,
                None => break,
            };
        }

        windows.reverse();
        Ok(windows)
    }

    /// Tiled rolling windows (`step == window_length`).
    pub fn tiled(&self, total_days: u32, window_length: u32) -> Result<Vec<DateRange>> {
        self.rolling(total_days, window_length, window_length)
    }
}

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::core::error::{Result, SerpwatchError};

/// Inclusive calendar date range.
///
/// The invariant `start_date <= end_date` is enforced by [`DateRange::new`];
/// every range handed out by the window calculator goes through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DateRange {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Result<Self> {
        if start_date > end_date {
            return Err(SerpwatchError::InvalidArgument(format!(
                "start date {start_date} is after end date {end_date}"
            )));
        }
        Ok(Self {
            start_date,
            end_date,
        })
    }

    /// Calendar days between start and end (a single-day range spans 0).
    pub fn span_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }

    /// Number of days covered, both ends included.
    pub fn len_days(&self) -> i64 {
        self.span_days() + 1
    }

    /// The range of equal length that ends the day before this one starts.
    pub fn preceding(&self) -> Self {
        let end_date = self.start_date - Duration::days(1);
        Self {
            start_date: end_date - Duration::days(self.span_days()),
            end_date,
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start_date, self.end_date)
    }
}

/// Two contiguous, equal-length periods; `period_a` is the more recent one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonWindowPair {
    pub period_a: DateRange,
    pub period_b: DateRange,
}

/// Categorical axis rows can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dimension {
    Query,
    Page,
    Device,
    Country,
    Date,
    SearchAppearance,
}

impl Dimension {
    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Query => "query",
            Dimension::Page => "page",
            Dimension::Device => "device",
            Dimension::Country => "country",
            Dimension::Date => "date",
            Dimension::SearchAppearance => "searchAppearance",
        }
    }
}

/// Search surface the remote API reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchType {
    Web,
    Image,
    Video,
    News,
    Discover,
    GoogleNews,
}

impl SearchType {
    pub const ALL: [SearchType; 6] = [
        SearchType::Web,
        SearchType::Image,
        SearchType::Video,
        SearchType::News,
        SearchType::Discover,
        SearchType::GoogleNews,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SearchType::Web => "web",
            SearchType::Image => "image",
            SearchType::Video => "video",
            SearchType::News => "news",
            SearchType::Discover => "discover",
            SearchType::GoogleNews => "googleNews",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    IncludingRegex,
    ExcludingRegex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionFilter {
    pub dimension: Dimension,
    pub operator: FilterOperator,
    pub expression: String,
}

impl DimensionFilter {
    pub fn equals(dimension: Dimension, expression: impl Into<String>) -> Self {
        Self {
            dimension,
            operator: FilterOperator::Equals,
            expression: expression.into(),
        }
    }
}

/// One row-query request against the remote analytics source.
#[derive(Debug, Clone, PartialEq)]
pub struct RowQuery {
    pub range: DateRange,
    pub dimensions: Vec<Dimension>,
    pub filters: Vec<DimensionFilter>,
    pub row_limit: u32,
    pub search_type: Option<SearchType>,
}

impl RowQuery {
    pub fn new(range: DateRange, dimensions: Vec<Dimension>, row_limit: u32) -> Self {
        Self {
            range,
            dimensions,
            filters: Vec::new(),
            row_limit,
            search_type: None,
        }
    }

    pub fn with_filters(mut self, filters: Vec<DimensionFilter>) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_search_type(mut self, search_type: SearchType) -> Self {
        self.search_type = Some(search_type);
        self
    }

    /// Same request for a different date range.
    pub fn for_range(&self, range: DateRange) -> Self {
        Self {
            range,
            ..self.clone()
        }
    }
}

/// Analytics row as returned by the remote source. Never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    #[serde(default)]
    pub keys: Vec<String>,
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: f64,
    pub position: f64,
}

impl MetricRow {
    pub fn new(keys: &[&str], clicks: u64, impressions: u64, ctr: f64, position: f64) -> Self {
        Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            clicks,
            impressions,
            ctr,
            position,
        }
    }

    /// Dimension value at `index`, or an empty string when absent.
    pub fn key(&self, index: usize) -> &str {
        self.keys.get(index).map(String::as_str).unwrap_or("")
    }
}

/// Index status of a single URL as reported by the inspection API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionResult {
    #[serde(default)]
    pub verdict: String,
    #[serde(default)]
    pub coverage_state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexing_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_crawl_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_canonical: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_canonical: Option<String>,
}

/// Lab performance audit summary for one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceAudit {
    pub strategy: String,
    pub performance_score: Option<f64>,
    pub lcp_ms: Option<f64>,
    pub cls: Option<f64>,
    pub tbt_ms: Option<f64>,
}

/// Real-user (field) experience percentiles for one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldExperience {
    pub lcp_p75_ms: Option<f64>,
    pub inp_p75_ms: Option<f64>,
    pub cls_p75: Option<f64>,
    pub overall_category: Option<String>,
}

/// Percentage that keeps non-finite values when serialized.
///
/// JSON has no representation for infinity, and `serde_json` would emit `null`;
/// these are written as the strings `"Infinity"`, `"-Infinity"` and `"NaN"`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Percent(pub f64);

impl Percent {
    pub const INFINITY: Percent = Percent(f64::INFINITY);

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Serialize for Percent {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if self.0.is_nan() {
            serializer.serialize_str("NaN")
        } else if self.0 == f64::INFINITY {
            serializer.serialize_str("Infinity")
        } else if self.0 == f64::NEG_INFINITY {
            serializer.serialize_str("-Infinity")
        } else {
            serializer.serialize_f64(self.0)
        }
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_nan() {
            write!(f, "NaN")
        } else if self.0.is_infinite() {
            write!(f, "{}", if self.0 > 0.0 { "Infinity" } else { "-Infinity" })
        } else {
            write!(f, "{:.2}%", self.0)
        }
    }
}

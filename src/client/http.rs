//! HTTP adapters for the remote collaborators

use async_trait::async_trait;
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::client::classify::{classify_status, classify_transport};
use crate::client::{PageSignals, SearchAnalytics};
use crate::config::Config;
use crate::core::constants::endpoints;
use crate::core::error::{RemoteError, Result, SerpwatchError};
use crate::core::types::{
    DimensionFilter, FieldExperience, InspectionResult, MetricRow, PerformanceAudit, RowQuery,
};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .pool_idle_timeout(Duration::from_secs(30))
        .build()?)
}

fn parse_base(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| SerpwatchError::Config(format!("Invalid endpoint '{url}': {e}")))
}

fn join_segments(base: &Url, segments: &[&str]) -> std::result::Result<Url, RemoteError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| RemoteError::fatal(format!("'{base}' cannot be used as a base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Send a request and decode a JSON body, classifying every failure.
async fn send_json<R: DeserializeOwned>(request: RequestBuilder) -> std::result::Result<R, RemoteError> {
    let response = request.send().await.map_err(|e| classify_transport(&e))?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(classify_status(status, &body));
    }
    response
        .json::<R>()
        .await
        .map_err(|e| RemoteError::fatal(format!("invalid response body: {e}")))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryBody<'a> {
    start_date: String,
    end_date: String,
    dimensions: Vec<&'static str>,
    row_limit: u32,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    search_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    dimension_filter_groups: Vec<FilterGroup<'a>>,
}

#[derive(Debug, Serialize)]
struct FilterGroup<'a> {
    filters: &'a [DimensionFilter],
}

impl<'a> From<&'a RowQuery> for QueryBody<'a> {
    fn from(query: &'a RowQuery) -> Self {
        Self {
            start_date: query.range.start_date.format("%Y-%m-%d").to_string(),
            end_date: query.range.end_date.format("%Y-%m-%d").to_string(),
            dimensions: query.dimensions.iter().map(|d| d.as_str()).collect(),
            row_limit: query.row_limit,
            search_type: query.search_type.map(|t| t.as_str()),
            dimension_filter_groups: if query.filters.is_empty() {
                Vec::new()
            } else {
                vec![FilterGroup {
                    filters: &query.filters,
                }]
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    rows: Vec<MetricRow>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InspectBody<'a> {
    inspection_url: &'a str,
    site_url: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InspectResponse {
    inspection_result: InspectionEnvelope,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InspectionEnvelope {
    index_status_result: InspectionResult,
}

/// Search analytics and URL inspection over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSearchConsole {
    client: reqwest::Client,
    base_url: Url,
    access_token: Option<String>,
}

impl HttpSearchConsole {
    pub fn new(base_url: &str, access_token: Option<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: parse_base(base_url)?,
            access_token,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config
                .api_base_url
                .as_deref()
                .unwrap_or(endpoints::API_BASE_URL),
            config.access_token.clone(),
            config.timeout_duration(),
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.access_token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl SearchAnalytics for HttpSearchConsole {
    async fn query_rows(&self, site: &str, query: &RowQuery) -> std::result::Result<Vec<MetricRow>, RemoteError> {
        let url = join_segments(
            &self.base_url,
            &["webmasters", "v3", "sites", site, "searchAnalytics", "query"],
        )?;
        let body = QueryBody::from(query);
        let response: QueryResponse =
            send_json(self.authorized(self.client.post(url).json(&body))).await?;
        Ok(response.rows)
    }

    async fn inspect_url(&self, site: &str, url: &str) -> std::result::Result<InspectionResult, RemoteError> {
        let endpoint = join_segments(&self.base_url, &["v1", "urlInspection", "index:inspect"])?;
        let body = InspectBody {
            inspection_url: url,
            site_url: site,
        };
        let response: InspectResponse =
            send_json(self.authorized(self.client.post(endpoint).json(&body))).await?;
        Ok(response.inspection_result.index_status_result)
    }
}

/// Lab performance audit and field experience lookups over HTTP.
#[derive(Debug, Clone)]
pub struct HttpPageSignals {
    client: reqwest::Client,
    pagespeed_url: Url,
    crux_url: Url,
    api_key: Option<String>,
}

impl HttpPageSignals {
    pub fn new(
        pagespeed_url: &str,
        crux_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            pagespeed_url: parse_base(pagespeed_url)?,
            crux_url: parse_base(crux_url)?,
            api_key,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config
                .pagespeed_url
                .as_deref()
                .unwrap_or(endpoints::PAGESPEED_URL),
            config.crux_url.as_deref().unwrap_or(endpoints::CRUX_URL),
            config.api_key.clone(),
            config.timeout_duration(),
        )
    }

    fn with_key(&self, request: RequestBuilder) -> RequestBuilder {
        match self.api_key {
            Some(ref key) => request.query(&[("key", key.as_str())]),
            None => request,
        }
    }
}

/// Numeric value at `pointer`; percentiles are sometimes sent as strings.
fn number_at(value: &Value, pointer: &str) -> Option<f64> {
    match value.pointer(pointer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn lcp_category(lcp_ms: f64) -> &'static str {
    if lcp_ms <= 2500.0 {
        "FAST"
    } else if lcp_ms <= 4000.0 {
        "AVERAGE"
    } else {
        "SLOW"
    }
}

#[async_trait]
impl PageSignals for HttpPageSignals {
    async fn performance_audit(&self, url: &str) -> std::result::Result<PerformanceAudit, RemoteError> {
        let request = self
            .client
            .get(self.pagespeed_url.clone())
            .query(&[("url", url), ("strategy", "mobile"), ("category", "performance")]);
        let body: Value = send_json(self.with_key(request)).await?;

        Ok(PerformanceAudit {
            strategy: "mobile".to_string(),
            performance_score: number_at(&body, "/lighthouseResult/categories/performance/score")
                .map(|s| (s * 100.0).round()),
            lcp_ms: number_at(&body, "/lighthouseResult/audits/largest-contentful-paint/numericValue"),
            cls: number_at(&body, "/lighthouseResult/audits/cumulative-layout-shift/numericValue"),
            tbt_ms: number_at(&body, "/lighthouseResult/audits/total-blocking-time/numericValue"),
        })
    }

    async fn field_experience(&self, url: &str) -> std::result::Result<FieldExperience, RemoteError> {
        let request = self
            .client
            .post(self.crux_url.clone())
            .json(&serde_json::json!({ "url": url }));
        let body: Value = send_json(self.with_key(request)).await?;

        let lcp_p75_ms = number_at(&body, "/record/metrics/largest_contentful_paint/percentiles/p75");
        Ok(FieldExperience {
            lcp_p75_ms,
            inp_p75_ms: number_at(&body, "/record/metrics/interaction_to_next_paint/percentiles/p75"),
            cls_p75: number_at(&body, "/record/metrics/cumulative_layout_shift/percentiles/p75"),
            overall_category: lcp_p75_ms.map(|lcp| lcp_category(lcp).to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use crate::core::error::ErrorClass;
    use crate::core::types::{DateRange, Dimension, SearchType};
    use chrono::NaiveDate;
    use mockito::{Matcher, Server};
    use serde_json::json;

    const SITE: &str = "sc-domain:example.com";

    fn query() -> RowQuery {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 28).unwrap(),
        )
        .unwrap();
        RowQuery::new(range, vec![Dimension::Query, Dimension::Page], 1000)
    }

    fn console(server: &Server) -> HttpSearchConsole {
        HttpSearchConsole::new(&server.url(), Some("test-token".to_string()), Duration::from_secs(5))
            .unwrap()
    }

    #[test]
    fn test_query_body__shape() {
        let q = query()
            .with_search_type(SearchType::Image)
            .with_filters(vec![DimensionFilter::equals(Dimension::Country, "swe")]);
        let body = serde_json::to_value(QueryBody::from(&q)).unwrap();

        assert_eq!(
            body,
            json!({
                "startDate": "2024-05-01",
                "endDate": "2024-05-28",
                "dimensions": ["query", "page"],
                "rowLimit": 1000,
                "type": "image",
                "dimensionFilterGroups": [
                    {"filters": [{"dimension": "country", "operator": "equals", "expression": "swe"}]}
                ]
            })
        );
    }

    #[test]
    fn test_join_segments__encodes_site_url() {
        let base = Url::parse("https://api.example.test").unwrap();
        let url = join_segments(&base, &["sites", "https://example.com/", "query"]).unwrap();

        assert_eq!(
            url.as_str(),
            "https://api.example.test/sites/https:%2F%2Fexample.com%2F/query"
        );
    }

    #[tokio::test]
    async fn test_query_rows__decodes_rows() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/webmasters/v3/sites/sc-domain:example.com/searchAnalytics/query")
            .match_header("authorization", "Bearer test-token")
            .match_body(Matcher::PartialJson(json!({"rowLimit": 1000})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"rows": [
                    {"keys": ["rust", "https://example.com/a"], "clicks": 12, "impressions": 300, "ctr": 0.04, "position": 3.2}
                ]})
                .to_string(),
            )
            .create_async()
            .await;

        let rows = console(&server).query_rows(SITE, &query()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key(1), "https://example.com/a");
        assert_eq!(rows[0].clicks, 12);
    }

    #[tokio::test]
    async fn test_query_rows__missing_rows_is_empty() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", Matcher::Any)
            .with_status(200)
            .with_body(json!({"responseAggregationType": "byProperty"}).to_string())
            .create_async()
            .await;

        let rows = console(&server).query_rows(SITE, &query()).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_query_rows__permission_error_is_classified() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", Matcher::Any)
            .with_status(403)
            .with_body(
                json!({"error": {"code": 403, "message": "User does not have sufficient permission", "status": "PERMISSION_DENIED"}})
                    .to_string(),
            )
            .create_async()
            .await;

        let err = console(&server).query_rows(SITE, &query()).await.unwrap_err();
        assert_eq!(err.class, ErrorClass::PermissionDenied);
        assert_eq!(err.message, "User does not have sufficient permission");
    }

    #[tokio::test]
    async fn test_inspect_url__unwraps_index_status() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/v1/urlInspection/index:inspect")
            .match_body(Matcher::Json(json!({
                "inspectionUrl": "https://example.com/a",
                "siteUrl": SITE
            })))
            .with_status(200)
            .with_body(
                json!({"inspectionResult": {"indexStatusResult": {
                    "verdict": "PASS",
                    "coverageState": "Submitted and indexed",
                    "lastCrawlTime": "2024-05-20T10:00:00Z"
                }}})
                .to_string(),
            )
            .create_async()
            .await;

        let result = console(&server)
            .inspect_url(SITE, "https://example.com/a")
            .await
            .unwrap();

        assert_eq!(result.verdict, "PASS");
        assert_eq!(result.coverage_state, "Submitted and indexed");
        assert_eq!(result.last_crawl_time.as_deref(), Some("2024-05-20T10:00:00Z"));
        assert_eq!(result.google_canonical, None);
    }

    #[tokio::test]
    async fn test_page_signals__extracts_audit_and_field_data() {
        let mut server = Server::new_async().await;
        let _psi = server
            .mock("GET", "/psi")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("url".into(), "https://example.com/a".into()),
                Matcher::UrlEncoded("key".into(), "k".into()),
            ]))
            .with_status(200)
            .with_body(
                json!({"lighthouseResult": {
                    "categories": {"performance": {"score": 0.87}},
                    "audits": {
                        "largest-contentful-paint": {"numericValue": 2100.5},
                        "cumulative-layout-shift": {"numericValue": 0.02},
                        "total-blocking-time": {"numericValue": 150.0}
                    }
                }})
                .to_string(),
            )
            .create_async()
            .await;
        let _crux = server
            .mock("POST", "/crux")
            .match_query(Matcher::UrlEncoded("key".into(), "k".into()))
            .with_status(200)
            .with_body(
                json!({"record": {"metrics": {
                    "largest_contentful_paint": {"percentiles": {"p75": 3100}},
                    "interaction_to_next_paint": {"percentiles": {"p75": 180}},
                    "cumulative_layout_shift": {"percentiles": {"p75": "0.05"}}
                }}})
                .to_string(),
            )
            .create_async()
            .await;

        let signals = HttpPageSignals::new(
            &format!("{}/psi", server.url()),
            &format!("{}/crux", server.url()),
            Some("k".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();

        let audit = signals.performance_audit("https://example.com/a").await.unwrap();
        assert_eq!(audit.performance_score, Some(87.0));
        assert_eq!(audit.lcp_ms, Some(2100.5));
        assert_eq!(audit.tbt_ms, Some(150.0));

        let field = signals.field_experience("https://example.com/a").await.unwrap();
        assert_eq!(field.lcp_p75_ms, Some(3100.0));
        assert_eq!(field.cls_p75, Some(0.05));
        assert_eq!(field.overall_category.as_deref(), Some("AVERAGE"));
    }

    #[tokio::test]
    async fn test_field_experience__no_data_is_fatal() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/crux")
            .with_status(404)
            .with_body(
                json!({"error": {"code": 404, "message": "chrome ux report data not found", "status": "NOT_FOUND"}})
                    .to_string(),
            )
            .create_async()
            .await;

        let signals = HttpPageSignals::new(
            &format!("{}/psi", server.url()),
            &format!("{}/crux", server.url()),
            None,
            Duration::from_secs(5),
        )
        .unwrap();

        let err = signals.field_experience("https://example.com/a").await.unwrap_err();
        assert_eq!(err.class, ErrorClass::Fatal);
        assert_eq!(err.code.as_deref(), Some("NOT_FOUND"));
    }

    #[test]
    fn test_lcp_category() {
        assert_eq!(lcp_category(1200.0), "FAST");
        assert_eq!(lcp_category(3000.0), "AVERAGE");
        assert_eq!(lcp_category(5200.0), "SLOW");
    }
}

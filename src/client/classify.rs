//! Failure classification at the HTTP boundary

use reqwest::StatusCode;
use serde::Deserialize;

use crate::core::error::{ErrorClass, RemoteError};

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    reason: Option<String>,
}

fn is_quota_reason(reason: &str) -> bool {
    let reason = reason.to_ascii_lowercase();
    reason.contains("quota") || reason.contains("ratelimit") || reason.contains("rate_limit")
}

/// Turn a non-success response into a classified [`RemoteError`].
///
/// * 429, and 403 whose reason names a quota or rate limit: `QuotaExceeded`
/// * 401, other 403: `PermissionDenied`
/// * 408, 5xx: `Transient`
/// * anything else: `Fatal`
///
/// The code is the API reason when the body carries one, else the status.
pub fn classify_status(status: StatusCode, body: &str) -> RemoteError {
    let parsed = serde_json::from_str::<ApiErrorBody>(body).ok().map(|b| b.error);
    let reason = parsed
        .as_ref()
        .and_then(|e| e.errors.iter().find_map(|d| d.reason.clone()).or_else(|| e.status.clone()));
    let message = parsed
        .as_ref()
        .map(|e| e.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected response")
                .to_string()
        });

    let quota_reason = reason.as_deref().is_some_and(is_quota_reason);
    let class = match status.as_u16() {
        429 => ErrorClass::QuotaExceeded,
        403 if quota_reason => ErrorClass::QuotaExceeded,
        401 | 403 => ErrorClass::PermissionDenied,
        408 | 500..=599 => ErrorClass::Transient,
        _ => ErrorClass::Fatal,
    };

    RemoteError::new(class, message).with_code(reason.unwrap_or_else(|| status.as_u16().to_string()))
}

/// Classify a transport-level failure (no response received).
pub fn classify_transport(err: &reqwest::Error) -> RemoteError {
    if let Some(status) = err.status() {
        return classify_status(status, "");
    }

    let class = if err.is_timeout() || err.is_connect() || err.is_request() {
        ErrorClass::Transient
    } else {
        ErrorClass::Fatal
    };

    let message = std::error::Error::source(err)
        .map(|e| e.to_string())
        .unwrap_or_else(|| err.to_string());
    RemoteError::new(class, message)
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    #[test]
    fn test_classify_status__quota_and_rate_limits() {
        let err = classify_status(StatusCode::TOO_MANY_REQUESTS, "");
        assert_eq!(err.class, ErrorClass::QuotaExceeded);
        assert_eq!(err.code.as_deref(), Some("429"));

        let body = r#"{"error":{"code":403,"message":"Quota exceeded for quota metric","errors":[{"reason":"rateLimitExceeded"}]}}"#;
        let err = classify_status(StatusCode::FORBIDDEN, body);
        assert_eq!(err.class, ErrorClass::QuotaExceeded);
        assert_eq!(err.code.as_deref(), Some("rateLimitExceeded"));
        assert_eq!(err.message, "Quota exceeded for quota metric");
    }

    #[test]
    fn test_classify_status__permission_denied() {
        let body = r#"{"error":{"code":403,"message":"User does not have sufficient permission for site","status":"PERMISSION_DENIED"}}"#;
        let err = classify_status(StatusCode::FORBIDDEN, body);

        assert_eq!(err.class, ErrorClass::PermissionDenied);
        assert_eq!(err.code.as_deref(), Some("PERMISSION_DENIED"));
        assert!(!err.is_retryable());

        assert_eq!(
            classify_status(StatusCode::UNAUTHORIZED, "").class,
            ErrorClass::PermissionDenied
        );
    }

    #[test]
    fn test_classify_status__transient() {
        for status in [
            StatusCode::REQUEST_TIMEOUT,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
        ] {
            let err = classify_status(status, "<html>oops</html>");
            assert_eq!(err.class, ErrorClass::Transient, "status {status}");
            assert!(err.is_retryable());
        }
    }

    #[test]
    fn test_classify_status__fatal_falls_back_to_reason_phrase() {
        let err = classify_status(StatusCode::BAD_REQUEST, "not json");

        assert_eq!(err.class, ErrorClass::Fatal);
        assert_eq!(err.message, "Bad Request");
        assert_eq!(err.code.as_deref(), Some("400"));
    }

    #[test]
    fn test_is_quota_reason() {
        assert!(is_quota_reason("quotaExceeded"));
        assert!(is_quota_reason("userRateLimitExceeded"));
        assert!(is_quota_reason("RESOURCE_EXHAUSTED_RATE_LIMIT"));
        assert!(!is_quota_reason("forbidden"));
    }

    #[tokio::test]
    async fn test_classify_transport__connection_refused_is_transient() {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(2))
            .build()
            .unwrap();
        let err = client.get("http://127.0.0.1:1/").send().await.unwrap_err();

        assert_eq!(classify_transport(&err).class, ErrorClass::Transient);
    }
}

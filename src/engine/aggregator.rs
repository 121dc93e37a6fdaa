//! Partial-failure aggregation of independent remote sources
//!
//! Each source is settled on its own: a failure becomes a value, so one
//! broken source never hides the others.

use serde::{Serialize, Serializer};
use std::future::Future;

use crate::core::error::RemoteError;
use crate::engine::retry::{RetryPolicy, retry};

/// Error record embedded in place of a failed source's value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl From<RemoteError> for SourceFailure {
    fn from(err: RemoteError) -> Self {
        Self {
            error: err.message,
            code: err.code,
        }
    }
}

/// Settled result of one source.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome<T> {
    Ok(T),
    Failed(SourceFailure),
}

impl<T> SourceOutcome<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, SourceOutcome::Ok(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            SourceOutcome::Ok(value) => Some(value),
            SourceOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&SourceFailure> {
        match self {
            SourceOutcome::Ok(_) => None,
            SourceOutcome::Failed(failure) => Some(failure),
        }
    }
}

impl<T> From<Result<T, RemoteError>> for SourceOutcome<T> {
    fn from(result: Result<T, RemoteError>) -> Self {
        match result {
            Ok(value) => SourceOutcome::Ok(value),
            Err(err) => SourceOutcome::Failed(err.into()),
        }
    }
}

/// A success serializes as the bare value, a failure as `{"error", "code"}`.
impl<T: Serialize> Serialize for SourceOutcome<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SourceOutcome::Ok(value) => value.serialize(serializer),
            SourceOutcome::Failed(failure) => failure.serialize(serializer),
        }
    }
}

/// Run one source through the retry executor and settle it.
pub async fn settle<T, F, Fut>(policy: &RetryPolicy, source: &str, op: F) -> SourceOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RemoteError>>,
{
    let result = retry(policy, source, op).await;
    if let Err(ref err) = result {
        crate::logging::log_source_failure(source, err);
    }
    result.into()
}

/// Number of sources that settled successfully.
pub fn count_ok(outcomes: &[bool]) -> usize {
    outcomes.iter().filter(|ok| **ok).count()
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Composite {
        alpha: SourceOutcome<u32>,
        beta: SourceOutcome<String>,
    }

    #[tokio::test]
    async fn test_settle__success_and_failure_side_by_side() {
        let policy = RetryPolicy::none();

        let (alpha, beta) = futures::join!(
            settle(&policy, "alpha", || async { Ok::<_, RemoteError>(42u32) }),
            settle(&policy, "beta", || async {
                Err::<String, _>(RemoteError::fatal("not found").with_code("NOT_FOUND"))
            }),
        );

        assert_eq!(alpha, SourceOutcome::Ok(42));
        assert_eq!(
            beta.failure(),
            Some(&SourceFailure {
                error: "not found".to_string(),
                code: Some("NOT_FOUND".to_string()),
            })
        );
    }

    #[test]
    fn test_source_outcome__serializes_untagged() {
        let composite = Composite {
            alpha: SourceOutcome::Ok(7),
            beta: SourceOutcome::Failed(SourceFailure {
                error: "timed out".to_string(),
                code: None,
            }),
        };

        assert_eq!(
            serde_json::to_value(&composite).unwrap(),
            json!({"alpha": 7, "beta": {"error": "timed out"}})
        );
    }

    #[test]
    fn test_source_outcome__from_result() {
        let ok: SourceOutcome<u8> = Ok(1).into();
        let failed: SourceOutcome<u8> = Err(RemoteError::transient("down").with_code("503")).into();

        assert!(ok.is_ok());
        assert_eq!(ok.value(), Some(&1));
        assert!(!failed.is_ok());
        assert_eq!(failed.failure().unwrap().code.as_deref(), Some("503"));
    }

    #[test]
    fn test_count_ok() {
        assert_eq!(count_ok(&[true, false, true, true]), 3);
        assert_eq!(count_ok(&[]), 0);
    }
}

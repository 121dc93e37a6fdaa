//! Remote collaborator boundary
//!
//! The insight engine only sees these traits. Concrete adapters turn
//! transport and API errors into [`RemoteError`] values with an explicit
//! [`ErrorClass`](crate::core::ErrorClass), and never interpret them further.

pub mod classify;
pub mod http;

use async_trait::async_trait;

use crate::core::error::RemoteError;
use crate::core::types::{FieldExperience, InspectionResult, MetricRow, PerformanceAudit, RowQuery};

// Re-export commonly used items
pub use classify::{classify_status, classify_transport};
pub use http::{HttpPageSignals, HttpSearchConsole};

/// Search analytics source: row queries and URL inspection.
#[async_trait]
pub trait SearchAnalytics: Send + Sync {
    async fn query_rows(&self, site: &str, query: &RowQuery) -> Result<Vec<MetricRow>, RemoteError>;

    async fn inspect_url(&self, site: &str, url: &str) -> Result<InspectionResult, RemoteError>;
}

/// Page-level signal sources used by the health dashboard.
#[async_trait]
pub trait PageSignals: Send + Sync {
    async fn performance_audit(&self, url: &str) -> Result<PerformanceAudit, RemoteError>;

    async fn field_experience(&self, url: &str) -> Result<FieldExperience, RemoteError>;
}

// Persistence API trait for dashboard and report records
use crate::domain::dashboard::{Dashboard, DashboardUpdate, NewDashboard};
use crate::domain::report::{NewReport, Report, ReportPatch};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The expected `updated_at` precondition no longer matches the stored record
    #[error("{message}")]
    Conflict { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Conflict { .. } => Some(409),
            ApiError::NotFound { .. } => Some(404),
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(_) | ApiError::Decode(_) => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiError::Conflict { .. })
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[async_trait]
pub trait DashboardApi: Send + Sync {
    /// Fetch a dashboard with all of its reports
    async fn fetch_dashboard(&self, id: &str) -> ApiResult<Dashboard>;

    /// Create an empty dashboard record
    async fn create_dashboard(&self, draft: NewDashboard) -> ApiResult<Dashboard>;

    /// Update editable fields; fails with `ApiError::Conflict` when
    /// `expected_updated_at` is set and stale
    async fn update_dashboard(&self, id: &str, update: DashboardUpdate) -> ApiResult<Dashboard>;

    async fn publish_dashboard(
        &self,
        id: &str,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> ApiResult<Dashboard>;

    async fn create_report(&self, dashboard_id: &str, body: NewReport) -> ApiResult<Report>;

    async fn update_report(
        &self,
        dashboard_id: &str,
        report_id: &str,
        patch: ReportPatch,
    ) -> ApiResult<Report>;

    async fn delete_report(&self, dashboard_id: &str, report_id: &str) -> ApiResult<()>;
}

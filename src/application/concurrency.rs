// Optimistic concurrency guard - tracks the server's updated_at for the open dashboard
use crate::application::dashboard_api::ApiError;
use crate::application::error::SessionError;
use crate::domain::dashboard::Dashboard;
use chrono::{DateTime, Utc};

/// `version` is the dashboard version the server should hold if nobody else
/// has written since `token` was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyGuard {
    token: DateTime<Utc>,
    version: u64,
}

impl ConcurrencyGuard {
    pub fn new(dashboard: &Dashboard) -> Self {
        Self {
            token: dashboard.updated_at,
            version: dashboard.version_number,
        }
    }

    /// Last `updated_at` observed from the server; sent as the write precondition
    pub fn token(&self) -> DateTime<Utc> {
        self.token
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Adopt the dashboard returned by one of our own accepted writes
    pub fn observe(&mut self, dashboard: &Dashboard) {
        if dashboard.updated_at != self.token {
            tracing::debug!(previous = %self.token, current = %dashboard.updated_at, "concurrency token refreshed");
        }
        self.token = dashboard.updated_at;
        self.version = dashboard.version_number;
    }

    /// Count report writes the server accepted; each bumps the dashboard version by one
    pub fn record_own_writes(&mut self, count: u64) {
        self.version += count;
    }

    /// Advance the token to a re-fetched dashboard, but only when its version is
    /// exactly what our own writes account for. Any other writer leaves the old
    /// token in place so the next save is rejected as stale.
    pub fn reconcile(&mut self, latest: &Dashboard) -> bool {
        if latest.version_number != self.version {
            return false;
        }
        self.observe(latest);
        true
    }

    /// Map a failed write onto the session taxonomy, keeping conflicts distinct
    pub fn classify_write_error(error: ApiError) -> SessionError {
        match error {
            ApiError::Conflict { .. } => SessionError::conflict(),
            other => SessionError::Mutation {
                status: other.status(),
                message: other.to_string(),
            },
        }
    }

    pub fn classify_load_error(error: ApiError) -> SessionError {
        SessionError::Load {
            status: error.status(),
            message: error.to_string(),
        }
    }
}

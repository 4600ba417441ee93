use crate::domain::chart::ChartConfigError;
use thiserror::Error;

pub const CONFLICT_MESSAGE: &str =
    "This dashboard was modified in another session. Please reload to see the latest version.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Failed to load dashboard: {message}")]
    Load { message: String, status: Option<u16> },

    /// Optimistic-lock precondition rejected; only a reload clears it
    #[error("{message}")]
    Conflict { message: String },

    #[error("{message}")]
    Mutation { message: String, status: Option<u16> },

    #[error("Auto-save failed: {message}")]
    AutoSave { message: String, status: Option<u16> },

    /// The dashboard exists but some widgets could not be created
    #[error(
        "Dashboard was created but {} of {attempted} widgets could not be saved: {}",
        .failed.len(),
        .failed.join(", ")
    )]
    PartialWizard {
        dashboard_id: String,
        attempted: usize,
        failed: Vec<String>,
    },

    #[error("No dashboard is open")]
    NoSession,

    #[error("Report {0} is not on this dashboard")]
    UnknownReport(String),

    #[error("{0}")]
    Guard(String),

    #[error("Invalid chart configuration: {0}")]
    InvalidChart(#[from] ChartConfigError),
}

impl SessionError {
    pub fn conflict() -> Self {
        SessionError::Conflict {
            message: CONFLICT_MESSAGE.to_string(),
        }
    }

    /// HTTP-style status code, when the failure came from the persistence API
    pub fn status(&self) -> Option<u16> {
        match self {
            SessionError::Conflict { .. } => Some(409),
            SessionError::Load { status, .. }
            | SessionError::Mutation { status, .. }
            | SessionError::AutoSave { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, SessionError::Conflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_wizard_message() {
        let err = SessionError::PartialWizard {
            dashboard_id: "dash_1".to_string(),
            attempted: 3,
            failed: vec!["Revenue".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Dashboard was created but 1 of 3 widgets could not be saved: Revenue"
        );
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_conflict_status() {
        let err = SessionError::conflict();
        assert!(err.is_conflict());
        assert_eq!(err.status(), Some(409));
        assert_eq!(err.to_string(), CONFLICT_MESSAGE);
    }
}

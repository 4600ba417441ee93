// Dashboard domain model - aggregate root owning its reports
use super::chart::FilterClause;
use super::grid::GRID_COLUMNS;
use super::report::Report;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

/// Caller's capability on a dashboard, ordered from weakest to strongest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    #[default]
    View,
    Edit,
    Admin,
    Owner,
}

impl AccessLevel {
    pub fn allows(&self, required: AccessLevel) -> bool {
        *self >= required
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardLayout {
    pub columns: u32,
    pub row_height: u32,
}

impl Default for DashboardLayout {
    fn default() -> Self {
        Self {
            columns: GRID_COLUMNS,
            row_height: 80,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: DashboardStatus,
    #[serde(default)]
    pub layout: DashboardLayout,
    #[serde(default)]
    pub filters: Option<Vec<FilterClause>>,
    pub version_number: u64,
    pub created_at: DateTime<Utc>,
    /// Changes on every accepted write to the dashboard or any of its reports
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub access_level: AccessLevel,
    #[serde(default)]
    pub reports: Vec<Report>,
}

impl Dashboard {
    pub fn report(&self, id: &str) -> Option<&Report> {
        self.reports.iter().find(|r| r.id == id)
    }

    pub fn report_mut(&mut self, id: &str) -> Option<&mut Report> {
        self.reports.iter_mut().find(|r| r.id == id)
    }

    /// Replace the report with the same id, or append it when unknown
    pub fn upsert_report(&mut self, report: Report) {
        match self.reports.iter().position(|r| r.id == report.id) {
            Some(index) => self.reports[index] = report,
            None => self.reports.push(report),
        }
    }

    pub fn remove_report(&mut self, id: &str) -> Option<Report> {
        let index = self.reports.iter().position(|r| r.id == id)?;
        Some(self.reports.remove(index))
    }

    pub fn can_edit(&self) -> bool {
        self.access_level.allows(AccessLevel::Edit)
    }

    pub fn is_draft(&self) -> bool {
        self.status == DashboardStatus::Draft
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDashboard {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Editable dashboard fields plus the optimistic-lock precondition
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DashboardUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<DashboardLayout>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<FilterClause>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PublishRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_updated_at: Option<DateTime<Utc>>,
}

/// Local-only edit of the dashboard's descriptive fields
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetaPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

// In-memory keyed record store implementing the persistence API
use crate::application::dashboard_api::{ApiError, ApiResult, DashboardApi};
use crate::domain::dashboard::{
    AccessLevel, Dashboard, DashboardLayout, DashboardStatus, DashboardUpdate, NewDashboard,
};
use crate::domain::report::{NewReport, Report, ReportPatch};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct StoreState {
    dashboards: HashMap<String, Dashboard>,
    next_id: u64,
    last_write: Option<DateTime<Utc>>,
}

impl StoreState {
    /// Strictly increasing write timestamp, so every accepted write yields a new token
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let next = match self.last_write {
            Some(previous) if now <= previous => previous + chrono::Duration::microseconds(1),
            _ => now,
        };
        self.last_write = Some(next);
        next
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}_{}", prefix, self.next_id)
    }

    fn dashboard_mut(&mut self, id: &str) -> ApiResult<&mut Dashboard> {
        self.dashboards.get_mut(id).ok_or_else(|| ApiError::NotFound {
            message: format!("Dashboard {} not found", id),
        })
    }
}

fn check_precondition(dashboard: &Dashboard, expected: Option<DateTime<Utc>>) -> ApiResult<()> {
    match expected {
        Some(expected) if expected != dashboard.updated_at => Err(ApiError::Conflict {
            message: format!(
                "Dashboard {} was updated at {}, expected {}",
                dashboard.id, dashboard.updated_at, expected
            ),
        }),
        _ => Ok(()),
    }
}

fn bump(dashboard: &mut Dashboard, at: DateTime<Utc>) {
    dashboard.updated_at = at;
    dashboard.version_number += 1;
}

#[derive(Debug, Default)]
pub struct InMemoryDashboardStore {
    state: Mutex<StoreState>,
}

impl InMemoryDashboardStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of dashboard records
    pub fn len(&self) -> usize {
        self.state().dashboards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DashboardApi for InMemoryDashboardStore {
    async fn fetch_dashboard(&self, id: &str) -> ApiResult<Dashboard> {
        let mut state = self.state();
        let mut dashboard = state.dashboard_mut(id)?.clone();
        dashboard.reports.sort_by_key(|r| r.sort_order);
        Ok(dashboard)
    }

    async fn create_dashboard(&self, draft: NewDashboard) -> ApiResult<Dashboard> {
        if draft.name.trim().is_empty() {
            return Err(ApiError::Status {
                status: 400,
                message: "Dashboard name is required".to_string(),
            });
        }

        let mut state = self.state();
        let now = state.tick();
        let dashboard = Dashboard {
            id: state.next_id("dash"),
            name: draft.name,
            description: draft.description,
            status: DashboardStatus::Draft,
            layout: DashboardLayout::default(),
            filters: None,
            version_number: 1,
            created_at: now,
            updated_at: now,
            access_level: AccessLevel::Owner,
            reports: Vec::new(),
        };
        state.dashboards.insert(dashboard.id.clone(), dashboard.clone());
        tracing::debug!(dashboard = %dashboard.id, "dashboard record created");
        Ok(dashboard)
    }

    async fn update_dashboard(&self, id: &str, update: DashboardUpdate) -> ApiResult<Dashboard> {
        let mut state = self.state();
        let now = state.tick();
        let dashboard = state.dashboard_mut(id)?;
        check_precondition(dashboard, update.expected_updated_at)?;

        if let Some(name) = update.name {
            dashboard.name = name;
        }
        if let Some(description) = update.description {
            dashboard.description = Some(description);
        }
        if let Some(layout) = update.layout {
            dashboard.layout = layout;
        }
        if let Some(filters) = update.filters {
            dashboard.filters = Some(filters);
        }
        bump(dashboard, now);
        Ok(dashboard.clone())
    }

    async fn publish_dashboard(
        &self,
        id: &str,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> ApiResult<Dashboard> {
        let mut state = self.state();
        let now = state.tick();
        let dashboard = state.dashboard_mut(id)?;
        check_precondition(dashboard, expected_updated_at)?;

        dashboard.status = DashboardStatus::Published;
        bump(dashboard, now);
        Ok(dashboard.clone())
    }

    async fn create_report(&self, dashboard_id: &str, body: NewReport) -> ApiResult<Report> {
        let mut state = self.state();
        state.dashboard_mut(dashboard_id)?;
        let now = state.tick();
        let report_id = state.next_id("rpt");
        let dashboard = state.dashboard_mut(dashboard_id)?;

        let report = Report {
            id: report_id,
            name: body.name,
            description: body.description,
            dataset: body.dataset,
            chart: body.chart,
            position: body.position,
            sort_order: body.sort_order.unwrap_or(dashboard.reports.len() as i32),
            created_by: None,
            created_at: now,
            updated_at: now,
            warnings: Vec::new(),
        };
        dashboard.reports.push(report.clone());
        bump(dashboard, now);
        Ok(report)
    }

    async fn update_report(
        &self,
        dashboard_id: &str,
        report_id: &str,
        patch: ReportPatch,
    ) -> ApiResult<Report> {
        let mut state = self.state();
        let now = state.tick();
        let dashboard = state.dashboard_mut(dashboard_id)?;
        let Some(report) = dashboard.report_mut(report_id) else {
            return Err(ApiError::NotFound {
                message: format!("Report {} not found", report_id),
            });
        };

        patch.apply_to(report);
        report.updated_at = now;
        let report = report.clone();
        bump(dashboard, now);
        Ok(report)
    }

    async fn delete_report(&self, dashboard_id: &str, report_id: &str) -> ApiResult<()> {
        let mut state = self.state();
        let now = state.tick();
        let dashboard = state.dashboard_mut(dashboard_id)?;
        if dashboard.remove_report(report_id).is_none() {
            return Err(ApiError::NotFound {
                message: format!("Report {} not found", report_id),
            });
        }
        bump(dashboard, now);
        Ok(())
    }
}

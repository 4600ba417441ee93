// Scripted persistence API for session tests: counts calls and injects failures
use crate::application::dashboard_api::{ApiError, ApiResult, DashboardApi};
use crate::domain::catalog::CatalogItem;
use crate::domain::chart::{ChartConfig, ChartKind};
use crate::domain::dashboard::{Dashboard, DashboardUpdate, NewDashboard};
use crate::domain::grid::GridPosition;
use crate::domain::report::{NewReport, Report, ReportPatch};
use crate::infrastructure::memory_store::InMemoryDashboardStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    FetchDashboard,
    CreateDashboard,
    UpdateDashboard,
    PublishDashboard,
    CreateReport,
    UpdateReport,
    DeleteReport,
}

#[derive(Debug, Clone)]
enum Rule {
    Nth(Call, usize),
    Always(Call),
    Report(Call, String),
}

#[derive(Debug, Default)]
pub struct ScriptedApi {
    store: InMemoryDashboardStore,
    calls: Mutex<Vec<Call>>,
    rules: Mutex<Vec<Rule>>,
    stalled: Mutex<Vec<Call>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct access to the backing records, bypassing counting and failures
    pub fn store(&self) -> &InMemoryDashboardStore {
        &self.store
    }

    pub fn count(&self, call: Call) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == call).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Fail the nth (1-based) call of this kind
    pub fn fail_nth(&self, call: Call, n: usize) {
        self.rules.lock().unwrap().push(Rule::Nth(call, n));
    }

    pub fn fail_always(&self, call: Call) {
        self.rules.lock().unwrap().push(Rule::Always(call));
    }

    /// Fail every call of this kind that targets the given report
    pub fn fail_report(&self, call: Call, report_id: &str) {
        self.rules
            .lock()
            .unwrap()
            .push(Rule::Report(call, report_id.to_string()));
    }

    pub fn clear_failures(&self) {
        self.rules.lock().unwrap().clear();
    }

    /// Calls of this kind never complete, so callers can be dropped mid-request
    pub fn stall(&self, call: Call) {
        self.stalled.lock().unwrap().push(call);
    }

    async fn hold_if_stalled(&self, call: Call) {
        let stalled = self.stalled.lock().unwrap().contains(&call);
        if stalled {
            std::future::pending::<()>().await;
        }
    }

    fn check(&self, call: Call, report_id: Option<&str>) -> ApiResult<()> {
        let nth = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(call);
            calls.iter().filter(|c| **c == call).count()
        };
        let fails = self.rules.lock().unwrap().iter().any(|rule| match rule {
            Rule::Nth(c, n) => *c == call && *n == nth,
            Rule::Always(c) => *c == call,
            Rule::Report(c, id) => *c == call && report_id == Some(id.as_str()),
        });
        if fails {
            return Err(ApiError::Status {
                status: 500,
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DashboardApi for ScriptedApi {
    async fn fetch_dashboard(&self, id: &str) -> ApiResult<Dashboard> {
        self.check(Call::FetchDashboard, None)?;
        self.hold_if_stalled(Call::FetchDashboard).await;
        self.store.fetch_dashboard(id).await
    }

    async fn create_dashboard(&self, draft: NewDashboard) -> ApiResult<Dashboard> {
        self.check(Call::CreateDashboard, None)?;
        self.store.create_dashboard(draft).await
    }

    async fn update_dashboard(&self, id: &str, update: DashboardUpdate) -> ApiResult<Dashboard> {
        self.check(Call::UpdateDashboard, None)?;
        self.store.update_dashboard(id, update).await
    }

    async fn publish_dashboard(
        &self,
        id: &str,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> ApiResult<Dashboard> {
        self.check(Call::PublishDashboard, None)?;
        self.store.publish_dashboard(id, expected_updated_at).await
    }

    async fn create_report(&self, dashboard_id: &str, body: NewReport) -> ApiResult<Report> {
        self.check(Call::CreateReport, None)?;
        self.store.create_report(dashboard_id, body).await
    }

    async fn update_report(
        &self,
        dashboard_id: &str,
        report_id: &str,
        patch: ReportPatch,
    ) -> ApiResult<Report> {
        self.check(Call::UpdateReport, Some(report_id))?;
        self.store.update_report(dashboard_id, report_id, patch).await
    }

    async fn delete_report(&self, dashboard_id: &str, report_id: &str) -> ApiResult<()> {
        self.check(Call::DeleteReport, Some(report_id))?;
        self.store.delete_report(dashboard_id, report_id).await
    }
}

pub fn kpi_report(name: &str, position: GridPosition) -> NewReport {
    NewReport {
        name: name.to_string(),
        description: None,
        dataset: "orders".to_string(),
        chart: ChartConfig::kpi("order_count").unwrap(),
        position,
        sort_order: None,
    }
}

pub fn catalog_item(id: &str, name: &str) -> CatalogItem {
    CatalogItem {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        category: "sales".to_string(),
        dataset: "orders".to_string(),
        chart: ChartConfig::series(ChartKind::Bar, vec!["net_sales".to_string()], vec!["day".to_string()])
            .unwrap(),
    }
}

/// Create a draft dashboard with three KPI reports stacked in a row
pub async fn seed_dashboard(api: &ScriptedApi) -> Dashboard {
    let store = api.store();
    let dashboard = store
        .create_dashboard(NewDashboard {
            name: "Sales overview".to_string(),
            description: Some("Daily numbers".to_string()),
        })
        .await
        .unwrap();
    for (index, name) in ["Orders", "Revenue", "Refunds"].iter().enumerate() {
        store
            .create_report(&dashboard.id, kpi_report(name, GridPosition::new(index as u32 * 2, 0, 2, 2)))
            .await
            .unwrap();
    }
    store.fetch_dashboard(&dashboard.id).await.unwrap()
}

// HTTP request handlers for the dashboard record API
use crate::application::dashboard_api::ApiError;
use crate::domain::chart::ChartConfigError;
use crate::domain::dashboard::{Dashboard, DashboardUpdate, NewDashboard, PublishRequest};
use crate::domain::report::{NewReport, Report, ReportPatch};
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::sync::Arc;

/// Error payload shared by every route: `{ "error": message }`
#[derive(Debug)]
pub struct HandlerError {
    status: StatusCode,
    message: String,
}

impl From<ApiError> for HandlerError {
    fn from(error: ApiError) -> Self {
        let status = error
            .status()
            .and_then(|s| StatusCode::from_u16(s).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %error, "dashboard store failure");
        }
        Self {
            status,
            message: error.to_string(),
        }
    }
}

impl From<ChartConfigError> for HandlerError {
    fn from(error: ChartConfigError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

type HandlerResult<T> = Result<Json<T>, HandlerError>;

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn get_dashboard(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> HandlerResult<Dashboard> {
    Ok(Json(state.store.fetch_dashboard(&id).await?))
}

pub async fn create_dashboard(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<NewDashboard>,
) -> Result<(StatusCode, Json<Dashboard>), HandlerError> {
    let dashboard = state.store.create_dashboard(draft).await?;
    tracing::info!(dashboard = %dashboard.id, "dashboard created");
    Ok((StatusCode::CREATED, Json(dashboard)))
}

pub async fn update_dashboard(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(update): Json<DashboardUpdate>,
) -> HandlerResult<Dashboard> {
    Ok(Json(state.store.update_dashboard(&id, update).await?))
}

pub async fn publish_dashboard(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<PublishRequest>,
) -> HandlerResult<Dashboard> {
    let dashboard = state
        .store
        .publish_dashboard(&id, request.expected_updated_at)
        .await?;
    tracing::info!(dashboard = %dashboard.id, "dashboard published");
    Ok(Json(dashboard))
}

pub async fn create_report(
    Path(dashboard_id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewReport>,
) -> Result<(StatusCode, Json<Report>), HandlerError> {
    body.chart.validate()?;
    let report = state.store.create_report(&dashboard_id, body).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn update_report(
    Path((dashboard_id, report_id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
    Json(patch): Json<ReportPatch>,
) -> HandlerResult<Report> {
    if let Some(chart) = &patch.chart {
        chart.validate()?;
    }
    Ok(Json(
        state
            .store
            .update_report(&dashboard_id, &report_id, patch)
            .await?,
    ))
}

pub async fn delete_report(
    Path((dashboard_id, report_id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, HandlerError> {
    state.store.delete_report(&dashboard_id, &report_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

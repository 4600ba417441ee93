// Presentation layer - HTTP routes over the dashboard record store
pub mod app_state;
pub mod handlers;

use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    create_dashboard, create_report, delete_report, get_dashboard, health_check,
    publish_dashboard, update_dashboard, update_report,
};
use axum::{
    Router,
    routing::{get, patch, post},
};
use std::sync::Arc;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/dashboards", post(create_dashboard))
        .route("/dashboards/:id", get(get_dashboard).patch(update_dashboard))
        .route("/dashboards/:id/publish", post(publish_dashboard))
        .route("/dashboards/:id/reports", post(create_report))
        .route(
            "/dashboards/:id/reports/:report_id",
            patch(update_report).delete(delete_report),
        )
        .with_state(state)
}

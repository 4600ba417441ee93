// HTTP implementation of the persistence API
use crate::application::dashboard_api::{ApiError, ApiResult, DashboardApi};
use crate::domain::dashboard::{Dashboard, DashboardUpdate, NewDashboard, PublishRequest};
use crate::domain::report::{NewReport, Report, ReportPatch};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Clone)]
pub struct HttpDashboardApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDashboardApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn dashboard_url(&self, id: &str) -> String {
        format!("{}/dashboards/{}", self.base_url, urlencoding::encode(id))
    }

    fn report_url(&self, dashboard_id: &str, report_id: &str) -> String {
        format!(
            "{}/reports/{}",
            self.dashboard_url(dashboard_id),
            urlencoding::encode(report_id)
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("Accept", "application/json")
    }

    async fn send(&self, request: RequestBuilder) -> ApiResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or(body);
        tracing::debug!(status = status.as_u16(), %message, "dashboard api returned an error");

        Err(match status {
            StatusCode::CONFLICT => ApiError::Conflict { message },
            StatusCode::NOT_FOUND => ApiError::NotFound { message },
            other => ApiError::Status {
                status: other.as_u16(),
                message,
            },
        })
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl DashboardApi for HttpDashboardApi {
    async fn fetch_dashboard(&self, id: &str) -> ApiResult<Dashboard> {
        let url = self.dashboard_url(id);
        self.json(self.request(Method::GET, &url)).await
    }

    async fn create_dashboard(&self, draft: NewDashboard) -> ApiResult<Dashboard> {
        let url = format!("{}/dashboards", self.base_url);
        self.json(self.request(Method::POST, &url).json(&draft)).await
    }

    async fn update_dashboard(&self, id: &str, update: DashboardUpdate) -> ApiResult<Dashboard> {
        let url = self.dashboard_url(id);
        self.json(self.request(Method::PATCH, &url).json(&update)).await
    }

    async fn publish_dashboard(
        &self,
        id: &str,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> ApiResult<Dashboard> {
        let url = format!("{}/publish", self.dashboard_url(id));
        let body = PublishRequest { expected_updated_at };
        self.json(self.request(Method::POST, &url).json(&body)).await
    }

    async fn create_report(&self, dashboard_id: &str, body: NewReport) -> ApiResult<Report> {
        let url = format!("{}/reports", self.dashboard_url(dashboard_id));
        self.json(self.request(Method::POST, &url).json(&body)).await
    }

    async fn update_report(
        &self,
        dashboard_id: &str,
        report_id: &str,
        patch: ReportPatch,
    ) -> ApiResult<Report> {
        let url = self.report_url(dashboard_id, report_id);
        self.json(self.request(Method::PATCH, &url).json(&patch)).await
    }

    async fn delete_report(&self, dashboard_id: &str, report_id: &str) -> ApiResult<()> {
        let url = self.report_url(dashboard_id, report_id);
        self.send(self.request(Method::DELETE, &url)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_segments_are_encoded() {
        let api = HttpDashboardApi::with_client(reqwest::Client::new(), "http://localhost:8080/");

        assert_eq!(api.dashboard_url("dash_1"), "http://localhost:8080/dashboards/dash_1");
        assert_eq!(
            api.report_url("dash 1", "sales::17"),
            "http://localhost:8080/dashboards/dash%201/reports/sales%3A%3A17"
        );
    }
}

// HTTP implementation of the dashboard endpoints
use crate::application::dashboard_api::{
    ApiError, AuditEvent, ControlCommand, ControlResponse, DashboardApi, HistoricalData,
    PromptRequest, PromptResponse,
};
use crate::infrastructure::config::UpstreamSettings;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct HttpDashboardApi {
    client: reqwest::Client,
    historical_url: String,
    control_url: String,
    prompt_url: String,
    audit_url: String,
}

impl HttpDashboardApi {
    pub fn new(upstream: &UpstreamSettings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(upstream.request_timeout())
            .build()?;
        Ok(Self {
            client,
            historical_url: upstream.url(&upstream.historical_path),
            control_url: upstream.url(&upstream.control_path),
            prompt_url: upstream.url(&upstream.prompt_path),
            audit_url: upstream.url(&upstream.audit_path),
        })
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<reqwest::Response, ApiError> {
        self.client
            .post(url)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))
    }
}

/// Decodes the body whatever the status, since the control and prompt
/// endpoints report failures in the same shape as successes. Only an
/// undecodable non-2xx body becomes a status error.
async fn decode_reported<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))?;

    match serde_json::from_str::<T>(&body) {
        Ok(value) => Ok(value),
        Err(_) if !status.is_success() => Err(ApiError::Status {
            status: status.as_u16(),
            body,
        }),
        Err(e) => Err(ApiError::Decode(e.to_string())),
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status { status, body })
}

#[async_trait]
impl DashboardApi for HttpDashboardApi {
    async fn fetch_historical(&self) -> Result<HistoricalData, ApiError> {
        tracing::debug!("Fetching trend history from {}", self.historical_url);
        let response = self
            .client
            .get(&self.historical_url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        ensure_success(response)
            .await?
            .json::<HistoricalData>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn send_control(&self, command: &ControlCommand) -> Result<ControlResponse, ApiError> {
        let response = self.post(&self.control_url, command).await?;
        decode_reported(response).await
    }

    async fn ask(&self, request: &PromptRequest) -> Result<PromptResponse, ApiError> {
        let response = self.post(&self.prompt_url, request).await?;
        decode_reported(response).await
    }

    async fn audit(&self, event: &AuditEvent) -> Result<(), ApiError> {
        let response = self.post(&self.audit_url, event).await?;
        ensure_success(response).await.map(|_| ())
    }
}

use super::auth::AparaviAuth;
use super::types::*;
use super::PipelineExecutor;
use crate::config::PollingConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::sync::Arc;

pub struct AparaviRest {
    client: Client,
    auth: Arc<AparaviAuth>,
    base_url: String,
    task_name: String,
    polling: PollingConfig,
}

impl AparaviRest {
    pub fn new(
        auth: Arc<AparaviAuth>,
        base_url: &str,
        task_name: &str,
        polling: PollingConfig,
    ) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(1)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            auth,
            base_url: base_url.trim_end_matches('/').to_string(),
            task_name: task_name.to_string(),
            polling,
        })
    }

    /// Ask the service to check a pipeline without running it.
    pub async fn validate(&self, payload: &PipelinePayload) -> Result<ApiEnvelope> {
        let resp = self
            .request(Method::POST, "/pipe/validate", &[], Some(payload))
            .await?;
        if resp.status.as_deref() == Some("Error") {
            anyhow::bail!(
                "Validation failed: {}",
                resp.error_text().unwrap_or_else(|| "unknown error".to_string())
            );
        }
        Ok(resp)
    }

    /// Submit a pipeline for execution and return the handle of the new task.
    pub async fn start_task(&self, payload: &PipelinePayload) -> Result<TaskHandle> {
        let query = [("name", self.task_name.as_str())];
        let resp = self.request(Method::PUT, "/task", &query, Some(payload)).await?;
        let data = match (resp.status.as_deref(), resp.data.as_ref()) {
            (Some("OK"), Some(data)) if !data.is_null() => data.clone(),
            _ => anyhow::bail!(
                "Execution failed: {}",
                resp.error_text().unwrap_or_else(|| "no task data returned".to_string())
            ),
        };
        serde_json::from_value(data).context("execute response is missing the task token or type")
    }

    /// Poll a task until it finishes or the attempt budget runs out.
    /// Returns the `data` of the last poll.
    pub async fn wait_for_task(&self, handle: &TaskHandle) -> Result<Option<Value>> {
        let mut last = None;
        for attempt in 1..=self.polling.max_attempts {
            let resp = self.request(Method::GET, "/task", &handle.query(), None).await?;
            match resp.task_state() {
                TaskState::Finished => {
                    tracing::debug!(attempt, "task finished");
                    return Ok(resp.data);
                }
                TaskState::Failed => anyhow::bail!(
                    "Pipeline failed: {}",
                    resp.error_text()
                        .or_else(|| resp.data_error_text())
                        .unwrap_or_else(|| "unknown error".to_string())
                ),
                TaskState::Pending => {
                    tracing::debug!(attempt, "task still running");
                }
            }
            last = resp.data;
            if attempt < self.polling.max_attempts {
                tokio::time::sleep(self.polling.interval()).await;
            }
        }
        tracing::warn!(
            attempts = self.polling.max_attempts,
            "task did not report completion; tearing down anyway"
        );
        Ok(last)
    }

    /// Release a task. Returns the final task data if the service sends it.
    pub async fn teardown(&self, handle: &TaskHandle) -> Result<Option<Value>> {
        let resp = self.request(Method::DELETE, "/task", &handle.query(), None).await?;
        Ok(resp.data.filter(|d| !d.is_null()))
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&PipelinePayload>,
    ) -> Result<ApiEnvelope> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.request(method.clone(), &url);
        if !query.is_empty() {
            req = req.query(query);
        }
        for (k, v) in self.auth.headers() {
            req = req.header(k, v);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req
            .send()
            .await
            .with_context(|| format!("{} {} request failed", method, path))?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();

        if status == StatusCode::UNAUTHORIZED {
            anyhow::bail!("Authentication failed. Check your API key.");
        }
        if status.is_client_error() || status.is_server_error() {
            let message = serde_json::from_str::<ApiEnvelope>(&text)
                .ok()
                .and_then(|e| e.error_text())
                .unwrap_or_else(|| format!("API error {}", status.as_u16()));
            anyhow::bail!("{}", message);
        }

        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse {} {} response", method, path))
    }
}

#[async_trait]
impl PipelineExecutor for AparaviRest {
    async fn validate_pipeline(&self, pipeline: &Value) -> Result<()> {
        self.validate(&PipelinePayload::wrap(pipeline)).await?;
        Ok(())
    }

    async fn execute_pipeline_workflow(&self, pipeline: &Value) -> Result<Value> {
        let payload = PipelinePayload::wrap(pipeline);

        tracing::info!("validating pipeline");
        self.validate(&payload).await?;

        tracing::info!(task = %self.task_name, "executing pipeline");
        let handle = self.start_task(&payload).await?;
        tracing::debug!(token = %handle.token, task_type = %handle.task_type, "task started");

        let polled = self.wait_for_task(&handle).await?;

        tracing::info!("tearing down task");
        let final_data = self.teardown(&handle).await?;

        Ok(final_data.or(polled).unwrap_or(Value::Null))
    }
}

pub mod auth;
pub mod rest;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Runs a pipeline configuration to completion on a remote service and
/// returns whatever result the service reports.
#[async_trait]
pub trait PipelineExecutor: Send + Sync {
    /// Check a pipeline configuration without running it.
    async fn validate_pipeline(&self, pipeline: &Value) -> Result<()>;

    async fn execute_pipeline_workflow(&self, pipeline: &Value) -> Result<Value>;
}

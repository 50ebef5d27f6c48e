use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for the validate and execute endpoints.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PipelinePayload {
    pub pipeline: Value,
    pub errors: Value,
    pub warnings: Value,
}

impl PipelinePayload {
    /// Wrap a pipeline config for submission. Configs that already carry a
    /// `pipeline` key are treated as a pre-wrapped export and unpacked.
    pub fn wrap(config: &Value) -> Self {
        match present(config.get("pipeline")) {
            Some(inner) => Self {
                pipeline: inner.clone(),
                errors: present(config.get("errors")).cloned().unwrap_or_else(empty_list),
                warnings: present(config.get("warnings")).cloned().unwrap_or_else(empty_list),
            },
            None => Self {
                pipeline: config.clone(),
                errors: empty_list(),
                warnings: empty_list(),
            },
        }
    }
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn empty_list() -> Value {
    Value::Array(Vec::new())
}

/// Common `{status, data, error}` body returned by every endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiEnvelope {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl ApiEnvelope {
    pub fn error_text(&self) -> Option<String> {
        format_error(self.error.as_ref())
    }

    /// Error reported inside `data` (task failures put it there).
    pub fn data_error_text(&self) -> Option<String> {
        format_error(self.data.as_ref().and_then(|d| d.get("error")))
    }

    pub fn task_state(&self) -> TaskState {
        let status = self
            .data
            .as_ref()
            .and_then(|d| d.get("status"))
            .and_then(Value::as_str);
        TaskState::from_status(status)
    }
}

/// Render an API error value as text. Strings pass through, structured
/// errors are pretty-printed.
pub fn format_error(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string())),
    }
}

/// Identifies a running task; returned by the execute endpoint.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TaskHandle {
    pub token: String,
    #[serde(rename = "type")]
    pub task_type: String,
}

impl TaskHandle {
    pub fn query(&self) -> [(&str, &str); 2] {
        [("token", self.token.as_str()), ("type", self.task_type.as_str())]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Finished,
    Failed,
    Pending,
}

impl TaskState {
    pub fn from_status(status: Option<&str>) -> Self {
        match status {
            Some("Completed") | Some("Done") => TaskState::Finished,
            Some("Error") | Some("Failed") => TaskState::Failed,
            _ => TaskState::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wrap_bare_config() {
        let config = json!({"id": "p1", "components": []});
        let payload = PipelinePayload::wrap(&config);
        assert_eq!(payload.pipeline, config);
        assert_eq!(payload.errors, json!([]));
        assert_eq!(payload.warnings, json!([]));
    }

    #[test]
    fn test_wrap_exported_config() {
        let config = json!({
            "pipeline": {"components": [{"id": "a"}]},
            "warnings": ["old provider"],
            "errors": null
        });
        let payload = PipelinePayload::wrap(&config);
        assert_eq!(payload.pipeline, json!({"components": [{"id": "a"}]}));
        assert_eq!(payload.warnings, json!(["old provider"]));
        assert_eq!(payload.errors, json!([]));
    }

    #[test]
    fn test_wrap_null_pipeline_key_is_treated_as_bare() {
        let config = json!({"id": "p1", "pipeline": null});
        assert_eq!(PipelinePayload::wrap(&config).pipeline, config);
    }

    #[test]
    fn test_payload_serializes_all_fields() {
        let payload = PipelinePayload::wrap(&json!({"id": "p1"}));
        let body = serde_json::to_value(&payload).unwrap();
        assert_eq!(body, json!({"pipeline": {"id": "p1"}, "errors": [], "warnings": []}));
    }

    #[test]
    fn test_payload_keeps_config_key_order() {
        let raw = r#"{"pipeline":{"source":"webhook_1","components":[{"provider":"parse","id":"p"}]},"warnings":[]}"#;
        let config: Value = serde_json::from_str(raw).unwrap();
        let body = serde_json::to_string(&PipelinePayload::wrap(&config)).unwrap();
        assert_eq!(
            body,
            r#"{"pipeline":{"source":"webhook_1","components":[{"provider":"parse","id":"p"}]},"errors":[],"warnings":[]}"#
        );
    }

    #[test]
    fn test_envelope_tolerates_missing_fields() {
        let env: ApiEnvelope = serde_json::from_str("{}").unwrap();
        assert!(env.status.is_none());
        assert!(env.data.is_none());
        assert!(env.error_text().is_none());
        assert_eq!(env.task_state(), TaskState::Pending);
    }

    #[test]
    fn test_format_error_variants() {
        assert_eq!(format_error(None), None);
        assert_eq!(format_error(Some(&Value::Null)), None);
        assert_eq!(format_error(Some(&json!("boom"))).as_deref(), Some("boom"));
        assert_eq!(
            format_error(Some(&json!({"code": 7}))).as_deref(),
            Some("{\n  \"code\": 7\n}")
        );
    }

    #[test]
    fn test_task_state_from_poll_data() {
        let env: ApiEnvelope =
            serde_json::from_value(json!({"status": "OK", "data": {"status": "Done"}})).unwrap();
        assert_eq!(env.task_state(), TaskState::Finished);
        assert_eq!(TaskState::from_status(Some("Completed")), TaskState::Finished);
        assert_eq!(TaskState::from_status(Some("Failed")), TaskState::Failed);
        assert_eq!(TaskState::from_status(Some("Error")), TaskState::Failed);
        assert_eq!(TaskState::from_status(Some("Running")), TaskState::Pending);
        assert_eq!(TaskState::from_status(None), TaskState::Pending);
    }

    #[test]
    fn test_data_error_text() {
        let env: ApiEnvelope = serde_json::from_value(
            json!({"data": {"status": "Failed", "error": "disk full"}}),
        )
        .unwrap();
        assert_eq!(env.data_error_text().as_deref(), Some("disk full"));
    }

    #[test]
    fn test_task_handle_query() {
        let handle: TaskHandle =
            serde_json::from_value(json!({"token": "t-1", "type": "cpu"})).unwrap();
        assert_eq!(handle.query(), [("token", "t-1"), ("type", "cpu")]);
    }
}

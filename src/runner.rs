use crate::aparavi::PipelineExecutor;
use crate::config::{FileConfig, Settings};
use crate::output;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub pipeline_id: String,
    pub output_path: PathBuf,
    pub documents: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Execute,
    ValidateOnly,
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Executed(RunReport),
    Validated { pipeline_id: String },
}

/// Full command sequence. Settings (and so the API key) are resolved
/// before the executor is built or the pipeline config is touched.
pub async fn run_with<F, B, E>(
    lookup: F,
    file: FileConfig,
    build: B,
    mode: RunMode,
) -> Result<RunOutcome>
where
    F: Fn(&str) -> Option<String>,
    B: FnOnce(&Settings) -> Result<E>,
    E: PipelineExecutor,
{
    let settings = Settings::resolve(file, lookup)?;
    let executor = build(&settings)?;
    match mode {
        RunMode::Execute => {
            let report = run(&executor, &settings.pipeline_config, &settings.output).await?;
            Ok(RunOutcome::Executed(report))
        }
        RunMode::ValidateOnly => {
            let pipeline_id = validate(&executor, &settings.pipeline_config).await?;
            Ok(RunOutcome::Validated { pipeline_id })
        }
    }
}

/// Read the pipeline config and ask the executor to validate it.
/// Writes nothing.
pub async fn validate(executor: &dyn PipelineExecutor, config_path: &Path) -> Result<String> {
    let pipeline = read_pipeline_config(config_path)?;
    let id = pipeline_id(&pipeline)?;
    println!("Validating pipeline {} ...", id);
    executor.validate_pipeline(&pipeline).await?;
    println!("Pipeline is valid.");
    Ok(id)
}

/// Read and parse the pipeline config file.
pub fn read_pipeline_config(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read pipeline config: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse pipeline config JSON: {}", path.display()))
}

/// The config's `id`, rendered as text.
pub fn pipeline_id(config: &Value) -> Result<String> {
    match config.get("id") {
        Some(Value::String(id)) => Ok(id.clone()),
        Some(id) if !id.is_null() => Ok(id.to_string()),
        _ => anyhow::bail!("pipeline config has no \"id\" field"),
    }
}

fn has_components(config: &Value) -> bool {
    let inner = config
        .get("pipeline")
        .filter(|p| !p.is_null())
        .unwrap_or(config);
    inner.get("components").is_some_and(Value::is_array)
}

/// Read the pipeline config, hand it to the executor once, and write the
/// result to `output_path`. Nothing is executed unless the config parses
/// and carries an `id`; nothing is written unless execution succeeds.
pub async fn run(
    executor: &dyn PipelineExecutor,
    config_path: &Path,
    output_path: &Path,
) -> Result<RunReport> {
    let pipeline = read_pipeline_config(config_path)?;
    let id = pipeline_id(&pipeline)?;
    if !has_components(&pipeline) {
        tracing::warn!(pipeline = %id, "pipeline config has no \"components\" array");
    }

    println!("Executing pipeline {} ...", id);
    let result = executor.execute_pipeline_workflow(&pipeline).await?;
    println!("Pipeline execution complete.");

    output::write_results(output_path, &result)?;
    println!("Results saved to {}", output_path.display());

    let documents = output::document_count(&result);
    tracing::info!(pipeline = %id, documents, "run finished");

    Ok(RunReport {
        pipeline_id: id,
        output_path: output_path.to_path_buf(),
        documents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pipeline_id_forms() {
        assert_eq!(pipeline_id(&json!({"id": "abc"})).unwrap(), "abc");
        assert_eq!(pipeline_id(&json!({"id": 42})).unwrap(), "42");
        assert!(pipeline_id(&json!({"id": null})).is_err());
        assert!(pipeline_id(&json!({"name": "abc"})).is_err());
        assert!(pipeline_id(&json!(["id"])).is_err());
    }

    #[test]
    fn test_has_components() {
        assert!(has_components(&json!({"components": []})));
        assert!(has_components(&json!({"pipeline": {"components": [{}]}})));
        assert!(!has_components(&json!({"components": {}})));
        assert!(!has_components(&json!({"id": "x"})));
    }

    #[test]
    fn test_read_pipeline_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        let err = read_pipeline_config(&missing).unwrap_err();
        assert!(err.to_string().contains("Failed to read pipeline config"));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ not json").unwrap();
        let err = read_pipeline_config(&bad).unwrap_err();
        assert!(err.to_string().contains("Failed to parse pipeline config JSON"));
    }

    #[test]
    fn test_bundled_pipeline_config_is_runnable() {
        let config = read_pipeline_config(Path::new("pipelines/pipeline-config.json")).unwrap();
        assert!(pipeline_id(&config).is_ok());
        assert!(has_components(&config));
    }
}

use anyhow::Result;
use pipeline_runner::aparavi::{auth::AparaviAuth, rest::AparaviRest};
use pipeline_runner::config::{FileConfig, Settings, ENV_FILE, SETTINGS_FILE};
use pipeline_runner::runner::{self, RunMode};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn build_client(settings: &Settings) -> Result<AparaviRest> {
    let auth = Arc::new(AparaviAuth::new(settings.api_key.clone()));
    tracing::info!(base_url = %settings.base_url, api_key = %auth.redacted(), "using Aparavi API");
    AparaviRest::new(
        auth,
        &settings.base_url,
        &settings.task_name,
        settings.polling.clone(),
    )
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pipeline_runner=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mode = if std::env::args().any(|arg| arg == "--validate-only") {
        RunMode::ValidateOnly
    } else {
        RunMode::Execute
    };

    // Real env vars take precedence over .env
    if Settings::load_env_file(Path::new(ENV_FILE))? {
        tracing::debug!("loaded {}", ENV_FILE);
    }
    let file_config = FileConfig::load_optional(Path::new(SETTINGS_FILE))?;

    runner::run_with(|key| std::env::var(key).ok(), file_config, build_client, mode).await?;
    Ok(())
}

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_FILE: &str = ".env";
pub const SETTINGS_FILE: &str = "runner.toml";

pub const API_KEY_VAR: &str = "APARAVI_API_KEY";
pub const BASE_URL_VAR: &str = "APARAVI_BASE_URL";
pub const DEFAULT_BASE_URL: &str = "https://eaas.aparavi.com/";

/// Optional `runner.toml`. Every section and key may be omitted.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub aparavi: AparaviConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub polling: PollingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AparaviConfig {
    pub base_url: Option<String>,
    #[serde(default = "default_task_name")]
    pub task_name: String,
}

fn default_task_name() -> String {
    "my-task".to_string()
}

impl Default for AparaviConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            task_name: default_task_name(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    #[serde(default = "default_pipeline_config")]
    pub pipeline_config: PathBuf,
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

fn default_pipeline_config() -> PathBuf {
    PathBuf::from("pipelines").join("pipeline-config.json")
}

fn default_output() -> PathBuf {
    PathBuf::from("static").join("data").join("pipeline-results.json")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            pipeline_config: default_pipeline_config(),
            output: default_output(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollingConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_interval_ms() -> u64 { 5000 }
fn default_max_attempts() -> u32 { 200 }

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        let config: FileConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings TOML: {}", path.display()))?;
        Ok(config)
    }

    /// Like [`FileConfig::load`], but a missing file yields the defaults.
    pub fn load_optional(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }
}

/// Fully resolved run settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: String,
    pub base_url: String,
    pub task_name: String,
    pub pipeline_config: PathBuf,
    pub output: PathBuf,
    pub polling: PollingConfig,
}

impl Settings {
    /// Load a `.env` file into the process environment. Real env vars take
    /// precedence. Returns `false` when there is no file to load.
    pub fn load_env_file(path: &Path) -> Result<bool> {
        match dotenvy::from_path(path) {
            Ok(()) => Ok(true),
            Err(e) if e.not_found() => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to load {}", path.display())),
        }
    }

    /// Resolve settings with an arbitrary variable lookup.
    ///
    /// The API key is required and only ever comes from the environment.
    /// The base URL comes from the environment, then the settings file, then
    /// [`DEFAULT_BASE_URL`].
    pub fn resolve<F>(file: FileConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_VAR)
            .map(|k| sanitize_key(&k))
            .filter(|k| !k.is_empty())
            .with_context(|| format!("{} is not set", API_KEY_VAR))?;

        let base_url = lookup(BASE_URL_VAR)
            .map(|u| sanitize_key(&u))
            .filter(|u| !u.is_empty())
            .or(file.aparavi.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            api_key,
            base_url,
            task_name: file.aparavi.task_name,
            pipeline_config: file.paths.pipeline_config,
            output: file.paths.output,
            polling: file.polling,
        })
    }
}

/// Strip carriage returns, BOM, and other invisible chars from a key/URL value.
fn sanitize_key(raw: &str) -> String {
    raw.replace(['\r', '\u{feff}', '\u{200b}'], "")
        .trim()
        .to_string()
}

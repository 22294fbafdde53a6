//! Backend configuration and factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use moca_core::assisted::AssistedConfig;
use moca_core::traits::ModelBackend;

use crate::mock::MockBackend;
use crate::openai::OpenAiBackend;

/// Configuration for the model backend.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    OpenAI {
        #[serde(default)]
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
    },
    /// Offline backend that awards full marks on every model-assisted task.
    Mock,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::OpenAI {
            api_key: String::new(),
            base_url: None,
            org_id: None,
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::OpenAI {
                api_key,
                base_url,
                org_id,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &if api_key.is_empty() { "<unset>" } else { "***" })
                .field("base_url", base_url)
                .field("org_id", org_id)
                .finish(),
            ProviderConfig::Mock => f.write_str("Mock"),
        }
    }
}

/// Top-level moca configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MocaConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Model used for drawings and abstraction answers.
    #[serde(default = "default_model")]
    pub model: String,
    /// Per-call timeout. Ten to thirty seconds works well for vision calls.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Retries on transient backend errors, capped at one.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Delay before the retry in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Max concurrent drawing evaluations.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Output directory for sessions and reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_drawing_tokens")]
    pub drawing_max_tokens: u32,
    #[serde(default = "default_abstraction_tokens")]
    pub abstraction_max_tokens: u32,
    #[serde(default)]
    pub temperature: f64,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_timeout() -> u64 {
    20
}
fn default_retries() -> u32 {
    1
}
fn default_retry_delay() -> u64 {
    500
}
fn default_parallelism() -> usize {
    4
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./moca-results")
}
fn default_drawing_tokens() -> u32 {
    500
}
fn default_abstraction_tokens() -> u32 {
    50
}

impl Default for MocaConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            model: default_model(),
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
            parallelism: default_parallelism(),
            output_dir: default_output_dir(),
            drawing_max_tokens: default_drawing_tokens(),
            abstraction_max_tokens: default_abstraction_tokens(),
            temperature: 0.0,
        }
    }
}

impl MocaConfig {
    /// Settings for the model-assisted adapter.
    pub fn assisted_config(&self) -> AssistedConfig {
        AssistedConfig {
            model: self.model.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries.min(1),
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            drawing_max_tokens: self.drawing_max_tokens,
            text_max_tokens: self.abstraction_max_tokens,
            temperature: self.temperature,
        }
    }

    /// Whether the configured backend can make calls.
    pub fn has_credentials(&self) -> bool {
        match &self.provider {
            ProviderConfig::OpenAI { api_key, .. } => !api_key.trim().is_empty(),
            ProviderConfig::Mock => true,
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
/// Expand `${VAR}` references. Substituted values are not expanded again.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    let mut cursor = 0;
    while let Some(offset) = result[cursor..].find("${") {
        let start = cursor + offset;
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let value = std::env::var(&result[start + 2..start + end]).unwrap_or_default();
        result.replace_range(start..start + end + 1, &value);
        cursor = start + value.len();
    }
    result
}

fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    match config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => ProviderConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_deref().map(resolve_env_vars),
            org_id: org_id.as_deref().map(resolve_env_vars),
        },
        ProviderConfig::Mock => ProviderConfig::Mock,
    }
}

/// Apply key overrides; a later non-empty value wins.
fn apply_key_overrides(config: &mut MocaConfig, keys: &[Option<String>]) {
    let ProviderConfig::OpenAI { api_key, .. } = &mut config.provider else {
        return;
    };
    for key in keys.iter().flatten() {
        if !key.trim().is_empty() {
            *api_key = key.clone();
        }
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `moca.toml` in the current directory
/// 2. `~/.config/moca/config.toml`
///
/// Environment variable overrides: `OPENAI_API_KEY`, then `MOCA_OPENAI_KEY`.
pub fn load_config() -> Result<MocaConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<MocaConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("moca.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|home| home.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<MocaConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => MocaConfig::default(),
    };

    config.provider = resolve_provider_config(&config.provider);
    apply_key_overrides(
        &mut config,
        &[
            std::env::var("OPENAI_API_KEY").ok(),
            std::env::var("MOCA_OPENAI_KEY").ok(),
        ],
    );

    if !config.has_credentials() {
        warn!("no model API key configured; drawing and abstraction scoring will fail");
    }

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("moca"))
}

/// Create the model backend for a configuration.
pub fn create_backend(config: &MocaConfig) -> Result<Arc<dyn ModelBackend>> {
    match &config.provider {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => Ok(Arc::new(OpenAiBackend::new(
            Some(api_key.clone()),
            base_url.clone(),
            org_id.clone(),
            Some(config.timeout_secs),
        )?)),
        ProviderConfig::Mock => Ok(Arc::new(MockBackend::full_marks())),
    }
}

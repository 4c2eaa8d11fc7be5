// Configuration Storage Service
// Reads the analyzer config file; defaults apply when it is absent

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use super::prompt_builder::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use super::providers::{ANTHROPIC_DEFAULT_URL, ANTHROPIC_DEFAULT_VERSION};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_anthropic_version")]
    pub anthropic_version: String,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_url: default_api_url(),
            anthropic_version: default_anthropic_version(),
            request_timeout_secs: default_timeout(),
            proxy: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    pub enabled: bool,
    pub url: Option<String>,
}

fn default_model() -> String { DEFAULT_MODEL.to_string() }
fn default_max_tokens() -> u32 { DEFAULT_MAX_TOKENS }
fn default_api_url() -> String { ANTHROPIC_DEFAULT_URL.to_string() }
fn default_anthropic_version() -> String { ANTHROPIC_DEFAULT_VERSION.to_string() }
fn default_timeout() -> u64 { 120 }

pub struct ConfigStore {
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("content-analyzer"))
    }

    /// Load configuration; a missing file yields the defaults
    pub fn load(&self) -> Result<AppConfig> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file)
            .with_context(|| format!("Failed to read config {}", self.config_file.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", self.config_file.display()))
    }
}

/// Config from the default location, falling back to defaults on any problem.
pub fn load_default_config() -> AppConfig {
    let Some(dir) = ConfigStore::default_config_dir() else {
        return AppConfig::default();
    };
    match ConfigStore::new(dir).load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("[CONFIG] {:#}; using defaults", e);
            AppConfig::default()
        }
    }
}

//! AI settings document and provider factory.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use acuquiz_core::gateway::GatewayConfig;
use acuquiz_core::traits::TextGenerator;

use crate::openai::OpenAiCompatibleProvider;

/// Settings document version written by this crate.
pub const SETTINGS_VERSION: &str = "1.0";

/// Remote examiner settings, persisted as `settings.json`.
///
/// Note: Custom Debug impl masks the API key to prevent accidental exposure in logs.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model_name")]
    pub model_name: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Stored for the settings screen; question and grading calls use their
    /// own fixed temperatures.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    #[serde(default = "default_version")]
    pub version: String,
}

impl std::fmt::Debug for AppSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppSettings")
            .field("api_url", &self.api_url)
            .field("api_key", &"***")
            .field("model_name", &self.model_name)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("version", &self.version)
            .finish()
    }
}

fn default_api_url() -> String {
    Platform::DeepSeek.api_url().to_string()
}
fn default_model_name() -> String {
    Platform::DeepSeek.default_model().to_string()
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_temperature() -> f64 {
    0.7
}
fn default_top_p() -> f64 {
    0.9
}
fn default_version() -> String {
    SETTINGS_VERSION.to_string()
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: String::new(),
            model_name: default_model_name(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            version: default_version(),
        }
    }
}

impl AppSettings {
    /// URL, key and model are all present.
    pub fn is_valid(&self) -> bool {
        !self.api_url.trim().is_empty()
            && !self.api_key.trim().is_empty()
            && !self.model_name.trim().is_empty()
    }

    /// Point the settings at a platform preset, keeping the key.
    pub fn apply_platform(&mut self, platform: Platform) {
        self.api_url = platform.api_url().to_string();
        self.model_name = platform.default_model().to_string();
    }

    /// Gateway tunables derived from these settings.
    pub fn gateway_config(&self, timeout: Duration) -> GatewayConfig {
        GatewayConfig {
            model: self.model_name.clone(),
            timeout,
            max_tokens: Some(self.max_tokens),
            top_p: Some(self.top_p),
        }
    }
}

/// Known OpenAI-compatible platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    DeepSeek,
    OpenAi,
    Qwen,
    Zhipu,
    Moonshot,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::DeepSeek,
        Platform::OpenAi,
        Platform::Qwen,
        Platform::Zhipu,
        Platform::Moonshot,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Platform::DeepSeek => "deepseek",
            Platform::OpenAi => "openai",
            Platform::Qwen => "qwen",
            Platform::Zhipu => "zhipu",
            Platform::Moonshot => "moonshot",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Platform::DeepSeek => "DeepSeek",
            Platform::OpenAi => "OpenAI",
            Platform::Qwen => "阿里云通义千问",
            Platform::Zhipu => "智谱AI GLM",
            Platform::Moonshot => "月之暗面 Kimi",
        }
    }

    pub fn api_url(self) -> &'static str {
        match self {
            Platform::DeepSeek => "https://api.deepseek.com/v1/chat/completions",
            Platform::OpenAi => "https://api.openai.com/v1/chat/completions",
            Platform::Qwen => {
                "https://dashscope.aliyuncs.com/compatible-mode/v1/chat/completions"
            }
            Platform::Zhipu => "https://open.bigmodel.cn/api/paas/v4/chat/completions",
            Platform::Moonshot => "https://api.moonshot.cn/v1/chat/completions",
        }
    }

    pub fn models(self) -> &'static [&'static str] {
        match self {
            Platform::DeepSeek => &["deepseek-chat", "deepseek-reasoner"],
            Platform::OpenAi => &["gpt-4o-mini", "gpt-4o", "gpt-4-turbo"],
            Platform::Qwen => &["qwen-plus", "qwen-turbo", "qwen-max"],
            Platform::Zhipu => &["glm-4", "glm-4-flash"],
            Platform::Moonshot => &["moonshot-v1-8k", "moonshot-v1-32k", "moonshot-v1-128k"],
        }
    }

    pub fn default_model(self) -> &'static str {
        self.models()[0]
    }
}

impl std::str::FromStr for Platform {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Platform::ALL
            .into_iter()
            .find(|p| p.id() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = Platform::ALL.iter().map(|p| p.id()).collect();
                anyhow::anyhow!("unknown platform '{s}' (known: {})", known.join(", "))
            })
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Read the settings file as stored, without environment overrides.
///
/// A missing file yields the defaults; an unreadable or corrupt one is
/// logged and also yields the defaults.
pub fn read_settings_file(path: &Path) -> AppSettings {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return AppSettings::default(),
        Err(e) => {
            tracing::warn!("cannot read {}: {e}; using defaults", path.display());
            return AppSettings::default();
        }
    };
    match serde_json::from_str(&content) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("corrupt {}: {e}; using defaults", path.display());
            AppSettings::default()
        }
    }
}

/// Load settings for use.
///
/// Environment variable overrides: `ACUQUIZ_API_KEY`, `ACUQUIZ_API_URL`,
/// `ACUQUIZ_MODEL`. `${VAR}` references inside values are then resolved.
pub fn load_settings(path: &Path) -> AppSettings {
    let mut settings = read_settings_file(path);

    if let Ok(key) = std::env::var("ACUQUIZ_API_KEY") {
        settings.api_key = key;
    }
    if let Ok(url) = std::env::var("ACUQUIZ_API_URL") {
        settings.api_url = url;
    }
    if let Ok(model) = std::env::var("ACUQUIZ_MODEL") {
        settings.model_name = model;
    }

    settings.api_key = resolve_env_vars(&settings.api_key);
    settings.api_url = resolve_env_vars(&settings.api_url);
    settings.model_name = resolve_env_vars(&settings.model_name);
    settings
}

/// Write the settings document.
pub fn save_settings(path: &Path, settings: &AppSettings) -> Result<()> {
    let json = serde_json::to_string_pretty(settings).context("failed to serialize settings")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json)
        .with_context(|| format!("failed to write settings to {}", path.display()))?;
    Ok(())
}

/// Create a text generator from settings.
pub fn create_provider(settings: &AppSettings, timeout: Duration) -> Result<Arc<dyn TextGenerator>> {
    if !settings.is_valid() {
        anyhow::bail!("AI settings incomplete: api_url, api_key and model_name are required");
    }
    let provider =
        OpenAiCompatibleProvider::with_timeout(&settings.api_key, &settings.api_url, timeout)?;
    Ok(Arc::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_ACUQUIZ_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_ACUQUIZ_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_ACUQUIZ_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        std::env::remove_var("_ACUQUIZ_TEST_VAR");
    }

    #[test]
    fn default_settings() {
        let settings = AppSettings::default();
        assert_eq!(settings.model_name, "deepseek-chat");
        assert_eq!(settings.max_tokens, 1000);
        assert_eq!(settings.version, "1.0");
        assert!(!settings.is_valid());
    }

    #[test]
    fn debug_masks_api_key() {
        let settings = AppSettings {
            api_key: "sk-secret-value".into(),
            ..AppSettings::default()
        };
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("sk-secret-value"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn partial_document_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"api_key": "k", "model_name": "qwen-plus"}"#).unwrap();

        let settings = read_settings_file(&path);
        assert_eq!(settings.api_key, "k");
        assert_eq!(settings.model_name, "qwen-plus");
        assert_eq!(settings.api_url, Platform::DeepSeek.api_url());
        assert_eq!(settings.top_p, 0.9);
    }

    #[test]
    fn corrupt_or_missing_document_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        assert_eq!(read_settings_file(&path), AppSettings::default());

        std::fs::write(&path, "not json").unwrap();
        assert_eq!(read_settings_file(&path), AppSettings::default());
    }

    #[test]
    fn save_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut settings = AppSettings {
            api_key: "${SOME_KEY}".into(),
            ..AppSettings::default()
        };
        settings.apply_platform(Platform::Moonshot);

        save_settings(&path, &settings).unwrap();
        let loaded = read_settings_file(&path);
        assert_eq!(loaded, settings);
        assert_eq!(loaded.model_name, "moonshot-v1-8k");
    }

    #[test]
    fn platform_parsing() {
        assert_eq!("DeepSeek".parse::<Platform>().unwrap(), Platform::DeepSeek);
        assert_eq!("zhipu".parse::<Platform>().unwrap(), Platform::Zhipu);
        assert!("claude".parse::<Platform>().is_err());
    }

    #[test]
    fn create_provider_requires_valid_settings() {
        let timeout = Duration::from_secs(45);
        assert!(create_provider(&AppSettings::default(), timeout).is_err());

        let settings = AppSettings {
            api_key: "k".into(),
            ..AppSettings::default()
        };
        let provider = create_provider(&settings, timeout).unwrap();
        assert_eq!(provider.name(), "openai-compatible");
    }

    #[test]
    fn gateway_config_carries_model_and_limits() {
        let settings = AppSettings::default();
        let config = settings.gateway_config(Duration::from_secs(10));
        assert_eq!(config.model, "deepseek-chat");
        assert_eq!(config.max_tokens, Some(1000));
        assert_eq!(config.timeout, Duration::from_secs(10));
    }
}

//! CLI configuration (`acuquiz.toml`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "acuquiz.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Directory holding `used_items.json` and `settings.json`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Batch size when `--count` is not given.
    #[serde(default = "default_quantity")]
    pub default_quantity: usize,
    /// Bound on each AI examiner call.
    #[serde(default = "default_ai_timeout")]
    pub ai_timeout_secs: u64,
    /// Extra bank text files registered after the built-in banks.
    #[serde(default)]
    pub bank_files: Vec<PathBuf>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".acuquiz")
}
fn default_quantity() -> usize {
    10
}
fn default_ai_timeout() -> u64 {
    45
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            default_quantity: default_quantity(),
            ai_timeout_secs: default_ai_timeout(),
            bank_files: Vec::new(),
        }
    }
}

impl CliConfig {
    pub fn ai_timeout(&self) -> Duration {
        Duration::from_secs(self.ai_timeout_secs)
    }
}

/// Load config from an explicit path, or `acuquiz.toml` in the current
/// directory, or fall back to defaults.
///
/// Relative `bank_files` are resolved against the config file's directory.
pub fn load_config_from(path: Option<&Path>) -> Result<CliConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from(CONFIG_FILE);
            local.exists().then_some(local)
        }
    };

    let Some(config_path) = config_path else {
        return Ok(CliConfig::default());
    };

    let content = std::fs::read_to_string(&config_path)
        .with_context(|| format!("failed to read config: {}", config_path.display()))?;
    let mut config: CliConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse config: {}", config_path.display()))?;

    if let Some(base) = config_path.parent() {
        config.bank_files = config
            .bank_files
            .iter()
            .map(|p| if p.is_relative() { base.join(p) } else { p.clone() })
            .collect();
    }
    tracing::debug!(?config, "loaded {}", config_path.display());
    Ok(config)
}

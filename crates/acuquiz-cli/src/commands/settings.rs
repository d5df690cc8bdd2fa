//! The `acuquiz settings` command.

use anyhow::Result;

use acuquiz_providers::config::{read_settings_file, save_settings, AppSettings, Platform};

use crate::app::App;

/// Requested changes; `None` leaves a value as stored.
pub struct SettingsUpdate {
    pub platform: Option<String>,
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
}

impl SettingsUpdate {
    fn is_empty(&self) -> bool {
        self.platform.is_none()
            && self.api_url.is_none()
            && self.api_key.is_none()
            && self.model.is_none()
    }

    /// Platform preset first, so explicit values win over it.
    fn apply(self, settings: &mut AppSettings) -> Result<()> {
        if let Some(platform) = self.platform {
            settings.apply_platform(platform.parse::<Platform>()?);
        }
        if let Some(url) = self.api_url {
            settings.api_url = url;
        }
        if let Some(key) = self.api_key {
            settings.api_key = key;
        }
        if let Some(model) = self.model {
            settings.model_name = model;
        }
        Ok(())
    }
}

pub fn execute(app: &App, update: SettingsUpdate, list_platforms: bool) -> Result<()> {
    if list_platforms {
        for platform in Platform::ALL {
            println!("{:<10} {}", platform.id(), platform.display_name());
            println!("           {}", platform.api_url());
            println!("           models: {}", platform.models().join(", "));
        }
        return Ok(());
    }

    let path = app.settings_path();
    let mut settings = read_settings_file(&path);

    if !update.is_empty() {
        update.apply(&mut settings)?;
        save_settings(&path, &settings)?;
        println!("Saved {}", path.display());
    }

    println!("API URL:   {}", settings.api_url);
    println!("API key:   {}", mask_key(&settings.api_key));
    println!("Model:     {}", settings.model_name);
    println!("Max tokens: {}", settings.max_tokens);
    if !settings.is_valid() {
        println!("\nAI examiner is not configured; `acuquiz ask` will run offline.");
    }
    Ok(())
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    match chars.len() {
        0 => "(not set)".to_string(),
        n if n <= 8 => "*".repeat(n),
        n => {
            let head: String = chars[..3].iter().collect();
            let tail: String = chars[n - 4..].iter().collect();
            format!("{head}...{tail}")
        }
    }
}

//! The `acuquiz init` command.

use std::path::Path;

use anyhow::{Context, Result};

use crate::app::App;
use crate::config::CONFIG_FILE;

pub fn execute(app: &App) -> Result<()> {
    if Path::new(CONFIG_FILE).exists() {
        println!("{CONFIG_FILE} already exists, skipping.");
    } else {
        std::fs::write(CONFIG_FILE, SAMPLE_CONFIG)
            .with_context(|| format!("failed to write {CONFIG_FILE}"))?;
        println!("Created {CONFIG_FILE}");
    }

    std::fs::create_dir_all(&app.data_dir)
        .with_context(|| format!("failed to create {}", app.data_dir.display()))?;
    println!("Data directory: {}", app.data_dir.display());

    println!("\nNext steps:");
    println!("  1. Run: acuquiz banks");
    println!("  2. Run: acuquiz quiz bank_01_lung --count 5");
    println!("  3. Optional: acuquiz settings --platform deepseek --api-key <KEY>");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# acuquiz configuration

# Where used_items.json and settings.json live.
data_dir = ".acuquiz"

# Entries per quiz batch when --count is not given.
default_quantity = 10

# Upper bound in seconds on each AI examiner call.
ai_timeout_secs = 45

# Extra bank text files, relative to this file.
bank_files = []
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CliConfig;

    #[test]
    fn sample_config_parses_to_defaults() {
        let config: CliConfig = toml::from_str(SAMPLE_CONFIG).unwrap();
        let defaults = CliConfig::default();
        assert_eq!(config.data_dir, defaults.data_dir);
        assert_eq!(config.default_quantity, defaults.default_quantity);
        assert_eq!(config.ai_timeout_secs, defaults.ai_timeout_secs);
        assert!(config.bank_files.is_empty());
    }
}

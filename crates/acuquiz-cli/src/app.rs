//! Shared state for commands: config, data paths and the bank catalog.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use acuquiz_core::catalog::{BankCatalog, BankRegistry, BankSource};
use acuquiz_core::model::Bank;
use acuquiz_core::session::QuizSession;
use acuquiz_core::store::JsonUsedItemsStore;

use crate::config::{load_config_from, CliConfig};

pub const USED_ITEMS_FILE: &str = "used_items.json";
pub const SETTINGS_FILE: &str = "settings.json";

pub struct App {
    pub config: CliConfig,
    pub data_dir: PathBuf,
    pub catalog: BankCatalog,
}

impl App {
    /// Load config and build the catalog. `data_dir` overrides the config.
    pub fn load(config_path: Option<&Path>, data_dir: Option<PathBuf>) -> Result<Self> {
        let config = load_config_from(config_path)?;
        let data_dir = data_dir.unwrap_or_else(|| config.data_dir.clone());

        let registry = config
            .bank_files
            .iter()
            .fold(BankRegistry::builtin(), |registry, path| {
                registry.with_source(BankSource::from_file(path))
            });

        Ok(Self {
            config,
            data_dir,
            catalog: BankCatalog::new(registry),
        })
    }

    pub fn used_items_path(&self) -> PathBuf {
        self.data_dir.join(USED_ITEMS_FILE)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_FILE)
    }

    /// A session backed by the used-items file in the data directory.
    pub fn session(&self, seed: Option<u64>) -> QuizSession {
        let store = Arc::new(JsonUsedItemsStore::new(self.used_items_path()));
        match seed {
            Some(seed) => QuizSession::with_seed(store, seed),
            None => QuizSession::new(store),
        }
    }

    /// Resolve a bank by registry key, key without extension, or display name.
    pub fn bank(&mut self, name: &str) -> Result<Arc<Bank>> {
        let key = self
            .catalog
            .registry()
            .sources()
            .iter()
            .find(|s| {
                s.key == name
                    || s.display_name == name
                    || s.key.strip_suffix(".txt") == Some(name)
            })
            .map(|s| s.key.clone())
            .with_context(|| {
                let known = self.catalog.list_available_bank_keys().join(", ");
                format!("unknown bank '{name}' (available: {known})")
            })?;

        let bank = self.catalog.get_bank(&key)?;
        if bank.is_empty() {
            anyhow::bail!("bank '{}' has no entries", bank.display_name);
        }
        Ok(bank)
    }
}

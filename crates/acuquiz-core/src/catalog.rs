//! Bank registry and catalog.
//!
//! The registry is an immutable table of `(key, display name, text source)`
//! handed to the catalog at construction. The catalog parses banks on
//! demand and memoizes them per key.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::ParseError;
use crate::model::Bank;
use crate::parser::parse_bank;

/// Where a bank's raw text comes from.
#[derive(Debug, Clone)]
pub enum BankText {
    /// Text compiled into the binary.
    Embedded(&'static str),
    /// In-memory text, e.g. a synthetic table in tests.
    Owned(String),
    /// A text file read when the bank is first requested.
    File(PathBuf),
}

/// One registry row.
#[derive(Debug, Clone)]
pub struct BankSource {
    pub key: String,
    pub display_name: String,
    pub text: BankText,
}

impl BankSource {
    pub fn new(key: impl Into<String>, display_name: impl Into<String>, text: BankText) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            text,
        }
    }

    /// A registry row for a bank file on disk, keyed by its file name.
    pub fn from_file(path: &Path) -> Self {
        let key = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let display_name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| key.clone());
        Self::new(key, display_name, BankText::File(path.to_path_buf()))
    }

    fn load_text(&self) -> Result<String, ParseError> {
        match &self.text {
            BankText::Embedded(text) => Ok((*text).to_string()),
            BankText::Owned(text) => Ok(text.clone()),
            BankText::File(path) => {
                let bytes = std::fs::read(path).map_err(|e| ParseError::ResourceMissing {
                    key: self.key.clone(),
                    message: format!("{}: {e}", path.display()),
                })?;
                String::from_utf8(bytes).map_err(|_| ParseError::InvalidEncoding {
                    key: self.key.clone(),
                })
            }
        }
    }
}

/// Fixed table of bank sources.
#[derive(Debug, Clone, Default)]
pub struct BankRegistry {
    sources: Vec<BankSource>,
}

impl BankRegistry {
    pub fn new(sources: Vec<BankSource>) -> Self {
        Self { sources }
    }

    /// The banks shipped with acuquiz.
    pub fn builtin() -> Self {
        Self::new(vec![
            BankSource::new(
                "bank_01_lung.txt",
                "手太阴肺经",
                BankText::Embedded(include_str!("../banks/bank_01_lung.txt")),
            ),
            BankSource::new(
                "bank_02_large_intestine.txt",
                "手阳明大肠经",
                BankText::Embedded(include_str!("../banks/bank_02_large_intestine.txt")),
            ),
            BankSource::new(
                "bank_16_exam.txt",
                "盲医考必背",
                BankText::Embedded(include_str!("../banks/bank_16_exam.txt")),
            ),
        ])
    }

    /// Add a source, replacing any row with the same key.
    pub fn with_source(mut self, source: BankSource) -> Self {
        self.sources.retain(|s| s.key != source.key);
        self.sources.push(source);
        self
    }

    pub fn sources(&self) -> &[BankSource] {
        &self.sources
    }

    pub fn get(&self, key: &str) -> Option<&BankSource> {
        self.sources.iter().find(|s| s.key == key)
    }
}

/// Parses and caches the banks of a registry.
pub struct BankCatalog {
    registry: BankRegistry,
    cache: HashMap<String, Arc<Bank>>,
}

impl BankCatalog {
    pub fn new(registry: BankRegistry) -> Self {
        Self {
            registry,
            cache: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &BankRegistry {
        &self.registry
    }

    /// Every registered key, in registry order.
    pub fn list_available_bank_keys(&self) -> Vec<&str> {
        self.registry.sources.iter().map(|s| s.key.as_str()).collect()
    }

    /// Display name registered for a key.
    pub fn display_name(&self, key: &str) -> Option<&str> {
        self.registry.get(key).map(|s| s.display_name.as_str())
    }

    /// Parse a bank, or return the memoized copy.
    pub fn get_bank(&mut self, key: &str) -> Result<Arc<Bank>, ParseError> {
        if let Some(bank) = self.cache.get(key) {
            return Ok(Arc::clone(bank));
        }

        let source = self
            .registry
            .get(key)
            .ok_or_else(|| ParseError::UnknownBank {
                key: key.to_string(),
            })?;

        let text = source.load_text()?;
        let mut bank = parse_bank(&text, &source.key);
        bank.display_name = source.display_name.clone();

        let bank = Arc::new(bank);
        self.cache.insert(key.to_string(), Arc::clone(&bank));
        Ok(bank)
    }

    /// Every bank that parses and has at least one entry.
    ///
    /// Failing banks are logged and skipped; an empty result means there is
    /// no usable bank at all.
    pub fn load_available(&mut self) -> Vec<Arc<Bank>> {
        let keys: Vec<String> = self
            .registry
            .sources
            .iter()
            .map(|s| s.key.clone())
            .collect();

        let mut banks = Vec::new();
        for key in keys {
            match self.get_bank(&key) {
                Ok(bank) if bank.is_empty() => {
                    tracing::warn!("skipping {key}: no entries");
                }
                Ok(bank) => banks.push(bank),
                Err(e) => {
                    tracing::warn!("skipping {key}: {e}");
                }
            }
        }
        banks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic() -> BankRegistry {
        BankRegistry::new(vec![
            BankSource::new(
                "a.txt",
                "甲库",
                BankText::Owned("甲一\n定位：A\n\n甲二\n定位：B\n".into()),
            ),
            BankSource::new("empty.txt", "空库", BankText::Owned("\n\n".into())),
            BankSource::new(
                "missing.txt",
                "缺失",
                BankText::File(PathBuf::from("/nonexistent/acuquiz/missing.txt")),
            ),
        ])
    }

    #[test]
    fn lists_keys_in_registry_order() {
        let catalog = BankCatalog::new(synthetic());
        assert_eq!(
            catalog.list_available_bank_keys(),
            vec!["a.txt", "empty.txt", "missing.txt"]
        );
        assert_eq!(catalog.display_name("a.txt"), Some("甲库"));
    }

    #[test]
    fn get_bank_uses_registry_display_name_and_memoizes() {
        let mut catalog = BankCatalog::new(synthetic());
        let first = catalog.get_bank("a.txt").unwrap();
        let second = catalog.get_bank("a.txt").unwrap();

        assert_eq!(first.display_name, "甲库");
        assert_eq!(first.total_count(), 2);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn unknown_and_missing_banks_are_errors() {
        let mut catalog = BankCatalog::new(synthetic());
        assert!(matches!(
            catalog.get_bank("nope.txt"),
            Err(ParseError::UnknownBank { .. })
        ));
        let err = catalog.get_bank("missing.txt").unwrap_err();
        assert!(matches!(err, ParseError::ResourceMissing { .. }));
        assert_eq!(err.bank_key(), "missing.txt");
    }

    #[test]
    fn load_available_skips_failed_and_empty_banks() {
        let mut catalog = BankCatalog::new(synthetic());
        let banks = catalog.load_available();
        assert_eq!(banks.len(), 1);
        assert_eq!(banks[0].key, "a.txt");
    }

    #[test]
    fn invalid_utf8_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0x80]).unwrap();

        let mut catalog = BankCatalog::new(BankRegistry::new(vec![BankSource::from_file(&path)]));
        assert!(matches!(
            catalog.get_bank("bad.txt"),
            Err(ParseError::InvalidEncoding { .. })
        ));
        assert!(catalog.load_available().is_empty());
    }

    #[test]
    fn builtin_banks_all_parse() {
        let mut catalog = BankCatalog::new(BankRegistry::builtin());
        let banks = catalog.load_available();
        assert_eq!(banks.len(), 3);

        let lung = catalog.get_bank("bank_01_lung.txt").unwrap();
        assert_eq!(lung.display_name, "手太阴肺经");
        assert_eq!(lung.total_count(), 11);
        assert_eq!(lung.entry_names.first().map(String::as_str), Some("中府"));
        assert_eq!(lung.entry("太渊").unwrap().group, "手太阴肺经");

        let exam = catalog.get_bank("bank_16_exam.txt").unwrap();
        assert!(exam.has_group_headers);
        assert_eq!(exam.group_target("足阳明胃经"), Some("足三里"));
    }
}

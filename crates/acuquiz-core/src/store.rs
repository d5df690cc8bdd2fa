//! Used-items persistence.
//!
//! The JSON document written by [`JsonUsedItemsStore`]:
//!
//! ```json
//! { "version": "1.0", "used_items": { "bank_01_lung.txt": ["中府", "云门"] } }
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::traits::{UsedItems, UsedItemsStore};

/// Document version written by this crate.
pub const DOCUMENT_VERSION: &str = "1.0";

#[derive(Debug, Serialize, Deserialize)]
struct UsedItemsDocument {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    used_items: UsedItems,
}

/// Stores the used-items document as a JSON file.
///
/// Saves go to a temporary file in the same directory which is then renamed
/// over the target, so a crash never leaves a half-written document.
#[derive(Debug, Clone)]
pub struct JsonUsedItemsStore {
    path: PathBuf,
}

impl JsonUsedItemsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl UsedItemsStore for JsonUsedItemsStore {
    fn load(&self) -> UsedItems {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return UsedItems::new(),
            Err(e) => {
                tracing::warn!("cannot read {}: {e}; starting empty", self.path.display());
                return UsedItems::new();
            }
        };

        match serde_json::from_str::<UsedItemsDocument>(&content) {
            Ok(doc) => {
                if doc.version.as_deref() != Some(DOCUMENT_VERSION) {
                    tracing::debug!(
                        "used-items document version {:?}, reading anyway",
                        doc.version
                    );
                }
                doc.used_items
            }
            Err(e) => {
                tracing::warn!("corrupt {}: {e}; starting empty", self.path.display());
                UsedItems::new()
            }
        }
    }

    fn save(&self, items: &UsedItems) -> Result<(), StoreError> {
        let doc = UsedItemsDocument {
            version: Some(DOCUMENT_VERSION.to_string()),
            used_items: items.clone(),
        };
        let json = serde_json::to_string_pretty(&doc)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| self.io_error(e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| self.io_error(e))?;
        tmp.write_all(json.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_error(e.error))?;

        tracing::info!(
            banks = items.len(),
            "saved used items to {}",
            self.path.display()
        );
        Ok(())
    }
}

/// Keeps the mapping in memory only.
#[derive(Debug, Default)]
pub struct MemoryUsedItemsStore {
    items: Mutex<UsedItems>,
}

impl MemoryUsedItemsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: UsedItems) -> Self {
        Self {
            items: Mutex::new(items),
        }
    }
}

impl UsedItemsStore for MemoryUsedItemsStore {
    fn load(&self) -> UsedItems {
        self.items
            .lock()
            .map(|items| items.clone())
            .unwrap_or_default()
    }

    fn save(&self, items: &UsedItems) -> Result<(), StoreError> {
        match self.items.lock() {
            Ok(mut guard) => *guard = items.clone(),
            Err(poisoned) => *poisoned.into_inner() = items.clone(),
        }
        Ok(())
    }
}

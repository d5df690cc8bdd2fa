//! Core data model types for acuquiz.
//!
//! An [`Entry`] is one named record (an acupoint) with labeled text
//! fields; a [`Bank`] is the ordered collection of entries parsed from one
//! text resource.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The labeled fields an entry can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldLabel {
    Location,
    Treatment,
    SpecialCategory,
    Group,
    Method,
}

impl FieldLabel {
    /// All labels in display order.
    pub const ALL: [FieldLabel; 5] = [
        FieldLabel::Location,
        FieldLabel::Treatment,
        FieldLabel::SpecialCategory,
        FieldLabel::Group,
        FieldLabel::Method,
    ];

    /// The label as shown to the user and sent to the AI examiner.
    pub fn display_name(self) -> &'static str {
        match self {
            FieldLabel::Location => "定位",
            FieldLabel::Treatment => "主治",
            FieldLabel::SpecialCategory => "特定穴",
            FieldLabel::Group => "归经",
            FieldLabel::Method => "取穴",
        }
    }
}

impl fmt::Display for FieldLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for FieldLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "定位" | "location" => Ok(FieldLabel::Location),
            "主治" | "treatment" | "indication" => Ok(FieldLabel::Treatment),
            "特定穴" | "special" | "special_category" => Ok(FieldLabel::SpecialCategory),
            "归经" | "group" | "meridian" => Ok(FieldLabel::Group),
            "取穴" | "method" => Ok(FieldLabel::Method),
            other => Err(format!("unknown field label: {other}")),
        }
    }
}

/// One named record of a bank.
///
/// Fields are never absent: a field the source text did not provide is an
/// empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub treatment: String,
    #[serde(default)]
    pub special_category: String,
    /// Title of the section header the entry appeared under.
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub method: String,
}

impl Entry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Raw text of one field.
    pub fn field(&self, label: FieldLabel) -> &str {
        match label {
            FieldLabel::Location => &self.location,
            FieldLabel::Treatment => &self.treatment,
            FieldLabel::SpecialCategory => &self.special_category,
            FieldLabel::Group => &self.group,
            FieldLabel::Method => &self.method,
        }
    }

    /// Non-blank fields in display order, trimmed.
    pub fn fields(&self) -> Vec<(FieldLabel, &str)> {
        FieldLabel::ALL
            .iter()
            .map(|&label| (label, self.field(label).trim()))
            .filter(|(_, text)| !text.is_empty())
            .collect()
    }

    /// Whether at least one field carries text.
    pub fn has_fields(&self) -> bool {
        FieldLabel::ALL
            .iter()
            .any(|&label| !self.field(label).trim().is_empty())
    }
}

/// A section header and the entry a group jump should land on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupHeader {
    pub title: String,
    /// First entry name following the header, if any precedes the next header.
    pub first_entry: Option<String>,
}

/// A parsed bank.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bank {
    /// Stable registry key (e.g. `bank_01_lung.txt`).
    pub key: String,
    /// Human-readable name.
    pub display_name: String,
    /// Entry names in parse order, without duplicates.
    pub entry_names: Vec<String>,
    /// Entry details keyed by name.
    pub entries: HashMap<String, Entry>,
    /// Section headers in order of first appearance.
    pub groups: Vec<GroupHeader>,
    pub has_group_headers: bool,
}

impl Bank {
    pub fn new(key: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            ..Self::default()
        }
    }

    pub fn total_count(&self) -> usize {
        self.entry_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_names.is_empty()
    }

    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    /// Insert or overwrite an entry, keeping its first position in the order.
    pub fn upsert_entry(&mut self, entry: Entry) {
        if !self.entries.contains_key(&entry.name) {
            self.entry_names.push(entry.name.clone());
        }
        self.entries.insert(entry.name.clone(), entry);
    }

    /// Record a section header, or update its jump target if seen before.
    pub fn record_group(&mut self, title: &str, first_entry: Option<String>) {
        self.has_group_headers = true;
        match self.groups.iter_mut().find(|g| g.title == title) {
            Some(existing) => {
                if first_entry.is_some() {
                    existing.first_entry = first_entry;
                }
            }
            None => self.groups.push(GroupHeader {
                title: title.to_string(),
                first_entry,
            }),
        }
    }

    /// Entry a group jump should select.
    pub fn group_target(&self, title: &str) -> Option<&str> {
        self.groups
            .iter()
            .find(|g| g.title == title)
            .and_then(|g| g.first_entry.as_deref())
    }

    /// Entry names not in `used`, in bank order.
    pub fn remaining_items(&self, used: &HashSet<String>) -> Vec<&str> {
        self.entry_names
            .iter()
            .filter(|name| !used.contains(name.as_str()))
            .map(String::as_str)
            .collect()
    }
}

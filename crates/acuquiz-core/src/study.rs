//! Plain-text rendering for browsing a bank.

use crate::model::{Bank, Entry};

const MISSING: &str = "（无相关信息）";

/// Multi-line detail card for one entry.
///
/// Location and treatment are always shown; group, special category and
/// method only when present. Sections are separated by blank lines.
pub fn format_entry_details(entry: &Entry) -> String {
    let mut parts = vec![format!("【穴位名称】{}", entry.name)];

    let optional = |text: &str| {
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    };
    let required = |text: &str| optional(text).unwrap_or_else(|| MISSING.to_string());

    if let Some(group) = optional(&entry.group) {
        parts.push(format!("【归经】{group}"));
    }
    parts.push(format!("【定位】{}", required(&entry.location)));
    parts.push(format!("【主治】{}", required(&entry.treatment)));
    if let Some(special) = optional(&entry.special_category) {
        parts.push(format!("【特定穴】{special}"));
    }
    if let Some(method) = optional(&entry.method) {
        parts.push(format!("【取穴】{method}"));
    }

    parts.join("\n\n")
}

/// Section titles with the entry a jump to each should land on.
pub fn group_index(bank: &Bank) -> Vec<(&str, Option<&str>)> {
    bank.groups
        .iter()
        .map(|g| (g.title.as_str(), g.first_entry.as_deref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn details_show_placeholders_for_missing_core_fields() {
        let entry = Entry {
            name: "少商".into(),
            group: "手太阴肺经".into(),
            location: "拇指末节桡侧".into(),
            ..Entry::default()
        };
        assert_eq!(
            format_entry_details(&entry),
            "【穴位名称】少商\n\n【归经】手太阴肺经\n\n【定位】拇指末节桡侧\n\n【主治】（无相关信息）"
        );
    }

    #[test]
    fn details_include_optional_fields_when_present() {
        let entry = Entry {
            name: "列缺".into(),
            location: "桡骨茎突上方".into(),
            treatment: "头痛，项强".into(),
            special_category: "络穴".into(),
            method: "两手虎口交叉".into(),
            ..Entry::default()
        };
        let text = format_entry_details(&entry);
        assert!(!text.contains("【归经】"));
        assert!(text.contains("【特定穴】络穴"));
        assert!(text.ends_with("【取穴】两手虎口交叉"));
    }

    #[test]
    fn group_index_lists_targets() {
        let mut bank = Bank::new("k", "K");
        bank.record_group("甲经", Some("甲一".into()));
        bank.record_group("乙经", None);
        assert_eq!(
            group_index(&bank),
            vec![("甲经", Some("甲一")), ("乙经", None)]
        );
    }
}

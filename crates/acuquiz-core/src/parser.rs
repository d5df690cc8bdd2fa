//! Text bank parser.
//!
//! Turns a loosely formatted plain-text bank into a [`Bank`]. The format is
//! line oriented:
//!
//! ```text
//! # 手太阴肺经：
//! 中府：
//! 定位：在胸前壁外上方，前正中线旁开6寸。
//! 主治：咳嗽，气喘，胸痛。<br>肩背痛。
//!
//! 云门
//! 【定位】锁骨下窝凹陷处。
//! ```
//!
//! `#` lines are section headers, the first line of every other block is
//! the entry name and the remaining lines of the block are its body. Labeled
//! fields are cut out of the body by synonym label sets.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::{Bank, Entry};

/// Synonyms introducing the location field.
pub const LOCATION_LABELS: &[&str] = &["定位", "取穴", "位置"];

/// Synonyms introducing the treatment field.
pub const TREATMENT_LABELS: &[&str] = &[
    "主治",
    "主治病症",
    "主治病证",
    "主治功能",
    "功效",
    "作用",
    "适应症",
];

/// Synonyms introducing the special-category field.
pub const SPECIAL_LABELS: &[&str] = &["特定穴", "类别", "属性", "所属"];

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*#+\s*(\S.*\S|\S)\s*$").expect("valid header regex"));

static HTML_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid html tag regex"));

static METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)取穴[：:]?\s*([^取穴定位主治特定穴]+)").expect("valid method regex")
});

static LOCATION_RE: LazyLock<Regex> = LazyLock::new(|| label_regex(&[LOCATION_LABELS]));
static TREATMENT_RE: LazyLock<Regex> = LazyLock::new(|| label_regex(&[TREATMENT_LABELS]));
static SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| label_regex(&[SPECIAL_LABELS]));

/// Matches a label of any set at a line start; ends every field.
static BOUNDARY_RE: LazyLock<Regex> =
    LazyLock::new(|| label_regex(&[LOCATION_LABELS, TREATMENT_LABELS, SPECIAL_LABELS]));

/// Build a line-anchored label matcher: optional bracket, one of the
/// labels, optional closing bracket, optional colon, trailing whitespace.
///
/// Alternation is leftmost-first in list order, so `主治病症：` matches the
/// shorter `主治` and leaves `病症：` in the field text.
fn label_regex(sets: &[&[&str]]) -> Regex {
    let alternatives = sets
        .iter()
        .flat_map(|set| set.iter())
        .map(|label| regex::escape(label))
        .collect::<Vec<_>>()
        .join("|");
    let pattern =
        format!(r"(?mi)^\s*(?:[【\[\(]?\s*(?:{alternatives})\s*[】\]\)]?\s*[:：]?\s*)");
    Regex::new(&pattern).expect("valid label regex")
}

/// Parse a raw bank text. The display name defaults to the key's file stem;
/// the catalog replaces it with the registry name.
pub fn parse_bank(raw: &str, key: &str) -> Bank {
    let mut bank = Bank::new(key, default_display_name(key));

    let normalized = raw.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<&str> = normalized.split('\n').collect();

    let mut current_group = String::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim();

        if line.is_empty() {
            i += 1;
            continue;
        }

        if let Some(title) = header_title(line) {
            let next = find_next_entry_name(&lines, i + 1);
            bank.record_group(&title, next);
            current_group = title;
            i += 1;
            continue;
        }

        let name = strip_trailing_colon(line).to_string();
        let mut body: Vec<&str> = Vec::new();
        i += 1;

        while i < lines.len() {
            let body_line = lines[i];
            let trimmed = body_line.trim();

            if trimmed.is_empty() {
                i += 1;
                break;
            }
            // Header lines end the body and are handled by the outer loop.
            if HEADER_RE.is_match(trimmed) {
                break;
            }

            body.push(body_line.trim_end());
            i += 1;
        }

        if name.is_empty() {
            tracing::debug!(bank = key, "skipping block with an empty name");
            continue;
        }

        bank.upsert_entry(parse_entry(name, &body, &current_group));
    }

    tracing::debug!(
        bank = key,
        entries = bank.total_count(),
        groups = bank.groups.len(),
        "parsed bank"
    );

    bank
}

fn default_display_name(key: &str) -> String {
    Path::new(key)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| key.to_string())
}

fn header_title(line: &str) -> Option<String> {
    HEADER_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| strip_trailing_colon(m.as_str()).to_string())
}

/// The first entry name after a header, unless another header comes first.
fn find_next_entry_name(lines: &[&str], start: usize) -> Option<String> {
    for line in lines.iter().skip(start) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if HEADER_RE.is_match(line) {
            return None;
        }
        let name = strip_trailing_colon(line);
        return (!name.is_empty()).then(|| name.to_string());
    }
    None
}

fn parse_entry(name: String, body: &[&str], group: &str) -> Entry {
    let mut entry = Entry::new(name);
    entry.group = group.to_string();

    if body.is_empty() {
        return entry;
    }

    let text = body
        .iter()
        .map(|line| clean_html(line.trim()))
        .collect::<Vec<_>>()
        .join("\n");

    let sections = extract_sections(&text);
    entry.location = sections.location;
    entry.treatment = sections.treatment;
    entry.special_category = sections.special_category;
    entry.method = sections.method;
    entry
}

/// Fields cut out of one entry body.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Sections {
    pub location: String,
    pub treatment: String,
    pub special_category: String,
    pub method: String,
}

/// Split a cleaned body text into its labeled fields.
pub fn extract_sections(text: &str) -> Sections {
    let method = METHOD_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| normalize_text(m.as_str()))
        .unwrap_or_default();

    Sections {
        location: extract_labeled(text, &LOCATION_RE),
        treatment: extract_labeled(text, &TREATMENT_RE),
        special_category: extract_labeled(text, &SPECIAL_RE),
        method,
    }
}

/// Text from the first `target` label up to the next line opening with any
/// label, or the end of the text.
fn extract_labeled(text: &str, target: &Regex) -> String {
    let Some(label) = target.find(text) else {
        return String::new();
    };
    let start = label.end();
    // Every boundary match begins at a line start, so the leftmost one is the
    // nearest following labeled line.
    let end = BOUNDARY_RE
        .find_at(text, start)
        .map(|m| m.start())
        .unwrap_or(text.len());

    normalize_text(&text[start..end])
}

/// Replace line-break tags with newlines and drop every other tag.
pub fn clean_html(text: &str) -> String {
    let text = text
        .replace("<br />", "\n")
        .replace("<br>", "\n")
        .replace("<br/>", "\n");
    HTML_TAG_RE.replace_all(&text, "").into_owned()
}

/// Trim every line, collapse runs of blank lines into one, trim the result.
pub fn normalize_text(text: &str) -> String {
    let text = text.replace('\r', "");
    let mut cleaned: Vec<&str> = Vec::new();

    for line in text.split('\n') {
        let line = line.trim();
        if line.is_empty() && cleaned.last().is_some_and(|last| last.is_empty()) {
            continue;
        }
        cleaned.push(line);
    }

    cleaned.join("\n").trim().to_string()
}

/// Drop one trailing ASCII or full-width colon.
pub fn strip_trailing_colon(text: &str) -> &str {
    let text = text.trim();
    text.strip_suffix('：')
        .or_else(|| text.strip_suffix(':'))
        .map(str::trim)
        .unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldLabel;

    const LUNG: &str = "# 手太阴肺经：\n\
中府：\n\
定位：在胸前壁外上方，云门下1寸，前正中线旁开6寸。\n\
主治：咳嗽，气喘，胸痛。<br>肩背痛。\n\
特定穴：肺之募穴\n\
\n\
云门\n\
【定位】锁骨下窝凹陷处，前正中线旁开6寸。\n\
【主治】咳嗽，气喘。\n\
\n\
# 手阳明大肠经\n\
\n\
商阳：\n\
取穴：食指末节桡侧，指甲根角旁0.1寸。\n\
主治：齿痛，咽喉肿痛。\n";

    #[test]
    fn header_then_entry_round_trip() {
        let bank = parse_bank("# A经\n穴位1\n定位：X\n主治：Y", "a.txt");

        assert!(bank.has_group_headers);
        assert_eq!(bank.groups.len(), 1);
        assert_eq!(bank.groups[0].title, "A经");
        assert_eq!(bank.group_target("A经"), Some("穴位1"));

        assert_eq!(bank.entry_names, vec!["穴位1"]);
        let entry = bank.entry("穴位1").unwrap();
        assert_eq!(entry.location, "X");
        assert_eq!(entry.treatment, "Y");
        assert_eq!(entry.special_category, "");
        assert_eq!(entry.method, "");
        assert_eq!(entry.group, "A经");
    }

    #[test]
    fn parses_multi_group_bank() {
        let bank = parse_bank(LUNG, "bank_01_lung.txt");

        assert_eq!(bank.display_name, "bank_01_lung");
        assert_eq!(bank.entry_names, vec!["中府", "云门", "商阳"]);
        assert_eq!(
            bank.groups.iter().map(|g| g.title.as_str()).collect::<Vec<_>>(),
            vec!["手太阴肺经", "手阳明大肠经"]
        );
        assert_eq!(bank.group_target("手阳明大肠经"), Some("商阳"));

        let zhongfu = bank.entry("中府").unwrap();
        assert_eq!(zhongfu.treatment, "咳嗽，气喘，胸痛。\n肩背痛。");
        assert_eq!(zhongfu.special_category, "肺之募穴");
        assert_eq!(zhongfu.group, "手太阴肺经");

        let yunmen = bank.entry("云门").unwrap();
        assert_eq!(yunmen.location, "锁骨下窝凹陷处，前正中线旁开6寸。");
        assert_eq!(yunmen.treatment, "咳嗽，气喘。");

        let shangyang = bank.entry("商阳").unwrap();
        assert_eq!(shangyang.group, "手阳明大肠经");
        assert_eq!(shangyang.location, "食指末节桡侧，指甲根角旁0.1寸。");
        assert_eq!(shangyang.method, "食指末节桡侧，指甲根角旁0.1寸。");
    }

    #[test]
    fn redeclared_entry_overwrites_without_duplicating() {
        let text = "甲\n定位：旧\n\n乙\n定位：B\n\n甲：\n定位：新\n";
        let bank = parse_bank(text, "dup.txt");

        assert_eq!(bank.entry_names, vec!["甲", "乙"]);
        assert_eq!(bank.entries.len(), bank.entry_names.len());
        assert_eq!(bank.entry("甲").unwrap().location, "新");
    }

    #[test]
    fn crlf_and_lone_cr_are_normalized() {
        let bank = parse_bank("甲\r\n定位：A\r\n\r\n乙\r定位：B\r", "crlf.txt");
        assert_eq!(bank.entry_names, vec!["甲", "乙"]);
        assert_eq!(bank.entry("乙").unwrap().location, "B");
    }

    #[test]
    fn header_line_ends_body_without_being_consumed() {
        let bank = parse_bank("甲\n定位：A\n# 新组\n乙\n定位：B", "h.txt");
        assert_eq!(bank.entry("甲").unwrap().location, "A");
        assert_eq!(bank.entry("甲").unwrap().group, "");
        assert_eq!(bank.entry("乙").unwrap().group, "新组");
        assert_eq!(bank.group_target("新组"), Some("乙"));
    }

    #[test]
    fn header_followed_by_header_has_no_target() {
        let bank = parse_bank("# 空组\n\n# 实组\n甲\n定位：A", "g.txt");
        assert_eq!(bank.group_target("空组"), None);
        assert_eq!(bank.group_target("实组"), Some("甲"));
        assert_eq!(bank.groups.len(), 2);
    }

    #[test]
    fn entry_without_body_has_empty_fields() {
        let bank = parse_bank("孤穴：\n\n", "empty.txt");
        let entry = bank.entry("孤穴").unwrap();
        assert!(!entry.has_fields());
    }

    #[test]
    fn field_spans_lines_until_next_label() {
        let text = extract_sections("定位：第一行\n\n\n第二行\n主治：咳嗽");
        assert_eq!(text.location, "第一行\n\n第二行");
        assert_eq!(text.treatment, "咳嗽");
    }

    #[test]
    fn label_mid_line_is_not_a_boundary() {
        let text = extract_sections("定位：在前臂，主治区附近\n主治：头痛");
        assert_eq!(text.location, "在前臂，主治区附近");
        assert_eq!(text.treatment, "头痛");
    }

    #[test]
    fn bracketed_and_colonless_labels() {
        let text = extract_sections("[位置] 腕横纹上\n(功效) 宣肺\n类别 原穴");
        assert_eq!(text.location, "腕横纹上");
        assert_eq!(text.treatment, "宣肺");
        assert_eq!(text.special_category, "原穴");
    }

    #[test]
    fn longer_synonym_keeps_suffix_in_field() {
        // Leftmost-first alternation picks `主治` before `主治病症`.
        let text = extract_sections("主治病症：咳嗽");
        assert_eq!(text.treatment, "病症：咳嗽");
    }

    #[test]
    fn empty_label_value_yields_empty_field() {
        let text = extract_sections("定位：\n主治：咳嗽");
        assert_eq!(text.location, "");
        assert_eq!(text.treatment, "咳嗽");
    }

    #[test]
    fn method_stops_at_excluded_characters() {
        let text = extract_sections("取穴：正坐仰掌，于腕横纹上\n主治：咳嗽");
        assert_eq!(text.method, "正坐仰掌，于腕横纹上");
        assert_eq!(text.location, "正坐仰掌，于腕横纹上");
    }

    #[test]
    fn clean_html_handles_break_variants_and_tags() {
        assert_eq!(clean_html("a<br>b<br/>c<br />d"), "a\nb\nc\nd");
        assert_eq!(clean_html("<b>粗</b>体<span class=\"x\">字</span>"), "粗体字");
    }

    #[test]
    fn strip_trailing_colon_variants() {
        assert_eq!(strip_trailing_colon("中府："), "中府");
        assert_eq!(strip_trailing_colon(" 中府 : "), "中府");
        assert_eq!(strip_trailing_colon("中府"), "中府");
        assert_eq!(strip_trailing_colon("中府::"), "中府:");
    }

    #[test]
    fn bank_fields_are_listed_in_display_order() {
        let bank = parse_bank(LUNG, "bank_01_lung.txt");
        let labels: Vec<FieldLabel> = bank
            .entry("中府")
            .unwrap()
            .fields()
            .into_iter()
            .map(|(label, _)| label)
            .collect();
        assert_eq!(
            labels,
            vec![
                FieldLabel::Location,
                FieldLabel::Treatment,
                FieldLabel::SpecialCategory,
                FieldLabel::Group
            ]
        );
    }
}

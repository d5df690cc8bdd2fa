//! Deterministic grading logic used around the remote examiner.
//!
//! Everything here is pure: the local pre-check, the similarity fallback,
//! feedback cleanup and question-type balancing.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

use rand::seq::IndexedRandom;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::{Bank, Entry, FieldLabel};

/// Minimum score that counts as a pass.
pub const PASS_THRESHOLD: f64 = 80.0;

/// Longest reference answer (in ideographs) the local pre-check accepts.
pub const PRECHECK_MAX_CHARS: usize = 8;

pub const CORRECT_FEEDBACK: &str = "回答正确。";
pub const MISMATCH_FEEDBACK: &str = "答案与标准答案存在较大差异。";
pub const NO_MATERIAL_ANSWER: &str = "（题库缺少资料）";
pub const NO_REFERENCE_ANSWER: &str = "（无相关资料）";

const REASON_EMPTY: &str = "空答案或无效输入";
const REASON_NO_OVERLAP: &str = "缺少关键要点或用词完全不符";
const REASON_MISMATCH: &str = "与标准答案含义不符或要点不全";

const HOMOPHONE_TERMS: [&str; 7] = ["同音", "拼音", "读音", "谐音", "发音", "homophone", "pinyin"];

static EMPTY_PARENS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[（(]\s*[)）]").expect("valid regex"));
static MULTI_SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("valid regex"));

/// A question ready to be shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuiltQuestion {
    pub question: String,
    /// Reference answer the user's reply is graded against.
    pub canonical_answer: String,
    pub field_label: FieldLabel,
}

/// Five 0-5 ratings returned by the remote examiner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Subscores {
    #[serde(default)]
    pub accuracy: f64,
    #[serde(default)]
    pub coverage: f64,
    #[serde(default)]
    pub key_terms: f64,
    #[serde(default)]
    pub specificity: f64,
    #[serde(default)]
    pub clarity: f64,
}

impl Subscores {
    /// Every dimension set to `value`.
    pub fn uniform(value: f64) -> Self {
        Self {
            accuracy: value,
            coverage: value,
            key_terms: value,
            specificity: value,
            clarity: value,
        }
    }

    /// Weighted total on a 0-100 scale, rounded to one decimal.
    pub fn weighted_score(&self) -> f64 {
        let raw = (self.accuracy * 0.4
            + self.coverage * 0.25
            + self.key_terms * 0.15
            + self.specificity * 0.10
            + self.clarity * 0.10)
            * 20.0;
        round1(raw)
    }
}

/// Verdict on one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeResult {
    /// 0-100.
    pub score: f64,
    pub pass: bool,
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub model_answer: String,
    /// Why the answer failed; empty on a pass.
    #[serde(default)]
    pub failure_reason: String,
    #[serde(default)]
    pub subscores: Option<Subscores>,
}

impl GradeResult {
    /// Full marks, as produced by the local pre-check.
    pub fn full_marks(model_answer: &str) -> Self {
        Self {
            score: 100.0,
            pass: true,
            feedback: CORRECT_FEEDBACK.to_string(),
            model_answer: model_answer.to_string(),
            failure_reason: String::new(),
            subscores: Some(Subscores::uniform(5.0)),
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn is_ideograph(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// Keep only CJK unified ideographs.
pub fn extract_ideographs(text: &str) -> String {
    text.chars().filter(|&c| is_ideograph(c)).collect()
}

/// Cheap acceptance check for short answers.
///
/// Passes when the ideographs of one answer contain those of the other.
/// Never passes if either side has no ideographs or the reference is longer
/// than [`PRECHECK_MAX_CHARS`].
pub fn local_precheck(user_answer: &str, reference: &str) -> bool {
    let user = extract_ideographs(user_answer);
    let reference = extract_ideographs(reference);
    if user.is_empty() || reference.is_empty() {
        return false;
    }
    if reference.chars().count() > PRECHECK_MAX_CHARS {
        return false;
    }
    user.contains(&reference) || reference.contains(&user)
}

/// Distinct shared characters over the longer length, after lowercasing and
/// dropping whitespace. In `[0, 1]`.
pub fn char_overlap_similarity(a: &str, b: &str) -> f64 {
    let clean = |s: &str| -> Vec<char> {
        s.to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect()
    };
    let a = clean(a);
    let b = clean(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let b_set: HashSet<char> = b.iter().copied().collect();
    let shared: HashSet<char> = a.iter().copied().filter(|c| b_set.contains(c)).collect();
    shared.len() as f64 / a.len().max(b.len()) as f64
}

/// Grade without the remote examiner.
pub fn fallback_grade(user_answer: &str, reference: &str) -> GradeResult {
    let similarity = char_overlap_similarity(user_answer, reference);
    let score = round1(similarity * 100.0);
    let pass = score >= PASS_THRESHOLD;
    GradeResult {
        score,
        pass,
        feedback: if pass { CORRECT_FEEDBACK } else { MISMATCH_FEEDBACK }.to_string(),
        model_answer: reference.to_string(),
        failure_reason: if pass {
            String::new()
        } else {
            REASON_MISMATCH.to_string()
        },
        subscores: Some(Subscores::uniform(similarity * 5.0)),
    }
}

/// Short explanation for a failed answer.
pub fn incorrect_reason(user_answer: &str, reference: &str) -> &'static str {
    if user_answer.trim().is_empty() {
        return REASON_EMPTY;
    }
    let user = extract_ideographs(user_answer);
    let reference = extract_ideographs(reference);
    if !user.is_empty() && !reference.is_empty() && !user.chars().any(|c| reference.contains(c)) {
        return REASON_NO_OVERLAP;
    }
    REASON_MISMATCH
}

/// Remove pronunciation talk from examiner feedback.
pub fn scrub_homophone_terms(feedback: &str) -> String {
    if feedback.is_empty() {
        return String::new();
    }
    let mut text = feedback.to_string();
    for term in HOMOPHONE_TERMS {
        text = text.replace(term, "");
    }
    let text = EMPTY_PARENS_RE.replace_all(&text, "");
    let text = MULTI_SPACE_RE.replace_all(&text, " ");
    let text = text.trim();
    if text.is_empty() {
        CORRECT_FEEDBACK.to_string()
    } else {
        text.to_string()
    }
}

/// Question used whenever the remote examiner cannot supply one.
pub fn template_question(entry_name: &str, label: FieldLabel) -> String {
    format!("关于【{entry_name}】的{label}？")
}

/// Reference answer for `label`: its text, else the first field, else a
/// placeholder.
pub fn reference_answer(entry: &Entry, label: FieldLabel) -> String {
    let text = entry.field(label).trim();
    if !text.is_empty() {
        return text.to_string();
    }
    entry
        .fields()
        .first()
        .map(|(_, text)| text.to_string())
        .unwrap_or_else(|| NO_REFERENCE_ANSWER.to_string())
}

/// The entry's non-empty fields keyed by Chinese label, as sent to the examiner.
pub fn materials(entry: &Entry) -> BTreeMap<String, String> {
    entry
        .fields()
        .into_iter()
        .map(|(label, text)| (label.display_name().to_string(), text.to_string()))
        .collect()
}

/// Spreads questions over the field labels.
///
/// Each pick is uniform among the entry's non-empty labels used the fewest
/// times so far.
#[derive(Debug, Default, Clone)]
pub struct QuestionTypeBalancer {
    counts: HashMap<FieldLabel, u32>,
}

impl QuestionTypeBalancer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick a label for `entry`, or `None` if it has no fields.
    pub fn pick<R: Rng + ?Sized>(&self, entry: &Entry, rng: &mut R) -> Option<FieldLabel> {
        let available: Vec<FieldLabel> = entry.fields().into_iter().map(|(l, _)| l).collect();
        let fewest = available.iter().map(|l| self.count(*l)).min()?;
        let candidates: Vec<FieldLabel> = available
            .into_iter()
            .filter(|l| self.count(*l) == fewest)
            .collect();
        candidates.choose(rng).copied()
    }

    pub fn record(&mut self, label: FieldLabel) {
        *self.counts.entry(label).or_insert(0) += 1;
    }

    pub fn count(&self, label: FieldLabel) -> u32 {
        self.counts.get(&label).copied().unwrap_or(0)
    }

    pub fn reset(&mut self) {
        self.counts.clear();
    }
}

/// A random entry of `bank` with at least one field.
pub fn choose_askable_entry<'a, R: Rng + ?Sized>(bank: &'a Bank, rng: &mut R) -> Option<&'a Entry> {
    let askable: Vec<&Entry> = bank
        .entry_names
        .iter()
        .filter_map(|name| bank.entry(name))
        .filter(|entry| entry.has_fields())
        .collect();
    askable.choose(rng).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn ideographs_only() {
        assert_eq!(extract_ideographs("手太阴 Lung 肺经, LU-9"), "手太阴肺经");
        assert_eq!(extract_ideographs("abc 123"), "");
    }

    #[test]
    fn precheck_accepts_containment() {
        assert!(local_precheck("肺经", "肺经"));
        assert!(local_precheck("手太阴肺经", "肺经"));
        assert!(local_precheck("太阴肺经", "手太阴肺经"));
        assert!(!local_precheck("大肠经", "肺经"));
    }

    #[test]
    fn precheck_skips_empty_and_long_references() {
        assert!(!local_precheck("", "肺经"));
        assert!(!local_precheck("lung", "肺经"));
        assert!(!local_precheck("肺经", ""));
        assert!(!local_precheck("咳嗽", "咳嗽，气喘，胸痛，咽喉肿痛"));
    }

    #[test]
    fn similarity_counts_distinct_shared_chars() {
        assert_eq!(char_overlap_similarity("咳嗽", "咳嗽"), 1.0);
        assert_eq!(char_overlap_similarity("A B", "ab"), 1.0);
        assert_eq!(char_overlap_similarity("咳咳", "咳嗽"), 0.5);
        assert_eq!(char_overlap_similarity("", "咳嗽"), 0.0);
        assert_eq!(char_overlap_similarity("头痛", "咳嗽"), 0.0);
    }

    #[test]
    fn fallback_grade_threshold() {
        let pass = fallback_grade("咳嗽气喘", "咳嗽，气喘");
        assert_eq!(pass.score, 80.0);
        assert!(pass.pass);
        assert!(pass.failure_reason.is_empty());

        let fail = fallback_grade("头痛", "咳嗽，气喘");
        assert!(!fail.pass);
        assert_eq!(fail.feedback, MISMATCH_FEEDBACK);
        assert_eq!(fail.model_answer, "咳嗽，气喘");
        assert!(!fail.failure_reason.is_empty());
    }

    #[test]
    fn weighted_score_matches_formula() {
        assert_eq!(Subscores::uniform(5.0).weighted_score(), 100.0);
        let s = Subscores {
            accuracy: 4.0,
            coverage: 3.5,
            key_terms: 5.0,
            specificity: 2.0,
            clarity: 4.5,
        };
        // (1.6 + 0.875 + 0.75 + 0.2 + 0.45) * 20 = 77.5
        assert_eq!(s.weighted_score(), 77.5);
    }

    #[test]
    fn reasons() {
        assert_eq!(incorrect_reason("  ", "咳嗽"), REASON_EMPTY);
        assert_eq!(incorrect_reason("头痛", "咳嗽"), REASON_NO_OVERLAP);
        assert_eq!(incorrect_reason("咳", "咳嗽气喘"), REASON_MISMATCH);
        assert_eq!(incorrect_reason("cough", "咳嗽"), REASON_MISMATCH);
    }

    #[test]
    fn scrub_removes_pronunciation_terms() {
        assert_eq!(scrub_homophone_terms("答案正确（同音）"), "答案正确");
        assert_eq!(
            scrub_homophone_terms("拼音 一致，  含义正确"),
            "一致， 含义正确"
        );
        assert_eq!(scrub_homophone_terms("同音"), CORRECT_FEEDBACK);
        assert_eq!(scrub_homophone_terms(""), "");
    }

    #[test]
    fn reference_answer_fallbacks() {
        let mut entry = Entry::new("列缺");
        assert_eq!(reference_answer(&entry, FieldLabel::Treatment), NO_REFERENCE_ANSWER);
        entry.location = "桡骨茎突上方".into();
        assert_eq!(reference_answer(&entry, FieldLabel::Treatment), "桡骨茎突上方");
        entry.treatment = "头痛".into();
        assert_eq!(reference_answer(&entry, FieldLabel::Treatment), "头痛");
        assert_eq!(materials(&entry).len(), 2);
        assert_eq!(template_question("列缺", FieldLabel::Treatment), "关于【列缺】的主治？");
    }

    #[test]
    fn balancer_prefers_least_used_labels() {
        let entry = Entry {
            name: "太渊".into(),
            location: "腕横纹".into(),
            treatment: "咳嗽".into(),
            ..Entry::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let mut balancer = QuestionTypeBalancer::new();

        let first = balancer.pick(&entry, &mut rng).unwrap();
        balancer.record(first);
        let second = balancer.pick(&entry, &mut rng).unwrap();
        assert_ne!(first, second);
        balancer.record(second);

        for _ in 0..10 {
            let label = balancer.pick(&entry, &mut rng).unwrap();
            balancer.record(label);
        }
        let diff = balancer.count(FieldLabel::Location) as i64
            - balancer.count(FieldLabel::Treatment) as i64;
        assert!(diff.abs() <= 1);

        assert_eq!(balancer.pick(&Entry::new("空"), &mut rng), None);
        balancer.reset();
        assert_eq!(balancer.count(FieldLabel::Location), 0);
    }

    #[test]
    fn askable_entries_have_fields() {
        let mut bank = Bank::new("k", "K");
        bank.upsert_entry(Entry::new("空"));
        let mut full = Entry::new("满");
        full.location = "某处".into();
        bank.upsert_entry(full);

        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..5 {
            assert_eq!(choose_askable_entry(&bank, &mut rng).unwrap().name, "满");
        }
        assert!(choose_askable_entry(&Bank::new("e", "E"), &mut rng).is_none());
    }
}

//! Batch results and bank statistics.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of one quiz batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResult {
    /// Identifier of the batch that produced this result.
    pub batch_id: Uuid,
    /// When the batch was started.
    pub started_at: DateTime<Utc>,
    pub bank_name: String,
    /// Number of items drawn for the batch.
    pub total: usize,
    pub correct: usize,
    pub wrong: usize,
    /// Frozen by `finish_quiz`; zero before that.
    pub elapsed_ms: u64,
    /// Names marked wrong, in marking order.
    pub wrong_items: Vec<String>,
}

impl QuizResult {
    /// `correct / total × 100`, rounded to two decimals. Zero for an empty batch.
    pub fn accuracy_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let raw = self.correct as f64 / self.total as f64 * 100.0;
        (raw * 100.0).round() / 100.0
    }

    /// Accuracy with at most two fractional digits, e.g. `66.67%` or `50%`.
    pub fn formatted_accuracy(&self) -> String {
        format!("{}%", trim_decimals(self.accuracy_percent()))
    }

    /// Elapsed time as `{minutes}分{seconds:02}秒`.
    pub fn formatted_time(&self) -> String {
        format_elapsed(self.elapsed_ms)
    }
}

/// Format milliseconds as whole minutes and seconds.
pub fn format_elapsed(elapsed_ms: u64) -> String {
    let total_seconds = elapsed_ms / 1000;
    format!("{}分{:02}秒", total_seconds / 60, total_seconds % 60)
}

/// Render with up to two decimals and no trailing zeros.
fn trim_decimals(value: f64) -> String {
    let s = format!("{value:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() || s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// Snapshot of a bank's draw state plus the live batch counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankStats {
    pub bank_name: String,
    pub total: usize,
    pub remaining: usize,
    /// 1-based position of the live batch.
    pub current_index: usize,
    pub batch_total: usize,
    pub correct: usize,
    pub wrong: usize,
}

impl fmt::Display for BankStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "题库：{} | 条目总数：{} | 未抽剩余：{} | 本批：{}/{} | 对：{} | 错：{}",
            self.bank_name,
            self.total,
            self.remaining,
            self.current_index,
            self.batch_total,
            self.correct,
            self.wrong
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(total: usize, correct: usize, elapsed_ms: u64) -> QuizResult {
        QuizResult {
            batch_id: Uuid::new_v4(),
            started_at: Utc::now(),
            bank_name: "手太阴肺经".into(),
            total,
            correct,
            wrong: total - correct,
            elapsed_ms,
            wrong_items: vec![],
        }
    }

    #[test]
    fn accuracy_rounds_to_two_decimals() {
        let r = result(3, 2, 0);
        assert_eq!(r.accuracy_percent(), 66.67);
        assert_eq!(r.formatted_accuracy(), "66.67%");
    }

    #[test]
    fn accuracy_trims_trailing_zeros() {
        assert_eq!(result(2, 1, 0).formatted_accuracy(), "50%");
        assert_eq!(result(8, 1, 0).formatted_accuracy(), "12.5%");
        assert_eq!(result(4, 4, 0).formatted_accuracy(), "100%");
        assert_eq!(result(0, 0, 0).formatted_accuracy(), "0%");
    }

    #[test]
    fn elapsed_time_formatting() {
        assert_eq!(result(1, 1, 0).formatted_time(), "0分00秒");
        assert_eq!(result(1, 1, 999).formatted_time(), "0分00秒");
        assert_eq!(result(1, 1, 65_400).formatted_time(), "1分05秒");
        assert_eq!(format_elapsed(3_600_000), "60分00秒");
    }

    #[test]
    fn stats_line() {
        let stats = BankStats {
            bank_name: "手太阴肺经".into(),
            total: 11,
            remaining: 8,
            current_index: 2,
            batch_total: 3,
            correct: 1,
            wrong: 0,
        };
        assert_eq!(
            stats.to_string(),
            "题库：手太阴肺经 | 条目总数：11 | 未抽剩余：8 | 本批：2/3 | 对：1 | 错：0"
        );
    }
}

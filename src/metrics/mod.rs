//! Post-level engagement metrics
//!
//! Reduces the classifications of a post's comments to percentages, a
//! uniqueness ratio, the Engagement Quality Score (EQS), and the Phase-1
//! admission decision.
//!
//! EQS = 100 × (0.6·text + 0.3·mixed − 0.1·emoji + 0.2·unique_ratio), where
//! the class shares are fractions of 1. Under normal inputs it lies roughly in
//! [−10, 110] and is never clamped.

mod creator;

pub use creator::{aggregate, CreatorSummary};

use crate::classifier::ClassificationCounts;
use crate::collector::normalize;
use ahash::{HashSet, HashSetExt};
use serde::{Deserialize, Serialize};

const TEXT_WEIGHT: f64 = 0.6;
const MIXED_WEIGHT: f64 = 0.3;
const EMOJI_PENALTY: f64 = 0.1;
const UNIQUENESS_WEIGHT: f64 = 0.2;

/// Round to `places` decimals, ties to even on the exact binary value
fn round_to(value: f64, places: usize) -> f64 {
    format!("{:.*}", places, value).parse().unwrap_or(value)
}

/// Round to 2 decimal places
pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}

/// Round to 4 decimal places
pub fn round4(value: f64) -> f64 {
    round_to(value, 4)
}

/// Phase-1 admission thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdmissionCriteria {
    pub min_comments: usize,
    /// Minimum share (0-100) of comments carrying text, mixed included
    pub min_text_percentage: f64,
}

impl AdmissionCriteria {
    pub fn new(min_comments: usize, min_text_percentage: f64) -> Self {
        Self {
            min_comments,
            min_text_percentage,
        }
    }

    /// Mixed comments count toward the text share since they contain text
    pub fn admits(&self, total_comments: usize, text_pct: f64, mixed_pct: f64) -> bool {
        total_comments >= self.min_comments && text_pct + mixed_pct >= self.min_text_percentage
    }
}

impl Default for AdmissionCriteria {
    fn default() -> Self {
        Self::new(50, 50.0)
    }
}

/// Metrics for one post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostMetrics {
    pub total_comments: usize,
    pub text_percentage: f64,
    pub emoji_percentage: f64,
    pub mixed_percentage: f64,
    pub unique_commenters_ratio: f64,
    #[serde(rename = "EQS")]
    pub eqs: f64,
    #[serde(rename = "pass")]
    pub passed: bool,
}

impl PostMetrics {
    /// Metrics of a post with no comments
    pub fn empty() -> Self {
        Self {
            total_comments: 0,
            text_percentage: 0.0,
            emoji_percentage: 0.0,
            mixed_percentage: 0.0,
            unique_commenters_ratio: 0.0,
            eqs: 0.0,
            passed: false,
        }
    }

    pub fn pass_label(&self) -> &'static str {
        if self.passed {
            "Pass"
        } else {
            "Fail"
        }
    }

    /// Text plus mixed share
    pub fn text_based_percentage(&self) -> f64 {
        self.text_percentage + self.mixed_percentage
    }
}

/// Share of `count` in `total`, as a percentage rounded to 2 decimals
fn percentage(count: usize, total: usize) -> f64 {
    round2(count as f64 / total as f64 * 100.0)
}

/// Distinct normalized comments over total comments, 4 decimals.
///
/// Stands in for distinct authors, which the source does not expose. Blank
/// comments never count as distinct.
pub fn unique_commenters_ratio<S: AsRef<str>>(comments: &[S]) -> f64 {
    if comments.is_empty() {
        return 0.0;
    }
    let mut distinct = HashSet::new();
    for comment in comments {
        let normalized = normalize(comment.as_ref());
        if !normalized.is_empty() {
            distinct.insert(normalized);
        }
    }
    round4(distinct.len() as f64 / comments.len() as f64)
}

/// Engagement Quality Score from class percentages (0-100) and the
/// uniqueness ratio (0-1), rounded to 2 decimals
pub fn engagement_quality_score(
    text_pct: f64,
    mixed_pct: f64,
    emoji_pct: f64,
    unique_ratio: f64,
) -> f64 {
    let score = TEXT_WEIGHT * (text_pct / 100.0) + MIXED_WEIGHT * (mixed_pct / 100.0)
        - EMOJI_PENALTY * (emoji_pct / 100.0)
        + UNIQUENESS_WEIGHT * unique_ratio;
    round2(score * 100.0)
}

/// Compute the metrics of one post from its comments
///
/// Accepts a deduplicated `CommentSet` slice or any list of raw strings.
pub fn compute_metrics<S: AsRef<str>>(comments: &[S], criteria: &AdmissionCriteria) -> PostMetrics {
    if comments.is_empty() {
        return PostMetrics::empty();
    }

    let counts = ClassificationCounts::tally(comments);
    let total = comments.len();

    let text_percentage = percentage(counts.text, total);
    let emoji_percentage = percentage(counts.emoji, total);
    let mixed_percentage = percentage(counts.mixed, total);
    let unique_commenters_ratio = unique_commenters_ratio(comments);
    let eqs = engagement_quality_score(
        text_percentage,
        mixed_percentage,
        emoji_percentage,
        unique_commenters_ratio,
    );

    PostMetrics {
        total_comments: total,
        text_percentage,
        emoji_percentage,
        mixed_percentage,
        unique_commenters_ratio,
        eqs,
        passed: criteria.admits(total, text_percentage, mixed_percentage),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::CommentSet;

    fn post_with(text: usize, mixed: usize, emoji: usize) -> Vec<String> {
        let mut comments = Vec::new();
        for i in 0..text {
            comments.push(format!("text comment {i}"));
        }
        for i in 0..mixed {
            comments.push(format!("mixed comment {i} 🔥"));
        }
        for i in 0..emoji {
            // Vary the emoji so every comment stays distinct
            let emojis = ["🔥", "😍", "👏", "💯", "🙌"];
            comments.push(emojis[i % emojis.len()].repeat(i / emojis.len() + 1));
        }
        comments
    }

    #[test]
    fn test_empty_post() {
        let metrics = compute_metrics::<&str>(&[], &AdmissionCriteria::default());
        assert_eq!(metrics, PostMetrics::empty());
        assert!(!metrics.passed);
        assert_eq!(metrics.pass_label(), "Fail");
    }

    #[test]
    fn test_percentages() {
        let comments = post_with(2, 1, 1);
        let metrics = compute_metrics(&comments, &AdmissionCriteria::new(1, 50.0));
        assert_eq!(metrics.total_comments, 4);
        assert_eq!(metrics.text_percentage, 50.0);
        assert_eq!(metrics.mixed_percentage, 25.0);
        assert_eq!(metrics.emoji_percentage, 25.0);
        assert_eq!(metrics.unique_commenters_ratio, 1.0);
    }

    #[test]
    fn test_percentages_sum_to_100() {
        for total in 1..=40 {
            for text in 0..=total {
                for mixed in 0..=(total - text) {
                    let emoji = total - text - mixed;
                    let comments = post_with(text, mixed, emoji);
                    let m = compute_metrics(&comments, &AdmissionCriteria::default());
                    let sum = m.text_percentage + m.mixed_percentage + m.emoji_percentage;
                    assert!(
                        (sum - 100.0).abs() <= 0.01 + 1e-9,
                        "sum {sum} for {text}/{mixed}/{emoji}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_rounding_ties_go_to_even() {
        assert_eq!(percentage(1, 800), 0.12);
        assert_eq!(round2(0.125), 0.12);
        assert_eq!(round2(0.375), 0.38);
        assert_eq!(round2(2.675), 2.67);
        assert_eq!(round2(-1.005), -1.0);
    }

    #[test]
    fn test_percentages_sum_to_100_at_tie_total() {
        for (text, mixed) in [(1, 1), (1, 0), (3, 5), (401, 1), (199, 201)] {
            let emoji = 800 - text - mixed;
            let comments = post_with(text, mixed, emoji);
            let m = compute_metrics(&comments, &AdmissionCriteria::default());
            assert_eq!(m.total_comments, 800);
            let sum = m.text_percentage + m.mixed_percentage + m.emoji_percentage;
            assert!(
                (sum - 100.0).abs() <= 0.01 + 1e-9,
                "sum {sum} for {text}/{mixed}/{emoji}"
            );
        }
    }

    #[test]
    fn test_eqs_formula() {
        // All text, all unique: 60 + 20
        assert_eq!(engagement_quality_score(100.0, 0.0, 0.0, 1.0), 80.0);
        // All emoji, all unique: -10 + 20
        assert_eq!(engagement_quality_score(0.0, 0.0, 100.0, 1.0), 10.0);
        assert_eq!(engagement_quality_score(40.0, 20.0, 40.0, 1.0), 46.0);
    }

    #[test]
    fn test_eqs_is_not_clamped() {
        assert_eq!(engagement_quality_score(200.0, 0.0, 0.0, 1.0), 140.0);
        assert_eq!(engagement_quality_score(0.0, 0.0, 100.0, 0.0), -10.0);
    }

    #[test]
    fn test_eqs_monotonic() {
        let base = engagement_quality_score(30.0, 30.0, 40.0, 1.0);
        assert!(engagement_quality_score(40.0, 30.0, 40.0, 1.0) >= base);
        assert!(engagement_quality_score(30.0, 40.0, 40.0, 1.0) >= base);
        assert!(engagement_quality_score(30.0, 30.0, 50.0, 1.0) <= base);
    }

    #[test]
    fn test_admission_rule() {
        let criteria = AdmissionCriteria::new(50, 50.0);

        // 60 comments: 40% text, 20% mixed, 40% emoji -> 60% text-based
        let comments = post_with(24, 12, 24);
        let metrics = compute_metrics(&comments, &criteria);
        assert_eq!(metrics.text_percentage, 40.0);
        assert_eq!(metrics.mixed_percentage, 20.0);
        assert_eq!(metrics.emoji_percentage, 40.0);
        assert!(metrics.passed);

        // Same mix with 40 comments fails on count
        let comments = post_with(16, 8, 16);
        let metrics = compute_metrics(&comments, &criteria);
        assert_eq!(metrics.text_based_percentage(), 60.0);
        assert!(!metrics.passed);
    }

    #[test]
    fn test_admission_boundary_is_inclusive() {
        let criteria = AdmissionCriteria::new(4, 50.0);
        assert!(criteria.admits(4, 25.0, 25.0));
        assert!(!criteria.admits(3, 100.0, 0.0));
        assert!(!criteria.admits(4, 25.0, 24.99));
    }

    #[test]
    fn test_unique_ratio_on_raw_list() {
        let comments = ["Nice shot", "nice   SHOT", "great light", "   "];
        // 2 distinct non-blank forms over 4 comments
        assert_eq!(unique_commenters_ratio(&comments), 0.5);

        let comments = ["a b c", "a b c", "d e f"];
        assert_eq!(unique_commenters_ratio(&comments), 0.6667);
    }

    #[test]
    fn test_comment_set_ratio_is_one() {
        let set: CommentSet = ["one comment", "ONE comment", "two comment"]
            .into_iter()
            .collect();
        let metrics = compute_metrics(set.as_slice(), &AdmissionCriteria::default());
        assert_eq!(metrics.total_comments, 2);
        assert_eq!(metrics.unique_commenters_ratio, 1.0);
    }

    #[test]
    fn test_serialized_field_names() {
        let json = serde_json::to_value(PostMetrics::empty()).unwrap();
        assert!(json.get("EQS").is_some());
        assert!(json.get("pass").is_some());
    }
}

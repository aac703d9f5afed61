// Creator-level aggregation of post metrics
use super::{round2, PostMetrics};
use serde::{Deserialize, Serialize};

/// Aggregate statistics over one creator's analyzed posts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreatorSummary {
    pub posts_analyzed: usize,
    pub posts_passed: usize,
    pub avg_text_percentage: f64,
    pub avg_emoji_percentage: f64,
    pub avg_mixed_percentage: f64,
    #[serde(rename = "avg_EQS")]
    pub avg_eqs: f64,
    #[serde(rename = "best_EQS")]
    pub best_eqs: f64,
    #[serde(rename = "worst_EQS")]
    pub worst_eqs: f64,
}

fn mean(values: impl Iterator<Item = f64>, count: usize) -> f64 {
    values.sum::<f64>() / count as f64
}

/// Fold a creator's post metrics into one summary.
///
/// An empty list yields the all-zero summary.
pub fn aggregate(posts: &[PostMetrics]) -> CreatorSummary {
    if posts.is_empty() {
        return CreatorSummary::default();
    }

    let n = posts.len();
    let best = posts.iter().map(|p| p.eqs).fold(f64::NEG_INFINITY, f64::max);
    let worst = posts.iter().map(|p| p.eqs).fold(f64::INFINITY, f64::min);

    CreatorSummary {
        posts_analyzed: n,
        posts_passed: posts.iter().filter(|p| p.passed).count(),
        avg_text_percentage: round2(mean(posts.iter().map(|p| p.text_percentage), n)),
        avg_emoji_percentage: round2(mean(posts.iter().map(|p| p.emoji_percentage), n)),
        avg_mixed_percentage: round2(mean(posts.iter().map(|p| p.mixed_percentage), n)),
        avg_eqs: round2(mean(posts.iter().map(|p| p.eqs), n)),
        best_eqs: round2(best),
        worst_eqs: round2(worst),
    }
}

//! Comment collection with convergence detection
//!
//! A post's comments arrive from the source in batches. The collector keeps
//! pulling batches, deduplicating as it goes, until the set stops growing and
//! the source has nothing left to expand, or until a hard batch cap is hit.
//! Collection never fails: fetch errors count as empty batches and whatever
//! was gathered is returned.

mod comment;

pub use comment::{normalize, Comment, CommentSet};

use crate::source::{ContentSource, PostRef};
use std::time::{Duration, Instant};

/// Minimum length (in characters) of a comment body
const MIN_COMMENT_CHARS: usize = 3;

/// Substrings that mark UI affordances ("View replies", "Load more") rather
/// than comment bodies
const UI_MARKERS: &[&str] = &["view", "load", "more"];

/// Whether a scraped string looks like a comment body
pub fn is_comment_candidate(text: &str) -> bool {
    let text = text.trim();
    if text.chars().count() < MIN_COMMENT_CHARS || text.starts_with('@') {
        return false;
    }
    let lower = text.to_lowercase();
    !UI_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Collector settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollectorConfig {
    /// Hard cap on batch requests per post
    pub max_batches: usize,
    /// Consecutive non-growing batches before an expand attempt
    pub stability_threshold: usize,
    /// Optional wall-clock bound on one post's collection
    pub deadline: Option<Duration>,
}

impl CollectorConfig {
    pub const DEFAULT_STABILITY_THRESHOLD: usize = 3;

    /// Settings for Phase-1 triage
    pub fn triage() -> Self {
        Self {
            max_batches: 10,
            stability_threshold: Self::DEFAULT_STABILITY_THRESHOLD,
            deadline: None,
        }
    }

    /// Settings for Phase-2 full analysis
    pub fn full() -> Self {
        Self {
            max_batches: 15,
            stability_threshold: Self::DEFAULT_STABILITY_THRESHOLD,
            deadline: None,
        }
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self::full()
    }
}

/// Why collection stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The set stopped growing and no expansion was available
    Stable,
    /// The batch cap was reached
    BatchCap,
    /// The deadline expired
    Deadline,
}

/// Bookkeeping from one collection run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionReport {
    pub batches: usize,
    pub expand_attempts: usize,
    pub expansions: usize,
    pub fetch_errors: usize,
    pub stop_reason: StopReason,
}

/// Comments collected for a post plus how collection went
#[derive(Debug, Clone)]
pub struct Collection {
    pub comments: CommentSet,
    pub report: CollectionReport,
}

/// Pulls comment batches for one post until convergence
#[derive(Debug, Clone, Copy)]
pub struct Collector {
    config: CollectorConfig,
}

impl Collector {
    pub fn new(config: CollectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Collect the comments of one post
    pub fn collect<S>(&self, source: &mut S, post: &PostRef) -> Collection
    where
        S: ContentSource + ?Sized,
    {
        let started = Instant::now();
        let mut comments = CommentSet::new();
        let mut batches = 0;
        let mut expand_attempts = 0;
        let mut expansions = 0;
        let mut fetch_errors = 0;
        let mut stable_count = 0;
        let mut stop_reason = StopReason::BatchCap;

        while batches < self.config.max_batches {
            if let Some(deadline) = self.config.deadline {
                if started.elapsed() >= deadline {
                    stop_reason = StopReason::Deadline;
                    break;
                }
            }

            let before = comments.len();
            match source.next_comment_batch(post) {
                Ok(batch) => {
                    for text in batch.iter().filter(|t| is_comment_candidate(t)) {
                        comments.insert(Comment::new(text.trim()));
                    }
                }
                Err(e) => {
                    fetch_errors += 1;
                    tracing::debug!("Batch fetch failed for {}: {}", post, e);
                }
            }
            batches += 1;

            if comments.len() > before {
                stable_count = 0;
                continue;
            }

            stable_count += 1;
            if stable_count >= self.config.stability_threshold {
                expand_attempts += 1;
                match source.expand_comments(post) {
                    Ok(true) => {
                        expansions += 1;
                        stable_count = 0;
                        tracing::debug!("Expanded comments for {}", post);
                    }
                    Ok(false) => {
                        stop_reason = StopReason::Stable;
                        break;
                    }
                    Err(e) => {
                        tracing::debug!("Expand failed for {}: {}", post, e);
                        stop_reason = StopReason::Stable;
                        break;
                    }
                }
            }
        }

        let report = CollectionReport {
            batches,
            expand_attempts,
            expansions,
            fetch_errors,
            stop_reason,
        };

        tracing::debug!(
            "Collected {} unique comments from {} after {} batches ({:?})",
            comments.len(),
            post,
            report.batches,
            report.stop_reason
        );

        Collection { comments, report }
    }
}

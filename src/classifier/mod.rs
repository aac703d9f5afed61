//! Comment classification
//!
//! Labels a single comment as text-only, emoji-only, or a mix of both. The
//! classifier is a pure function over the comment body: no configuration, no
//! state, and every input maps to exactly one label.

use serde::{Deserialize, Serialize};
use std::fmt;

mod emoji;

pub use emoji::{is_emoji, strip_emoji};

/// Classification assigned to a comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// Letters or digits, no emoji
    #[default]
    Text,
    /// Emoji only (punctuation and whitespace allowed)
    Emoji,
    /// Emoji alongside letters or digits
    Mixed,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Text => "text",
            Classification::Emoji => "emoji",
            Classification::Mixed => "mixed",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a comment body
///
/// Empty or whitespace-only input is `Text`.
pub fn classify(text: &str) -> Classification {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Classification::Text;
    }

    let has_emoji = trimmed.chars().any(is_emoji);
    let has_text = strip_emoji(trimmed).chars().any(char::is_alphanumeric);

    match (has_emoji, has_text) {
        (true, true) => Classification::Mixed,
        (true, false) => Classification::Emoji,
        _ => Classification::Text,
    }
}

/// Per-class tallies over a group of comments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassificationCounts {
    pub text: usize,
    pub emoji: usize,
    pub mixed: usize,
}

impl ClassificationCounts {
    /// Classify every comment and tally the results
    pub fn tally<I, S>(comments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut counts = Self::default();
        for comment in comments {
            counts.record(classify(comment.as_ref()));
        }
        counts
    }

    pub fn record(&mut self, classification: Classification) {
        match classification {
            Classification::Text => self.text += 1,
            Classification::Emoji => self.emoji += 1,
            Classification::Mixed => self.mixed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.text + self.emoji + self.mixed
    }

    /// Comments that carry text content (text-only plus mixed)
    pub fn text_based(&self) -> usize {
        self.text + self.mixed
    }
}

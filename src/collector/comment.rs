// Comments and the deduplicated comment set collected for one post
use ahash::{HashSet, HashSetExt};

/// Lower-case, collapse internal whitespace to single spaces, trim
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// A single comment body and its normalized form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    text: String,
    normalized: String,
}

impl Comment {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let normalized = normalize(&text);
        Self { text, normalized }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Two comments are duplicates iff their normalized forms match
    pub fn is_duplicate_of(&self, other: &Comment) -> bool {
        self.normalized == other.normalized
    }
}

impl AsRef<str> for Comment {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// Comments collected for one post, unique by normalized form, in insertion
/// order
#[derive(Debug, Clone, Default)]
pub struct CommentSet {
    comments: Vec<Comment>,
    seen: HashSet<String>,
}

impl CommentSet {
    pub fn new() -> Self {
        Self {
            comments: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Insert a comment unless a duplicate is already present.
    /// Returns true when the set grew.
    pub fn insert(&mut self, comment: Comment) -> bool {
        if self.seen.contains(comment.normalized()) {
            return false;
        }
        self.seen.insert(comment.normalized.clone());
        self.comments.push(comment);
        true
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Comment> {
        self.comments.iter()
    }

    pub fn as_slice(&self) -> &[Comment] {
        &self.comments
    }
}

impl<S: Into<String>> FromIterator<S> for CommentSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = CommentSet::new();
        for text in iter {
            set.insert(Comment::new(text));
        }
        set
    }
}

impl<'a> IntoIterator for &'a CommentSet {
    type Item = &'a Comment;
    type IntoIter = std::slice::Iter<'a, Comment>;

    fn into_iter(self) -> Self::IntoIter {
        self.comments.iter()
    }
}

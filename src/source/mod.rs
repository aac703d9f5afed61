//! Content sources
//!
//! The pipeline never talks to a web page directly. Everything it needs
//! (candidate posts, creator handles, comment batches, creator post lists)
//! comes through the [`ContentSource`] trait. A source is a single stateful
//! session: batch requests on one source depend on the side effects of the
//! previous ones, so a source is driven by one caller at a time.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

mod paced;
mod replay;

pub use paced::{PacedFactory, PacedSource, ScrollDelay};
pub use replay::{ReplayFixture, ReplayPost, ReplaySource};

/// Errors reported by a content source
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The source cannot be reached at all
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// A single request failed
    #[error("request failed: {0}")]
    Request(String),

    /// The requested post or creator does not exist on the source
    #[error("not found: {0}")]
    NotFound(String),
}

pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Reference to a single post
///
/// Query strings are stripped on construction, so the same post reached
/// through different tracking links compares equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PostRef(String);

impl PostRef {
    pub fn new(url: impl AsRef<str>) -> Self {
        let url = url.as_ref().trim();
        let clean = url.split('?').next().unwrap_or(url);
        Self(clean.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PostRef {
    fn from(url: String) -> Self {
        Self::new(url)
    }
}

impl From<&str> for PostRef {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<PostRef> for String {
    fn from(post: PostRef) -> Self {
        post.0
    }
}

impl fmt::Display for PostRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path segments that look like handles in a profile URL but are not creators
const RESERVED_HANDLES: &[&str] = &["accounts", "explore", "p", "reel", "stories"];

/// A creator's handle, without the leading `@`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "String")]
pub struct CreatorHandle(String);

impl CreatorHandle {
    /// Parse a handle, returning `None` for anything that is not a plausible
    /// creator handle
    pub fn parse(raw: &str) -> Option<Self> {
        let handle = raw.trim().trim_start_matches('@');
        if handle.is_empty() || RESERVED_HANDLES.contains(&handle) {
            return None;
        }
        let valid = handle
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_');
        valid.then(|| Self(handle.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for CreatorHandle {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        CreatorHandle::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid creator handle: {raw:?}")))
    }
}

impl From<CreatorHandle> for String {
    fn from(handle: CreatorHandle) -> Self {
        handle.0
    }
}

impl fmt::Display for CreatorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Provider of posts and comments
pub trait ContentSource {
    /// Candidate posts for a keyword; best effort, may return fewer than `limit`
    fn search(&mut self, keyword: &str, limit: usize) -> SourceResult<Vec<PostRef>>;

    /// Creator of a post, `None` when it cannot be determined
    fn resolve_creator(&mut self, post: &PostRef) -> SourceResult<Option<CreatorHandle>>;

    /// Comment strings currently visible on a post; may be empty
    fn next_comment_batch(&mut self, post: &PostRef) -> SourceResult<Vec<String>>;

    /// Ask the source to reveal more comments. `Ok(false)` means no expansion
    /// is available.
    fn expand_comments(&mut self, post: &PostRef) -> SourceResult<bool>;

    /// Up to `limit` of a creator's own posts
    fn creator_posts(&mut self, handle: &CreatorHandle, limit: usize)
        -> SourceResult<Vec<PostRef>>;
}

impl<S: ContentSource + ?Sized> ContentSource for Box<S> {
    fn search(&mut self, keyword: &str, limit: usize) -> SourceResult<Vec<PostRef>> {
        (**self).search(keyword, limit)
    }

    fn resolve_creator(&mut self, post: &PostRef) -> SourceResult<Option<CreatorHandle>> {
        (**self).resolve_creator(post)
    }

    fn next_comment_batch(&mut self, post: &PostRef) -> SourceResult<Vec<String>> {
        (**self).next_comment_batch(post)
    }

    fn expand_comments(&mut self, post: &PostRef) -> SourceResult<bool> {
        (**self).expand_comments(post)
    }

    fn creator_posts(
        &mut self,
        handle: &CreatorHandle,
        limit: usize,
    ) -> SourceResult<Vec<PostRef>> {
        (**self).creator_posts(handle, limit)
    }
}

/// Opens independent source sessions, one per worker
pub trait SourceFactory: Send + Sync {
    type Source: ContentSource + Send + 'static;

    fn open(&self) -> SourceResult<Self::Source>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_ref_strips_query() {
        let a = PostRef::new("https://example.com/p/abc/?utm_source=share");
        let b = PostRef::new(" https://example.com/p/abc/ ");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "https://example.com/p/abc/");
    }

    #[test]
    fn test_handle_strips_at() {
        let handle = CreatorHandle::parse("@chef.maria_").unwrap();
        assert_eq!(handle.as_str(), "chef.maria_");
    }

    #[test]
    fn test_handle_rejects_reserved_and_invalid() {
        assert!(CreatorHandle::parse("explore").is_none());
        assert!(CreatorHandle::parse("reel").is_none());
        assert!(CreatorHandle::parse("").is_none());
        assert!(CreatorHandle::parse("@").is_none());
        assert!(CreatorHandle::parse("bad handle").is_none());
        assert!(CreatorHandle::parse("?igsh=1").is_none());
    }

    #[test]
    fn test_handle_deserialize() {
        let handle: CreatorHandle = serde_json::from_str("\"@nomad\"").unwrap();
        assert_eq!(handle.as_str(), "nomad");
        assert!(serde_json::from_str::<CreatorHandle>("\"explore\"").is_err());
    }
}

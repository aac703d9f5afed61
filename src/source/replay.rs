// Replay source: serves a recorded crawl from a JSON fixture
//
// Each post holds its comment pages in the order they were revealed. A batch
// request returns every comment on the pages revealed so far, the way a
// scrolled comment pane keeps earlier comments on screen; an expand request
// reveals the next page.

use super::{ContentSource, CreatorHandle, PostRef, SourceError, SourceFactory, SourceResult};
use crate::error::{Result, ScanError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// One recorded post
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayPost {
    /// Raw creator handle as scraped; unparsable handles resolve to unknown
    #[serde(default)]
    pub creator: Option<String>,

    /// Comment pages; `null` entries stand in for elements whose text could
    /// not be read
    #[serde(default)]
    pub pages: Vec<Vec<Option<String>>>,
}

/// Recorded crawl
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayFixture {
    /// Keyword (lower-case) -> search results in display order
    #[serde(default)]
    pub search: HashMap<String, Vec<PostRef>>,

    #[serde(default)]
    pub posts: HashMap<PostRef, ReplayPost>,

    /// Creator handle -> their posts, newest first
    #[serde(default)]
    pub creators: HashMap<String, Vec<PostRef>>,

    /// Simulate a source that cannot be reached
    #[serde(default)]
    pub unavailable: bool,
}

impl ReplayFixture {
    /// Load a fixture from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ScanError::Io {
            source: e,
            context: format!("Failed to read fixture: {}", path.display()),
        })?;
        serde_json::from_str(&content).map_err(|e| ScanError::Fixture {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// A session over a shared fixture
#[derive(Debug, Clone)]
pub struct ReplaySource {
    fixture: Arc<ReplayFixture>,
    /// Post -> number of pages revealed so far
    revealed: HashMap<PostRef, usize>,
}

impl ReplaySource {
    pub fn new(fixture: Arc<ReplayFixture>) -> Self {
        Self {
            fixture,
            revealed: HashMap::new(),
        }
    }

    fn check_available(&self) -> SourceResult<()> {
        if self.fixture.unavailable {
            return Err(SourceError::Unavailable(
                "replay fixture marked unavailable".to_string(),
            ));
        }
        Ok(())
    }

    fn post(&self, post: &PostRef) -> SourceResult<&ReplayPost> {
        self.fixture
            .posts
            .get(post)
            .ok_or_else(|| SourceError::NotFound(post.to_string()))
    }
}

impl ContentSource for ReplaySource {
    fn search(&mut self, keyword: &str, limit: usize) -> SourceResult<Vec<PostRef>> {
        self.check_available()?;
        let mut results: Vec<PostRef> = Vec::new();
        if let Some(posts) = self.fixture.search.get(&keyword.trim().to_lowercase()) {
            for post in posts {
                if results.len() >= limit {
                    break;
                }
                if !results.contains(post) {
                    results.push(post.clone());
                }
            }
        }
        Ok(results)
    }

    fn resolve_creator(&mut self, post: &PostRef) -> SourceResult<Option<CreatorHandle>> {
        self.check_available()?;
        let recorded = self.post(post)?;
        Ok(recorded.creator.as_deref().and_then(CreatorHandle::parse))
    }

    fn next_comment_batch(&mut self, post: &PostRef) -> SourceResult<Vec<String>> {
        self.check_available()?;
        let fixture = Arc::clone(&self.fixture);
        let recorded = fixture
            .posts
            .get(post)
            .ok_or_else(|| SourceError::NotFound(post.to_string()))?;
        let revealed = *self.revealed.entry(post.clone()).or_insert(1);

        Ok(recorded
            .pages
            .iter()
            .take(revealed)
            .flatten()
            .map(|comment| comment.clone().unwrap_or_default())
            .collect())
    }

    fn expand_comments(&mut self, post: &PostRef) -> SourceResult<bool> {
        self.check_available()?;
        let page_count = self.post(post)?.pages.len();
        let revealed = self.revealed.entry(post.clone()).or_insert(1);
        if *revealed < page_count {
            *revealed += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn creator_posts(
        &mut self,
        handle: &CreatorHandle,
        limit: usize,
    ) -> SourceResult<Vec<PostRef>> {
        self.check_available()?;
        let posts = self
            .fixture
            .creators
            .iter()
            .find(|(raw, _)| CreatorHandle::parse(raw).as_ref() == Some(handle))
            .map(|(_, posts)| posts.as_slice())
            .unwrap_or_default();

        let mut results: Vec<PostRef> = Vec::new();
        for post in posts {
            if results.len() >= limit {
                break;
            }
            if !results.contains(post) {
                results.push(post.clone());
            }
        }
        Ok(results)
    }
}

impl SourceFactory for Arc<ReplayFixture> {
    type Source = ReplaySource;

    fn open(&self) -> SourceResult<ReplaySource> {
        Ok(ReplaySource::new(Arc::clone(self)))
    }
}

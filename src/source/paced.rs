// Pacing wrapper: sleeps a random interval before every comment batch request

use super::{ContentSource, CreatorHandle, PostRef, SourceFactory, SourceResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delay range in seconds between successive batch requests
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct ScrollDelay {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl ScrollDelay {
    /// Longest pause ever taken between two batch requests
    pub const MAX_SECS: f64 = 300.0;

    pub fn new(min_secs: f64, max_secs: f64) -> Self {
        Self { min_secs, max_secs }
    }

    /// No pacing at all
    pub fn none() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn is_zero(&self) -> bool {
        self.max_secs <= 0.0
    }

    /// Pick a delay uniformly from the range
    pub fn sample(&self) -> Duration {
        let bound = |secs: f64| {
            if secs.is_nan() {
                0.0
            } else {
                secs.clamp(0.0, Self::MAX_SECS)
            }
        };
        let min = bound(self.min_secs);
        let max = bound(self.max_secs).max(min);
        let secs = if max > min {
            rand::thread_rng().gen_range(min..=max)
        } else {
            min
        };
        Duration::from_secs_f64(secs)
    }
}

impl From<[f64; 2]> for ScrollDelay {
    fn from([min_secs, max_secs]: [f64; 2]) -> Self {
        Self { min_secs, max_secs }
    }
}

impl From<ScrollDelay> for [f64; 2] {
    fn from(delay: ScrollDelay) -> Self {
        [delay.min_secs, delay.max_secs]
    }
}

/// Wraps a source and sleeps before each comment batch request
#[derive(Debug, Clone)]
pub struct PacedSource<S> {
    inner: S,
    delay: ScrollDelay,
}

impl<S> PacedSource<S> {
    pub fn new(inner: S, delay: ScrollDelay) -> Self {
        Self { inner, delay }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: ContentSource> ContentSource for PacedSource<S> {
    fn search(&mut self, keyword: &str, limit: usize) -> SourceResult<Vec<PostRef>> {
        self.inner.search(keyword, limit)
    }

    fn resolve_creator(&mut self, post: &PostRef) -> SourceResult<Option<CreatorHandle>> {
        self.inner.resolve_creator(post)
    }

    fn next_comment_batch(&mut self, post: &PostRef) -> SourceResult<Vec<String>> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay.sample());
        }
        self.inner.next_comment_batch(post)
    }

    fn expand_comments(&mut self, post: &PostRef) -> SourceResult<bool> {
        self.inner.expand_comments(post)
    }

    fn creator_posts(
        &mut self,
        handle: &CreatorHandle,
        limit: usize,
    ) -> SourceResult<Vec<PostRef>> {
        self.inner.creator_posts(handle, limit)
    }
}

/// Factory that paces every session it opens
#[derive(Debug, Clone)]
pub struct PacedFactory<F> {
    inner: F,
    delay: ScrollDelay,
}

impl<F> PacedFactory<F> {
    pub fn new(inner: F, delay: ScrollDelay) -> Self {
        Self { inner, delay }
    }
}

impl<F: SourceFactory> SourceFactory for PacedFactory<F> {
    type Source = PacedSource<F::Source>;

    fn open(&self) -> SourceResult<Self::Source> {
        Ok(PacedSource::new(self.inner.open()?, self.delay))
    }
}

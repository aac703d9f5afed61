// Run-scoped pipeline state: the creator registry and accumulated results
use crate::metrics::{CreatorSummary, PostMetrics};
use crate::source::{CreatorHandle, PostRef};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::AddAssign;
use std::sync::{Mutex, MutexGuard};

/// Pipeline stages, in the only order they may be entered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Discover,
    Triage,
    DeepAnalysis,
    Summarize,
    Done,
}

/// Metrics of one analyzed post, tagged with its creator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub creator_handle: CreatorHandle,
    pub post_url: PostRef,
    #[serde(flatten)]
    pub metrics: PostMetrics,
}

/// Summary of one registered creator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatorRecord {
    pub creator_handle: CreatorHandle,
    #[serde(flatten)]
    pub summary: CreatorSummary,
}

#[derive(Debug, Default)]
struct RegistryInner {
    order: Vec<(CreatorHandle, PostRef)>,
    handles: HashSet<CreatorHandle>,
}

/// Creator handle -> post that first qualified them, in registration order
///
/// Registration is a single atomic check-and-insert, so concurrent triage
/// workers can share one registry.
#[derive(Debug, Default)]
pub struct CreatorRegistry {
    inner: Mutex<RegistryInner>,
}

impl CreatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a creator unless already present. Returns true if this call
    /// registered them; the first qualifying post wins.
    pub fn register(&self, handle: CreatorHandle, post: PostRef) -> bool {
        let mut inner = self.lock();
        if !inner.handles.insert(handle.clone()) {
            return false;
        }
        inner.order.push((handle, post));
        true
    }

    pub fn contains(&self, handle: &CreatorHandle) -> bool {
        self.lock().handles.contains(handle)
    }

    pub fn len(&self) -> usize {
        self.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the registrations in order
    pub fn entries(&self) -> Vec<(CreatorHandle, PostRef)> {
        self.lock().order.clone()
    }
}

/// Counters kept across a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Candidate posts returned by discovery
    pub candidates: usize,
    /// Candidate posts whose comments were collected and scored
    pub posts_triaged: usize,
    /// Candidates skipped: unknown creator or creator already registered
    pub posts_skipped: usize,
    /// Posts or creators whose processing failed and yielded nothing
    pub unit_failures: usize,
    /// Posts analyzed in Phase 2
    pub posts_analyzed: usize,
    /// Phase-2 posts that passed admission
    pub posts_passed: usize,
}

impl AddAssign for RunStats {
    fn add_assign(&mut self, other: Self) {
        self.candidates += other.candidates;
        self.posts_triaged += other.posts_triaged;
        self.posts_skipped += other.posts_skipped;
        self.unit_failures += other.unit_failures;
        self.posts_analyzed += other.posts_analyzed;
        self.posts_passed += other.posts_passed;
    }
}

/// Mutable state of one pipeline run
#[derive(Debug)]
pub struct PipelineState {
    stage: Stage,
    pub registry: CreatorRegistry,
    pub posts: Vec<PostRecord>,
    pub creators: Vec<CreatorRecord>,
    pub stats: RunStats,
}

impl PipelineState {
    pub fn new() -> Self {
        Self {
            stage: Stage::Discover,
            registry: CreatorRegistry::new(),
            posts: Vec::new(),
            creators: Vec::new(),
            stats: RunStats::default(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Move to a later stage; stages are never re-entered or revisited
    pub fn enter(&mut self, stage: Stage) {
        debug_assert!(
            stage > self.stage,
            "pipeline cannot move from {:?} back to {:?}",
            self.stage,
            stage
        );
        tracing::debug!("Pipeline stage: {:?} -> {:?}", self.stage, stage);
        self.stage = stage;
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn handle(s: &str) -> CreatorHandle {
        CreatorHandle::parse(s).unwrap()
    }

    #[test]
    fn test_first_registration_wins() {
        let registry = CreatorRegistry::new();
        assert!(registry.register(handle("ana"), PostRef::new("https://ex.com/p/1/")));
        assert!(!registry.register(handle("ana"), PostRef::new("https://ex.com/p/2/")));
        assert!(registry.register(handle("ben"), PostRef::new("https://ex.com/p/3/")));

        let entries = registry.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, handle("ana"));
        assert_eq!(entries[0].1, PostRef::new("https://ex.com/p/1/"));
        assert_eq!(entries[1].0, handle("ben"));
    }

    #[test]
    fn test_concurrent_registration_is_atomic() {
        let registry = Arc::new(CreatorRegistry::new());
        let threads: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    registry.register(handle("same"), PostRef::new(format!("https://ex.com/p/{i}/")))
                })
            })
            .collect();

        let wins = threads
            .into_iter()
            .map(|t| t.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(wins, 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_stage_order() {
        let mut state = PipelineState::new();
        assert_eq!(state.stage(), Stage::Discover);
        state.enter(Stage::Triage);
        state.enter(Stage::DeepAnalysis);
        assert_eq!(state.stage(), Stage::DeepAnalysis);
        assert!(Stage::Summarize > Stage::DeepAnalysis);
    }

    #[test]
    fn test_stats_add_assign() {
        let mut total = RunStats::default();
        total += RunStats {
            posts_triaged: 2,
            unit_failures: 1,
            ..Default::default()
        };
        total += RunStats {
            posts_triaged: 3,
            ..Default::default()
        };
        assert_eq!(total.posts_triaged, 5);
        assert_eq!(total.unit_failures, 1);
    }
}

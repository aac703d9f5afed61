//! Two-phase discovery pipeline
//!
//! Discover -> Triage (Phase 1) -> Deep analysis (Phase 2) -> Summarize.
//!
//! Triage scores candidate posts for a keyword and registers the creator of
//! every post that passes admission; deep analysis then scores each
//! registered creator's own posts and folds them into a creator summary.
//! Failures are contained to the post or creator being processed; only an
//! unreachable source, an empty candidate list, or an empty registry end a
//! run early.

mod concurrent;
mod state;

pub use concurrent::ConcurrentPipeline;
pub use state::{CreatorRecord, CreatorRegistry, PipelineState, PostRecord, RunStats, Stage};

use crate::collector::{Collector, CollectorConfig};
use crate::error::{Result, ScanError};
use crate::metrics::{aggregate, compute_metrics, AdmissionCriteria, PostMetrics};
use crate::source::{ContentSource, CreatorHandle, PostRef, SourceError};
use serde::{Deserialize, Serialize};

/// Everything a run needs to know besides the source
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub keyword: String,
    /// Discover limit
    pub candidate_limit: usize,
    /// Phase-2 posts per creator
    pub posts_per_creator: usize,
    pub criteria: AdmissionCriteria,
    pub triage: CollectorConfig,
    pub full: CollectorConfig,
}

impl PipelineSettings {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            candidate_limit: 20,
            posts_per_creator: 5,
            criteria: AdmissionCriteria::default(),
            triage: CollectorConfig::triage(),
            full: CollectorConfig::full(),
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Completed,
    /// Discovery returned no candidate posts
    NoCandidates,
    /// No candidate post passed triage
    NoQualifyingCreators,
}

/// Output of a run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub outcome: Outcome,
    /// Registered creators and the post that qualified each, in order
    pub registered: Vec<(CreatorHandle, PostRef)>,
    /// Phase-2 post metrics, grouped by creator in registration order
    pub posts: Vec<PostRecord>,
    /// One summary per registered creator, in registration order
    pub creators: Vec<CreatorRecord>,
    pub stats: RunStats,
}

impl PipelineReport {
    fn aborted(outcome: Outcome, state: PipelineState) -> Self {
        Self {
            outcome,
            registered: state.registry.entries(),
            posts: Vec::new(),
            creators: Vec::new(),
            stats: state.stats,
        }
    }
}

/// Result of triaging one candidate post
#[derive(Debug, Clone, PartialEq)]
pub enum TriageOutcome {
    /// Post passed and its creator was registered
    Registered(CreatorHandle),
    /// Post passed but its creator was registered meanwhile
    AlreadyRegistered(CreatorHandle),
    /// Creator was registered before this post was examined
    Skipped(CreatorHandle),
    /// Post did not pass admission
    Rejected(CreatorHandle),
    /// Creator could not be determined
    UnknownCreator,
    /// Processing failed
    Failed,
}

/// Phase-2 result for one creator
#[derive(Debug, Clone)]
pub struct CreatorAnalysis {
    pub posts: Vec<PostRecord>,
    pub failed: bool,
}

/// Sequential pipeline over a single source session
#[derive(Debug, Clone)]
pub struct Pipeline {
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(settings: PipelineSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run all stages against one source
    pub fn run<S>(&self, source: &mut S) -> Result<PipelineReport>
    where
        S: ContentSource + ?Sized,
    {
        let mut state = PipelineState::new();

        tracing::info!("Discovering posts for keyword '{}'", self.settings.keyword);
        let candidates = self.discover(source)?;
        state.stats.candidates = candidates.len();
        if candidates.is_empty() {
            tracing::warn!("No candidate posts found. Stopping.");
            return Ok(PipelineReport::aborted(Outcome::NoCandidates, state));
        }

        state.enter(Stage::Triage);
        tracing::info!("PHASE 1: Checking {} posts for admission", candidates.len());
        for post in &candidates {
            let (_, stats) = self.triage_post(source, post, &state.registry);
            state.stats += stats;
        }

        if state.registry.is_empty() {
            tracing::warn!("No creators passed Phase 1. Stopping.");
            return Ok(PipelineReport::aborted(
                Outcome::NoQualifyingCreators,
                state,
            ));
        }

        state.enter(Stage::DeepAnalysis);
        let registered = state.registry.entries();
        tracing::info!("PHASE 2: Analyzing {} creators", registered.len());
        let mut analyses = Vec::with_capacity(registered.len());
        for (handle, _) in &registered {
            let analysis = self.analyze_creator(source, handle);
            if analysis.failed {
                state.stats.unit_failures += 1;
            }
            analyses.push(analysis);
        }

        state.enter(Stage::Summarize);
        Ok(self.summarize(state, registered, analyses))
    }

    /// Candidate posts for the configured keyword, deduplicated and limited.
    ///
    /// An unreachable source is fatal; any other search failure yields no
    /// candidates.
    pub fn discover<S>(&self, source: &mut S) -> Result<Vec<PostRef>>
    where
        S: ContentSource + ?Sized,
    {
        let limit = self.settings.candidate_limit;
        let found = match source.search(&self.settings.keyword, limit) {
            Ok(found) => found,
            Err(SourceError::Unavailable(msg)) => return Err(ScanError::SourceUnavailable(msg)),
            Err(e) => {
                tracing::warn!("Search for '{}' failed: {}", self.settings.keyword, e);
                Vec::new()
            }
        };

        let mut candidates: Vec<PostRef> = Vec::with_capacity(found.len().min(limit));
        for post in found {
            if candidates.len() >= limit {
                break;
            }
            if !candidates.contains(&post) {
                candidates.push(post);
            }
        }

        tracing::info!("Found {} candidate posts", candidates.len());
        Ok(candidates)
    }

    /// Phase 1 for one candidate post
    pub fn triage_post<S>(
        &self,
        source: &mut S,
        post: &PostRef,
        registry: &CreatorRegistry,
    ) -> (TriageOutcome, RunStats)
    where
        S: ContentSource + ?Sized,
    {
        let mut stats = RunStats::default();

        let handle = match source.resolve_creator(post) {
            Ok(Some(handle)) => handle,
            Ok(None) => {
                tracing::warn!("Could not determine creator of {}; skipping", post);
                stats.posts_skipped += 1;
                return (TriageOutcome::UnknownCreator, stats);
            }
            Err(e) => {
                tracing::warn!("Failed to process post {}: {}", post, e);
                stats.unit_failures += 1;
                return (TriageOutcome::Failed, stats);
            }
        };

        if registry.contains(&handle) {
            tracing::debug!("Creator {} already registered; skipping {}", handle, post);
            stats.posts_skipped += 1;
            return (TriageOutcome::Skipped(handle), stats);
        }

        let collection = Collector::new(self.settings.triage).collect(source, post);
        let metrics = compute_metrics(collection.comments.as_slice(), &self.settings.criteria);
        stats.posts_triaged += 1;
        log_post_metrics("Phase-1", post, &metrics);

        if !metrics.passed {
            return (TriageOutcome::Rejected(handle), stats);
        }

        if registry.register(handle.clone(), post.clone()) {
            tracing::info!("Creator added for Phase-2 analysis: {}", handle);
            (TriageOutcome::Registered(handle), stats)
        } else {
            (TriageOutcome::AlreadyRegistered(handle), stats)
        }
    }

    /// Phase 2 for one creator
    pub fn analyze_creator<S>(&self, source: &mut S, handle: &CreatorHandle) -> CreatorAnalysis
    where
        S: ContentSource + ?Sized,
    {
        let post_refs = match source.creator_posts(handle, self.settings.posts_per_creator) {
            Ok(posts) => posts,
            Err(e) => {
                tracing::warn!("Failed to fetch posts for creator {}: {}", handle, e);
                return CreatorAnalysis {
                    posts: Vec::new(),
                    failed: true,
                };
            }
        };

        if post_refs.is_empty() {
            tracing::warn!("No posts found for creator: {}", handle);
        }

        let collector = Collector::new(self.settings.full);
        let posts: Vec<PostRecord> = post_refs
            .into_iter()
            .take(self.settings.posts_per_creator)
            .map(|post| {
                let collection = collector.collect(source, &post);
                let metrics =
                    compute_metrics(collection.comments.as_slice(), &self.settings.criteria);
                log_post_metrics("Phase-2", &post, &metrics);
                PostRecord {
                    creator_handle: handle.clone(),
                    post_url: post,
                    metrics,
                }
            })
            .collect();

        tracing::info!(
            "Completed analysis of {} posts for creator: {}",
            posts.len(),
            handle
        );
        CreatorAnalysis {
            posts,
            failed: false,
        }
    }

    /// Aggregate per-creator analyses, given in registration order
    fn summarize(
        &self,
        mut state: PipelineState,
        registered: Vec<(CreatorHandle, PostRef)>,
        analyses: Vec<CreatorAnalysis>,
    ) -> PipelineReport {
        for ((handle, _), analysis) in registered.iter().zip(analyses) {
            let metrics: Vec<PostMetrics> =
                analysis.posts.iter().map(|p| p.metrics.clone()).collect();
            let summary = aggregate(&metrics);

            tracing::info!(
                "Creator {}: {} posts analyzed, {} passed, avg EQS: {:.2}",
                handle,
                summary.posts_analyzed,
                summary.posts_passed,
                summary.avg_eqs
            );

            state.stats.posts_analyzed += summary.posts_analyzed;
            state.stats.posts_passed += summary.posts_passed;
            state.posts.extend(analysis.posts);
            state.creators.push(CreatorRecord {
                creator_handle: handle.clone(),
                summary,
            });
        }

        state.enter(Stage::Done);
        PipelineReport {
            outcome: Outcome::Completed,
            registered,
            posts: state.posts,
            creators: state.creators,
            stats: state.stats,
        }
    }
}

fn log_post_metrics(phase: &str, post: &PostRef, metrics: &PostMetrics) {
    tracing::info!(
        "[{}] {} | {} comments | Text %: {} | Emoji %: {} | Mixed %: {} | EQS: {} | {}",
        phase,
        post,
        metrics.total_comments,
        metrics.text_percentage,
        metrics.emoji_percentage,
        metrics.mixed_percentage,
        metrics.eqs,
        metrics.pass_label()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceResult;
    use std::collections::HashMap;

    /// In-memory source with fixed comments per post
    #[derive(Default)]
    struct MemorySource {
        search: Vec<PostRef>,
        creators: HashMap<PostRef, CreatorHandle>,
        comments: HashMap<PostRef, Vec<String>>,
        creator_posts: HashMap<CreatorHandle, Vec<PostRef>>,
        failing_creators: Vec<CreatorHandle>,
        search_error: Option<SourceError>,
    }

    impl MemorySource {
        fn post(&mut self, url: &str, creator: &str, comments: Vec<String>) -> PostRef {
            let post = PostRef::new(url);
            if let Some(handle) = CreatorHandle::parse(creator) {
                self.creators.insert(post.clone(), handle);
            }
            self.comments.insert(post.clone(), comments);
            post
        }
    }

    impl ContentSource for MemorySource {
        fn search(&mut self, _keyword: &str, limit: usize) -> SourceResult<Vec<PostRef>> {
            if let Some(e) = &self.search_error {
                return Err(e.clone());
            }
            Ok(self.search.iter().take(limit).cloned().collect())
        }

        fn resolve_creator(&mut self, post: &PostRef) -> SourceResult<Option<CreatorHandle>> {
            Ok(self.creators.get(post).cloned())
        }

        fn next_comment_batch(&mut self, post: &PostRef) -> SourceResult<Vec<String>> {
            Ok(self.comments.get(post).cloned().unwrap_or_default())
        }

        fn expand_comments(&mut self, _post: &PostRef) -> SourceResult<bool> {
            Ok(false)
        }

        fn creator_posts(
            &mut self,
            handle: &CreatorHandle,
            limit: usize,
        ) -> SourceResult<Vec<PostRef>> {
            if self.failing_creators.contains(handle) {
                return Err(SourceError::Request("profile did not load".to_string()));
            }
            Ok(self
                .creator_posts
                .get(handle)
                .map(|posts| posts.iter().take(limit).cloned().collect())
                .unwrap_or_default())
        }
    }

    fn text_comments(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("thoughtful comment {i}")).collect()
    }

    fn emoji_comments(n: usize) -> Vec<String> {
        (0..n).map(|i| "🔥".repeat(i + 1)).collect()
    }

    fn settings() -> PipelineSettings {
        PipelineSettings {
            criteria: AdmissionCriteria::new(5, 50.0),
            ..PipelineSettings::new("travel")
        }
    }

    #[test]
    fn test_no_candidates() {
        let mut source = MemorySource::default();
        let report = Pipeline::new(settings()).run(&mut source).unwrap();
        assert_eq!(report.outcome, Outcome::NoCandidates);
        assert!(report.creators.is_empty());
    }

    #[test]
    fn test_unavailable_source_is_fatal() {
        let mut source = MemorySource {
            search_error: Some(SourceError::Unavailable("offline".to_string())),
            ..Default::default()
        };
        let err = Pipeline::new(settings()).run(&mut source).unwrap_err();
        assert!(matches!(err, ScanError::SourceUnavailable(_)));
    }

    #[test]
    fn test_search_request_error_means_no_candidates() {
        let mut source = MemorySource {
            search_error: Some(SourceError::Request("rate limited".to_string())),
            ..Default::default()
        };
        let report = Pipeline::new(settings()).run(&mut source).unwrap();
        assert_eq!(report.outcome, Outcome::NoCandidates);
    }

    #[test]
    fn test_no_qualifying_creators() {
        let mut source = MemorySource::default();
        let post = source.post("https://ex.com/p/1/", "emojifan", emoji_comments(10));
        source.search = vec![post];

        let report = Pipeline::new(settings()).run(&mut source).unwrap();
        assert_eq!(report.outcome, Outcome::NoQualifyingCreators);
        assert_eq!(report.stats.posts_triaged, 1);
        assert!(report.posts.is_empty());
    }

    #[test]
    fn test_full_run_registers_once_and_keeps_empty_creators() {
        let mut source = MemorySource::default();
        let a1 = source.post("https://ex.com/p/a1/", "ana", text_comments(8));
        let a2 = source.post("https://ex.com/p/a2/", "ana", text_comments(9));
        let b1 = source.post("https://ex.com/p/b1/", "ben", text_comments(6));
        let unknown = source.post("https://ex.com/p/u/", "", text_comments(6));
        source.search = vec![a1.clone(), unknown, a2.clone(), b1.clone()];

        let ana = CreatorHandle::parse("ana").unwrap();
        let ben = CreatorHandle::parse("ben").unwrap();
        source
            .creator_posts
            .insert(ana.clone(), vec![a1.clone(), a2.clone()]);
        // ben has no posts listed on the source

        let report = Pipeline::new(settings()).run(&mut source).unwrap();

        assert_eq!(report.outcome, Outcome::Completed);
        assert_eq!(
            report.registered,
            vec![(ana.clone(), a1.clone()), (ben.clone(), b1.clone())]
        );
        assert_eq!(report.stats.candidates, 4);
        // a2 skipped because ana is registered, unknown creator skipped
        assert_eq!(report.stats.posts_skipped, 2);
        assert_eq!(report.stats.posts_triaged, 2);

        assert_eq!(report.posts.len(), 2);
        assert!(report.posts.iter().all(|p| p.creator_handle == ana));

        assert_eq!(report.creators.len(), 2);
        assert_eq!(report.creators[0].creator_handle, ana);
        assert_eq!(report.creators[0].summary.posts_analyzed, 2);
        assert_eq!(report.creators[0].summary.posts_passed, 2);
        assert_eq!(report.creators[1].creator_handle, ben);
        assert_eq!(report.creators[1].summary.posts_analyzed, 0);
        assert_eq!(report.creators[1].summary.avg_eqs, 0.0);
    }

    #[test]
    fn test_creator_failure_is_contained() {
        let mut source = MemorySource::default();
        let p1 = source.post("https://ex.com/p/1/", "ana", text_comments(8));
        let p2 = source.post("https://ex.com/p/2/", "ben", text_comments(8));
        source.search = vec![p1.clone(), p2.clone()];

        let ana = CreatorHandle::parse("ana").unwrap();
        let ben = CreatorHandle::parse("ben").unwrap();
        source.failing_creators.push(ana.clone());
        source.creator_posts.insert(ben.clone(), vec![p2]);

        let report = Pipeline::new(settings()).run(&mut source).unwrap();

        assert_eq!(report.outcome, Outcome::Completed);
        assert_eq!(report.stats.unit_failures, 1);
        assert_eq!(report.creators.len(), 2);
        assert_eq!(report.creators[0].summary.posts_analyzed, 0);
        assert_eq!(report.creators[1].summary.posts_analyzed, 1);
    }

    #[test]
    fn test_discover_dedups_and_limits() {
        let mut source = MemorySource::default();
        source.search = vec![
            PostRef::new("https://ex.com/p/1/?a=1"),
            PostRef::new("https://ex.com/p/1/"),
            PostRef::new("https://ex.com/p/2/"),
            PostRef::new("https://ex.com/p/3/"),
        ];
        let pipeline = Pipeline::new(PipelineSettings {
            candidate_limit: 3,
            ..settings()
        });
        let candidates = pipeline.discover(&mut source).unwrap();
        assert_eq!(
            candidates,
            vec![PostRef::new("https://ex.com/p/1/"), PostRef::new("https://ex.com/p/2/")]
        );
    }

    #[test]
    fn test_triage_outcomes() {
        let mut source = MemorySource::default();
        let good = source.post("https://ex.com/p/1/", "ana", text_comments(8));
        let bad = source.post("https://ex.com/p/2/", "ben", emoji_comments(8));
        let pipeline = Pipeline::new(settings());
        let registry = CreatorRegistry::new();

        let (outcome, stats) = pipeline.triage_post(&mut source, &good, &registry);
        assert!(matches!(outcome, TriageOutcome::Registered(_)));
        assert_eq!(stats.posts_triaged, 1);

        let (outcome, _) = pipeline.triage_post(&mut source, &good, &registry);
        assert!(matches!(outcome, TriageOutcome::Skipped(_)));

        let (outcome, _) = pipeline.triage_post(&mut source, &bad, &registry);
        assert!(matches!(outcome, TriageOutcome::Rejected(_)));
        assert_eq!(registry.len(), 1);
    }
}

// Worker-pool pipeline: same stages as the sequential pipeline, with each
// phase's units spread over N independent source sessions.
//
// Source calls are blocking, so workers run on tokio's blocking pool. Each
// worker opens its own session and pulls units from a shared queue until it
// is empty. Creator registration goes through the shared registry, so a
// creator is registered at most once however the posts are interleaved.

use super::{CreatorAnalysis, Outcome, Pipeline, PipelineReport, PipelineSettings, Stage};
use super::{CreatorRegistry, PipelineState, RunStats};
use crate::error::{Result, ScanError};
use crate::source::{CreatorHandle, PostRef, SourceFactory};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::task::JoinSet;

type WorkQueue<T> = Arc<Mutex<VecDeque<T>>>;

fn next_unit<T>(queue: &WorkQueue<T>) -> Option<T> {
    queue
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .pop_front()
}

/// Pipeline that processes each phase with a pool of workers
#[derive(Debug, Clone)]
pub struct ConcurrentPipeline {
    pipeline: Arc<Pipeline>,
    workers: usize,
}

impl ConcurrentPipeline {
    pub fn new(settings: PipelineSettings, workers: usize) -> Self {
        Self {
            pipeline: Arc::new(Pipeline::new(settings)),
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run all stages, opening one session per worker from `factory`
    pub fn run<F>(&self, factory: Arc<F>) -> Result<PipelineReport>
    where
        F: SourceFactory + 'static,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .max_blocking_threads(self.workers)
            .build()
            .map_err(|e| ScanError::Runtime(format!("Failed to create tokio runtime: {}", e)))?;

        runtime.block_on(self.run_phases(factory))
    }

    async fn run_phases<F>(&self, factory: Arc<F>) -> Result<PipelineReport>
    where
        F: SourceFactory + 'static,
    {
        let mut state = PipelineState::new();
        let settings = self.pipeline.settings();

        tracing::info!(
            "Discovering posts for keyword '{}' with {} workers",
            settings.keyword,
            self.workers
        );
        let mut session = factory
            .open()
            .map_err(|e| ScanError::SourceUnavailable(e.to_string()))?;
        let candidates = self.pipeline.discover(&mut session)?;
        drop(session);

        state.stats.candidates = candidates.len();
        if candidates.is_empty() {
            tracing::warn!("No candidate posts found. Stopping.");
            return Ok(PipelineReport::aborted(Outcome::NoCandidates, state));
        }

        state.enter(Stage::Triage);
        tracing::info!("PHASE 1: Checking {} posts for admission", candidates.len());
        let registry = Arc::new(CreatorRegistry::new());
        state.stats += self
            .triage_all(Arc::clone(&factory), candidates, Arc::clone(&registry))
            .await?;

        if registry.is_empty() {
            tracing::warn!("No creators passed Phase 1. Stopping.");
            return Ok(PipelineReport::aborted(
                Outcome::NoQualifyingCreators,
                state,
            ));
        }

        state.enter(Stage::DeepAnalysis);
        let registered = registry.entries();
        tracing::info!("PHASE 2: Analyzing {} creators", registered.len());
        let handles: Vec<CreatorHandle> = registered.iter().map(|(h, _)| h.clone()).collect();
        let analyses = self.analyze_all(factory, handles).await?;
        state.stats.unit_failures += analyses.iter().filter(|a| a.failed).count();

        state.enter(Stage::Summarize);
        Ok(self.pipeline.summarize(state, registered, analyses))
    }

    /// Phase 1 over a shared post queue; returns the merged counters
    async fn triage_all<F>(
        &self,
        factory: Arc<F>,
        candidates: Vec<PostRef>,
        registry: Arc<CreatorRegistry>,
    ) -> Result<RunStats>
    where
        F: SourceFactory + 'static,
    {
        let worker_count = self.workers.min(candidates.len());
        let queue: WorkQueue<PostRef> = Arc::new(Mutex::new(candidates.into()));
        let mut set = JoinSet::new();

        for worker in 0..worker_count {
            let factory = Arc::clone(&factory);
            let queue = Arc::clone(&queue);
            let registry = Arc::clone(&registry);
            let pipeline = Arc::clone(&self.pipeline);

            set.spawn_blocking(move || {
                let mut source = factory.open().map_err(|e| {
                    tracing::warn!("Worker {} could not open a session: {}", worker, e);
                    e
                })?;
                let mut stats = RunStats::default();
                while let Some(post) = next_unit(&queue) {
                    let (_, unit_stats) = pipeline.triage_post(&mut source, &post, &registry);
                    stats += unit_stats;
                }
                Ok::<_, crate::source::SourceError>(stats)
            });
        }

        let mut stats = RunStats::default();
        let mut opened = 0;
        let mut last_error = None;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(worker_stats)) => {
                    opened += 1;
                    stats += worker_stats;
                }
                Ok(Err(e)) => last_error = Some(e.to_string()),
                Err(e) => {
                    tracing::warn!("Triage worker panicked: {}", e);
                    stats.unit_failures += 1;
                    opened += 1;
                }
            }
        }

        if opened == 0 {
            return Err(ScanError::SourceUnavailable(
                last_error.unwrap_or_else(|| "no worker session could be opened".to_string()),
            ));
        }

        Ok(stats)
    }

    /// Phase 2 over a shared creator queue; results come back in the order
    /// of `handles`
    async fn analyze_all<F>(
        &self,
        factory: Arc<F>,
        handles: Vec<CreatorHandle>,
    ) -> Result<Vec<CreatorAnalysis>>
    where
        F: SourceFactory + 'static,
    {
        let total = handles.len();
        let worker_count = self.workers.min(total);
        let queue: WorkQueue<(usize, CreatorHandle)> =
            Arc::new(Mutex::new(handles.into_iter().enumerate().collect()));
        let mut set = JoinSet::new();

        for worker in 0..worker_count {
            let factory = Arc::clone(&factory);
            let queue = Arc::clone(&queue);
            let pipeline = Arc::clone(&self.pipeline);

            set.spawn_blocking(move || {
                let mut source = factory.open().map_err(|e| {
                    tracing::warn!("Worker {} could not open a session: {}", worker, e);
                    e
                })?;
                let mut done = Vec::new();
                while let Some((slot, handle)) = next_unit(&queue) {
                    done.push((slot, pipeline.analyze_creator(&mut source, &handle)));
                }
                Ok::<_, crate::source::SourceError>(done)
            });
        }

        let mut slots: Vec<Option<CreatorAnalysis>> = vec![None; total];
        let mut opened = 0;
        let mut last_error = None;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(done)) => {
                    opened += 1;
                    for (slot, analysis) in done {
                        slots[slot] = Some(analysis);
                    }
                }
                Ok(Err(e)) => last_error = Some(e.to_string()),
                Err(e) => {
                    tracing::warn!("Analysis worker panicked: {}", e);
                    opened += 1;
                }
            }
        }

        if opened == 0 {
            return Err(ScanError::SourceUnavailable(
                last_error.unwrap_or_else(|| "no worker session could be opened".to_string()),
            ));
        }

        // Creators lost with a panicked worker are reported as failed
        Ok(slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or(CreatorAnalysis {
                    posts: Vec::new(),
                    failed: true,
                })
            })
            .collect())
    }
}

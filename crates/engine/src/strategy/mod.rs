#![forbid(unsafe_code)]

mod graph;
mod probabilistic;
mod sliding_window;

pub use graph::GraphStrategy;
pub use probabilistic::ProbabilisticStrategy;
pub use sliding_window::SlidingWindowStrategy;

use crate::domain::{AccessRecord, ContentType, PrefetchCandidate};
use config::WindowSettings;
use std::collections::HashMap;

/// A prediction policy: turns one access record into candidates.
///
/// Pure and stateless: identical records yield identical candidates.
pub trait Strategy: Send + Sync {
    fn predict(&self, record: &AccessRecord, window: &WindowSettings) -> Vec<PrefetchCandidate>;
}

/// Predicts nothing. Unclassified content is never speculatively fetched.
#[derive(Debug, Default)]
pub struct NoopStrategy;

impl Strategy for NoopStrategy {
    fn predict(&self, _record: &AccessRecord, _window: &WindowSettings) -> Vec<PrefetchCandidate> {
        Vec::new()
    }
}

/// Runs strategies in order and concatenates their candidates.
pub struct ChainStrategy {
    strategies: Vec<Box<dyn Strategy>>,
}

impl ChainStrategy {
    pub fn new(strategies: Vec<Box<dyn Strategy>>) -> Self {
        Self { strategies }
    }
}

impl Strategy for ChainStrategy {
    fn predict(&self, record: &AccessRecord, window: &WindowSettings) -> Vec<PrefetchCandidate> {
        self.strategies
            .iter()
            .flat_map(|strategy| strategy.predict(record, window))
            .collect()
    }
}

/// Per-content-type strategy lookup, built once at construction.
///
/// Selection is total: every `ContentType` maps to exactly one strategy,
/// with `Unknown` pinned to [`NoopStrategy`].
pub struct StrategyTable {
    entries: HashMap<ContentType, Box<dyn Strategy>>,
    noop: NoopStrategy,
}

impl StrategyTable {
    pub fn new(priority_levels: u32) -> Self {
        let mut entries: HashMap<ContentType, Box<dyn Strategy>> = HashMap::new();
        entries.insert(
            ContentType::Video,
            Box::new(SlidingWindowStrategy::new(priority_levels)),
        );
        entries.insert(
            ContentType::Document,
            Box::new(ChainStrategy::new(vec![
                Box::new(ProbabilisticStrategy::new(priority_levels)),
                Box::new(GraphStrategy::new(priority_levels)),
            ])),
        );
        entries.insert(
            ContentType::Generic,
            Box::new(ChainStrategy::new(vec![
                Box::new(ProbabilisticStrategy::new(priority_levels)),
                Box::new(GraphStrategy::new(priority_levels)),
            ])),
        );
        Self {
            entries,
            noop: NoopStrategy,
        }
    }

    pub fn select(&self, content_type: ContentType) -> &dyn Strategy {
        self.entries
            .get(&content_type)
            .map(Box::as_ref)
            .unwrap_or(&self.noop)
    }
}

#![forbid(unsafe_code)]

use crate::domain::{AccessRecord, PredictReason, PrefetchCandidate};
use crate::strategy::Strategy;
use config::WindowSettings;
use std::time::Duration;

/// Predicts immediate children from the record's adjacency hint.
///
/// A freshly-listed directory or DAG node is likely to have its children
/// opened next; the colder the parent access, the lower the urgency. Lane 0
/// stays reserved for imminent window chunks.
#[derive(Debug, Clone)]
pub struct GraphStrategy {
    priority_levels: u32,
}

impl GraphStrategy {
    pub fn new(priority_levels: u32) -> Self {
        Self { priority_levels }
    }

    fn recency_lane(&self, since_access: Duration) -> u8 {
        let last = self.priority_levels.saturating_sub(1).min(u8::MAX.into()) as u8;
        if since_access <= Duration::from_secs(1) {
            1u8.min(last)
        } else if since_access <= Duration::from_secs(60) {
            (self.priority_levels / 2).min(last.into()) as u8
        } else {
            last
        }
    }
}

impl Strategy for GraphStrategy {
    fn predict(&self, record: &AccessRecord, _window: &WindowSettings) -> Vec<PrefetchCandidate> {
        if record.children.is_empty() {
            return Vec::new();
        }
        let priority = self.recency_lane(record.last_access.elapsed());

        let mut candidates = Vec::with_capacity(record.children.len());
        for id in &record.children {
            if id == &record.content_id {
                continue;
            }
            if candidates
                .iter()
                .any(|c: &PrefetchCandidate| &c.content_id == id)
            {
                continue;
            }
            candidates.push(PrefetchCandidate {
                content_id: id.clone(),
                priority,
                reason: PredictReason::GraphRelated,
            });
        }
        candidates
    }
}

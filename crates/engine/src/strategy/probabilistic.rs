#![forbid(unsafe_code)]

use crate::domain::{AccessRecord, PredictReason, PrefetchCandidate};
use crate::strategy::Strategy;
use config::WindowSettings;

/// Predicts a handful of related ids from the record's relation hint.
///
/// Confidence is low (the hint says "often seen together", nothing more),
/// so everything lands in the lowest lane as background work.
#[derive(Debug, Clone)]
pub struct ProbabilisticStrategy {
    background_lane: u8,
}

impl ProbabilisticStrategy {
    pub fn new(priority_levels: u32) -> Self {
        Self {
            background_lane: priority_levels.saturating_sub(1).min(u8::MAX.into()) as u8,
        }
    }
}

impl Strategy for ProbabilisticStrategy {
    fn predict(&self, record: &AccessRecord, window: &WindowSettings) -> Vec<PrefetchCandidate> {
        let mut candidates = Vec::new();
        for id in &record.related {
            if candidates.len() == window.related_limit {
                break;
            }
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
                priority: self.background_lane,
                reason: PredictReason::Probabilistic,
            });
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccessMetadata, ContentType};
    use pretty_assertions::assert_eq;
    use std::time::Instant;

    fn record(related: &[&str]) -> AccessRecord {
        AccessRecord::new(
            "doc.txt",
            ContentType::Document,
            &AccessMetadata {
                related: related.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            },
            Instant::now(),
        )
    }

    #[test]
    fn takes_up_to_the_related_limit() {
        let strategy = ProbabilisticStrategy::new(4);
        let candidates = strategy.predict(
            &record(&["a.txt", "b.txt", "c.txt"]),
            &WindowSettings::default(),
        );

        let ids: Vec<&str> = candidates.iter().map(|c| c.content_id.as_str()).collect();
        assert_eq!(ids, ["a.txt", "b.txt"]);
        assert!(candidates.iter().all(|c| c.priority == 3));
        assert!(candidates
            .iter()
            .all(|c| c.reason == PredictReason::Probabilistic));
    }

    #[test]
    fn skips_self_and_duplicates() {
        let strategy = ProbabilisticStrategy::new(4);
        let candidates = strategy.predict(
            &record(&["doc.txt", "a.txt", "a.txt", "b.txt"]),
            &WindowSettings::default(),
        );
        let ids: Vec<&str> = candidates.iter().map(|c| c.content_id.as_str()).collect();
        assert_eq!(ids, ["a.txt", "b.txt"]);
    }

    #[test]
    fn empty_hint_predicts_nothing() {
        let strategy = ProbabilisticStrategy::new(4);
        assert!(strategy
            .predict(&record(&[]), &WindowSettings::default())
            .is_empty());
    }
}

#![forbid(unsafe_code)]

use crate::domain::{AccessRecord, PredictReason, PrefetchCandidate, chunk_id};
use crate::strategy::Strategy;
use config::WindowSettings;

/// Predicts the next chunks ahead of the observed read position.
///
/// For streamed content a reader at position `p` will almost certainly want
/// the chunks right after `p`'s chunk; priority decays with distance so the
/// imminent chunk lands in lane 0 and the window tail in later lanes. The
/// window never reaches past `total_size`.
#[derive(Debug, Clone)]
pub struct SlidingWindowStrategy {
    last_lane: u8,
}

impl SlidingWindowStrategy {
    pub fn new(priority_levels: u32) -> Self {
        Self {
            last_lane: priority_levels.saturating_sub(1).min(u8::MAX.into()) as u8,
        }
    }
}

impl Strategy for SlidingWindowStrategy {
    fn predict(&self, record: &AccessRecord, window: &WindowSettings) -> Vec<PrefetchCandidate> {
        let (Some(position), Some(total)) = (record.observed_position, record.total_size) else {
            return Vec::new();
        };
        if window.chunk_size == 0 || position >= total {
            return Vec::new();
        }

        let current_chunk = position / window.chunk_size;
        let mut candidates = Vec::with_capacity(window.chunk_count as usize);
        for i in 0..window.chunk_count as u64 {
            let Some(chunk) = current_chunk.checked_add(1 + i) else {
                break;
            };
            let Some(offset) = chunk.checked_mul(window.chunk_size) else {
                break;
            };
            if offset >= total {
                break;
            }
            candidates.push(PrefetchCandidate {
                content_id: chunk_id(&record.content_id, offset),
                priority: (i.min(self.last_lane as u64)) as u8,
                reason: PredictReason::SlidingWindow,
            });
        }
        candidates
    }
}

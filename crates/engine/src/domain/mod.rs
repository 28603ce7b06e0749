#![forbid(unsafe_code)]

mod access;
mod candidate;
mod content;

pub use access::{AccessMetadata, AccessRecord};
pub use candidate::{PredictReason, PrefetchCandidate, chunk_id, split_chunk_id};
pub use content::ContentType;

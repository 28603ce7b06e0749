#![forbid(unsafe_code)]

/// Why a candidate was predicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictReason {
    SlidingWindow,
    Probabilistic,
    GraphRelated,
}

/// One predicted future access, produced by a strategy and consumed
/// immediately by the admission filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchCandidate {
    pub content_id: String,
    /// 0 = most urgent lane.
    pub priority: u8,
    pub reason: PredictReason,
}

/// Address of one window chunk within a larger object.
pub fn chunk_id(content_id: &str, offset: u64) -> String {
    format!("{content_id}@{offset}")
}

/// Split a chunk id back into `(object id, offset)`.
///
/// Ids without a trailing `@<offset>` come back whole, with `None`.
pub fn split_chunk_id(id: &str) -> (&str, Option<u64>) {
    match id.rsplit_once('@') {
        Some((base, offset)) if !base.is_empty() => match offset.parse() {
            Ok(offset) => (base, Some(offset)),
            Err(_) => (id, None),
        },
        _ => (id, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_id_round_trips() {
        let id = chunk_id("movies/intro.mkv", 262144);
        assert_eq!(id, "movies/intro.mkv@262144");
        assert_eq!(split_chunk_id(&id), ("movies/intro.mkv", Some(262144)));
    }

    #[test]
    fn split_leaves_plain_ids_alone() {
        assert_eq!(split_chunk_id("plain"), ("plain", None));
        assert_eq!(split_chunk_id("user@host"), ("user@host", None));
        assert_eq!(split_chunk_id("@42"), ("@42", None));
    }
}

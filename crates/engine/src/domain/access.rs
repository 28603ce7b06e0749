#![forbid(unsafe_code)]

use crate::domain::ContentType;
use std::time::Instant;

/// Caller-supplied description of one content access.
#[derive(Debug, Clone, Default)]
pub struct AccessMetadata {
    /// File-name hint, e.g. `"movies/intro.mkv"`.
    pub name_hint: Option<String>,

    /// MIME hint, e.g. `"video/mp4"`. Takes precedence over the name.
    pub mime: Option<String>,

    pub size_bytes: u64,

    /// Byte position the caller is currently reading, for streamed content.
    pub observed_position: Option<u64>,

    pub total_size: Option<u64>,

    /// Relation hint: ids often accessed together with this one.
    pub related: Vec<String>,

    /// Adjacency hint: immediate children of this content (directory
    /// entries, DAG links).
    pub children: Vec<String>,
}

/// Access history for one content id.
///
/// Owned exclusively by the manager's history table; identity fields never
/// change, position/time/hint fields are updated in place on each access.
#[derive(Debug, Clone)]
pub struct AccessRecord {
    pub content_id: String,
    pub content_type: ContentType,
    pub size_bytes: u64,
    pub observed_position: Option<u64>,
    pub total_size: Option<u64>,
    pub last_access: Instant,
    pub related: Vec<String>,
    pub children: Vec<String>,
}

impl AccessRecord {
    pub fn new(
        content_id: impl Into<String>,
        content_type: ContentType,
        metadata: &AccessMetadata,
        now: Instant,
    ) -> Self {
        Self {
            content_id: content_id.into(),
            content_type,
            size_bytes: metadata.size_bytes,
            observed_position: metadata.observed_position,
            total_size: metadata.total_size,
            last_access: now,
            related: metadata.related.clone(),
            children: metadata.children.clone(),
        }
    }

    /// Fold a repeated access into this record.
    ///
    /// The content type only upgrades away from `Unknown`; hints are
    /// replaced when the new access carries them and kept otherwise.
    pub fn touch(&mut self, content_type: ContentType, metadata: &AccessMetadata, now: Instant) {
        if self.content_type == ContentType::Unknown {
            self.content_type = content_type;
        }
        if metadata.size_bytes > 0 {
            self.size_bytes = metadata.size_bytes;
        }
        if metadata.observed_position.is_some() {
            self.observed_position = metadata.observed_position;
        }
        if metadata.total_size.is_some() {
            self.total_size = metadata.total_size;
        }
        if !metadata.related.is_empty() {
            self.related = metadata.related.clone();
        }
        if !metadata.children.is_empty() {
            self.children = metadata.children.clone();
        }
        self.last_access = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touch_updates_mutable_fields_only() {
        let now = Instant::now();
        let mut record = AccessRecord::new(
            "vid",
            ContentType::Video,
            &AccessMetadata {
                observed_position: Some(100),
                total_size: Some(1000),
                ..Default::default()
            },
            now,
        );

        record.touch(
            ContentType::Unknown,
            &AccessMetadata {
                observed_position: Some(300),
                ..Default::default()
            },
            now,
        );

        assert_eq!(record.content_id, "vid");
        // known type is not demoted by a hint-less later access
        assert_eq!(record.content_type, ContentType::Video);
        assert_eq!(record.observed_position, Some(300));
        assert_eq!(record.total_size, Some(1000));
    }

    #[test]
    fn touch_upgrades_unknown() {
        let now = Instant::now();
        let mut record =
            AccessRecord::new("x", ContentType::Unknown, &AccessMetadata::default(), now);
        record.touch(ContentType::Document, &AccessMetadata::default(), now);
        assert_eq!(record.content_type, ContentType::Document);
    }
}

#![forbid(unsafe_code)]

use crate::domain::AccessMetadata;

/// Classified kind of a piece of content, driving strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// Streaming media consumed positionally (video, audio).
    Video,
    Document,
    Generic,
    /// Unclassifiable; never speculatively fetched.
    Unknown,
}

impl ContentType {
    /// Classify from an explicit MIME hint, then a file-name hint, then a
    /// sample of the leading bytes. Total: falls back to `Unknown`.
    pub fn classify(metadata: &AccessMetadata, sample: Option<&[u8]>) -> Self {
        if let Some(mime) = metadata.mime.as_deref()
            && let Some(content_type) = Self::from_mime(mime)
        {
            return content_type;
        }
        if let Some(name) = metadata.name_hint.as_deref()
            && let Some(content_type) = Self::from_name(name)
        {
            return content_type;
        }
        if let Some(sample) = sample
            && !sample.is_empty()
        {
            return Self::sniff(sample);
        }
        Self::Unknown
    }

    fn from_mime(mime: &str) -> Option<Self> {
        // strip parameters: "video/mp4; codecs=..." -> "video/mp4"
        let essence = mime.split(';').next().unwrap_or(mime).trim();
        match essence {
            m if m.starts_with("video/") || m.starts_with("audio/") => Some(Self::Video),
            "application/vnd.apple.mpegurl" | "application/x-mpegurl" => Some(Self::Video),
            m if m.starts_with("text/") => Some(Self::Document),
            "application/pdf" | "application/epub+zip" | "application/msword" | "application/rtf" => {
                Some(Self::Document)
            }
            m if m.starts_with("image/") || m.starts_with("application/") => Some(Self::Generic),
            _ => None,
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        let (stem, extension) = name.rsplit_once('.')?;
        if stem.is_empty() {
            return None;
        }
        match extension.to_ascii_lowercase().as_str() {
            "mp4" | "mkv" | "webm" | "avi" | "mov" | "m4v" | "mpg" | "mpeg" | "ts" | "mp3"
            | "flac" | "ogg" => Some(Self::Video),
            "pdf" | "txt" | "md" | "doc" | "docx" | "odt" | "epub" | "html" | "htm" | "rtf" => {
                Some(Self::Document)
            }
            "bin" | "dat" | "iso" | "img" | "zip" | "tar" | "gz" | "xz" | "zst" => {
                Some(Self::Generic)
            }
            _ => None,
        }
    }

    fn sniff(sample: &[u8]) -> Self {
        // ISO BMFF (mp4/mov): "ftyp" at byte 4
        if sample.len() >= 8 && &sample[4..8] == b"ftyp" {
            return Self::Video;
        }
        // EBML header (mkv/webm)
        if sample.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
            return Self::Video;
        }
        if sample.starts_with(b"%PDF-") {
            return Self::Document;
        }
        let printable = sample
            .iter()
            .filter(|b| b.is_ascii_graphic() || b.is_ascii_whitespace())
            .count();
        if printable * 100 >= sample.len() * 95 {
            return Self::Document;
        }
        Self::Generic
    }
}

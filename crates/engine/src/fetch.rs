#![forbid(unsafe_code)]

use async_trait::async_trait;

/// Retrieves content bytes by id.
///
/// Supplied by the host (an HTTP client, an object store, a filesystem);
/// the engine treats it as opaque, potentially slow, potentially failing.
/// A fetcher that can hang indefinitely should carry its own timeout.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, id: &str) -> Result<Vec<u8>, FetchError>;
}

#[derive(Debug, thiserror::Error)]
#[error("{reason}")]
pub struct FetchError {
    pub reason: String,
}

impl FetchError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

#![forbid(unsafe_code)]

use crate::cache::CacheError;
use crate::fetch::FetchError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The pool no longer accepts submissions.
    #[error("pool is closed")]
    PoolClosed,

    /// The lane's bounded queue is at capacity. This is a backpressure
    /// signal: drop the speculative work, do not retry.
    #[error("queue full for priority lane {priority}")]
    QueueFull { priority: u8 },

    #[error("fetch failed for {id}: {source}")]
    Fetch { id: String, source: FetchError },

    #[error("cache put failed for {id}: {source}")]
    CachePut { id: String, source: CacheError },

    #[error("config error: {0}")]
    Config(#[from] config::Error),
}

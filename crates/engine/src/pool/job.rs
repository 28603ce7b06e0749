#![forbid(unsafe_code)]

use crate::Error;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

pub type JobFuture = Pin<Box<dyn Future<Output = Result<(), Error>> + Send + 'static>>;

/// A unit of work owned by the pool from submission until completion.
pub struct Job {
    pub id: String,
    pub priority: u8,
    pub submitted_at: Instant,
    pub(crate) work: JobFuture,
}

impl Job {
    pub fn new(
        id: impl Into<String>,
        priority: u8,
        work: impl Future<Output = Result<(), Error>> + Send + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            priority,
            submitted_at: Instant::now(),
            work: Box::pin(work),
        }
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("submitted_at", &self.submitted_at)
            .finish_non_exhaustive()
    }
}

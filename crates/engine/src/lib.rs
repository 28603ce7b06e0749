#![forbid(unsafe_code)]

mod error;

pub mod cache;
pub mod domain;
pub mod fetch;
pub mod pool;
pub mod prefetch;
pub mod strategy;

pub use error::Error;
pub use prefetch::PrefetchManager;

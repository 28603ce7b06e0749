#![forbid(unsafe_code)]

mod feed;
mod monitor;
mod snapshot;

pub use feed::{FixedFeed, ResourceFeed};
pub use monitor::ResourceMonitor;
pub use snapshot::ResourceSnapshot;

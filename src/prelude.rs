//! Convenience re-exports for the common surface.

pub use crate::builder::{Cache, CacheBuilder, PolicyKind};
pub use crate::cache::CacheCore;
pub use crate::error::{ConfigError, InsertError};
pub use crate::policy::{
    ArcPolicy, ClockPolicy, FifoPolicy, LfuPolicy, LruPolicy, Policy, SievePolicy,
};
pub use crate::stats::CacheStats;
pub use crate::sync::ConcurrentCache;

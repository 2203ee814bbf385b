//! `payeekit-core` - runtime pieces shared by the classification and
//! duplicate engines.
//!
//! Everything here is executor-agnostic in the sense that matters: futures
//! are driven by whoever calls them (`smol::block_on` in the CLI and tests,
//! a UI executor on the desktop). Nothing spawns threads.

pub mod cache;
pub mod cancel;
pub mod resilience;
pub mod schedule;

pub use cache::{CacheService, FileTtlCache, InMemoryTtlCache};
pub use cancel::{CancelGuard, CancelToken};
pub use resilience::{with_resilience, CallError, ResiliencePolicy};
pub use schedule::{adaptive_chunk_size, yield_point, Progress};

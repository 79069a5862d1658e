//! # Quota Infrastructure
//!
//! Concrete implementations of the ports defined in `quota-core`:
//! key-value stores for the persisted window and clocks.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external services, memory and file stores only
//! - `redis` - Redis-backed store shared between hosts

pub mod clock;
pub mod store;

// Re-exports - Local
pub use clock::{ManualClock, SystemClock};
pub use store::{FileStore, InMemoryStore, ScopedStore};

// Re-exports - Redis
#[cfg(feature = "redis")]
pub use store::{RedisConfig, RedisStore};

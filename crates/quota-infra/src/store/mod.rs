//! Key-value store implementations - file, in-memory and Redis.

mod file;
mod memory;
mod scoped;

pub use file::FileStore;
pub use memory::InMemoryStore;
pub use scoped::ScopedStore;

#[cfg(feature = "redis")]
mod redis;
#[cfg(feature = "redis")]
pub use self::redis::{RedisConfig, RedisStore};

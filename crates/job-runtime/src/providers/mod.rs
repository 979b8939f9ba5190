//! Concrete queue backends.

mod memory;
mod redis;

pub use memory::InMemoryJobQueue;
pub use redis::RedisJobQueue;

//! Bus seam: the shared publish/subscribe substrate plus the two key
//! operations front ends need at startup (atomic counter, config fetch).
//!
//! [`RedisBus`] talks to a real Redis server; [`MemoryBus`] keeps everything
//! in-process and backs the tests of every crate above this one.

pub mod memory;
pub mod redis_bus;

use std::pin::Pin;

use {async_trait::async_trait, futures::Stream};

pub use {memory::MemoryBus, redis_bus::RedisBus};

/// Raw messages received on one channel, in arrival order. Ends when the
/// underlying connection goes away.
pub type Subscription = Pin<Box<dyn Stream<Item = String> + Send>>;

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("value at '{0}' is not an integer")]
    NotAnInteger(String),

    #[error("bus unavailable: {0}")]
    Unavailable(String),
}

/// Operations every bus backend provides.
#[async_trait]
pub trait Bus: Send + Sync {
    /// Fire-and-forget broadcast to all current subscribers of `channel`.
    async fn publish(&self, channel: &str, message: &str) -> Result<(), BusError>;

    /// Start receiving messages published to `channel` from now on.
    async fn subscribe(&self, channel: &str) -> Result<Subscription, BusError>;

    /// Atomically increment the integer at `key` and return the new value.
    /// A missing key counts as zero.
    async fn incr(&self, key: &str) -> Result<i64, BusError>;

    async fn get(&self, key: &str) -> Result<Option<String>, BusError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), BusError>;
}

pub mod redis;

pub use self::redis::RedisManager;

use crate::error::Result;

/// Cache-store capability consumed by the redis probe.
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    async fn ping(&self) -> Result<()>;

    /// Raw `INFO <section>` text.
    async fn info(&self, section: &str) -> Result<String>;
}

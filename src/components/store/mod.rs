//! Persistent key-value store used for the session nonce cache and the
//! per-guild channel bindings.

mod actor;

pub use actor::{keys, StoreActor, StoreActorHandle};

use crate::error::BotResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// One guild's calendar mirror: the channel the image is posted in and the
/// message that gets edited on every refresh
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuildBinding {
    pub guild_id: u64,
    pub channel_id: u64,
    pub message_id: u64,
}

/// Cache capability injected into the session manager.
///
/// Entries expire after their TTL; an expired entry reads back as a miss.
/// Concurrent writers are tolerated, last write wins.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_value(&self, key: &str) -> BotResult<Option<String>>;
    async fn set_value(&self, key: &str, value: &str, ttl: Duration) -> BotResult<()>;
    async fn delete_value(&self, key: &str) -> BotResult<()>;
}

/// In-process session store, used when running without Redis and in tests
#[derive(Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, (String, Instant)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get_value(&self, key: &str) -> BotResult<Option<String>> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => Ok(Some(value.clone())),
            _ => Ok(None),
        }
    }

    async fn set_value(&self, key: &str, value: &str, ttl: Duration) -> BotResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn delete_value(&self, key: &str) -> BotResult<()> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }
}

use super::{GuildBinding, SessionStore};
use crate::config::Config;
use crate::error::{store_error, BotResult};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client as RedisClient};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tracing::info;

// Redis key constants
pub mod keys {
    pub const GUILD_BINDINGS: &str = "sugar_calendar_guild_bindings";
    pub const SESSION_NONCE: &str = "sugar_calendar_nonce";
}

/// The store actor that processes messages
pub struct StoreActor {
    config: Arc<RwLock<Config>>,
    command_rx: mpsc::Receiver<StoreCommand>,
    connection: Option<ConnectionManager>,
}

/// Commands that can be sent to the store actor
pub enum StoreCommand {
    GetCached(String, mpsc::Sender<BotResult<Option<String>>>),
    SetCached {
        key: String,
        value: String,
        ttl: Duration,
        response_tx: mpsc::Sender<BotResult<()>>,
    },
    DeleteCached(String, mpsc::Sender<BotResult<()>>),
    GetBindings(mpsc::Sender<BotResult<Vec<GuildBinding>>>),
    SaveBinding(GuildBinding, mpsc::Sender<BotResult<()>>),
    RemoveBinding(u64, mpsc::Sender<BotResult<()>>),
    Shutdown,
}

/// Handle for communicating with the store actor
#[derive(Clone)]
pub struct StoreActorHandle {
    command_tx: mpsc::Sender<StoreCommand>,
}

impl StoreActorHandle {
    /// Read a cached value, `None` when missing or expired
    pub async fn get_cached(&self, key: &str) -> BotResult<Option<String>> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(StoreCommand::GetCached(key.to_string(), response_tx))
            .await
            .map_err(|e| store_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| store_error("Response channel closed"))?
    }

    /// Write a cached value with a TTL
    pub async fn set_cached(&self, key: &str, value: &str, ttl: Duration) -> BotResult<()> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(StoreCommand::SetCached {
                key: key.to_string(),
                value: value.to_string(),
                ttl,
                response_tx,
            })
            .await
            .map_err(|e| store_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| store_error("Response channel closed"))?
    }

    /// Delete a cached value
    pub async fn delete_cached(&self, key: &str) -> BotResult<()> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(StoreCommand::DeleteCached(key.to_string(), response_tx))
            .await
            .map_err(|e| store_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| store_error("Response channel closed"))?
    }

    /// Get all guild bindings
    pub async fn get_bindings(&self) -> BotResult<Vec<GuildBinding>> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(StoreCommand::GetBindings(response_tx))
            .await
            .map_err(|e| store_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| store_error("Response channel closed"))?
    }

    /// Insert or replace the binding for one guild
    pub async fn save_binding(&self, binding: GuildBinding) -> BotResult<()> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(StoreCommand::SaveBinding(binding, response_tx))
            .await
            .map_err(|e| store_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| store_error("Response channel closed"))?
    }

    /// Remove the binding for one guild
    pub async fn remove_binding(&self, guild_id: u64) -> BotResult<()> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(StoreCommand::RemoveBinding(guild_id, response_tx))
            .await
            .map_err(|e| store_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| store_error("Response channel closed"))?
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> BotResult<()> {
        let _ = self.command_tx.send(StoreCommand::Shutdown).await;
        Ok(())
    }
}

// The store handle doubles as the session cache capability injected into
// the session manager.
#[async_trait]
impl SessionStore for StoreActorHandle {
    async fn get_value(&self, key: &str) -> BotResult<Option<String>> {
        self.get_cached(key).await
    }

    async fn set_value(&self, key: &str, value: &str, ttl: Duration) -> BotResult<()> {
        self.set_cached(key, value, ttl).await
    }

    async fn delete_value(&self, key: &str) -> BotResult<()> {
        self.delete_cached(key).await
    }
}

impl StoreActor {
    /// Create a new actor and return its handle
    pub fn new(config: Arc<RwLock<Config>>) -> (Self, StoreActorHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);

        let actor = Self {
            config,
            command_rx,
            connection: None,
        };

        let handle = StoreActorHandle { command_tx };

        (actor, handle)
    }

    /// Start the actor's processing loop
    pub async fn run(&mut self) {
        info!("Store actor started");

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                StoreCommand::GetCached(key, response_tx) => {
                    let result = self.get_cached_value(&key).await;
                    let _ = response_tx.send(result).await;
                }
                StoreCommand::SetCached {
                    key,
                    value,
                    ttl,
                    response_tx,
                } => {
                    let result = self.set_cached_value(&key, &value, ttl).await;
                    let _ = response_tx.send(result).await;
                }
                StoreCommand::DeleteCached(key, response_tx) => {
                    let result = self.delete_cached_value(&key).await;
                    let _ = response_tx.send(result).await;
                }
                StoreCommand::GetBindings(response_tx) => {
                    let result = self.get_bindings().await;
                    let _ = response_tx.send(result).await;
                }
                StoreCommand::SaveBinding(binding, response_tx) => {
                    let result = self.save_binding(binding).await;
                    let _ = response_tx.send(result).await;
                }
                StoreCommand::RemoveBinding(guild_id, response_tx) => {
                    let result = self.remove_binding(guild_id).await;
                    let _ = response_tx.send(result).await;
                }
                StoreCommand::Shutdown => {
                    info!("Store actor shutting down");
                    break;
                }
            }
        }

        info!("Store actor shut down");
    }

    /// Get a redis connection, establishing one on first use
    async fn get_connection(&mut self) -> BotResult<ConnectionManager> {
        if let Some(connection) = &self.connection {
            return Ok(connection.clone());
        }

        let redis_url = {
            let config_guard = self.config.read().await;
            config_guard.redis_url.clone()
        };

        let client = RedisClient::open(redis_url)
            .map_err(|e| store_error(&format!("Failed to create Redis client: {}", e)))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| store_error(&format!("Failed to connect to Redis: {}", e)))?;

        self.connection = Some(connection.clone());
        Ok(connection)
    }

    async fn get_cached_value(&mut self, key: &str) -> BotResult<Option<String>> {
        let mut conn = self.get_connection().await?;

        let value: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| store_error(&format!("Failed to read {} from Redis: {}", key, e)))?;

        Ok(value)
    }

    async fn set_cached_value(&mut self, key: &str, value: &str, ttl: Duration) -> BotResult<()> {
        let mut conn = self.get_connection().await?;

        // Redis expires the key for us
        () = conn
            .set_ex(key, value, ttl.as_secs())
            .await
            .map_err(|e| store_error(&format!("Failed to write {} to Redis: {}", key, e)))?;

        Ok(())
    }

    async fn delete_cached_value(&mut self, key: &str) -> BotResult<()> {
        let mut conn = self.get_connection().await?;

        () = conn
            .del(key)
            .await
            .map_err(|e| store_error(&format!("Failed to delete {} from Redis: {}", key, e)))?;

        Ok(())
    }

    async fn get_bindings(&mut self) -> BotResult<Vec<GuildBinding>> {
        let mut conn = self.get_connection().await?;

        let bindings_json: Option<String> = conn
            .get(keys::GUILD_BINDINGS)
            .await
            .map_err(|e| store_error(&format!("Failed to read bindings from Redis: {}", e)))?;

        let Some(bindings_json) = bindings_json else {
            return Ok(Vec::new());
        };

        let bindings: Vec<GuildBinding> = serde_json::from_str(&bindings_json)
            .map_err(|e| store_error(&format!("Failed to deserialize bindings: {}", e)))?;

        Ok(bindings)
    }

    async fn save_binding(&mut self, binding: GuildBinding) -> BotResult<()> {
        let mut bindings = self.get_bindings().await?;
        bindings.retain(|b| b.guild_id != binding.guild_id);
        bindings.push(binding);
        self.write_bindings(&bindings).await
    }

    async fn remove_binding(&mut self, guild_id: u64) -> BotResult<()> {
        let mut bindings = self.get_bindings().await?;
        bindings.retain(|b| b.guild_id != guild_id);
        self.write_bindings(&bindings).await
    }

    async fn write_bindings(&mut self, bindings: &[GuildBinding]) -> BotResult<()> {
        let mut conn = self.get_connection().await?;

        let bindings_json = serde_json::to_string(bindings)
            .map_err(|e| store_error(&format!("Failed to serialize bindings: {}", e)))?;

        () = conn
            .set(keys::GUILD_BINDINGS, bindings_json)
            .await
            .map_err(|e| store_error(&format!("Failed to save bindings to Redis: {}", e)))?;

        Ok(())
    }
}

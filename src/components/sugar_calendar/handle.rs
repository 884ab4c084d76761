use super::actor::{SugarCalendarActor, SugarCalendarActorHandle};
use crate::components::store::StoreActorHandle;
use crate::config::Config;
use crate::error::BotResult;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Handle for interacting with the Sugar Calendar actor
#[derive(Clone)]
pub struct SugarCalendarHandle {
    actor_handle: SugarCalendarActorHandle,
    _actor_task: Arc<JoinHandle<()>>,
}

impl SugarCalendarHandle {
    /// Create a new SugarCalendarHandle and spawn the actor
    pub async fn new(
        config: Arc<RwLock<Config>>,
        store_handle: StoreActorHandle,
    ) -> BotResult<Self> {
        let (mut actor, handle) = SugarCalendarActor::new(config, store_handle).await?;

        // Spawn a task to run the actor
        let actor_task = tokio::spawn(async move {
            actor.run().await;
        });

        Ok(Self {
            actor_handle: handle,
            _actor_task: Arc::new(actor_task),
        })
    }

    /// Render the current month as a PNG. This is the one operation the rest
    /// of the bot needs from the pipeline.
    pub async fn get_calendar_image(&self) -> BotResult<Vec<u8>> {
        self.actor_handle.get_calendar_image().await
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> BotResult<()> {
        self.actor_handle.shutdown().await
    }
}

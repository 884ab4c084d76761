//! Sugar Calendar component: scrapes the upstream widget's AJAX API,
//! renders the month as an image, and keeps one mirrored message per bound
//! guild up to date.

mod actor;
pub mod client;
mod handle;
pub mod models;
pub mod parse;
pub mod schema;
mod scheduler;
pub mod session;
pub mod transport;

pub use client::CalendarClient;
pub use handle::SugarCalendarHandle;
pub use models::{CalendarEvent, CalendarQuery};
pub use scheduler::{refresh_guild_messages, update_bound_message, ATTACHMENT_NAME};
pub use session::SessionManager;

use crate::components::store::StoreActorHandle;
use crate::config::Config;
use crate::error::BotResult;
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Sugar Calendar component for integration with Discord
#[derive(Default)]
pub struct SugarCalendar {
    handle: RwLock<Option<SugarCalendarHandle>>,
}

impl SugarCalendar {
    /// Create a new Sugar Calendar component
    pub fn new() -> Self {
        Self {
            handle: RwLock::new(None),
        }
    }

    /// Get the handle if it exists
    pub async fn get_handle(&self) -> Option<SugarCalendarHandle> {
        let handle_lock = self.handle.read().await;
        handle_lock.clone()
    }
}

#[async_trait]
impl super::Component for SugarCalendar {
    fn name(&self) -> &'static str {
        "sugar_calendar"
    }

    async fn init(
        &self,
        ctx: &serenity::Context,
        config: Arc<RwLock<Config>>,
        store_handle: StoreActorHandle,
    ) -> BotResult<()> {
        // Create a new handle if one doesn't exist
        let mut handle_lock = self.handle.write().await;
        if handle_lock.is_none() {
            *handle_lock =
                Some(SugarCalendarHandle::new(Arc::clone(&config), store_handle.clone()).await?);
        }

        let handle = handle_lock
            .as_ref()
            .cloned()
            .expect("handle was just created");
        let ctx = Arc::new(ctx.clone());

        // Start the periodic refresh scheduler
        scheduler::start_scheduler(ctx, config, handle, store_handle).await;

        Ok(())
    }

    async fn shutdown(&self) -> BotResult<()> {
        // Shutdown the handle if it exists
        let handle_lock = self.handle.read().await;
        if let Some(handle) = &*handle_lock {
            handle.shutdown().await?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

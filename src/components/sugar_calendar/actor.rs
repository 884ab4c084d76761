use super::client::CalendarClient;
use super::models::CalendarQuery;
use super::transport::ReqwestTransport;
use crate::components::store::StoreActorHandle;
use crate::config::Config;
use crate::error::{store_error, BotResult};
use crate::render;
use chrono::{Datelike, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tracing::info;

/// The Sugar Calendar actor that processes messages
pub struct SugarCalendarActor {
    config: Arc<RwLock<Config>>,
    client: CalendarClient,
    command_rx: mpsc::Receiver<SugarCalendarCommand>,
}

/// Commands that can be sent to the Sugar Calendar actor
pub enum SugarCalendarCommand {
    GetCalendarImage(mpsc::Sender<BotResult<Vec<u8>>>),
    Shutdown,
}

/// Handle for communicating with the Sugar Calendar actor
#[derive(Clone)]
pub struct SugarCalendarActorHandle {
    command_tx: mpsc::Sender<SugarCalendarCommand>,
}

impl SugarCalendarActorHandle {
    /// Render the current month as a PNG
    pub async fn get_calendar_image(&self) -> BotResult<Vec<u8>> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(SugarCalendarCommand::GetCalendarImage(response_tx))
            .await
            .map_err(|e| store_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| store_error("Response channel closed"))?
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> BotResult<()> {
        let _ = self.command_tx.send(SugarCalendarCommand::Shutdown).await;
        Ok(())
    }
}

impl SugarCalendarActor {
    /// Create a new actor and return its handle
    pub async fn new(
        config: Arc<RwLock<Config>>,
        store_handle: StoreActorHandle,
    ) -> BotResult<(Self, SugarCalendarActorHandle)> {
        let (command_tx, command_rx) = mpsc::channel(32);

        let (base_url, timeout, timezone) = {
            let config_read = config.read().await;
            (
                config_read.calendar_base_url.clone(),
                Duration::from_secs(config_read.http_timeout_secs),
                config_read.timezone.clone(),
            )
        };

        let transport = Arc::new(ReqwestTransport::new(&base_url, timeout)?);
        let client = CalendarClient::new(transport, Arc::new(store_handle), timezone);

        let actor = Self {
            config,
            client,
            command_rx,
        };

        let handle = SugarCalendarActorHandle { command_tx };

        Ok((actor, handle))
    }

    /// Start the actor's processing loop
    pub async fn run(&mut self) {
        info!("Sugar Calendar actor started");

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                SugarCalendarCommand::GetCalendarImage(response_tx) => {
                    let result = self.get_calendar_image().await;
                    let _ = response_tx.send(result).await;
                }
                SugarCalendarCommand::Shutdown => {
                    info!("Sugar Calendar actor shutting down");
                    break;
                }
            }
        }

        info!("Sugar Calendar actor shut down");
    }

    /// Run the whole scrape-validate-render pipeline for the current month
    async fn get_calendar_image(&self) -> BotResult<Vec<u8>> {
        let (tz, calendar_id) = {
            let config_read = self.config.read().await;
            (config_read.tz(), config_read.calendar_id.clone())
        };

        let now = Utc::now().with_timezone(&tz);
        let query = CalendarQuery {
            day: now.day(),
            month: now.month(),
            year: now.year(),
            calendar_id,
        };

        let events = self.client.fetch_calendar(&query).await?;
        info!("Fetched {} calendar events", events.len());

        let image = render::render_month(&events, now)?;
        info!("Calendar rendered ({:.1} KB)", image.len() as f64 / 1024.0);

        Ok(image)
    }
}

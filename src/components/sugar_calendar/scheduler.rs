use super::handle::SugarCalendarHandle;
use crate::components::store::{GuildBinding, StoreActorHandle};
use crate::config::Config;
use crate::error::BotResult;
use poise::serenity_prelude as serenity;
use serenity::{
    ChannelId, CreateAttachment, CreateMessage, EditAttachments, EditMessage, MessageId,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};

/// File name the calendar image is attached under
pub const ATTACHMENT_NAME: &str = "calendar.png";

/// Start the periodic refresh loop. The first tick fires immediately so a
/// freshly started bot updates its mirrors right away.
pub async fn start_scheduler(
    ctx: Arc<serenity::Context>,
    config: Arc<RwLock<Config>>,
    handle: SugarCalendarHandle,
    store_handle: StoreActorHandle,
) {
    let interval_minutes = {
        let config_read = config.read().await;
        config_read.refresh_interval_minutes.max(1)
    };

    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(interval_minutes * 60));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Calendar refresh scheduler started ({}m interval)",
            interval_minutes
        );

        loop {
            ticker.tick().await;

            if let Err(e) = refresh_guild_messages(&ctx, &handle, &store_handle).await {
                // Previously posted images stay untouched on a failed cycle
                error!("Calendar refresh failed: {:?}", e);
            }
        }
    });
}

/// Render the calendar once and push the image into every bound guild
pub async fn refresh_guild_messages(
    ctx: &serenity::Context,
    handle: &SugarCalendarHandle,
    store_handle: &StoreActorHandle,
) -> BotResult<()> {
    let image = handle.get_calendar_image().await?;

    let bindings = store_handle.get_bindings().await?;
    if bindings.is_empty() {
        info!("No guild bindings, skipping calendar update");
        return Ok(());
    }

    let mut updated = 0;
    for binding in &bindings {
        match update_bound_message(ctx, store_handle, binding, &image).await {
            Ok(()) => updated += 1,
            Err(e) => error!(
                "Failed to update calendar in guild {}: {:?}",
                binding.guild_id, e
            ),
        }
    }

    info!("Updated calendar in {}/{} guilds", updated, bindings.len());
    Ok(())
}

/// Edit the tracked message in place, or post a fresh one and re-bind when
/// the tracked message is gone
pub async fn update_bound_message(
    ctx: &serenity::Context,
    store_handle: &StoreActorHandle,
    binding: &GuildBinding,
    image: &[u8],
) -> BotResult<()> {
    let channel = ChannelId::new(binding.channel_id);
    let message_id = MessageId::new(binding.message_id);
    let attachment = CreateAttachment::bytes(image.to_vec(), ATTACHMENT_NAME);

    match channel.message(&ctx.http, message_id).await {
        Ok(_) => {
            channel
                .edit_message(
                    &ctx.http,
                    message_id,
                    EditMessage::new().attachments(EditAttachments::new().add(attachment)),
                )
                .await?;
        }
        Err(_) => {
            let message = channel
                .send_message(&ctx.http, CreateMessage::new().add_file(attachment))
                .await?;

            store_handle
                .save_binding(GuildBinding {
                    guild_id: binding.guild_id,
                    channel_id: binding.channel_id,
                    message_id: message.id.get(),
                })
                .await?;
        }
    }

    Ok(())
}

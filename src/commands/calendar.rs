use crate::commands::{create_error_embed, create_success_embed, CommandResult, Context};
use crate::components::store::GuildBinding;
use crate::components::sugar_calendar::{update_bound_message, SugarCalendar, ATTACHMENT_NAME};
use crate::components::SugarCalendarHandle;
use crate::error::Error;
use poise::serenity_prelude as serenity;
use serenity::{CreateAttachment, CreateMessage};

/// Resolve the calendar handle from the component manager
async fn calendar_handle(ctx: &Context<'_>) -> Result<SugarCalendarHandle, Error> {
    if let Some(component_manager) = &ctx.data().component_manager {
        if let Some(component) = component_manager.get_component_by_name("sugar_calendar") {
            if let Some(calendar) = component.as_any().downcast_ref::<SugarCalendar>() {
                if let Some(handle) = calendar.get_handle().await {
                    return Ok(handle);
                }
            }
        }
    }

    Err(Error::Other(
        "Sugar Calendar component is not available".to_string(),
    ))
}

/// Start mirroring the calendar in this channel
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "KICK_MEMBERS",
    required_bot_permissions = "SEND_MESSAGES | ATTACH_FILES | VIEW_CHANNEL"
)]
pub async fn start(ctx: Context<'_>) -> CommandResult {
    let guild_id = ctx
        .guild_id()
        .ok_or_else(|| Error::Other("Command used outside a guild".to_string()))?;
    let store_handle = ctx.data().store_handle.clone();

    // Refuse a second binding rather than silently moving the mirror
    let bindings = store_handle.get_bindings().await?;
    if let Some(existing) = bindings.iter().find(|b| b.guild_id == guild_id.get()) {
        ctx.send(
            poise::CreateReply::default()
                .embed(create_error_embed(
                    "Already started",
                    &format!("The calendar is already mirrored in <#{}>.", existing.channel_id),
                ))
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    // Rendering takes a few seconds, acknowledge the interaction first
    ctx.defer_ephemeral().await?;

    let handle = calendar_handle(&ctx).await?;
    let image = handle.get_calendar_image().await?;

    let message = ctx
        .channel_id()
        .send_message(
            ctx.http(),
            CreateMessage::new().add_file(CreateAttachment::bytes(image, ATTACHMENT_NAME)),
        )
        .await?;

    store_handle
        .save_binding(GuildBinding {
            guild_id: guild_id.get(),
            channel_id: ctx.channel_id().get(),
            message_id: message.id.get(),
        })
        .await?;

    ctx.send(
        poise::CreateReply::default()
            .embed(create_success_embed(
                "Calendar started",
                "I'll keep the calendar image in this channel up to date.",
            ))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// Stop mirroring the calendar in this guild
#[poise::command(slash_command, guild_only, required_permissions = "KICK_MEMBERS")]
pub async fn stop(ctx: Context<'_>) -> CommandResult {
    let guild_id = ctx
        .guild_id()
        .ok_or_else(|| Error::Other("Command used outside a guild".to_string()))?;
    let store_handle = ctx.data().store_handle.clone();

    let bindings = store_handle.get_bindings().await?;
    if !bindings.iter().any(|b| b.guild_id == guild_id.get()) {
        ctx.send(
            poise::CreateReply::default()
                .embed(create_error_embed(
                    "Not running",
                    "The calendar is not being mirrored in this server.",
                ))
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    store_handle.remove_binding(guild_id.get()).await?;

    ctx.send(
        poise::CreateReply::default()
            .embed(create_success_embed(
                "Calendar stopped",
                "The calendar message will no longer be updated.",
            ))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// Refresh this guild's calendar image right now
#[poise::command(slash_command, guild_only, required_permissions = "KICK_MEMBERS")]
pub async fn refresh(ctx: Context<'_>) -> CommandResult {
    let guild_id = ctx
        .guild_id()
        .ok_or_else(|| Error::Other("Command used outside a guild".to_string()))?;
    let store_handle = ctx.data().store_handle.clone();

    let bindings = store_handle.get_bindings().await?;
    let Some(binding) = bindings.into_iter().find(|b| b.guild_id == guild_id.get()) else {
        ctx.send(
            poise::CreateReply::default()
                .embed(create_error_embed(
                    "Not running",
                    "Use /start first to pick a channel for the calendar.",
                ))
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    };

    ctx.defer_ephemeral().await?;

    let handle = calendar_handle(&ctx).await?;
    let image = handle.get_calendar_image().await?;

    update_bound_message(ctx.serenity_context(), &store_handle, &binding, &image).await?;

    ctx.send(
        poise::CreateReply::default()
            .embed(create_success_embed(
                "Calendar refreshed",
                "The calendar image has been re-rendered.",
            ))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}
